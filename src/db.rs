use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Marker written into an `attrib` column to retire a row.
/// A row is live while its attrib does not contain it.
pub const ARCHIVED: &str = "XXXUP";

/// SQL predicate selecting live rows of a table with an `attrib` column.
pub const LIVE: &str = "attrib NOT LIKE '%XXXUP%'";

pub fn init_pool(path: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let manager = SqliteConnectionManager::file(path)
        .with_init(|c| c.execute_batch("PRAGMA foreign_keys=ON;"));
    let pool = Pool::builder().max_size(10).build(manager)?;

    // Enable WAL mode for better concurrent read performance
    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        -- Portal accounts (staff and administrators)
        CREATE TABLE IF NOT EXISTS users (
            user_no INTEGER PRIMARY KEY,
            user_id TEXT UNIQUE NOT NULL,
            user_name TEXT NOT NULL,
            user_password TEXT NOT NULL,
            user_role TEXT NOT NULL DEFAULT 'staff',
            club_no INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Server-side sessions
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_no INTEGER NOT NULL,
            user_name TEXT NOT NULL,
            user_role TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'user',
            created_at DATETIME NOT NULL,
            expires_at DATETIME NOT NULL,
            ip_address TEXT
        );

        CREATE TABLE IF NOT EXISTS regions (
            region_no INTEGER PRIMARY KEY,
            region_name TEXT NOT NULL,
            attrib TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Region detail history (latest live row is current)
        CREATE TABLE IF NOT EXISTS region_details (
            id INTEGER PRIMARY KEY,
            region_no INTEGER NOT NULL,
            chairman TEXT NOT NULL DEFAULT '',
            slogan TEXT NOT NULL DEFAULT '',
            detail TEXT NOT NULL DEFAULT '',
            attrib TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            FOREIGN KEY (region_no) REFERENCES regions(region_no)
        );

        CREATE TABLE IF NOT EXISTS clubs (
            club_no INTEGER PRIMARY KEY,
            club_name TEXT NOT NULL,
            region_no INTEGER,
            charter_date TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            slogan TEXT NOT NULL DEFAULT '',
            attrib TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS ranks (
            rank_no INTEGER PRIMARY KEY,
            rank_title TEXT NOT NULL,
            order_no INTEGER NOT NULL DEFAULT 0,
            attrib TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS members (
            member_no INTEGER PRIMARY KEY,
            club_no INTEGER NOT NULL,
            rank_no INTEGER,
            member_name TEXT NOT NULL,
            phone TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            birth TEXT NOT NULL DEFAULT '',
            join_date TEXT NOT NULL DEFAULT '',
            mb_password TEXT,
            is_private INTEGER NOT NULL DEFAULT 0,
            attrib TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (club_no) REFERENCES clubs(club_no)
        );

        CREATE INDEX IF NOT EXISTS idx_members_club ON members(club_no);

        CREATE TABLE IF NOT EXISTS member_spouses (
            member_no INTEGER PRIMARY KEY,
            spouse_name TEXT NOT NULL DEFAULT '',
            spouse_phone TEXT NOT NULL DEFAULT '',
            spouse_birth TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (member_no) REFERENCES members(member_no)
        );

        CREATE TABLE IF NOT EXISTS member_businesses (
            member_no INTEGER PRIMARY KEY,
            company TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            business_phone TEXT NOT NULL DEFAULT '',
            business_address TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (member_no) REFERENCES members(member_no)
        );

        -- Photo blobs: one row per upload, newest wins
        CREATE TABLE IF NOT EXISTS member_photos (
            id INTEGER PRIMARY KEY,
            member_no INTEGER NOT NULL,
            mime TEXT NOT NULL,
            photo BLOB NOT NULL,
            byte_len INTEGER NOT NULL,
            created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );

        CREATE TABLE IF NOT EXISTS member_namecards (
            id INTEGER PRIMARY KEY,
            member_no INTEGER NOT NULL,
            mime TEXT NOT NULL,
            photo BLOB NOT NULL,
            byte_len INTEGER NOT NULL,
            created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );

        CREATE TABLE IF NOT EXISTS spouse_photos (
            id INTEGER PRIMARY KEY,
            member_no INTEGER NOT NULL,
            mime TEXT NOT NULL,
            photo BLOB NOT NULL,
            byte_len INTEGER NOT NULL,
            created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_member_photos ON member_photos(member_no, created_at);
        CREATE INDEX IF NOT EXISTS idx_member_namecards ON member_namecards(member_no, created_at);
        CREATE INDEX IF NOT EXISTS idx_spouse_photos ON spouse_photos(member_no, created_at);

        -- Club officers (latest live row per club is current)
        CREATE TABLE IF NOT EXISTS club_staff (
            id INTEGER PRIMARY KEY,
            club_no INTEGER NOT NULL,
            president TEXT NOT NULL DEFAULT '',
            secretary TEXT NOT NULL DEFAULT '',
            treasurer TEXT NOT NULL DEFAULT '',
            term_year TEXT NOT NULL DEFAULT '',
            attrib TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            FOREIGN KEY (club_no) REFERENCES clubs(club_no)
        );

        CREATE TABLE IF NOT EXISTS club_documents (
            id INTEGER PRIMARY KEY,
            club_no INTEGER NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL DEFAULT '',
            attrib TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            FOREIGN KEY (club_no) REFERENCES clubs(club_no)
        );

        CREATE TABLE IF NOT EXISTS boards (
            board_no INTEGER PRIMARY KEY,
            club_no INTEGER,
            region_no INTEGER,
            title TEXT NOT NULL,
            attrib TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS board_messages (
            message_no INTEGER PRIMARY KEY,
            board_no INTEGER NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL DEFAULT '',
            author_name TEXT NOT NULL DEFAULT '',
            attrib TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            FOREIGN KEY (board_no) REFERENCES boards(board_no)
        );

        -- Inbound requests from the mobile client
        CREATE TABLE IF NOT EXISTS request_messages (
            id INTEGER PRIMARY KEY,
            member_no INTEGER,
            sender TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL,
            archived INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        ",
    )?;

    Ok(())
}

pub fn seed_defaults(pool: &DbPool, admin_password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    let rank_count: i64 = conn.query_row("SELECT COUNT(*) FROM ranks", [], |row| row.get(0))?;
    if rank_count == 0 {
        let defaults = [
            ("President", 1),
            ("First Vice President", 2),
            ("Second Vice President", 3),
            ("Secretary", 4),
            ("Treasurer", 5),
            ("Director", 6),
            ("Member", 10),
        ];
        for (title, order_no) in defaults {
            conn.execute(
                "INSERT INTO ranks (rank_title, order_no) VALUES (?1, ?2)",
                params![title, order_no],
            )?;
        }
    }

    // Seed the administrator account if there is none
    let admin_exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE user_id = 'admin'",
        [],
        |row| row.get(0),
    )?;

    if admin_exists == 0 {
        let hash = bcrypt::hash(admin_password, bcrypt::DEFAULT_COST)?;
        conn.execute(
            "INSERT INTO users (user_id, user_name, user_password, user_role)
             VALUES ('admin', 'Administrator', ?1, 'admin')",
            params![hash],
        )?;
    }

    Ok(())
}
