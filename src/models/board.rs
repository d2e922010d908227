use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::update::archive_row;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Board {
    pub board_no: i64,
    pub club_no: Option<i64>,
    pub region_no: Option<i64>,
    pub title: String,
    pub owner_name: Option<String>,
    pub message_count: i64,
    pub created_at: String,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct BoardForm {
    pub club_no: Option<i64>,
    pub region_no: Option<i64>,
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardMessage {
    pub message_no: i64,
    pub board_no: i64,
    pub title: String,
    pub body: String,
    pub author_name: String,
    pub created_at: String,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct MessageForm {
    pub title: String,
    pub body: String,
}

const BOARD_SELECT: &str = "SELECT b.board_no, b.club_no, b.region_no, b.title,
        COALESCE(c.club_name, r.region_name) AS owner_name,
        (SELECT COUNT(*) FROM board_messages m
           WHERE m.board_no = b.board_no AND m.attrib NOT LIKE '%XXXUP%') AS message_count,
        b.created_at
    FROM boards b
    LEFT JOIN clubs c ON c.club_no = b.club_no
    LEFT JOIN regions r ON r.region_no = b.region_no";

impl Board {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Board {
            board_no: row.get(0)?,
            club_no: row.get(1)?,
            region_no: row.get(2)?,
            title: row.get(3)?,
            owner_name: row.get(4)?,
            message_count: row.get(5)?,
            created_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        })
    }

    pub fn find(pool: &DbPool, board_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("{} WHERE b.board_no = ?1 AND b.attrib NOT LIKE '%XXXUP%'", BOARD_SELECT),
            params![board_no],
            Self::from_row,
        )
        .ok()
    }

    pub fn list(pool: &DbPool) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE b.attrib NOT LIKE '%XXXUP%' ORDER BY b.board_no DESC",
                BOARD_SELECT
            ))
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn create(pool: &DbPool, form: &BoardForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO boards (club_no, region_no, title) VALUES (?1, ?2, ?3)",
            params![form.club_no, form.region_no, form.title],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }
}

impl BoardMessage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(BoardMessage {
            message_no: row.get("message_no")?,
            board_no: row.get("board_no")?,
            title: row.get("title")?,
            body: row.get("body")?,
            author_name: row.get("author_name")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn find(pool: &DbPool, message_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT message_no, board_no, title, body, author_name, created_at
             FROM board_messages WHERE message_no = ?1",
            params![message_no],
            Self::from_row,
        )
        .ok()
    }

    pub fn list_for_board(pool: &DbPool, board_no: i64) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT message_no, board_no, title, body, author_name, created_at
                 FROM board_messages
                 WHERE board_no = ?1 AND attrib NOT LIKE '%XXXUP%'
                 ORDER BY created_at DESC, message_no DESC",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![board_no], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn create(
        pool: &DbPool,
        board_no: i64,
        form: &MessageForm,
        author_name: &str,
    ) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO board_messages (board_no, title, body, author_name) VALUES (?1, ?2, ?3, ?4)",
            params![board_no, form.title, form.body, author_name],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn archive(pool: &DbPool, message_no: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        archive_row(&conn, "board_messages", "message_no", message_no)?;
        Ok(())
    }
}
