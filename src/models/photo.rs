use rusqlite::params;
use serde::Serialize;

use crate::db::DbPool;

/// Which photo table an upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhotoKind {
    Portrait,
    Namecard,
    Spouse,
}

impl PhotoKind {
    pub const ALL: [PhotoKind; 3] = [PhotoKind::Portrait, PhotoKind::Namecard, PhotoKind::Spouse];

    /// Path segment used in routes (`/member/<no>/photo/<kind>`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(PhotoKind::Portrait),
            "namecard" => Some(PhotoKind::Namecard),
            "spouse" => Some(PhotoKind::Spouse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoKind::Portrait => "photo",
            PhotoKind::Namecard => "namecard",
            PhotoKind::Spouse => "spouse",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            PhotoKind::Portrait => "member_photos",
            PhotoKind::Namecard => "member_namecards",
            PhotoKind::Spouse => "spouse_photos",
        }
    }

    /// File name prefix of the on-disk thumbnail.
    pub fn thumb_prefix(&self) -> &'static str {
        match self {
            PhotoKind::Portrait => "photo_",
            PhotoKind::Namecard => "namecard_",
            PhotoKind::Spouse => "spouse_",
        }
    }

    pub fn thumb_name(&self, member_no: i64) -> String {
        format!("{}{}.jpg", self.thumb_prefix(), member_no)
    }
}

#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub id: i64,
    pub member_no: i64,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub created_at: String,
}

impl StoredPhoto {
    /// Append a new upload. Older rows stay; readers pick the newest.
    pub fn insert(
        pool: &DbPool,
        kind: PhotoKind,
        member_no: i64,
        mime: &str,
        bytes: &[u8],
    ) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            &format!(
                "INSERT INTO {} (member_no, mime, photo, byte_len) VALUES (?1, ?2, ?3, ?4)",
                kind.table()
            ),
            params![member_no, mime, bytes, bytes.len() as i64],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn latest(pool: &DbPool, kind: PhotoKind, member_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!(
                "SELECT id, member_no, mime, photo, created_at FROM {}
                 WHERE member_no = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                kind.table()
            ),
            params![member_no],
            |row| {
                Ok(StoredPhoto {
                    id: row.get(0)?,
                    member_no: row.get(1)?,
                    mime: row.get(2)?,
                    bytes: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .ok()
    }

    pub fn count(pool: &DbPool, kind: PhotoKind, member_no: i64) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE member_no = ?1", kind.table()),
            params![member_no],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }
}
