use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::update::archive_and_insert;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClubDocument {
    pub id: i64,
    pub club_no: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct DocumentForm {
    pub title: String,
    pub content: String,
}

impl ClubDocument {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ClubDocument {
            id: row.get("id")?,
            club_no: row.get("club_no")?,
            title: row.get("title")?,
            content: row.get("content")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn current(pool: &DbPool, club_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT id, club_no, title, content, created_at FROM club_documents
             WHERE club_no = ?1 AND attrib NOT LIKE '%XXXUP%'
             ORDER BY created_at DESC, id DESC LIMIT 1",
            params![club_no],
            Self::from_row,
        )
        .ok()
    }

    pub fn replace(pool: &DbPool, club_no: i64, form: &DocumentForm) -> Result<i64, String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        archive_and_insert(
            &mut conn,
            "club_documents",
            "club_no",
            club_no,
            "INSERT INTO club_documents (club_no, title, content) VALUES (?1, ?2, ?3)",
            params![club_no, form.title, form.content],
        )
    }
}
