use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

/// Inbound message from the mobile client, waiting for a staff reply.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestMessage {
    pub id: i64,
    pub member_no: Option<i64>,
    pub sender: String,
    pub phone: String,
    pub body: String,
    pub archived: bool,
    pub created_at: String,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct RequestForm {
    pub member_no: Option<i64>,
    pub sender: String,
    pub phone: Option<String>,
    pub body: String,
}

impl RequestMessage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let archived: i64 = row.get("archived")?;
        Ok(RequestMessage {
            id: row.get("id")?,
            member_no: row.get("member_no")?,
            sender: row.get("sender")?,
            phone: row.get("phone")?,
            body: row.get("body")?,
            archived: archived != 0,
            created_at: row.get::<_, Option<String>>("created_at")?.unwrap_or_default(),
        })
    }

    pub fn create(pool: &DbPool, form: &RequestForm) -> Result<i64, String> {
        let body = form.body.trim();
        if body.is_empty() {
            return Err("Message body is required".to_string());
        }
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO request_messages (member_no, sender, phone, body) VALUES (?1, ?2, ?3, ?4)",
            params![
                form.member_no,
                form.sender.trim(),
                form.phone.as_deref().unwrap_or("").trim(),
                body
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    /// Open (or, with `archived`, closed) requests, newest first.
    pub fn list(pool: &DbPool, archived: bool) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT id, member_no, sender, phone, body, archived, created_at
                 FROM request_messages WHERE archived = ?1
                 ORDER BY id DESC",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![archived as i64], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn archive(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE request_messages SET archived = 1 WHERE id = ?1",
            params![id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn open_count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM request_messages WHERE archived = 0",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }
}
