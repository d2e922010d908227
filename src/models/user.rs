use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub user_no: i64,
    pub user_id: String,
    pub user_name: String,
    pub user_password: String,
    pub user_role: String, // admin, staff
    pub club_no: Option<i64>,
    pub created_at: String,
}

impl User {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(User {
            user_no: row.get(0)?,
            user_id: row.get(1)?,
            user_name: row.get(2)?,
            user_password: row.get(3)?,
            user_role: row.get(4)?,
            club_no: row.get(5)?,
            created_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        })
    }

    const SELECT_COLS: &'static str =
        "user_no, user_id, user_name, user_password, user_role, club_no, created_at";

    // ── Lookups ──

    pub fn get_by_no(pool: &DbPool, user_no: i64) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE user_no = ?1", Self::SELECT_COLS),
            params![user_no],
            Self::from_row,
        )
        .ok()
    }

    pub fn get_by_login(pool: &DbPool, user_id: &str) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE user_id = ?1", Self::SELECT_COLS),
            params![user_id],
            Self::from_row,
        )
        .ok()
    }

    pub fn list_all(pool: &DbPool) -> Result<Vec<User>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM users ORDER BY user_no ASC",
                Self::SELECT_COLS
            ))
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    // ── Create / update ──

    pub fn create(
        pool: &DbPool,
        user_id: &str,
        password_hash: &str,
        user_name: &str,
        user_role: &str,
        club_no: Option<i64>,
    ) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO users (user_id, user_password, user_name, user_role, club_no)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, password_hash, user_name, user_role, club_no],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_name(pool: &DbPool, user_no: i64, user_name: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE users SET user_name = ?1 WHERE user_no = ?2",
            params![user_name, user_no],
        )
        .map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE sessions SET user_name = ?1 WHERE user_no = ?2 AND kind = 'user'",
            params![user_name, user_no],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn update_password(pool: &DbPool, user_no: i64, password_hash: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE users SET user_password = ?1 WHERE user_no = ?2",
            params![password_hash, user_no],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    // ── Helpers ──

    pub fn is_admin(&self) -> bool {
        self.user_role == "admin"
    }

    /// Template-safe view without the password hash
    pub fn safe_json(&self) -> serde_json::Value {
        serde_json::json!({
            "user_no": self.user_no,
            "user_id": self.user_id,
            "user_name": self.user_name,
            "user_role": self.user_role,
            "club_no": self.club_no,
        })
    }
}
