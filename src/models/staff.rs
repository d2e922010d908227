use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::update::archive_and_insert;

/// A club's officer line-up for one term.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClubStaff {
    pub id: i64,
    pub club_no: i64,
    pub president: String,
    pub secretary: String,
    pub treasurer: String,
    pub term_year: String,
    pub created_at: String,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct StaffForm {
    pub president: String,
    pub secretary: String,
    pub treasurer: String,
    pub term_year: String,
}

impl ClubStaff {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ClubStaff {
            id: row.get("id")?,
            club_no: row.get("club_no")?,
            president: row.get("president")?,
            secretary: row.get("secretary")?,
            treasurer: row.get("treasurer")?,
            term_year: row.get("term_year")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn current(pool: &DbPool, club_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT id, club_no, president, secretary, treasurer, term_year, created_at
             FROM club_staff
             WHERE club_no = ?1 AND attrib NOT LIKE '%XXXUP%'
             ORDER BY created_at DESC, id DESC LIMIT 1",
            params![club_no],
            Self::from_row,
        )
        .ok()
    }

    /// Every row for the club, archived ones included, newest first.
    pub fn history(pool: &DbPool, club_no: i64) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT id, club_no, president, secretary, treasurer, term_year, created_at
                 FROM club_staff WHERE club_no = ?1
                 ORDER BY created_at DESC, id DESC",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![club_no], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn replace(pool: &DbPool, club_no: i64, form: &StaffForm) -> Result<i64, String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        archive_and_insert(
            &mut conn,
            "club_staff",
            "club_no",
            club_no,
            "INSERT INTO club_staff (club_no, president, secretary, treasurer, term_year)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                club_no,
                form.president.trim(),
                form.secretary.trim(),
                form.treasurer.trim(),
                form.term_year.trim()
            ],
        )
    }

    /// Officer names in display order, blanks skipped.
    pub fn officer_names(&self) -> Vec<&str> {
        [&self.president, &self.secretary, &self.treasurer]
            .into_iter()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
