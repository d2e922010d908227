use std::collections::HashMap;

use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::update::{archive_row, PartialUpdate};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Club {
    pub club_no: i64,
    pub club_name: String,
    pub region_no: Option<i64>,
    pub region_name: Option<String>,
    pub charter_date: String,
    pub phone: String,
    pub address: String,
    pub slogan: String,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct ClubForm {
    pub club_name: String,
    pub region_no: Option<i64>,
    pub charter_date: String,
    pub phone: String,
    pub address: String,
    pub slogan: String,
}

pub const CLUB_UPDATE: PartialUpdate = PartialUpdate {
    table: "clubs",
    key_column: "club_no",
    columns: &[
        "club_name",
        "region_no",
        "charter_date",
        "phone",
        "address",
        "slogan",
    ],
};

const SELECT: &str = "SELECT c.club_no, c.club_name, c.region_no, r.region_name,
        c.charter_date, c.phone, c.address, c.slogan
    FROM clubs c
    LEFT JOIN regions r ON r.region_no = c.region_no";

impl Club {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Club {
            club_no: row.get(0)?,
            club_name: row.get(1)?,
            region_no: row.get(2)?,
            region_name: row.get(3)?,
            charter_date: row.get(4)?,
            phone: row.get(5)?,
            address: row.get(6)?,
            slogan: row.get(7)?,
        })
    }

    pub fn find(pool: &DbPool, club_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!(
                "{} WHERE c.club_no = ?1 AND c.attrib NOT LIKE '%XXXUP%'",
                SELECT
            ),
            params![club_no],
            Self::from_row,
        )
        .ok()
    }

    /// Live clubs, optionally restricted to one region.
    pub fn list(pool: &DbPool, region_no: Option<i64>) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match region_no {
            Some(r) => (
                format!(
                    "{} WHERE c.attrib NOT LIKE '%XXXUP%' AND c.region_no = ?1 ORDER BY c.club_name",
                    SELECT
                ),
                vec![Box::new(r)],
            ),
            None => (
                format!("{} WHERE c.attrib NOT LIKE '%XXXUP%' ORDER BY c.club_name", SELECT),
                vec![],
            ),
        };

        let mut stmt = conn.prepare(&sql).map_err(|e| e.to_string())?;
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn create(pool: &DbPool, form: &ClubForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO clubs (club_name, region_no, charter_date, phone, address, slogan)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                form.club_name,
                form.region_no,
                form.charter_date,
                form.phone,
                form.address,
                form.slogan
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(pool: &DbPool, club_no: i64, fields: &HashMap<String, String>) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        CLUB_UPDATE.apply(&conn, club_no, fields)
    }

    pub fn archive(pool: &DbPool, club_no: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        archive_row(&conn, "clubs", "club_no", club_no)?;
        Ok(())
    }
}
