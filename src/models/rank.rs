use std::collections::HashMap;

use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::update::{archive_row, PartialUpdate};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Rank {
    pub rank_no: i64,
    pub rank_title: String,
    pub order_no: i64,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct RankForm {
    pub rank_title: String,
    pub order_no: i64,
}

pub const RANK_UPDATE: PartialUpdate = PartialUpdate {
    table: "ranks",
    key_column: "rank_no",
    columns: &["rank_title", "order_no"],
};

impl Rank {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Rank {
            rank_no: row.get("rank_no")?,
            rank_title: row.get("rank_title")?,
            order_no: row.get("order_no")?,
        })
    }

    pub fn find(pool: &DbPool, rank_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT rank_no, rank_title, order_no FROM ranks WHERE rank_no = ?1",
            params![rank_no],
            Self::from_row,
        )
        .ok()
    }

    pub fn list(pool: &DbPool) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT rank_no, rank_title, order_no FROM ranks
                 WHERE attrib NOT LIKE '%XXXUP%'
                 ORDER BY order_no, rank_no",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn create(pool: &DbPool, form: &RankForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO ranks (rank_title, order_no) VALUES (?1, ?2)",
            params![form.rank_title, form.order_no],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(pool: &DbPool, rank_no: i64, fields: &HashMap<String, String>) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        RANK_UPDATE.apply(&conn, rank_no, fields)
    }

    /// Ranks are retired, not deleted; members keep pointing at them.
    pub fn archive(pool: &DbPool, rank_no: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        archive_row(&conn, "ranks", "rank_no", rank_no)?;
        Ok(())
    }
}
