use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::update::{archive_and_insert, PartialUpdate};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Region {
    pub region_no: i64,
    pub region_name: String,
    pub club_count: i64,
}

/// One revision of a region's descriptive block.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegionDetail {
    pub id: i64,
    pub region_no: i64,
    pub chairman: String,
    pub slogan: String,
    pub detail: String,
    pub created_at: String,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct RegionDetailForm {
    pub chairman: String,
    pub slogan: String,
    pub detail: String,
}

pub const REGION_UPDATE: PartialUpdate = PartialUpdate {
    table: "regions",
    key_column: "region_no",
    columns: &["region_name"],
};

impl Region {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Region {
            region_no: row.get("region_no")?,
            region_name: row.get("region_name")?,
            club_count: row.get("club_count")?,
        })
    }

    pub fn find(pool: &DbPool, region_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT r.region_no, r.region_name,
                    (SELECT COUNT(*) FROM clubs c WHERE c.region_no = r.region_no
                       AND c.attrib NOT LIKE '%XXXUP%') AS club_count
             FROM regions r
             WHERE r.region_no = ?1 AND r.attrib NOT LIKE '%XXXUP%'",
            params![region_no],
            Self::from_row,
        )
        .ok()
    }

    pub fn list(pool: &DbPool) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT r.region_no, r.region_name,
                        (SELECT COUNT(*) FROM clubs c WHERE c.region_no = r.region_no
                           AND c.attrib NOT LIKE '%XXXUP%') AS club_count
                 FROM regions r
                 WHERE r.attrib NOT LIKE '%XXXUP%'
                 ORDER BY r.region_name",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn create(pool: &DbPool, region_name: &str) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO regions (region_name) VALUES (?1)",
            params![region_name],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(
        pool: &DbPool,
        region_no: i64,
        fields: &std::collections::HashMap<String, String>,
    ) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        REGION_UPDATE.apply(&conn, region_no, fields)
    }
}

impl RegionDetail {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RegionDetail {
            id: row.get("id")?,
            region_no: row.get("region_no")?,
            chairman: row.get("chairman")?,
            slogan: row.get("slogan")?,
            detail: row.get("detail")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Latest live revision for a region.
    pub fn current(pool: &DbPool, region_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT id, region_no, chairman, slogan, detail, created_at
             FROM region_details
             WHERE region_no = ?1 AND attrib NOT LIKE '%XXXUP%'
             ORDER BY created_at DESC, id DESC LIMIT 1",
            params![region_no],
            Self::from_row,
        )
        .ok()
    }

    /// Retire the current revision and store a new one.
    pub fn replace(pool: &DbPool, region_no: i64, form: &RegionDetailForm) -> Result<i64, String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        archive_and_insert(
            &mut conn,
            "region_details",
            "region_no",
            region_no,
            "INSERT INTO region_details (region_no, chairman, slogan, detail) VALUES (?1, ?2, ?3, ?4)",
            params![region_no, form.chairman, form.slogan, form.detail],
        )
    }
}
