use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::DbPool;
use crate::update::{archive_row, PartialUpdate};

/// Literal shown in place of a private member's contact details.
pub const HIDDEN: &str = "비공개";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Member {
    pub member_no: i64,
    pub club_no: i64,
    pub club_name: String,
    pub rank_no: Option<i64>,
    pub rank_title: Option<String>,
    pub member_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub birth: String,
    pub join_date: String,
    pub is_private: bool,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct MemberForm {
    pub club_no: i64,
    pub rank_no: Option<i64>,
    pub member_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub birth: String,
    pub join_date: String,
    pub is_private: bool,
}

#[derive(Debug, FromForm, Serialize, Deserialize, Clone, Default)]
pub struct Spouse {
    pub spouse_name: String,
    pub spouse_phone: String,
    pub spouse_birth: String,
}

#[derive(Debug, FromForm, Serialize, Deserialize, Clone, Default)]
pub struct Business {
    pub company: String,
    pub title: String,
    pub business_phone: String,
    pub business_address: String,
}

pub const MEMBER_UPDATE: PartialUpdate = PartialUpdate {
    table: "members",
    key_column: "member_no",
    columns: &[
        "club_no",
        "rank_no",
        "member_name",
        "phone",
        "email",
        "address",
        "birth",
        "join_date",
        "is_private",
    ],
};

const SELECT: &str = "SELECT m.member_no, m.club_no, c.club_name, m.rank_no, k.rank_title,
        m.member_name, m.phone, m.email, m.address, m.birth, m.join_date, m.is_private
    FROM members m
    JOIN clubs c ON c.club_no = m.club_no
    LEFT JOIN ranks k ON k.rank_no = m.rank_no";

impl Member {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let private_int: i64 = row.get(11)?;
        Ok(Member {
            member_no: row.get(0)?,
            club_no: row.get(1)?,
            club_name: row.get(2)?,
            rank_no: row.get(3)?,
            rank_title: row.get(4)?,
            member_name: row.get(5)?,
            phone: row.get(6)?,
            email: row.get(7)?,
            address: row.get(8)?,
            birth: row.get(9)?,
            join_date: row.get(10)?,
            is_private: private_int != 0,
        })
    }

    pub fn find(pool: &DbPool, member_no: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!(
                "{} WHERE m.member_no = ?1 AND m.attrib NOT LIKE '%XXXUP%'",
                SELECT
            ),
            params![member_no],
            Self::from_row,
        )
        .ok()
    }

    /// Live members of a club, highest rank first.
    pub fn list_by_club(pool: &DbPool, club_no: i64) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE m.club_no = ?1 AND m.attrib NOT LIKE '%XXXUP%'
                 ORDER BY COALESCE(k.order_no, 9999), m.member_name",
                SELECT
            ))
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![club_no], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn list_all(pool: &DbPool) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE m.attrib NOT LIKE '%XXXUP%' AND c.attrib NOT LIKE '%XXXUP%'
                 ORDER BY c.club_name, COALESCE(k.order_no, 9999), m.member_name",
                SELECT
            ))
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    /// First live member of a club with this exact name.
    pub fn find_in_club_by_name(pool: &DbPool, club_no: i64, name: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!(
                "{} WHERE m.club_no = ?1 AND m.member_name = ?2 AND m.attrib NOT LIKE '%XXXUP%'
                 ORDER BY m.member_no LIMIT 1",
                SELECT
            ),
            params![club_no, name],
            Self::from_row,
        )
        .ok()
    }

    pub fn create(pool: &DbPool, form: &MemberForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO members (club_no, rank_no, member_name, phone, email, address, birth, join_date, is_private)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                form.club_no,
                form.rank_no,
                form.member_name,
                form.phone,
                form.email,
                form.address,
                form.birth,
                form.join_date,
                form.is_private
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(pool: &DbPool, member_no: i64, fields: &HashMap<String, String>) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        // Checkbox values arrive as "on"/"true"; the column stores 0/1
        let mut fields = fields.clone();
        if let Some(flag) = fields.get_mut("is_private") {
            let on = matches!(flag.trim(), "1" | "on" | "true" | "yes");
            *flag = if on { "1" } else { "0" }.to_string();
        }
        MEMBER_UPDATE.apply(&conn, member_no, &fields)
    }

    pub fn archive(pool: &DbPool, member_no: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        archive_row(&conn, "members", "member_no", member_no)?;
        Ok(())
    }

    // ── Member login ──

    pub fn set_password(pool: &DbPool, member_no: i64, password_hash: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE members SET mb_password = ?1 WHERE member_no = ?2",
            params![password_hash, member_no],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Live members with this name that have a login password set.
    pub fn login_candidates(pool: &DbPool, member_name: &str) -> Vec<(i64, String, String)> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(
            "SELECT member_no, member_name, mb_password FROM members
             WHERE member_name = ?1 AND mb_password IS NOT NULL AND attrib NOT LIKE '%XXXUP%'",
        ) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![member_name], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
    }

    // ── Sub-records ──

    pub fn spouse(pool: &DbPool, member_no: i64) -> Option<Spouse> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT spouse_name, spouse_phone, spouse_birth FROM member_spouses WHERE member_no = ?1",
            params![member_no],
            |row| {
                Ok(Spouse {
                    spouse_name: row.get(0)?,
                    spouse_phone: row.get(1)?,
                    spouse_birth: row.get(2)?,
                })
            },
        )
        .optional()
        .ok()
        .flatten()
    }

    pub fn save_spouse(pool: &DbPool, member_no: i64, spouse: &Spouse) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO member_spouses (member_no, spouse_name, spouse_phone, spouse_birth)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(member_no) DO UPDATE SET
                spouse_name = ?2, spouse_phone = ?3, spouse_birth = ?4",
            params![
                member_no,
                spouse.spouse_name,
                spouse.spouse_phone,
                spouse.spouse_birth
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn business(pool: &DbPool, member_no: i64) -> Option<Business> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT company, title, business_phone, business_address
             FROM member_businesses WHERE member_no = ?1",
            params![member_no],
            |row| {
                Ok(Business {
                    company: row.get(0)?,
                    title: row.get(1)?,
                    business_phone: row.get(2)?,
                    business_address: row.get(3)?,
                })
            },
        )
        .optional()
        .ok()
        .flatten()
    }

    pub fn save_business(pool: &DbPool, member_no: i64, business: &Business) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO member_businesses (member_no, company, title, business_phone, business_address)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(member_no) DO UPDATE SET
                company = ?2, title = ?3, business_phone = ?4, business_address = ?5",
            params![
                member_no,
                business.company,
                business.title,
                business.business_phone,
                business.business_address
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    // ── Mobile projections ──

    /// Row shape used by the member lists of the mobile client.
    pub fn summary_json(&self, thumb_url: &str) -> Value {
        json!({
            "memberNo": self.member_no,
            "memberName": self.member_name,
            "clubNo": self.club_no,
            "rankTitle": self.rank_title.clone().unwrap_or_default(),
            "thumb": thumb_url,
        })
    }

    /// Full detail. When the member is private, every protected field is
    /// replaced by [`HIDDEN`]; the keys are always present.
    pub fn detail_json(&self, spouse: Option<&Spouse>, business: Option<&Business>) -> Value {
        let spouse = spouse.cloned().unwrap_or_default();
        let business = business.cloned().unwrap_or_default();
        let guard = |v: &str| -> String {
            if self.is_private {
                HIDDEN.to_string()
            } else {
                v.to_string()
            }
        };

        json!({
            "memberNo": self.member_no,
            "memberName": self.member_name,
            "clubNo": self.club_no,
            "clubName": self.club_name,
            "rankTitle": self.rank_title.clone().unwrap_or_default(),
            "joinDate": self.join_date,
            "isPrivate": self.is_private,
            "phone": guard(&self.phone),
            "email": guard(&self.email),
            "address": guard(&self.address),
            "birth": guard(&self.birth),
            "spouse": {
                "name": guard(&spouse.spouse_name),
                "phone": guard(&spouse.spouse_phone),
                "birth": guard(&spouse.spouse_birth),
            },
            "business": {
                "company": guard(&business.company),
                "title": guard(&business.title),
                "phone": guard(&business.business_phone),
                "address": guard(&business.business_address),
            },
        })
    }
}
