//! Sparse UPDATE statements and append-only history rows.
//!
//! Edit forms post whatever subset of fields the user touched. [`PartialUpdate`]
//! turns that payload into an UPDATE that only writes the present fields; the
//! column list is fixed per entity, so field names coming from the form never
//! reach the SQL text unless they are whitelisted.

use std::collections::HashMap;

use rusqlite::types::ToSql;
use rusqlite::{params_from_iter, Connection};

use crate::db::{ARCHIVED, LIVE};

/// Column whitelist and key for one updatable table.
#[derive(Debug, Clone, Copy)]
pub struct PartialUpdate {
    pub table: &'static str,
    pub key_column: &'static str,
    pub columns: &'static [&'static str],
}

/// A built statement: SQL text plus positional values (key last).
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub sql: String,
    pub columns: Vec<&'static str>,
    pub values: Vec<String>,
    pub key: i64,
}

impl PartialUpdate {
    /// Fields that are missing, blank, or not whitelisted are skipped.
    /// Returns `None` when nothing is left to write.
    pub fn build(&self, key: i64, fields: &HashMap<String, String>) -> Option<UpdateStatement> {
        let mut columns = Vec::new();
        let mut values = Vec::new();

        for column in self.columns {
            if let Some(value) = fields.get(*column) {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                columns.push(*column);
                values.push(value.to_string());
            }
        }

        if columns.is_empty() {
            return None;
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            self.table,
            assignments.join(", "),
            self.key_column,
            columns.len() + 1
        );

        Some(UpdateStatement {
            sql,
            columns,
            values,
            key,
        })
    }

    /// Build and execute. Returns the number of rows touched (0 when the
    /// payload had no usable fields).
    pub fn apply(
        &self,
        conn: &Connection,
        key: i64,
        fields: &HashMap<String, String>,
    ) -> Result<usize, String> {
        let stmt = match self.build(key, fields) {
            Some(s) => s,
            None => return Ok(0),
        };

        let mut bound: Vec<&dyn ToSql> = stmt.values.iter().map(|v| v as &dyn ToSql).collect();
        bound.push(&stmt.key);

        log::debug!("partial update on {}: {:?}", self.table, stmt.columns);
        conn.execute(&stmt.sql, params_from_iter(bound))
            .map_err(|e| e.to_string())
    }
}

/// Retire every live row of `table` whose `scope_column` equals `scope`,
/// then insert the replacement row, in a single transaction.
/// Returns the id of the new row.
pub fn archive_and_insert(
    conn: &mut Connection,
    table: &str,
    scope_column: &str,
    scope: i64,
    insert_sql: &str,
    insert_params: &[&dyn ToSql],
) -> Result<i64, String> {
    let tx = conn.transaction().map_err(|e| e.to_string())?;

    let archived = tx
        .execute(
            &format!(
                "UPDATE {} SET attrib = attrib || ?1 WHERE {} = ?2 AND {}",
                table, scope_column, LIVE
            ),
            rusqlite::params![ARCHIVED, scope],
        )
        .map_err(|e| e.to_string())?;

    tx.execute(insert_sql, insert_params)
        .map_err(|e| e.to_string())?;
    let id = tx.last_insert_rowid();

    tx.commit().map_err(|e| e.to_string())?;

    log::info!(
        "{}: archived {} row(s) for {} = {}, new row {}",
        table,
        archived,
        scope_column,
        scope,
        id
    );
    Ok(id)
}

/// Mark a single row as archived by its key.
pub fn archive_row(conn: &Connection, table: &str, key_column: &str, key: i64) -> Result<usize, String> {
    conn.execute(
        &format!(
            "UPDATE {} SET attrib = attrib || ?1 WHERE {} = ?2 AND {}",
            table, key_column, LIVE
        ),
        rusqlite::params![ARCHIVED, key],
    )
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGETS: PartialUpdate = PartialUpdate {
        table: "widgets",
        key_column: "widget_no",
        columns: &["name", "color", "size"],
    };

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn widget_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE widgets (widget_no INTEGER PRIMARY KEY, name TEXT, color TEXT, size TEXT);
             INSERT INTO widgets VALUES (1, 'gear', 'red', 'L');
             CREATE TABLE notes (id INTEGER PRIMARY KEY, owner INTEGER, body TEXT, attrib TEXT NOT NULL DEFAULT '');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn build_only_present_fields() {
        let stmt = WIDGETS
            .build(7, &fields(&[("color", "blue"), ("size", "")]))
            .unwrap();
        assert_eq!(stmt.sql, "UPDATE widgets SET color = ?1 WHERE widget_no = ?2");
        assert_eq!(stmt.values, vec!["blue".to_string()]);
        assert_eq!(stmt.key, 7);
    }

    #[test]
    fn build_ignores_unknown_columns() {
        let stmt = WIDGETS.build(
            1,
            &fields(&[("name", "cog"), ("widget_no = 1; DROP TABLE widgets; --", "x")]),
        );
        let stmt = stmt.unwrap();
        assert_eq!(stmt.columns, vec!["name"]);
        assert!(!stmt.sql.contains("DROP"));
    }

    #[test]
    fn build_empty_payload_is_none() {
        assert!(WIDGETS.build(1, &HashMap::new()).is_none());
        assert!(WIDGETS.build(1, &fields(&[("name", "   ")])).is_none());
    }

    #[test]
    fn apply_leaves_absent_fields_unchanged() {
        let conn = widget_db();
        let n = WIDGETS
            .apply(&conn, 1, &fields(&[("size", "XL")]))
            .unwrap();
        assert_eq!(n, 1);
        let row: (String, String, String) = conn
            .query_row("SELECT name, color, size FROM widgets WHERE widget_no = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(row, ("gear".to_string(), "red".to_string(), "XL".to_string()));
    }

    #[test]
    fn apply_with_nothing_to_write() {
        let conn = widget_db();
        assert_eq!(WIDGETS.apply(&conn, 1, &HashMap::new()).unwrap(), 0);
    }

    #[test]
    fn archive_then_insert_keeps_one_live_row() {
        let mut conn = widget_db();
        for body in ["first", "second", "third"] {
            archive_and_insert(
                &mut conn,
                "notes",
                "owner",
                5,
                "INSERT INTO notes (owner, body) VALUES (?1, ?2)",
                rusqlite::params![5i64, body],
            )
            .unwrap();
        }
        let live: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT body FROM notes WHERE owner = 5 AND attrib NOT LIKE '%XXXUP%'")
                .unwrap();
            stmt.query_map([], |r| r.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };
        assert_eq!(live, vec!["third".to_string()]);
    }

    #[test]
    fn failed_insert_rolls_back_archive() {
        let mut conn = widget_db();
        conn.execute("INSERT INTO notes (owner, body) VALUES (5, 'keep')", [])
            .unwrap();
        let result = archive_and_insert(
            &mut conn,
            "notes",
            "owner",
            5,
            "INSERT INTO missing_table (x) VALUES (?1)",
            rusqlite::params![1i64],
        );
        assert!(result.is_err());
        let attrib: String = conn
            .query_row("SELECT attrib FROM notes WHERE body = 'keep'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(attrib, "");
    }
}
