use crate::parser::OrbitalRecord;
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::{debug, warn};

/// SQLite store of TLE records keyed by catalog number.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_tables()?;
        debug!("Opened database {}", path.display());
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tle (
                 norad INTEGER PRIMARY KEY,
                 name TEXT NOT NULL DEFAULT '',
                 line1 TEXT NOT NULL,
                 line2 TEXT NOT NULL,
                 updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
             );",
        )?;
        Ok(())
    }

    /// Insert or replace records by catalog number in one transaction.
    /// `on_stored` is called after each record with its 1-based position.
    pub fn upsert_records<'a, I, F>(&mut self, records: I, mut on_stored: F) -> Result<usize>
    where
        I: IntoIterator<Item = &'a OrbitalRecord>,
        F: FnMut(usize, &OrbitalRecord),
    {
        let tx = self.conn.transaction()?;
        let mut stored = 0;

        {
            let mut upsert = tx.prepare(
                "INSERT INTO tle (norad, name, line1, line2) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(norad) DO UPDATE SET
                     name = excluded.name,
                     line1 = excluded.line1,
                     line2 = excluded.line2,
                     updated_at = CURRENT_TIMESTAMP",
            )?;

            for record in records {
                upsert.execute(params![
                    record.catalog_id(),
                    record.name(),
                    record.line1(),
                    record.line2()
                ])?;
                stored += 1;
                on_stored(stored, record);
            }
        }

        tx.commit()?;
        Ok(stored)
    }

    /// All stored records ordered by catalog number. Rows that no longer
    /// validate are skipped with a warning.
    pub fn fetch_records(&self) -> Result<Vec<OrbitalRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT norad, name, line1, line2 FROM tle ORDER BY norad")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (norad, name, line1, line2) = row?;
            match OrbitalRecord::new(&name, &line1, &line2) {
                Ok(record) => records.push(record),
                Err(err) => warn!("Skipping stored record {}: {}", norad, err),
            }
        }
        Ok(records)
    }

    #[cfg(test)]
    pub fn get(&self, catalog_id: u32) -> Result<Option<OrbitalRecord>> {
        use rusqlite::OptionalExtension;

        let row = self
            .conn
            .query_row(
                "SELECT name, line1, line2 FROM tle WHERE norad = ?1",
                [catalog_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((name, line1, line2)) => Ok(Some(
                OrbitalRecord::new(&name, &line1, &line2)
                    .with_context(|| format!("Stored record {} is invalid", catalog_id))?,
            )),
            None => Ok(None),
        }
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tle", [], |row| row.get(0))?;
        Ok(count)
    }
}
