//! Archive space: completed tasks partitioned by completion month.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{require_table, table_exists, ARCHIVE_TABLE};
use crate::error::{Error, Result};
use crate::model::{Task, TaskRecord};
use crate::month::MonthKey;

pub struct ArchiveStore<'c> {
    conn: &'c Connection,
}

impl<'c> ArchiveStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Store `task` under `id` in the partition for `month`.
    pub fn put_in_month(&self, month: &MonthKey, id: &str, task: &Task) -> Result<()> {
        require_table(self.conn, ARCHIVE_TABLE)?;
        let raw = TaskRecord::encode(task)?;
        self.conn.execute(
            "INSERT INTO archive (month, id, record) VALUES (?1, ?2, ?3)
             ON CONFLICT(month, id) DO UPDATE SET record = excluded.record",
            params![month.to_string(), id, raw],
        )?;
        Ok(())
    }

    pub fn get(&self, month: &MonthKey, id: &str, now: DateTime<Utc>) -> Result<Task> {
        require_table(self.conn, ARCHIVE_TABLE)?;
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM archive WHERE month = ?1 AND id = ?2",
                params![month.to_string(), id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(TaskRecord::decode(id, &raw)?.into_task(id, now)),
            None => Err(Error::NotFound(format!("{id} (archived {month})"))),
        }
    }

    pub fn delete(&self, month: &MonthKey, id: &str) -> Result<()> {
        require_table(self.conn, ARCHIVE_TABLE)?;
        self.conn.execute(
            "DELETE FROM archive WHERE month = ?1 AND id = ?2",
            params![month.to_string(), id],
        )?;
        Ok(())
    }

    /// Partitions that hold at least one record, oldest first.
    pub fn months(&self) -> Result<Vec<MonthKey>> {
        if !table_exists(self.conn, ARCHIVE_TABLE)? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT month FROM archive ORDER BY month")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut months = Vec::new();
        for row in rows {
            months.push(row?.parse()?);
        }
        Ok(months)
    }

    /// Call `visit` for every record in each of `months`, in the order given.
    /// Months without a partition are skipped. Stops at the first error.
    pub fn for_each_in_months<F>(
        &self,
        months: &[MonthKey],
        now: DateTime<Utc>,
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(Task) -> Result<()>,
    {
        if months.is_empty() || !table_exists(self.conn, ARCHIVE_TABLE)? {
            return Ok(());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT id, record FROM archive WHERE month = ?1 ORDER BY id")?;
        for month in months {
            let rows = stmt.query_map(params![month.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (id, raw) = row?;
                visit(TaskRecord::decode(&id, &raw)?.into_task(&id, now))?;
            }
        }
        Ok(())
    }
}
