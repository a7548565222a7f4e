//! Active task space: id -> record for tasks that are not complete.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{require_table, table_exists, ACTIVE_TABLE};
use crate::error::{Error, Result};
use crate::model::{Task, TaskPreview, TaskRecord};

/// View of the active space bound to an open transaction.
pub struct ActiveStore<'c> {
    conn: &'c Connection,
}

impl<'c> ActiveStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert or overwrite the record for `task.id`.
    pub fn put(&self, task: &Task) -> Result<()> {
        require_table(self.conn, ACTIVE_TABLE)?;
        let raw = TaskRecord::encode(task)?;
        self.conn.execute(
            "INSERT INTO active (id, record) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET record = excluded.record",
            params![task.id, raw],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Task> {
        require_table(self.conn, ACTIVE_TABLE)?;
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM active WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(TaskRecord::decode(id, &raw)?.into_task(id, now)),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    /// Fetch every id in order, failing on the first one that is missing.
    pub fn get_many<S: AsRef<str>>(&self, ids: &[S], now: DateTime<Utc>) -> Result<Vec<Task>> {
        ids.iter().map(|id| self.get(id.as_ref(), now)).collect()
    }

    /// Every active task, ordered by id. A missing active space is empty.
    pub fn get_all(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        if !table_exists(self.conn, ACTIVE_TABLE)? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT id, record FROM active ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            let (id, raw) = row?;
            tasks.push(TaskRecord::decode(&id, &raw)?.into_task(&id, now));
        }
        Ok(tasks)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        require_table(self.conn, ACTIVE_TABLE)?;
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM active WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Remove `id`. Removing an absent id is not an error.
    pub fn delete(&self, id: &str) -> Result<()> {
        require_table(self.conn, ACTIVE_TABLE)?;
        self.conn
            .execute("DELETE FROM active WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Remove every active task and return how many were removed.
    pub fn delete_all(&self) -> Result<usize> {
        if !table_exists(self.conn, ACTIVE_TABLE)? {
            return Ok(0);
        }
        Ok(self.conn.execute("DELETE FROM active", [])?)
    }

    /// Ids starting with `prefix`, ascending.
    ///
    /// A prefix longer than `id_len` can never match and is rejected.
    pub fn find_by_prefix(&self, prefix: &str, id_len: usize) -> Result<Vec<String>> {
        if prefix.chars().count() > id_len {
            return Err(Error::InvalidInput(format!(
                "id prefix '{prefix}' is longer than {id_len} characters"
            )));
        }
        if !table_exists(self.conn, ACTIVE_TABLE)? {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT id FROM active WHERE substr(id, 1, ?2) = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![prefix, prefix.chars().count() as i64], |row| {
            row.get::<_, String>(0)
        })?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Length of the longest stored id, or 0 when the space is empty.
    ///
    /// Ids minted under an earlier, longer id length stay addressable.
    pub fn longest_id_len(&self) -> Result<usize> {
        if !table_exists(self.conn, ACTIVE_TABLE)? {
            return Ok(0);
        }
        let len: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(length(id)), 0) FROM active",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(len).unwrap_or(0))
    }

    /// Id and title of every task whose id starts with `prefix`.
    pub fn previews(&self, prefix: &str, now: DateTime<Utc>) -> Result<Vec<TaskPreview>> {
        Ok(self
            .get_all(now)?
            .into_iter()
            .filter(|task| task.id.starts_with(prefix))
            .map(|task| TaskPreview {
                id: task.id,
                title: task.title,
            })
            .collect())
    }
}
