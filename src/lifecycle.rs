//! Task lifecycle: creation, notes, completion, deletion and lookup.
//!
//! ```text
//! Pending ──note──▶ InProgress ──complete──▶ Complete (archived)
//!    └─────────────────complete──────────────────▲
//! ```
//!
//! Open tasks live in the active space. Completing a task moves it into the
//! archive partition for the current month inside one write transaction, so
//! a task is never visible in both places.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::ids::IdGenerator;
use crate::model::{NewTask, Task, TaskPreview, TaskStatus};
use crate::month::MonthKey;
use crate::store::{ActiveStore, ArchiveStore, Store};

pub struct TaskManager<C: Clock = SystemClock> {
    store: Store,
    ids: IdGenerator,
    clock: C,
}

impl TaskManager<SystemClock> {
    pub fn new(store: Store, ids: IdGenerator) -> Self {
        Self::with_clock(store, ids, SystemClock)
    }
}

impl<C: Clock> TaskManager<C> {
    pub fn with_clock(store: Store, ids: IdGenerator, clock: C) -> Self {
        Self { store, ids, clock }
    }

    pub fn id_len(&self) -> usize {
        self.ids.len()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Create a pending task and persist it.
    pub fn add_task(&self, new: NewTask) -> Result<Task> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("task title cannot be empty".to_string()));
        }
        let now = self.clock.now();

        let task = self.store.write(|conn| {
            let active = ActiveStore::new(conn);
            let id = self.ids.generate(title, |candidate| active.contains(candidate));
            let task = Task {
                id,
                title: title.to_string(),
                description: non_blank(new.description),
                category: non_blank(new.category),
                due_date: new.due_date.unwrap_or(now),
                status: TaskStatus::Pending,
                priority: new.priority,
                notes: BTreeMap::new(),
                last_update: now,
            };
            active.put(&task)?;
            Ok(task)
        })?;

        debug!(id = %task.id, "task added");
        Ok(task)
    }

    /// Set note `label` on an active task, starting it if it was pending.
    pub fn add_note(&self, id: &str, label: &str, text: &str) -> Result<Task> {
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidInput("note label cannot be empty".to_string()));
        }
        let now = self.clock.now();

        let task = self.store.write(|conn| {
            let active = ActiveStore::new(conn);
            let mut task = active.get(id, now)?;
            task.notes.insert(label.to_string(), text.to_string());
            if task.status == TaskStatus::Pending {
                task.status = TaskStatus::InProgress;
                debug!(id, "task started");
            }
            task.touch(now);
            active.put(&task)?;
            Ok(task)
        })?;

        debug!(id, label, "note added");
        Ok(task)
    }

    /// Move an active task into this month's archive partition.
    pub fn complete_task(&self, id: &str) -> Result<Task> {
        let now = self.clock.now();
        let month = MonthKey::of(now);

        let task = self.store.write(|conn| {
            let active = ActiveStore::new(conn);
            let mut task = active.get(id, now)?;
            active.delete(id)?;
            task.status = TaskStatus::Complete;
            task.touch(now);
            ArchiveStore::new(conn).put_in_month(&month, id, &task)?;
            Ok(task)
        })?;

        debug!(id, %month, "task completed");
        Ok(task)
    }

    /// Completed tasks updated strictly after `lookback`.
    ///
    /// Walks the archive from the current month back to the month containing
    /// `lookback`, stopping early at the oldest partition on disk. A lookback
    /// in the future finds nothing.
    pub fn completed_tasks(&self, lookback: DateTime<Utc>) -> Result<Vec<Task>> {
        let now = self.clock.now();
        let mut tasks = Vec::new();
        self.store.read(|conn| {
            let archive = ArchiveStore::new(conn);
            let Some(earliest) = archive.months()?.first().copied() else {
                return Ok(());
            };
            let months = MonthKey::of(now).back_to(MonthKey::of(lookback).max(earliest));
            archive.for_each_in_months(&months, now, |task| {
                if task.last_update > lookback {
                    tasks.push(task);
                }
                Ok(())
            })
        })?;
        Ok(tasks)
    }

    /// Every active task, ordered by id.
    pub fn all_tasks(&self) -> Result<Vec<Task>> {
        let now = self.clock.now();
        self.store.read(|conn| ActiveStore::new(conn).get_all(now))
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        let now = self.clock.now();
        self.store.read(|conn| ActiveStore::new(conn).get(id, now))
    }

    pub fn get_tasks<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Task>> {
        let now = self.clock.now();
        self.store.read(|conn| ActiveStore::new(conn).get_many(ids, now))
    }

    pub fn archived_task(&self, month: &MonthKey, id: &str) -> Result<Task> {
        let now = self.clock.now();
        self.store
            .read(|conn| ArchiveStore::new(conn).get(month, id, now))
    }

    /// Archive partitions that hold at least one task, oldest first.
    pub fn archive_months(&self) -> Result<Vec<MonthKey>> {
        self.store.read(|conn| ArchiveStore::new(conn).months())
    }

    /// Remove an active task. Unknown ids are ignored.
    pub fn delete_task(&self, id: &str) -> Result<()> {
        self.store.write(|conn| ActiveStore::new(conn).delete(id))?;
        debug!(id, "task deleted");
        Ok(())
    }

    /// Remove every active task; archived tasks are kept.
    pub fn delete_all_tasks(&self) -> Result<usize> {
        let removed = self
            .store
            .write(|conn| ActiveStore::new(conn).delete_all())?;
        debug!(removed, "active tasks deleted");
        Ok(removed)
    }

    /// Active ids starting with `prefix`.
    ///
    /// A prefix may be as long as the configured id length or the longest
    /// stored id, whichever is greater.
    pub fn find_tasks_by_id_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.store.read(|conn| {
            let active = ActiveStore::new(conn);
            let limit = self.prefix_limit(&active)?;
            active.find_by_prefix(prefix, limit)
        })
    }

    pub fn task_previews(&self, prefix: &str) -> Result<Vec<TaskPreview>> {
        let now = self.clock.now();
        self.store.read(|conn| {
            let active = ActiveStore::new(conn);
            let limit = self.prefix_limit(&active)?;
            if prefix.chars().count() > limit {
                return Err(Error::InvalidInput(format!(
                    "id prefix '{prefix}' is longer than {limit} characters"
                )));
            }
            active.previews(prefix, now)
        })
    }

    fn prefix_limit(&self, active: &ActiveStore<'_>) -> Result<usize> {
        Ok(self.ids.len().max(active.longest_id_len()?))
    }

    /// Resolve user input to one active task id: an exact id, or a prefix
    /// matching exactly one task.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("task id cannot be empty".to_string()));
        }
        let mut matches = self.find_tasks_by_id_prefix(input)?;
        if matches.iter().any(|id| id == input) {
            return Ok(input.to_string());
        }
        match matches.len() {
            0 => Err(Error::NotFound(input.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousId {
                prefix: input.to_string(),
                matches,
            }),
        }
    }

    /// Close the store. Later calls fail with `StoreUnavailable`.
    pub fn close(&mut self) -> Result<()> {
        self.store.close()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
