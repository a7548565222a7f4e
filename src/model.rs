//! Task entity and its persisted record format.
//!
//! Records are stored as JSON documents. Every document carries a
//! `schema_version`; documents written before versioning existed are version 0
//! and are migrated once at load by [`TaskRecord::into_task`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Current version of the persisted task record.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Lifecycle state of a task.
///
/// Persisted as the integer codes `0`, `1` and `10`. Older records used the
/// labels `"pending"` and `"done"`; both forms are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
}

impl TaskStatus {
    pub fn code(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Complete => 10,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TaskStatus::Pending),
            1 => Some(TaskStatus::InProgress),
            10 => Some(TaskStatus::Complete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Complete => "complete",
        }
    }

    /// Short label used in task tables.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "waiting",
            TaskStatus::InProgress => "in prog",
            TaskStatus::Complete => "COMP",
        }
    }

    /// Parse a user-supplied or legacy status name.
    pub fn parse(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "pending" | "waiting" | "open" => Ok(TaskStatus::Pending),
            "in_progress" | "in_prog" | "progress" | "started" => Ok(TaskStatus::InProgress),
            "complete" | "completed" | "comp" | "done" => Ok(TaskStatus::Complete),
            _ => Err(Error::InvalidInput(format!(
                "unknown status '{}' (expected pending|in_progress|complete)",
                value.trim()
            ))),
        }
    }

    /// Rank used when sorting by status: open work first.
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::InProgress => 0,
            TaskStatus::Pending => 1,
            TaskStatus::Complete => 2,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawStatus {
            Code(i64),
            Label(String),
        }

        match RawStatus::deserialize(deserializer)? {
            RawStatus::Code(code) => TaskStatus::from_code(code)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown status code {code}"))),
            RawStatus::Label(label) => TaskStatus::parse(&label)
                .map_err(|_| serde::de::Error::custom(format!("unknown status '{label}'"))),
        }
    }
}

/// A task as seen by the rest of the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub priority: i64,
    pub notes: BTreeMap<String, String>,
    pub last_update: DateTime<Utc>,
}

impl Task {
    pub fn is_complete(&self) -> bool {
        self.status == TaskStatus::Complete
    }

    /// Refresh `last_update`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_update {
            self.last_update = now;
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: i64,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Id and title of an active task, used for id completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPreview {
    pub id: String,
    pub title: String,
}

/// Note label derived from the time the note was written.
pub fn note_label(now: DateTime<Utc>) -> String {
    now.format("%-m-%-d-%Y %H:%M").to_string()
}

/// Persisted form of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub notes: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category.clone(),
            due_date: Some(task.due_date),
            status: task.status,
            priority: task.priority,
            notes: Some(task.notes.clone()),
            last_update: Some(task.last_update),
        }
    }
}

impl TaskRecord {
    /// Decode a stored document. `key` is the id the document is stored under.
    pub fn decode(key: &str, raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|source| Error::Serialization {
            id: key.to_string(),
            source,
        })
    }

    /// Encode a task for storage at the current schema version.
    pub fn encode(task: &Task) -> Result<String> {
        serde_json::to_string(&TaskRecord::from(task)).map_err(|source| Error::Serialization {
            id: task.id.clone(),
            source,
        })
    }

    /// Apply pending migrations and produce a task. Nothing is written back.
    pub fn into_task(self, key: &str, now: DateTime<Utc>) -> Task {
        let mut record = self;
        if record.schema_version < 1 {
            record = record.migrate_v0(now);
        }

        let last_update = record.last_update.unwrap_or(now);
        Task {
            id: if record.id.is_empty() {
                key.to_string()
            } else {
                record.id
            },
            title: record.title,
            description: record.description,
            category: record.category,
            due_date: record.due_date.unwrap_or(last_update),
            status: record.status,
            priority: record.priority,
            notes: record.notes.unwrap_or_default(),
            last_update,
        }
    }

    /// Version 0 records stored empty strings for absent text and a zero
    /// timestamp (year 1) for `last_update` before that field existed.
    fn migrate_v0(mut self, now: DateTime<Utc>) -> Self {
        if self.last_update.map_or(true, is_zero_time) {
            self.last_update = Some(now);
        }
        if self.due_date.is_some_and(is_zero_time) {
            self.due_date = None;
        }
        self.description = self.description.filter(|value| !value.is_empty());
        self.category = self.category.filter(|value| !value.is_empty());
        self.schema_version = 1;
        self
    }
}

fn is_zero_time(ts: DateTime<Utc>) -> bool {
    ts.year() <= 1
}
