//! tasktrack - personal task tracker library
//!
//! This library provides the core of the `task` CLI: a small store of
//! short-lived tasks with a month-partitioned archive of completed ones.
//!
//! # Core Concepts
//!
//! - **Active tasks**: open work, keyed by a short id derived from the title
//! - **Archive**: completed tasks, partitioned by the month they were completed
//! - **Lifecycle**: pending -> in progress (first note) -> complete (archived)
//! - **Due dates**: relative or calendar input, bucketed for prioritization
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `clock`: Time source, swappable in tests
//! - `config`: Configuration loading from `config.toml`
//! - `due`: Due-date parsing and formatting
//! - `error`: Error types and result aliases
//! - `ids`: Task id generation
//! - `lifecycle`: Task manager driving every state transition
//! - `model`: Task entity and persisted record format
//! - `month`: Archive partition keys
//! - `output`: Human and JSON output
//! - `query`: Sorting and filtering of listings
//! - `store`: SQLite-backed active and archive spaces

pub mod cli;
pub mod clock;
pub mod config;
pub mod due;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod model;
pub mod month;
pub mod output;
pub mod query;
pub mod store;

pub use error::{Error, Result};
pub use lifecycle::TaskManager;
