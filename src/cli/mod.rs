//! Command-line interface for tasktrack
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in [`task`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod table;
mod task;

/// task - a personal task tracker
///
/// Add, list, annotate and complete short-lived tasks. Completed tasks are
/// archived by month.
#[derive(Parser, Debug)]
#[command(name = "task")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Task database file
    #[arg(long, global = true, env = "TASKTRACK_DB")]
    pub db: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, env = "TASKTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Category used for filtering
        #[arg(short, long)]
        category: Option<String>,

        /// Due date: M/D, M/D/YYYY, or an offset like 2d, 1w, 3m, 1y
        #[arg(short = 'D', long = "due-date")]
        due_date: Option<String>,

        /// Priority; higher comes first among tasks due at the same time
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        priority: i64,
    },

    /// List active tasks and recently completed ones
    List {
        /// Sort by title, category, duedate, priority or status
        #[arg(short, long)]
        sort: Option<String>,

        /// Filter by key=value (status, category, priority, due); repeatable
        #[arg(short, long = "filter")]
        filter: Vec<String>,

        /// Show at most this many tasks
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show what to do first: open tasks by due date, then priority
        #[arg(short, long, conflicts_with = "sort")]
        todo: bool,

        /// Include tasks completed within this many days (default from config)
        #[arg(short, long)]
        recent: Option<i64>,
    },

    /// Add a note to a task and mark it in progress
    Note {
        /// Task id or unique id prefix
        id: String,

        /// Note text (read from stdin when omitted)
        text: Option<String>,
    },

    /// Complete tasks and show what was completed today
    Comp {
        /// Task ids or unique id prefixes
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete an active task, or all of them
    Delete {
        /// Task id or unique id prefix
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Delete every active task
        #[arg(short, long)]
        all: bool,

        /// Do not ask for confirmation
        #[arg(short, long, requires = "all")]
        yes: bool,
    },

    /// Show a task's details and notes
    View {
        /// Task id or unique id prefix
        id: String,
    },

    /// Print `id<TAB>title` for active tasks, for shell completion
    Ids {
        /// Only ids starting with this prefix
        prefix: Option<String>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = task::GlobalOptions {
            db: self.db,
            config: self.config,
            json: self.json,
            quiet: self.quiet,
        };
        match self.command {
            Commands::Add {
                title,
                description,
                category,
                due_date,
                priority,
            } => task::run_add(
                global,
                task::AddOptions {
                    title,
                    description,
                    category,
                    due_date,
                    priority,
                },
            ),
            Commands::List {
                sort,
                filter,
                limit,
                todo,
                recent,
            } => task::run_list(
                global,
                task::ListOptions {
                    sort,
                    filters: filter,
                    limit,
                    todo,
                    recent_days: recent,
                },
            ),
            Commands::Note { id, text } => task::run_note(global, task::NoteOptions { id, text }),
            Commands::Comp { ids } => task::run_comp(global, task::CompOptions { ids }),
            Commands::Delete { id, all, yes } => {
                task::run_delete(global, task::DeleteOptions { id, all, yes })
            }
            Commands::View { id } => task::run_view(global, task::ViewOptions { id }),
            Commands::Ids { prefix } => task::run_ids(global, task::IdsOptions { prefix }),
        }
    }
}
