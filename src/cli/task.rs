//! task command implementations.

use std::collections::BTreeMap;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::cli::table;
use crate::config::{default_config_path, Config};
use crate::due::{format_due, parse_due_date, start_of_day, DueBucket};
use crate::error::{Error, Result};
use crate::ids::IdGenerator;
use crate::lifecycle::TaskManager;
use crate::model::{note_label, NewTask, Task, TaskPreview};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::query::{Filter, ListQuery, SortKey};
use crate::store::Store;

/// Flags shared by every command.
pub struct GlobalOptions {
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub due_date: Option<String>,
    pub priority: i64,
}

pub struct ListOptions {
    pub sort: Option<String>,
    pub filters: Vec<String>,
    pub limit: Option<usize>,
    pub todo: bool,
    pub recent_days: Option<i64>,
}

pub struct NoteOptions {
    pub id: String,
    pub text: Option<String>,
}

pub struct CompOptions {
    pub ids: Vec<String>,
}

pub struct DeleteOptions {
    pub id: Option<String>,
    pub all: bool,
    pub yes: bool,
}

pub struct ViewOptions {
    pub id: String,
}

pub struct IdsOptions {
    pub prefix: Option<String>,
}

/// JSON view of a task.
#[derive(Serialize)]
struct TaskOutput {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due: Option<&'static str>,
    status: &'static str,
    priority: i64,
    notes: BTreeMap<String, String>,
    last_update: DateTime<Utc>,
}

impl TaskOutput {
    fn new(task: &Task, now: DateTime<Utc>) -> Self {
        let due = if task.is_complete() {
            None
        } else {
            Some(DueBucket::of(task.due_date, now).as_str())
        };
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category.clone(),
            due_date: task.due_date,
            due,
            status: task.status.as_str(),
            priority: task.priority,
            notes: task.notes.clone(),
            last_update: task.last_update,
        }
    }
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<TaskOutput>,
}

impl TaskListOutput {
    fn new(tasks: &[Task], now: DateTime<Utc>) -> Self {
        Self {
            total: tasks.len(),
            tasks: tasks.iter().map(|task| TaskOutput::new(task, now)).collect(),
        }
    }
}

struct TaskContext {
    manager: TaskManager,
    config: Config,
}

pub fn run_add(global: GlobalOptions, options: AddOptions) -> Result<()> {
    let ctx = load_context(&global)?;
    let now = ctx.manager.now();
    let due_date = options
        .due_date
        .as_deref()
        .map(|raw| parse_due_date(raw, now))
        .transpose()?;

    let task = ctx.manager.add_task(NewTask {
        title: options.title,
        description: options.description,
        category: options.category,
        due_date,
        priority: options.priority,
    })?;

    let mut human = HumanOutput::new(format!("Added task {}", task.id));
    human.push_summary("Title", task.title.clone());
    human.push_summary("Due", format_due(task.due_date, now));
    if task.priority != 0 {
        human.push_summary("Priority", task.priority.to_string());
    }
    if let Some(category) = task.category.as_ref() {
        human.push_summary("Category", category.clone());
    }

    emit_success(
        global.output(),
        "add",
        &TaskOutput::new(&task, now),
        Some(&human),
    )
}

pub fn run_list(global: GlobalOptions, options: ListOptions) -> Result<()> {
    let ctx = load_context(&global)?;
    let now = ctx.manager.now();

    let query = ListQuery {
        sort: options.sort.as_deref().map(str::parse::<SortKey>).transpose()?,
        filters: options
            .filters
            .iter()
            .map(|raw| Filter::parse(raw, now))
            .collect::<Result<Vec<_>>>()?,
        limit: options.limit,
        todo: options.todo,
    };

    let recent_days = options.recent_days.unwrap_or(ctx.config.list.recent_days);
    if recent_days < 0 {
        return Err(Error::InvalidInput(
            "--recent must be >= 0".to_string(),
        ));
    }

    let mut tasks = ctx.manager.all_tasks()?;
    if recent_days > 0 && !query.todo {
        let lookback = Duration::try_days(recent_days - 1)
            .and_then(|span| start_of_day(now).checked_sub_signed(span))
            .ok_or_else(|| Error::InvalidInput(format!("--recent {recent_days} is out of range")))?;
        tasks.extend(ctx.manager.completed_tasks(lookback)?);
    }
    let tasks = query.apply(tasks, now);
    debug!(count = tasks.len(), "listing tasks");

    let mut human = HumanOutput::new("Tasks");
    if tasks.is_empty() {
        human.push_detail("No tasks");
    } else {
        for line in table::render(&tasks, now) {
            human.push_body(line);
        }
    }
    human.push_summary("Total", tasks.len().to_string());

    emit_success(
        global.output(),
        "list",
        &TaskListOutput::new(&tasks, now),
        Some(&human),
    )
}

#[derive(Serialize)]
struct NoteOutput {
    label: String,
    text: String,
    task: TaskOutput,
}

pub fn run_note(global: GlobalOptions, options: NoteOptions) -> Result<()> {
    let ctx = load_context(&global)?;
    let id = ctx.manager.resolve_id(&options.id)?;

    let text = match options.text {
        Some(text) => text,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text.trim_end_matches(['\n', '\r']).to_string()
        }
    };
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("note text cannot be empty".to_string()));
    }

    let now = ctx.manager.now();
    let label = note_label(now);
    let task = ctx.manager.add_note(&id, &label, &text)?;

    let mut human = HumanOutput::new(format!("Added note \"{label}\" to task {id}"));
    human.push_body(text.clone());
    human.push_summary("Status", task.status.label());

    emit_success(
        global.output(),
        "note",
        &NoteOutput {
            label,
            text,
            task: TaskOutput::new(&task, now),
        },
        Some(&human),
    )
}

#[derive(Serialize)]
struct CompOutput {
    completed: Vec<String>,
    today: TaskListOutput,
}

pub fn run_comp(global: GlobalOptions, options: CompOptions) -> Result<()> {
    let ctx = load_context(&global)?;

    let mut completed = Vec::new();
    let mut failures: Vec<(String, Error)> = Vec::new();
    for input in &options.ids {
        let outcome = ctx
            .manager
            .resolve_id(input)
            .and_then(|id| ctx.manager.complete_task(&id));
        match outcome {
            Ok(task) => completed.push(task.id),
            Err(err) => failures.push((input.clone(), err)),
        }
    }

    if completed.is_empty() {
        return Err(combine_failures(failures));
    }

    let failed: Vec<(String, String)> = failures
        .iter()
        .map(|(id, err)| (id.clone(), err.to_string()))
        .collect();
    let partial = if failures.is_empty() {
        None
    } else {
        let err = combine_failures(failures);
        Some(Error::PartialCompletion {
            message: err.to_string(),
            code: err.exit_code(),
            completed: completed.clone(),
            failed: failed.clone(),
        })
    };

    // JSON callers get a single envelope: the error carries both lists.
    let partial = match partial {
        Some(err) if global.json => return Err(err),
        other => other,
    };

    let now = ctx.manager.now();
    let today = ctx.manager.completed_tasks(start_of_day(now))?;

    let mut human = HumanOutput::new("Completed today");
    for line in table::render(&today, now) {
        human.push_body(line);
    }
    human.push_summary("Completed", completed.join(", "));
    for (id, err) in &failed {
        human.push_warning(format!("{id}: {err}"));
    }

    emit_success(
        global.output(),
        "comp",
        &CompOutput {
            completed,
            today: TaskListOutput::new(&today, now),
        },
        Some(&human),
    )?;

    match partial {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// One failure is returned as-is so its exit code survives.
fn combine_failures(mut failures: Vec<(String, Error)>) -> Error {
    if failures.len() == 1 {
        if let Some((_, err)) = failures.pop() {
            return err;
        }
    }
    let summary = failures
        .iter()
        .map(|(id, err)| format!("{id}: {err}"))
        .collect::<Vec<_>>()
        .join("; ");
    Error::OperationFailed(format!(
        "{} tasks could not be completed ({summary})",
        failures.len()
    ))
}

#[derive(Serialize)]
struct DeleteOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    removed: usize,
}

pub fn run_delete(global: GlobalOptions, options: DeleteOptions) -> Result<()> {
    let ctx = load_context(&global)?;

    if options.all {
        if !options.yes && !confirm("Delete all active tasks?")? {
            let mut human = HumanOutput::new("Aborted");
            human.push_detail("No tasks were deleted");
            return emit_success(
                global.output(),
                "delete",
                &DeleteOutput {
                    id: None,
                    removed: 0,
                },
                Some(&human),
            );
        }
        let removed = ctx.manager.delete_all_tasks()?;
        let mut human = HumanOutput::new("Deleted all active tasks");
        human.push_summary("Removed", removed.to_string());
        return emit_success(
            global.output(),
            "delete",
            &DeleteOutput { id: None, removed },
            Some(&human),
        );
    }

    let input = options
        .id
        .ok_or_else(|| Error::InvalidInput("task id or --all is required".to_string()))?;
    let input = input.trim();
    let id = match ctx.manager.resolve_id(input) {
        Ok(id) => id,
        // A full-length id is deleted as given, even if it is already gone.
        Err(Error::NotFound(_)) if input.chars().count() >= ctx.manager.id_len() => {
            input.to_string()
        }
        Err(err) => return Err(err),
    };
    ctx.manager.delete_task(&id)?;

    let human = HumanOutput::new(format!("Deleted task {id}"));
    emit_success(
        global.output(),
        "delete",
        &DeleteOutput {
            id: Some(id),
            removed: 1,
        },
        Some(&human),
    )
}

pub fn run_view(global: GlobalOptions, options: ViewOptions) -> Result<()> {
    let ctx = load_context(&global)?;
    let id = ctx.manager.resolve_id(&options.id)?;
    let task = ctx.manager.get_task(&id)?;
    let now = ctx.manager.now();

    let mut human = HumanOutput::new(format!("{}  {}", task.id, task.title));
    if let Some(description) = task.description.as_ref() {
        human.push_body(String::new());
        human.push_body(description.clone());
    }
    human.push_summary("Status", task.status.label());
    human.push_summary(
        "Due",
        format!(
            "{} ({})",
            format_due(task.due_date, now),
            DueBucket::of(task.due_date, now).as_str()
        ),
    );
    human.push_summary("Priority", task.priority.to_string());
    if let Some(category) = task.category.as_ref() {
        human.push_summary("Category", category.clone());
    }
    human.push_summary("Updated", task.last_update.to_rfc3339());
    for (label, text) in notes_in_order(&task.notes) {
        human.push_detail(format!("[{label}] {text}"));
    }

    emit_success(
        global.output(),
        "view",
        &TaskOutput::new(&task, now),
        Some(&human),
    )
}

/// Notes sorted by the time encoded in their label; other labels follow in
/// name order.
fn notes_in_order(notes: &BTreeMap<String, String>) -> Vec<(&str, &str)> {
    let mut entries: Vec<(Option<NaiveDateTime>, &str, &str)> = notes
        .iter()
        .map(|(label, text)| {
            let when = NaiveDateTime::parse_from_str(label, "%m-%d-%Y %H:%M").ok();
            (when, label.as_str(), text.as_str())
        })
        .collect();
    entries.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.1.cmp(b.1)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(b.1),
    });
    entries
        .into_iter()
        .map(|(_, label, text)| (label, text))
        .collect()
}

#[derive(Serialize)]
struct IdsOutput {
    tasks: Vec<TaskPreview>,
}

pub fn run_ids(global: GlobalOptions, options: IdsOptions) -> Result<()> {
    let ctx = load_context(&global)?;
    let prefix = options.prefix.unwrap_or_default();
    let previews = ctx.manager.task_previews(prefix.trim())?;

    if global.json {
        return emit_success(
            global.output(),
            "ids",
            &IdsOutput { tasks: previews },
            None,
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for preview in &previews {
        writeln!(out, "{}\t{}", preview.id, preview.title)?;
    }
    Ok(())
}

fn load_context(global: &GlobalOptions) -> Result<TaskContext> {
    let config = match &global.config {
        Some(path) => Config::load_or_default(path)?,
        None => match default_config_path() {
            Ok(path) => Config::load_or_default(&path)?,
            Err(_) => Config::default(),
        },
    };
    let db_path = match &global.db {
        Some(path) => path.clone(),
        None => config.db_path()?,
    };
    let store = Store::open(&db_path, config.store.busy_timeout_ms)?;
    let ids = IdGenerator::new(config.tasks.id_length)?;
    Ok(TaskContext {
        manager: TaskManager::new(store, ids),
        config,
    })
}

/// Ask on stderr; only an interactive stdin can answer.
fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(Error::InvalidInput(
            "refusing to delete all tasks without --yes".to_string(),
        ));
    }
    eprint!("{question} [y/N] ");
    io::stderr().flush()?;
    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_sort_by_label_time() {
        let mut notes = BTreeMap::new();
        notes.insert("6-10-2024 09:00".to_string(), "later".to_string());
        notes.insert("6-9-2024 17:30".to_string(), "earlier".to_string());
        notes.insert("custom".to_string(), "free label".to_string());
        let ordered = notes_in_order(&notes);
        assert_eq!(
            ordered,
            vec![
                ("6-9-2024 17:30", "earlier"),
                ("6-10-2024 09:00", "later"),
                ("custom", "free label"),
            ]
        );
    }

    #[test]
    fn single_failure_keeps_its_error() {
        let err = combine_failures(vec![(
            "abc".to_string(),
            Error::NotFound("abc".to_string()),
        )]);
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn several_failures_become_operation_failed() {
        let err = combine_failures(vec![
            ("abc".to_string(), Error::NotFound("abc".to_string())),
            ("def".to_string(), Error::NotFound("def".to_string())),
        ]);
        match err {
            Error::OperationFailed(message) => {
                assert!(message.starts_with("2 tasks could not be completed"));
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
