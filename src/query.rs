//! Sorting, filtering and limiting task listings.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::due::{parse_due_date, DueBucket};
use crate::error::{Error, Result};
use crate::model::{Task, TaskStatus};

/// Property a listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Case-insensitive, ascending.
    Title,
    /// Ascending, uncategorized last.
    Category,
    /// Soonest first.
    DueDate,
    /// Highest first.
    Priority,
    /// In progress, then pending, then complete.
    Status,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SortKey::Title),
            "category" | "cat" => Ok(SortKey::Category),
            "due" | "duedate" | "due_date" | "due-date" => Ok(SortKey::DueDate),
            "priority" | "pr" => Ok(SortKey::Priority),
            "status" => Ok(SortKey::Status),
            other => Err(Error::InvalidInput(format!(
                "unknown sort key '{other}' (expected title|category|duedate|priority|status)"
            ))),
        }
    }
}

/// One `key=value` listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Status(TaskStatus),
    Category(String),
    Priority(i64),
    /// Due on the same UTC day as the parsed date.
    DueOn(DateTime<Utc>),
    /// Due before the start of today.
    Overdue,
}

impl Filter {
    /// Parse `key=value`. Relative due dates resolve against `now`.
    pub fn parse(input: &str, now: DateTime<Utc>) -> Result<Self> {
        let (key, value) = input.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!("invalid filter '{input}' (expected key=value)"))
        })?;
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(Filter::Status(TaskStatus::parse(value)?)),
            "category" | "cat" => Ok(Filter::Category(value.to_string())),
            "priority" | "pr" => value
                .parse()
                .map(Filter::Priority)
                .map_err(|_| Error::InvalidInput(format!("invalid priority '{value}'"))),
            "due" | "duedate" | "due_date" => match value.to_ascii_lowercase().as_str() {
                "overdue" | "late" => Ok(Filter::Overdue),
                "today" => Ok(Filter::DueOn(now)),
                "tomorrow" => parse_due_date("1d", now).map(Filter::DueOn),
                _ => parse_due_date(value, now).map(Filter::DueOn),
            },
            other => Err(Error::InvalidInput(format!(
                "unknown filter key '{other}' (expected status|category|priority|due)"
            ))),
        }
    }

    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            Filter::Status(status) => task.status == *status,
            Filter::Category(category) => task
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category)),
            Filter::Priority(priority) => task.priority == *priority,
            Filter::DueOn(day) => task.due_date.date_naive() == day.date_naive(),
            Filter::Overdue => {
                !task.is_complete()
                    && matches!(
                        DueBucket::of(task.due_date, now),
                        DueBucket::VeryLate | DueBucket::Late
                    )
            }
        }
    }
}

/// A listing request.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub sort: Option<SortKey>,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
    /// Order by what needs doing first; overrides `sort`.
    pub todo: bool,
}

impl ListQuery {
    pub fn apply(&self, tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<Task> {
        let mut tasks: Vec<Task> = tasks
            .into_iter()
            .filter(|task| self.filters.iter().all(|filter| filter.matches(task, now)))
            .collect();

        if self.todo {
            tasks.retain(|task| !task.is_complete());
            sort_for_today(&mut tasks);
        } else if let Some(key) = self.sort {
            sort_by_key(&mut tasks, key);
        }

        if let Some(limit) = self.limit {
            if limit > 0 {
                tasks.truncate(limit);
            }
        }
        tasks
    }
}

/// Soonest due first; equal due dates put higher priority first.
pub fn sort_for_today(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub fn sort_by_key(tasks: &mut [Task], key: SortKey) {
    tasks.sort_by(|a, b| compare(a, b, key).then_with(|| a.id.cmp(&b.id)));
}

fn compare(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Category => match (&a.category, &b.category) {
            (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::DueDate => a.due_date.cmp(&b.due_date),
        SortKey::Priority => b.priority.cmp(&a.priority),
        SortKey::Status => a.status.rank().cmp(&b.status.rank()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn task(id: &str, due_in_days: i64, priority: i64) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            category: None,
            due_date: now() + Duration::days(due_in_days),
            status: TaskStatus::Pending,
            priority,
            notes: BTreeMap::new(),
            last_update: now(),
        }
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn todo_orders_by_due_then_priority() {
        let tasks = vec![
            task("later", 3, 5),
            task("low", 1, 0),
            task("high", 1, 9),
            task("overdue", -2, 0),
        ];
        let query = ListQuery {
            todo: true,
            ..ListQuery::default()
        };
        let sorted = query.apply(tasks, now());
        assert_eq!(ids(&sorted), vec!["overdue", "high", "low", "later"]);
    }

    #[test]
    fn todo_hides_completed_tasks() {
        let mut done = task("done", 0, 0);
        done.status = TaskStatus::Complete;
        let query = ListQuery {
            todo: true,
            ..ListQuery::default()
        };
        let sorted = query.apply(vec![done, task("open", 0, 0)], now());
        assert_eq!(ids(&sorted), vec!["open"]);
    }

    #[test]
    fn sort_keys_parse_with_aliases() {
        assert_eq!("duedate".parse::<SortKey>().unwrap(), SortKey::DueDate);
        assert_eq!("Priority".parse::<SortKey>().unwrap(), SortKey::Priority);
        assert!("color".parse::<SortKey>().is_err());
    }

    #[test]
    fn sort_by_category_puts_uncategorized_last() {
        let mut a = task("a", 0, 0);
        a.category = Some("work".to_string());
        let b = task("b", 0, 0);
        let mut c = task("c", 0, 0);
        c.category = Some("Home".to_string());
        let mut tasks = vec![a, b, c];
        sort_by_key(&mut tasks, SortKey::Category);
        assert_eq!(ids(&tasks), vec!["c", "a", "b"]);
    }

    #[test]
    fn sort_by_status_puts_in_progress_first() {
        let pending = task("pending", 0, 0);
        let mut started = task("started", 0, 0);
        started.status = TaskStatus::InProgress;
        let mut done = task("done", 0, 0);
        done.status = TaskStatus::Complete;
        let mut tasks = vec![done, pending, started];
        sort_by_key(&mut tasks, SortKey::Status);
        assert_eq!(ids(&tasks), vec!["started", "pending", "done"]);
    }

    #[test]
    fn filters_combine_and_limit_applies_last() {
        let mut a = task("a", 0, 2);
        a.category = Some("work".to_string());
        let mut b = task("b", 1, 2);
        b.category = Some("WORK".to_string());
        let c = task("c", 1, 2);
        let query = ListQuery {
            sort: Some(SortKey::DueDate),
            filters: vec![
                Filter::parse("category=work", now()).unwrap(),
                Filter::parse("priority=2", now()).unwrap(),
            ],
            limit: Some(1),
            todo: false,
        };
        assert_eq!(ids(&query.apply(vec![c, b, a], now())), vec!["a"]);
    }

    #[test]
    fn due_filters() {
        let tomorrow = Filter::parse("due=tomorrow", now()).unwrap();
        assert!(tomorrow.matches(&task("t", 1, 0), now()));
        assert!(!tomorrow.matches(&task("t", 2, 0), now()));

        let overdue = Filter::parse("due=overdue", now()).unwrap();
        assert!(overdue.matches(&task("late", -1, 0), now()));
        assert!(!overdue.matches(&task("today", 0, 0), now()));

        let exact = Filter::parse("due=6/3", now()).unwrap();
        assert!(exact.matches(&task("t", 2, 0), now()));
    }

    #[test]
    fn malformed_filters_are_rejected() {
        for input in ["status", "status=paused", "priority=high", "color=red", "due=soon"] {
            assert!(Filter::parse(input, now()).is_err(), "{input}");
        }
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let query = ListQuery {
            limit: Some(0),
            ..ListQuery::default()
        };
        assert_eq!(query.apply(vec![task("a", 0, 0), task("b", 0, 0)], now()).len(), 2);
    }
}
