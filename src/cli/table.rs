//! Plain-text task tables.

use chrono::{DateTime, Utc};

use crate::due::{format_due, since_label, DueBucket};
use crate::model::Task;

const HEADERS: [&str; 7] = ["ID", "Title", "Category", "Due", "Status", "Pr", "Upd"];
const TITLE_COLUMN: usize = 1;
const CATEGORY_COLUMN: usize = 2;
const MAX_TITLE_WIDTH: usize = 40;
const MAX_CATEGORY_WIDTH: usize = 12;

/// Render `tasks` as aligned rows, header first.
pub fn render(tasks: &[Task], now: DateTime<Utc>) -> Vec<String> {
    let rows: Vec<[String; 7]> = tasks.iter().map(|task| row(task, now)).collect();

    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(&HEADERS.map(str::to_string), &widths));
    for row in &rows {
        lines.push(format_row(row, &widths));
    }
    lines
}

fn row(task: &Task, now: DateTime<Utc>) -> [String; 7] {
    let due = if task.is_complete() {
        format_due(task.due_date, now)
    } else {
        let marker = DueBucket::of(task.due_date, now).marker();
        format!("{}{marker}", format_due(task.due_date, now))
    };
    let mut cells = [
        task.id.clone(),
        task.title.clone(),
        task.category.clone().unwrap_or_default(),
        due,
        task.status.label().to_string(),
        task.priority.to_string(),
        since_label(task.last_update, now),
    ];
    cells[TITLE_COLUMN] = truncate(&cells[TITLE_COLUMN], MAX_TITLE_WIDTH);
    cells[CATEGORY_COLUMN] = truncate(&cells[CATEGORY_COLUMN], MAX_CATEGORY_WIDTH);
    cells
}

fn format_row(cells: &[String; 7], widths: &[usize; 7]) -> String {
    let line = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

/// Shorten `value` to at most `max` characters, marking the cut with `...`.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = value.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            category: Some("docs".to_string()),
            due_date: now() + Duration::days(2),
            status: TaskStatus::InProgress,
            priority: 3,
            notes: BTreeMap::new(),
            last_update: now() - Duration::days(15),
        }
    }

    #[test]
    fn header_only_for_empty_list() {
        let lines = render(&[], now());
        assert_eq!(lines, vec!["ID  Title  Category  Due  Status  Pr  Upd".to_string()]);
    }

    #[test]
    fn rows_are_aligned_under_headers() {
        let lines = render(&[task("writethe", "write the memo")], now());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID        Title           Category"));
        assert_eq!(
            lines[1],
            "writethe  write the memo  docs      6-3  in prog  3   2w"
        );
    }

    #[test]
    fn overdue_tasks_are_marked() {
        let mut late = task("late0000", "late");
        late.due_date = now() - Duration::days(5);
        let lines = render(&[late], now());
        assert!(lines[1].contains("5-27!!"));
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
