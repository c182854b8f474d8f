//! Projection of a task list into display rows.
//!
//! The backend delivers tasks already ordered by due date. This module only
//! decides which tasks are shown, how each row is highlighted and where the
//! two group separators go. It never reorders or mutates the tasks.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::interval::format_iso_date;
use crate::task::Task;

/// Tasks due later than this many days from today are "far future".
pub const FAR_FUTURE_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTag {
    Escalated,
    FutureTask,
}

impl RowTag {
    pub fn class(self) -> &'static str {
        match self {
            RowTag::Escalated => "escalated",
            RowTag::FutureTask => "futuretask",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// Closes the block of overdue tasks.
    EndOfOverdue,
    /// Opens the block of tasks due after the one-week horizon.
    FarFuture,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    pub name: &'a str,
    pub due_date: &'a str,
    pub tags: Vec<RowTag>,
}

impl TaskRow<'_> {
    pub fn has_tag(&self, tag: RowTag) -> bool {
        self.tags.contains(&tag)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry<'a> {
    Separator(Separator),
    Row(TaskRow<'a>),
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Completed tasks: rows are shown without highlighting or separators.
    pub history: bool,
    /// Owners explicitly mapped to `false` are hidden.
    pub visibility: HashMap<i32, bool>,
}

impl ListOptions {
    pub fn is_visible(&self, owner: i32) -> bool {
        self.visibility.get(&owner).copied().unwrap_or(true)
    }
}

pub fn present<'a>(tasks: &'a [Task], today: NaiveDate, options: &ListOptions) -> Vec<ListEntry<'a>> {
    // ISO dates order correctly as text, so all comparisons are on strings.
    let horizon = today
        .checked_add_signed(Duration::days(FAR_FUTURE_DAYS))
        .map(format_iso_date)
        .unwrap_or_default();
    let today = format_iso_date(today);

    let mut entries = Vec::with_capacity(tasks.len() + 2);
    let mut seen_escalated = false;
    let mut past_today = false;
    let mut far_future_started = false;

    for task in tasks.iter().filter(|task| options.is_visible(task.owner)) {
        let due = task.next_due_date.as_str();
        let mut tags = Vec::new();

        // A missing due date sorts before every date, so it counts as overdue.
        if !options.history {
            let escalated = due < today.as_str();
            let far_future = due > horizon.as_str();

            if !past_today && due > today.as_str() {
                past_today = true;
                if seen_escalated && !far_future {
                    entries.push(ListEntry::Separator(Separator::EndOfOverdue));
                }
            }

            if far_future && !far_future_started {
                far_future_started = true;
                entries.push(ListEntry::Separator(Separator::FarFuture));
            }

            if escalated {
                seen_escalated = true;
                tags.push(RowTag::Escalated);
            }
            if far_future {
                tags.push(RowTag::FutureTask);
            }
        }

        entries.push(ListEntry::Row(TaskRow {
            task,
            name: &task.name,
            due_date: due,
            tags,
        }));
    }

    entries
}
