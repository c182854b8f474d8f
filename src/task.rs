use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// Id of a task that has not been stored by the backend yet.
pub const NEW_TASK_ID: &str = "-1";

/// A task as exchanged with the backend.
///
/// The interval is kept in its stored text form. Read and write it through
/// [`Task::interval`] and [`Task::set_interval`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "lId", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: i32,
    #[serde(default)]
    pub creator: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default)]
    pub next_due_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) interval: Option<String>,
}

impl Task {
    pub fn draft() -> Self {
        Self {
            id: NEW_TASK_ID.to_string(),
            ..Self::default()
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty() || self.id == NEW_TASK_ID
    }

    pub fn interval(&self) -> Interval {
        Interval::decode(self.interval.as_deref())
    }

    pub fn set_interval(&mut self, interval: &Interval) {
        self.interval = Some(interval.encode());
    }

    pub fn with_interval(mut self, interval: &Interval) -> Self {
        self.set_interval(interval);
        self
    }
}
