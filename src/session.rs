use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::directory::KeyValueList;
use crate::interval::{Interval, Repeat};
use crate::task::Task;

/// Field values of the task form.
///
/// Field names match the form inputs, so a posted form deserializes
/// directly. `startdate` repeats once per date input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskForm {
    #[serde(default)]
    pub tasklid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub duedate: String,
    #[serde(default)]
    pub lastchanged: String,
    #[serde(default = "default_kind")]
    pub interval: String,
    #[serde(default = "default_divider")]
    pub divider: String,
    #[serde(default)]
    pub startdate: Vec<String>,
}

fn default_kind() -> String {
    Repeat::Single.label().to_string()
}

fn default_divider() -> String {
    "1".to_string()
}

impl Default for TaskForm {
    fn default() -> Self {
        let mut form = Self {
            tasklid: String::new(),
            name: String::new(),
            description: String::new(),
            owner: String::new(),
            duedate: String::new(),
            lastchanged: String::new(),
            interval: default_kind(),
            divider: default_divider(),
            startdate: Vec::new(),
        };
        form.fill_interval(&Interval::default());
        form
    }
}

impl TaskForm {
    /// Put an interval into the interval fields. The date list is cleared
    /// first so no field of a previously shown task survives.
    pub fn fill_interval(&mut self, interval: &Interval) {
        self.startdate.clear();
        self.interval = interval.repeat.label().to_string();
        self.divider = interval.divisor.clone();
        for date in &interval.start_dates {
            self.add_date_field(Some(date));
        }
    }

    pub fn add_date_field(&mut self, initial: Option<&str>) {
        self.startdate.push(initial.unwrap_or_default().to_string());
    }

    /// Read the interval fields back into an interval.
    pub fn interval(&self) -> Interval {
        Interval {
            repeat: Repeat::from_label(&self.interval),
            divisor: self.divider.clone(),
            start_dates: self.startdate.clone(),
        }
    }
}

/// Enabled state of the form buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub save_disabled: bool,
    pub remove_disabled: bool,
    pub history_disabled: bool,
}

impl Controls {
    fn for_task(task: &Task) -> Self {
        Self {
            save_disabled: true,
            remove_disabled: task.is_new(),
            history_disabled: task.is_new(),
        }
    }
}

/// The task currently shown in the form, together with the form state.
///
/// Replaces a page-wide "selected task": handlers build or receive a
/// session and pass it on explicitly.
#[derive(Debug, Clone)]
pub struct TaskSession {
    selected: Task,
    pub form: TaskForm,
    pub controls: Controls,
    pub status: String,
}

impl Default for TaskSession {
    fn default() -> Self {
        let selected = Task::draft();
        Self {
            controls: Controls::for_task(&selected),
            form: TaskForm {
                tasklid: selected.id.clone(),
                ..TaskForm::default()
            },
            selected,
            status: String::new(),
        }
    }
}

impl TaskSession {
    pub fn with_task(task: Task, directory: &KeyValueList) -> Self {
        let mut session = Self::default();
        session.select(task, directory);
        session
    }

    pub fn new_task(directory: &KeyValueList) -> Self {
        Self::with_task(Task::draft(), directory)
    }

    /// Session for a posted form: the user's values win over the stored task.
    pub fn from_form(task: Task, form: TaskForm) -> Self {
        let mut controls = Controls::for_task(&task);
        controls.save_disabled = false;
        Self {
            selected: task,
            form,
            controls,
            status: String::new(),
        }
    }

    /// Show `task` in the form, replacing whatever was shown before.
    pub fn select(&mut self, task: Task, directory: &KeyValueList) {
        self.form.tasklid = task.id.clone();
        self.form.name = task.name.clone();
        self.form.description = task.description.clone();
        self.form.owner = directory.display_name(task.owner);
        self.form.duedate = task.next_due_date.clone();
        self.form.lastchanged = task
            .last_changed
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_default();
        self.form.fill_interval(&task.interval());

        self.controls = Controls::for_task(&task);
        self.status.clear();
        self.selected = task;
    }

    pub fn selected(&self) -> &Task {
        &self.selected
    }

    pub fn is_new(&self) -> bool {
        self.selected.is_new()
    }

    pub fn mark_changed(&mut self) {
        self.controls.save_disabled = false;
    }

    pub fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
    }

    /// The selected task with the form values applied, ready to be saved.
    ///
    /// Owner text that matches no directory entry keeps the current owner.
    pub fn to_task(&self, directory: &KeyValueList) -> Task {
        let mut task = self.selected.clone();
        task.name = self.form.name.trim().to_string();
        task.description = self.form.description.clone();
        if let Some(owner) = directory.id_from_name(&self.form.owner) {
            task.owner = owner;
        }
        task.next_due_date = self.form.duedate.clone();
        task.set_interval(&self.form.interval());
        task
    }
}

/// `2024-02-03T08:15:00` becomes `2024-02-03 08:15`; anything else is
/// shown unchanged.
pub fn format_timestamp(text: &str) -> String {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::KeyValue;

    fn directory() -> KeyValueList {
        KeyValueList::new(vec![KeyValue::new(1, "Anna"), KeyValue::new(2, "Bernd")])
    }

    fn stored_task(id: &str, interval: &str) -> Task {
        Task {
            id: id.to_string(),
            name: "Change filter".to_string(),
            description: "Air conditioning".to_string(),
            owner: 2,
            next_due_date: "2024-03-01".to_string(),
            last_changed: Some("2024-02-03T08:15:00".to_string()),
            ..Task::default()
        }
        .with_interval(&Interval::decode(Some(interval)))
    }

    #[test]
    fn test_select_fills_form() {
        let session = TaskSession::with_task(
            stored_task("12", "monthly|3|2024-03-01;2024-03-15"),
            &directory(),
        );

        assert_eq!(session.form.tasklid, "12");
        assert_eq!(session.form.owner, "Bernd");
        assert_eq!(session.form.duedate, "2024-03-01");
        assert_eq!(session.form.lastchanged, "2024-02-03 08:15");
        assert_eq!(session.form.interval, "monthly");
        assert_eq!(session.form.divider, "3");
        assert_eq!(session.form.startdate, vec!["2024-03-01", "2024-03-15"]);
        assert!(session.controls.save_disabled);
        assert!(!session.controls.remove_disabled);
    }

    #[test]
    fn test_reselect_drops_previous_date_fields() {
        let directory = directory();
        let mut session = TaskSession::with_task(
            stored_task("12", "daily|2|2024-01-01;2024-01-02;2024-01-03"),
            &directory,
        );

        session.select(stored_task("13", "weekly|1|2024-05-06"), &directory);

        assert_eq!(session.form.startdate, vec!["2024-05-06"]);
        assert_eq!(session.selected().id, "13");
    }

    #[test]
    fn test_new_task_defaults() {
        let session = TaskSession::new_task(&directory());

        assert!(session.is_new());
        assert_eq!(session.form.tasklid, "-1");
        assert_eq!(session.form.interval, "single");
        assert_eq!(session.form.divider, "1");
        assert_eq!(session.form.startdate, vec![""]);
        assert!(session.controls.remove_disabled);
        assert!(session.controls.history_disabled);
    }

    #[test]
    fn test_broken_interval_shows_default_fields() {
        let session = TaskSession::with_task(stored_task("12", "weekly"), &directory());

        assert_eq!(session.form.interval, "single");
        assert_eq!(session.form.startdate, vec![""]);
    }

    #[test]
    fn test_status_cleared_on_select() {
        let directory = directory();
        let mut session = TaskSession::new_task(&directory);
        session.set_status("Gespeichert.");

        session.select(stored_task("12", "single|1|2024-01-01"), &directory);

        assert_eq!(session.status, "");
    }

    #[test]
    fn test_to_task_applies_form() {
        let directory = directory();
        let mut session = TaskSession::with_task(stored_task("12", "single|1|2024-01-01"), &directory);
        session.form.name = "  Change filters  ".to_string();
        session.form.owner = "an".to_string();
        session.form.interval = "weekly".to_string();
        session.form.divider = "2".to_string();
        session.form.add_date_field(Some("2024-01-08"));
        session.mark_changed();

        let task = session.to_task(&directory);

        assert_eq!(task.id, "12");
        assert_eq!(task.name, "Change filters");
        assert_eq!(task.owner, 1);
        assert_eq!(
            task.interval(),
            Interval::decode(Some("weekly|2|2024-01-01;2024-01-08"))
        );
        assert!(!session.controls.save_disabled);
    }

    #[test]
    fn test_unknown_owner_keeps_current() {
        let directory = directory();
        let mut session = TaskSession::with_task(stored_task("12", "single|1|2024-01-01"), &directory);
        session.form.owner = "Nobody".to_string();

        assert_eq!(session.to_task(&directory).owner, 2);
    }

    #[test]
    fn test_form_deserializes_repeated_dates() {
        let form: TaskForm = serde_html_form::from_str(
            "tasklid=5&name=Mow&interval=weekly&divider=2&startdate=2024-04-01&startdate=2024-04-03",
        )
        .unwrap();

        assert_eq!(form.startdate, vec!["2024-04-01", "2024-04-03"]);
        assert_eq!(form.interval().encode(), "weekly|2|2024-04-01;2024-04-03");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-02-03T08:15:00"), "2024-02-03 08:15");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
