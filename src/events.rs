use chrono::NaiveDateTime;

use crate::models::{format_due, Task, TaskId};

pub const EVENT_REMINDER: &str = "reminder_fired";
pub const EVENT_STATE_UPDATED: &str = "state_updated";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReminderEvent {
    pub task_id: TaskId,
    pub name: String,
    #[serde(serialize_with = "serialize_due")]
    pub due_at: NaiveDateTime,
}

impl ReminderEvent {
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            name: task.name.clone(),
            due_at: task.due_at,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatePayload {
    pub tasks: Vec<Task>,
    pub undo_available: bool,
}

fn serialize_due<S: serde::Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_due(value))
}
