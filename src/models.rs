use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

pub const DUE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(with = "due_text")]
    pub due_at: NaiveDateTime,
    pub completed: bool,
}

impl Task {
    pub fn new(id: TaskId, name: &str, due_at: NaiveDateTime) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            due_at: truncate_to_minute(due_at),
            completed: false,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Due: {})", self.name, format_due(&self.due_at))?;
        if self.completed {
            write!(f, " [Completed]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    InvalidDueDateFormat { input: String },
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::InvalidDueDateFormat { input } => {
                write!(f, "invalid due date {input:?}, expected YYYY-MM-DD HH:MM")
            }
        }
    }
}

impl std::error::Error for TaskError {}

/// Parses `YYYY-MM-DD HH:MM` strictly: four-digit year, zero padding, and
/// nothing after the minutes.
pub fn parse_due(input: &str) -> Result<NaiveDateTime, TaskError> {
    let trimmed = input.trim();
    let invalid = || TaskError::InvalidDueDateFormat {
        input: input.to_string(),
    };
    // `%Y` also takes signed and longer years.
    if trimmed.len() != 16 || !trimmed.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    let parsed = NaiveDateTime::parse_from_str(trimmed, DUE_FORMAT).map_err(|_| invalid())?;
    // chrono accepts unpadded fields; the round trip rejects them.
    if format_due(&parsed) != trimmed {
        return Err(invalid());
    }
    Ok(parsed)
}

pub fn format_due(due_at: &NaiveDateTime) -> String {
    due_at.format(DUE_FORMAT).to_string()
}

pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|at| at.with_nanosecond(0))
        .unwrap_or(at)
}

mod due_text {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_due(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_due(&raw).map_err(serde::de::Error::custom)
    }
}
