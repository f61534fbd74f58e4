use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which volunteer roles are still unfilled. `true` means missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingFields {
    pub leader: bool,
    pub notetaker: bool,
}

impl MissingFields {
    pub fn any(&self) -> bool {
        self.leader || self.notetaker
    }
}

/// Follow-up artifacts a finished session still owes.
///
/// `needs_recording` and `needs_notes` are only populated once the session is
/// past due; before that the comments are never fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingUpdates {
    pub past_due: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_recording: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_notes: Option<bool>,
}

impl MissingUpdates {
    pub fn not_due() -> Self {
        Self::default()
    }

    pub fn needs_recording(&self) -> bool {
        self.past_due && self.needs_recording.unwrap_or(false)
    }

    pub fn needs_notes(&self) -> bool {
        self.past_due && self.needs_notes.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdate {
    pub id: u64,
    pub url: String,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub high_priority: bool,
    pub missing_fields: MissingFields,
    pub missing_updates: MissingUpdates,
}
