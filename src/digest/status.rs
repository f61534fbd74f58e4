use chrono::{DateTime, Utc};

use super::{DigestError, DigestRules};
use crate::model::issue::RepoRef;
use crate::model::issue_update::{MissingFields, MissingUpdates};
use crate::providers::IssueTracker;

/// The session time has been reached.
pub fn is_past_due(due_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    due_date <= now
}

/// The session is still ahead, but no further than `window`.
pub fn is_due_soon(due_date: DateTime<Utc>, now: DateTime<Utc>, window: chrono::Duration) -> bool {
    due_date > now && due_date - now <= window
}

pub fn is_high_priority(
    due_date: DateTime<Utc>,
    missing_fields: &MissingFields,
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> bool {
    is_due_soon(due_date, now, window) && missing_fields.any()
}

/// Check an overdue session's comments for the recording and notes links.
///
/// Sessions that are not past due return immediately without touching the
/// tracker.
pub async fn get_missing_updates(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    rules: &DigestRules,
    due_date: DateTime<Utc>,
    issue_number: u64,
    now: DateTime<Utc>,
) -> Result<MissingUpdates, DigestError> {
    if !is_past_due(due_date, now) {
        return Ok(MissingUpdates::not_due());
    }

    let comments = tracker
        .list_comments(repo, issue_number)
        .await
        .map_err(|source| DigestError::Comments {
            issue: issue_number,
            source,
        })?;

    let mut needs_recording = true;
    let mut needs_notes = true;
    for body in comments.iter().filter_map(|c| c.body.as_deref()) {
        if body.contains(&rules.recording_marker) {
            needs_recording = false;
        }
        if body.contains(&rules.notes_marker) {
            needs_notes = false;
        }
    }

    tracing::debug!(
        issue = issue_number,
        comments = comments.len(),
        needs_recording,
        needs_notes,
        "checked past-due session"
    );

    Ok(MissingUpdates {
        past_due: true,
        needs_recording: Some(needs_recording),
        needs_notes: Some(needs_notes),
    })
}
