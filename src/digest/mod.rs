//! Deep-dive status digest.
//!
//! Open issues carrying the deep-dive label are read through an
//! [`IssueTracker`](crate::providers::IssueTracker); each body is scanned for
//! the session date and volunteer roles, overdue sessions have their comments
//! checked for a recording and notes, and every issue becomes one line of an
//! `<li>` list fragment.
//!
//! Everything here is a function of its inputs. `now` is passed in rather than
//! read from the clock so the date rules can be tested.

pub mod collect;
pub mod extract;
pub mod format;
pub mod status;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::issue::{IssueState, RepoRef};
use crate::providers::IssueTracker;

/// Knobs for how issues are selected and judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRules {
    pub label: String,
    pub state: IssueState,
    /// Substring of a comment that counts as a recording link.
    pub recording_marker: String,
    /// Substring of a comment that counts as a notes link.
    pub notes_marker: String,
    /// How far ahead a session counts as "tomorrow's".
    pub due_soon_window: chrono::Duration,
}

impl Default for DigestRules {
    fn default() -> Self {
        Self {
            label: "Deep-dive".into(),
            state: IssueState::Open,
            recording_marker: "rewatch.com".into(),
            notes_marker: "/notes/".into(),
            due_soon_window: chrono::Duration::days(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("issue #{issue}: no Timing section with a due date")]
    MissingDueDate { issue: u64 },

    #[error("issue #{issue}: could not parse due date '{text}'")]
    UnparseableDueDate { issue: u64, text: String },

    #[error("failed to list issues in {repo}")]
    ListIssues {
        repo: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("issue #{issue}: failed to fetch comments")]
    Comments {
        issue: u64,
        #[source]
        source: anyhow::Error,
    },
}

impl DigestError {
    /// The issue this error belongs to, if it is not a batch-level failure.
    pub fn issue(&self) -> Option<u64> {
        match self {
            DigestError::MissingDueDate { issue }
            | DigestError::UnparseableDueDate { issue, .. }
            | DigestError::Comments { issue, .. } => Some(*issue),
            DigestError::ListIssues { .. } => None,
        }
    }
}

/// Collect, format and join. Empty string when no issue matched.
pub async fn run(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    rules: &DigestRules,
    now: DateTime<Utc>,
) -> Result<String, DigestError> {
    let updates = collect::get_deep_dive_issues(tracker, repo, rules, now).await?;
    Ok(format::render_digest(&updates))
}
