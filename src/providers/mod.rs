pub mod github;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::GitHubConfig;
use crate::model::issue::{Comment, Issue, IssueState, RepoRef};

/// The two paginated reads the digest needs from an issue tracker.
///
/// Implementations return every page; callers never see pagination.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn list_issues(
        &self,
        repo: &RepoRef,
        label: &str,
        state: IssueState,
    ) -> Result<Vec<Issue>>;
    async fn list_comments(&self, repo: &RepoRef, issue_number: u64) -> Result<Vec<Comment>>;
}


pub fn create_tracker(config: &GitHubConfig) -> Result<Box<dyn IssueTracker>> {
    let token = config.resolved_token();
    let tracker = github::GitHubTracker::new(
        &config.api_base,
        token.as_deref(),
        Duration::from_secs(config.timeout_secs.max(1)),
    )?;
    Ok(Box::new(tracker))
}
