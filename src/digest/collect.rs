use chrono::{DateTime, Utc};

use super::extract::{extract_due_date, extract_missing_fields};
use super::status::{get_missing_updates, is_high_priority};
use super::{DigestError, DigestRules};
use crate::model::issue::{Issue, RepoRef};
use crate::model::issue_update::IssueUpdate;
use crate::providers::IssueTracker;

/// Per-issue result from [`collect_outcomes`].
pub type IssueOutcome = Result<IssueUpdate, DigestError>;

/// Build an update for every labeled issue in `rules.state`, in tracker order.
///
/// The first issue that cannot be evaluated fails the whole batch.
pub async fn get_deep_dive_issues(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    rules: &DigestRules,
    now: DateTime<Utc>,
) -> Result<Vec<IssueUpdate>, DigestError> {
    let issues = list_labeled_issues(tracker, repo, rules).await?;

    let mut updates = Vec::with_capacity(issues.len());
    for issue in issues {
        updates.push(build_update(tracker, repo, rules, issue, now).await?);
    }
    Ok(updates)
}

/// Like [`get_deep_dive_issues`], but each issue succeeds or fails on its own.
/// Only a failure to list the issues fails the call.
pub async fn collect_outcomes(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    rules: &DigestRules,
    now: DateTime<Utc>,
) -> Result<Vec<IssueOutcome>, DigestError> {
    let issues = list_labeled_issues(tracker, repo, rules).await?;

    let mut outcomes = Vec::with_capacity(issues.len());
    for issue in issues {
        let outcome = build_update(tracker, repo, rules, issue, now).await;
        if let Err(err) = &outcome {
            tracing::warn!(issue = ?err.issue(), error = %err, "skipping deep dive issue");
        }
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

async fn list_labeled_issues(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    rules: &DigestRules,
) -> Result<Vec<Issue>, DigestError> {
    let issues = tracker
        .list_issues(repo, &rules.label, rules.state)
        .await
        .map_err(|source| DigestError::ListIssues {
            repo: repo.to_string(),
            source,
        })?;
    tracing::debug!(
        %repo,
        label = %rules.label,
        count = issues.len(),
        "listed deep dive issues"
    );
    Ok(issues)
}

async fn build_update(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    rules: &DigestRules,
    issue: Issue,
    now: DateTime<Utc>,
) -> Result<IssueUpdate, DigestError> {
    let body = issue.body.as_deref().unwrap_or_default();
    let due_date = extract_due_date(issue.number, body)?;
    let missing_updates =
        get_missing_updates(tracker, repo, rules, due_date, issue.number, now).await?;
    let missing_fields = extract_missing_fields(body);
    let high_priority = is_high_priority(due_date, &missing_fields, now, rules.due_soon_window);

    Ok(IssueUpdate {
        id: issue.number,
        url: issue.url,
        title: issue.title,
        due_date,
        high_priority,
        missing_fields,
        missing_updates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::issue::IssueState;
    use crate::providers::tests::{make_issue, test_repo, MockTracker};

    fn now() -> DateTime<Utc> {
        "2024-05-10T12:00:00Z".parse().unwrap()
    }

    async fn strict(tracker: &MockTracker) -> Result<Vec<IssueUpdate>, DigestError> {
        get_deep_dive_issues(tracker, &test_repo(), &DigestRules::default(), now()).await
    }

    #[tokio::test]
    async fn builds_updates_in_tracker_order() {
        let tracker = MockTracker::new()
            .with_issue(make_issue(
                4,
                "### Timing\n2024-05-11 00:00 UTC\n\nLeader: @hubot\nNotetaker:\n",
            ))
            .with_issue(make_issue(
                2,
                "### Timing\n2024-05-20 17:00 UTC\n\nLeader:\nNotetaker:\n",
            ));

        let updates = strict(&tracker).await.unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].id, 4);
        assert!(updates[0].high_priority);
        assert!(!updates[0].missing_fields.leader);
        assert!(updates[0].missing_fields.notetaker);
        assert_eq!(updates[1].id, 2);
        assert!(!updates[1].high_priority);
        assert!(updates[1].url.ends_with("/octo-org/handbook/issues/2"));
        assert_eq!(tracker.comment_calls(), 0);
    }

    #[tokio::test]
    async fn lists_open_issues_with_configured_label() {
        let tracker = MockTracker::new();
        let rules = DigestRules {
            label: "Knowledge share".into(),
            ..DigestRules::default()
        };

        get_deep_dive_issues(&tracker, &test_repo(), &rules, now())
            .await
            .unwrap();

        assert_eq!(
            tracker.issue_requests.lock().unwrap().as_slice(),
            &[("Knowledge share".to_string(), IssueState::Open)]
        );
    }

    #[tokio::test]
    async fn only_past_due_issues_fetch_comments() {
        let tracker = MockTracker::new()
            .with_issue(make_issue(1, "### Timing\n2024-05-01 17:00 UTC\n"))
            .with_issue(make_issue(2, "### Timing\n2024-06-01 17:00 UTC\n"))
            .with_comments(1, &["https://rewatch.com/v/9"]);

        let updates = strict(&tracker).await.unwrap();

        assert_eq!(tracker.comment_requests.lock().unwrap().as_slice(), &[1]);
        assert_eq!(updates[0].missing_updates.needs_recording, Some(false));
        assert_eq!(updates[0].missing_updates.needs_notes, Some(true));
        assert!(!updates[1].missing_updates.past_due);
    }

    #[tokio::test]
    async fn missing_body_is_a_missing_due_date() {
        let mut issue = make_issue(8, "");
        issue.body = None;
        let tracker = MockTracker::new().with_issue(issue);

        let err = strict(&tracker).await.unwrap_err();
        assert!(matches!(err, DigestError::MissingDueDate { issue: 8 }));
    }

    #[tokio::test]
    async fn listing_failure_names_the_repo() {
        let tracker = MockTracker::new().with_listing_failure();

        let err = strict(&tracker).await.unwrap_err();
        assert!(err.to_string().ends_with("in octo-org/handbook"), "{err}");
        assert_eq!(err.issue(), None);
    }

    #[tokio::test]
    async fn outcomes_isolate_bad_issues() {
        let tracker = MockTracker::new()
            .with_issue(make_issue(1, "no timing here"))
            .with_issue(make_issue(2, "### Timing\n2024-05-01 17:00 UTC\n"))
            .with_issue(make_issue(3, "### Timing\n2024-05-20 17:00 UTC\n"))
            .with_comment_failure(2);
        let rules = DigestRules::default();

        let outcomes = collect_outcomes(&tracker, &test_repo(), &rules, now())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            outcomes[0],
            Err(DigestError::MissingDueDate { issue: 1 })
        ));
        assert!(matches!(
            outcomes[1],
            Err(DigestError::Comments { issue: 2, .. })
        ));
        assert_eq!(outcomes[2].as_ref().unwrap().id, 3);
    }
}
