use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::IssueTracker;
use crate::model::issue::{Comment, Issue, IssueState, RepoRef};

const DEFAULT_PAGE_SIZE: u32 = 100;
const ERROR_BODY_LIMIT: usize = 300;

pub struct GitHubTracker {
    client: reqwest::Client,
    api_base: String,
    page_size: u32,
}

impl GitHubTracker {
    pub fn new(api_base: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("deepdive-digest"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("Invalid GitHub authorization header")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to create GitHub client")?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    #[cfg(test)]
    fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Walk `?page=1,2,...` until a page comes back shorter than `page_size`.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let per_page = self.page_size.to_string();
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let resp = self
                .client
                .get(url)
                .query(query)
                .query(&[
                    ("per_page", per_page.as_str()),
                    ("page", page_value.as_str()),
                ])
                .send()
                .await
                .with_context(|| format!("GitHub {operation} request failed"))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                bail!(
                    "GitHub {operation} returned {status}: {}",
                    truncate_for_error(&body, ERROR_BODY_LIMIT)
                );
            }

            let chunk: Vec<T> = resp
                .json()
                .await
                .with_context(|| format!("Failed to parse GitHub {operation} response"))?;
            let chunk_len = chunk.len();
            tracing::debug!(operation, page, count = chunk_len, "fetched page");
            rows.extend(chunk);

            if chunk_len < self.page_size as usize {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }
}

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    body: Option<String>,
    html_url: String,
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GhComment {
    body: Option<String>,
}

fn truncate_for_error(body: &str, limit: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(limit).collect();
    format!("{cut}...")
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    async fn list_issues(
        &self,
        repo: &RepoRef,
        label: &str,
        state: IssueState,
    ) -> Result<Vec<Issue>> {
        let base = &self.api_base;
        let url = format!("{base}/repos/{repo}/issues");
        let query = [("labels", label), ("state", state.as_str())];
        let rows: Vec<GhIssue> = self.get_all_pages("list issues", &url, &query).await?;

        // The issues endpoint also returns pull requests.
        let issues = rows
            .into_iter()
            .filter(|row| row.pull_request.is_none())
            .map(|row| Issue {
                number: row.number,
                url: row.html_url,
                title: row.title,
                body: row.body,
            })
            .collect();

        Ok(issues)
    }

    async fn list_comments(&self, repo: &RepoRef, issue_number: u64) -> Result<Vec<Comment>> {
        let base = &self.api_base;
        let url = format!("{base}/repos/{repo}/issues/{issue_number}/comments");
        let rows: Vec<GhComment> = self.get_all_pages("list issue comments", &url, &[]).await?;

        Ok(rows
            .into_iter()
            .map(|row| Comment { body: row.body })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn repo() -> RepoRef {
        RepoRef {
            owner: "octo-org".into(),
            name: "handbook".into(),
        }
    }

    fn tracker(server: &MockServer) -> GitHubTracker {
        GitHubTracker::new(
            &server.base_url(),
            Some("test-token"),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_page_size(2)
    }

    fn gh_issue(number: u64) -> serde_json::Value {
        json!({
            "number": number,
            "title": format!("Deep dive {number}"),
            "body": "### Timing\n2024-05-01 17:00 UTC",
            "html_url": format!("https://github.com/octo-org/handbook/issues/{number}"),
        })
    }

    #[tokio::test]
    async fn list_issues_follows_pages_and_drops_pull_requests() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/octo-org/handbook/issues")
                .query_param("labels", "Deep-dive")
                .query_param("state", "open")
                .query_param("per_page", "2")
                .query_param("page", "1")
                .header("authorization", "Bearer test-token");
            let mut pr = gh_issue(2);
            pr["pull_request"] = json!({ "url": "https://api.github.com/pulls/2" });
            then.status(200).json_body(json!([gh_issue(1), pr]));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/octo-org/handbook/issues")
                .query_param("page", "2");
            then.status(200).json_body(json!([gh_issue(3)]));
        });

        let issues = tracker(&server)
            .list_issues(&repo(), "Deep-dive", IssueState::Open)
            .await
            .unwrap();

        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
        let numbers: Vec<u64> = issues.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(
            issues[0].url,
            "https://github.com/octo-org/handbook/issues/1"
        );
        assert_eq!(issues[0].title, "Deep dive 1");
    }

    #[tokio::test]
    async fn list_comments_stops_on_short_page() {
        let server = MockServer::start();
        let comments = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/octo-org/handbook/issues/7/comments")
                .query_param("page", "1");
            then.status(200)
                .json_body(json!([{ "body": "https://rewatch.com/v/123" }]));
        });

        let rows = tracker(&server).list_comments(&repo(), 7).await.unwrap();

        assert_eq!(comments.calls(), 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].body.as_deref(), Some("https://rewatch.com/v/123"));
    }

    #[tokio::test]
    async fn list_comments_tolerates_null_bodies() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/repos/octo-org/handbook/issues/7/comments");
            then.status(200).json_body(json!([{ "body": null }]));
        });

        let rows = tracker(&server).list_comments(&repo(), 7).await.unwrap();
        assert_eq!(rows, vec![Comment { body: None }]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/octo-org/handbook/issues");
            then.status(404).body("{\"message\":\"Not Found\"}");
        });

        let err = tracker(&server)
            .list_issues(&repo(), "Deep-dive", IssueState::Open)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("404"), "{message}");
        assert!(message.contains("Not Found"), "{message}");
    }

    #[test]
    fn truncate_for_error_caps_long_bodies() {
        assert_eq!(truncate_for_error("  short  ", 10), "short");
        assert_eq!(truncate_for_error("abcdefghij", 4), "abcd...");
    }
}
