//! Makes the pending-pin backlog visible to humans.
//!
//! A run reads the pending store, builds a short summary, and pushes it
//! through up to two independent channels: an issue on the tracker
//! (REST, with a `gh` CLI fallback) and a chat webhook. Every channel
//! failure is non-fatal; the job always terminates with a status.

use pinq_store::{PendingPin, PendingStore};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;

/// Timeout applied to both the tracker and the webhook call.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_TRACKER_API_URL: &str = "https://api.github.com";

/// Payload shape expected by the configured chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WebhookPlatform {
    /// `{"text": ...}` body. Also the fallback for unrecognized selectors.
    #[default]
    Slack,
    /// `{"content": ...}` body.
    Discord,
}

impl WebhookPlatform {
    pub fn parse(selector: &str) -> Self {
        match selector.to_ascii_lowercase().as_str() {
            "discord" => WebhookPlatform::Discord,
            _ => WebhookPlatform::Slack,
        }
    }

    pub fn payload(&self, summary: &str) -> Value {
        match self {
            WebhookPlatform::Slack => json!({"text": summary}),
            WebhookPlatform::Discord => json!({"content": summary}),
        }
    }
}

/// Channel configuration, normally read from the environment.
///
/// Absence of any value disables the corresponding channel without error.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub tracker_token: Option<String>,
    /// Target repository as `owner/repo`.
    pub repository: Option<String>,
    /// Tracker API base; overridable for self-hosted trackers.
    pub tracker_api_url: Option<String>,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub webhook_url: Option<String>,
    pub webhook_platform: WebhookPlatform,
    /// Whether a failed REST issue creation may shell out to the local
    /// `gh` tool as a fallback.
    pub gh_fallback: bool,
}

impl NotifyConfig {
    /// Recognized variables: `GITHUB_TOKEN`/`GH_TOKEN`,
    /// `GITHUB_REPOSITORY`, `PINQ_TRACKER_API_URL`, `PINQ_ISSUE_LABELS`,
    /// `PINQ_ISSUE_ASSIGNEES`, `PINQ_WEBHOOK_URL`, `PINQ_WEBHOOK_PLATFORM`.
    pub fn from_env() -> Self {
        NotifyConfig {
            tracker_token: env_var("GITHUB_TOKEN").or_else(|| env_var("GH_TOKEN")),
            repository: env_var("GITHUB_REPOSITORY"),
            tracker_api_url: env_var("PINQ_TRACKER_API_URL"),
            labels: parse_csv(&env_var("PINQ_ISSUE_LABELS").unwrap_or_default()),
            assignees: parse_csv(&env_var("PINQ_ISSUE_ASSIGNEES").unwrap_or_default()),
            webhook_url: env_var("PINQ_WEBHOOK_URL"),
            webhook_platform: env_var("PINQ_WEBHOOK_PLATFORM")
                .map(|s| WebhookPlatform::parse(&s))
                .unwrap_or_default(),
            gh_fallback: true,
        }
    }

    fn tracker_api_url(&self) -> &str {
        self.tracker_api_url
            .as_deref()
            .unwrap_or(DEFAULT_TRACKER_API_URL)
    }
}

/// Final outcome of a notification run. Informational; never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStatus {
    /// Empty store; nothing was sent.
    NothingPending,
    /// An issue was created (webhook may or may not also have fired).
    IssueCreated,
    /// No issue, but the webhook post succeeded.
    Posted,
    /// Neither channel worked; the summary is only available locally.
    SummaryOnly,
}

impl fmt::Display for NotifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotifyStatus::NothingPending => "nothing pending",
            NotifyStatus::IssueCreated => "issue created",
            NotifyStatus::Posted => "posted",
            NotifyStatus::SummaryOnly => "summary only",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct NotifyReport {
    pub status: NotifyStatus,
    pub title: String,
    pub summary: String,
}

/// Builds the issue title and human-readable summary body.
pub fn summarize(entries: &[(String, PendingPin)]) -> (String, String) {
    let title = format!("[pinq] {} pending pin(s) need attention", entries.len());
    let mut summary = format!("Found {} pending pins:\n\n", entries.len());
    for (_, record) in entries {
        summary.push_str(&format!("- {}: {}\n", record.file, record.error));
    }
    (title, summary)
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Runs the notification job once against the given store.
pub async fn run(store: &dyn PendingStore, config: &NotifyConfig) -> NotifyReport {
    let entries = match store.list().await {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("failed to read pending store: {e}");
            vec![]
        }
    };
    if entries.is_empty() {
        return NotifyReport {
            status: NotifyStatus::NothingPending,
            title: String::new(),
            summary: "No pending pins found".to_owned(),
        };
    }

    let (title, summary) = summarize(&entries);

    let issue_created = create_issue(config, &title, &summary).await;

    // The webhook fires independently of issue creation.
    let webhook_posted = match &config.webhook_url {
        Some(url) => post_webhook(url, config.webhook_platform, &summary).await,
        None => false,
    };

    let status = if issue_created {
        NotifyStatus::IssueCreated
    } else if webhook_posted {
        NotifyStatus::Posted
    } else {
        NotifyStatus::SummaryOnly
    };

    NotifyReport {
        status,
        title,
        summary,
    }
}

/// Issue body for the tracker REST API; labels and assignees are only
/// included when non-empty.
fn issue_request_body(config: &NotifyConfig, title: &str, body: &str) -> Value {
    let mut request = json!({"title": title, "body": body});
    if !config.labels.is_empty() {
        request["labels"] = json!(config.labels);
    }
    if !config.assignees.is_empty() {
        request["assignees"] = json!(config.assignees);
    }
    request
}

async fn create_issue(config: &NotifyConfig, title: &str, body: &str) -> bool {
    let (Some(token), Some(repository)) = (&config.tracker_token, &config.repository) else {
        return false;
    };

    let url = format!("{}/repos/{}/issues", config.tracker_api_url(), repository);
    let request = issue_request_body(config, title, body);

    let result = reqwest::Client::new()
        .post(&url)
        .bearer_auth(token)
        .header("User-Agent", "pinq")
        .header("Accept", "application/vnd.github+json")
        .timeout(NOTIFY_TIMEOUT)
        .json(&request)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            log::info!("created tracker issue for {repository}");
            return true;
        }
        Ok(response) => {
            log::warn!(
                "issue creation failed with HTTP {}",
                response.status().as_u16()
            );
        }
        Err(e) => {
            log::warn!("issue creation request failed: {e}");
        }
    }

    if config.gh_fallback {
        return create_issue_via_gh(title, body).await;
    }
    false
}

/// Fallback path using the local `gh` command-line tool.
async fn create_issue_via_gh(title: &str, body: &str) -> bool {
    let status = tokio::process::Command::new("gh")
        .args(["issue", "create", "--title", title, "--body", body])
        .status()
        .await;
    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            log::warn!("gh issue create exited with {status}");
            false
        }
        Err(e) => {
            log::warn!("could not spawn gh: {e}");
            false
        }
    }
}

async fn post_webhook(url: &str, platform: WebhookPlatform, summary: &str) -> bool {
    let result = reqwest::Client::new()
        .post(url)
        .timeout(NOTIFY_TIMEOUT)
        .json(&platform.payload(summary))
        .send()
        .await;
    match result {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            log::warn!("webhook post failed with HTTP {}", response.status().as_u16());
            false
        }
        Err(e) => {
            log::warn!("webhook post request failed: {e}");
            false
        }
    }
}
