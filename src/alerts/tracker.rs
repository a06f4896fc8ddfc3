use crate::error::IssueError;
use log::info;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Everything the tracker needs to file or update an alert issue
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRequest {
    pub title: String,
    pub description: String,
    pub labels: Vec<String>,
    /// Issue from the most recent earlier alert on the same test and metric
    pub existing_issue_number: Option<u64>,
}

/// Reference to the issue (or comment) an alert was reported on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub number: u64,
    pub url: String,
}

/// Trait for issue tracker implementations
#[cfg_attr(test, mockall::automock)]
pub trait IssueTracker: Send + Sync {
    /// Report a change point, either on a new issue or on `existing_issue_number`
    fn report(&self, request: &IssueRequest) -> Result<IssueRef, IssueError>;
}

/// GitHub Issues tracker
///
/// Comments on the existing issue when it is still open, otherwise opens a new
/// issue with the request's title and labels.
pub struct GitHubIssueTracker {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct CreateIssueBody<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [String],
}

#[derive(Debug, Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
    html_url: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    html_url: String,
}

impl GitHubIssueTracker {
    /// Create a new GitHub tracker
    ///
    /// # Arguments
    ///
    /// * `api_url` - GitHub REST API root (e.g., "https://api.github.com")
    /// * `owner` - Repository owner
    /// * `repo` - Repository name
    /// * `token` - Token with permission to write issues
    pub fn new(
        api_url: String,
        owner: String,
        repo: String,
        token: String,
    ) -> Result<Self, IssueError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("perfalert/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url,
            owner,
            repo,
            token,
        })
    }

    /// Create a tracker reading its token from the environment variable `token_env`
    pub fn from_env(
        api_url: String,
        owner: String,
        repo: String,
        token_env: &str,
    ) -> Result<Self, IssueError> {
        let token =
            std::env::var(token_env).map_err(|_| IssueError::MissingToken(token_env.to_string()))?;
        Self::new(api_url, owner, repo, token)
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    fn issue_url(&self, number: u64) -> String {
        format!("{}/{}", self.issues_url(), number)
    }

    fn comments_url(&self, number: u64) -> String {
        format!("{}/comments", self.issue_url(number))
    }

    fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T, IssueError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(IssueError::RequestFailed(format!(
                "GitHub API returned error {}: {}",
                status, error_text
            )));
        }

        response.json().map_err(|e| {
            IssueError::InvalidResponse(format!("Failed to parse GitHub response: {}", e))
        })
    }

    fn is_open(&self, number: u64) -> Result<bool, IssueError> {
        let issue: IssueResponse = self.send(self.client.get(self.issue_url(number)))?;
        Ok(issue.state.as_deref() == Some("open"))
    }

    fn comment(&self, number: u64, body: &str) -> Result<IssueRef, IssueError> {
        let comment: CommentResponse = self.send(
            self.client
                .post(self.comments_url(number))
                .json(&CommentBody { body }),
        )?;

        Ok(IssueRef {
            number,
            url: comment.html_url,
        })
    }

    fn create(&self, request: &IssueRequest) -> Result<IssueRef, IssueError> {
        let issue: IssueResponse = self.send(self.client.post(self.issues_url()).json(
            &CreateIssueBody {
                title: &request.title,
                body: &request.description,
                labels: &request.labels,
            },
        ))?;

        Ok(IssueRef {
            number: issue.number,
            url: issue.html_url,
        })
    }
}

impl IssueTracker for GitHubIssueTracker {
    fn report(&self, request: &IssueRequest) -> Result<IssueRef, IssueError> {
        if let Some(number) = request.existing_issue_number {
            if self.is_open(number)? {
                let issue = self.comment(number, &request.description)?;
                info!("Commented on open issue #{}: {}", issue.number, issue.url);
                return Ok(issue);
            }
            info!("Issue #{} is closed, opening a new issue", number);
        }

        let issue = self.create(request)?;
        info!("Created issue #{}: {}", issue.number, issue.url);
        Ok(issue)
    }
}

/// Tracker that only logs the issue it would have filed
///
/// Used for dry runs. Numbers are handed out sequentially; a request naming an
/// existing issue is "commented" on that issue.
#[derive(Debug)]
pub struct LogIssueTracker {
    next_number: AtomicU64,
}

impl Default for LogIssueTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LogIssueTracker {
    pub fn new() -> Self {
        Self {
            next_number: AtomicU64::new(1),
        }
    }
}

impl IssueTracker for LogIssueTracker {
    fn report(&self, request: &IssueRequest) -> Result<IssueRef, IssueError> {
        let number = match request.existing_issue_number {
            Some(number) => number,
            None => self.next_number.fetch_add(1, Ordering::SeqCst),
        };

        info!(
            "DRY RUN ISSUE #{} - Title: {}, Labels: {:?}\n{}",
            number, request.title, request.labels, request.description
        );

        Ok(IssueRef {
            number,
            url: format!("log://issues/{}", number),
        })
    }
}
