use crate::config::Config;
use crate::error::{Error, Result};
use crate::git::GitCheckout;
use crate::models::{Branch, PullRequestRequest, PullRequestResponse, Repo};
use crate::outcome::{self, PullRequestOutcome};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, warn};

const PR_TITLE: &str = "Apply README Generator";
const PR_BODY: &str =
    "This PR was created by a bot. We have used conan-readme-generator for this PR.";

/// Operations the workflow needs from the hosting service.
pub trait Host {
    async fn list_repositories(&self, org: &str) -> Result<Vec<Repo>>;

    /// Branch names in the order the host returns them.
    async fn list_branches(&self, full_name: &str) -> Result<Vec<String>>;

    /// Clones into a fresh temporary directory, removed when dropped.
    async fn clone_repository(&self, full_name: &str) -> Result<TempDir>;

    /// URL `origin` is pointed at before pushing.
    fn push_url(&self, full_name: &str) -> String;

    /// `Ok` covers both a new PR and one that is already open or redundant.
    async fn create_pull_request(
        &self,
        full_name: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestOutcome>;
}

#[derive(Clone)]
pub struct GithubClient {
    client: Arc<reqwest::Client>,
    token: String,
    api_url: String,
    git_host: String,
}

impl GithubClient {
    pub fn new(
        token: String,
        api_url: impl Into<String>,
        git_host: impl Into<String>,
    ) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Auth("no GitHub token configured".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("readme-template-updater"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        let auth = HeaderValue::from_str(&format!("token {}", token))
            .map_err(|_| Error::Auth("token contains invalid header characters".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client: Arc::new(client),
            token,
            api_url: api_url.into(),
            git_host: git_host.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.token.clone(), &config.api_url, &config.git_host)
    }

    /// Fetches every page of a list endpoint, following `Link: rel="next"`.
    pub async fn get_paged<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(with_per_page(url));

        while let Some(url) = next.take() {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_url);

            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("failed to read response body: {}", e));
                return Err(Error::host(status.as_u16(), body));
            }
            let page: Vec<T> = response.json().await?;
            items.extend(page);
        }

        Ok(items)
    }

    fn clone_url(&self, full_name: &str) -> String {
        format!("https://{}:@{}/{}.git", self.token, self.git_host, full_name)
    }

    fn public_clone_url(&self, full_name: &str) -> String {
        format!("https://{}/{}.git", self.git_host, full_name)
    }
}

impl Host for GithubClient {
    async fn list_repositories(&self, org: &str) -> Result<Vec<Repo>> {
        let url = format!("{}/orgs/{}/repos", self.api_url, org);
        info!("GET REPOS: {}", url);
        self.get_paged::<Repo>(&url).await
    }

    async fn list_branches(&self, full_name: &str) -> Result<Vec<String>> {
        let url = format!("{}/repos/{}/branches", self.api_url, full_name);
        let branches = self.get_paged::<Branch>(&url).await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn clone_repository(&self, full_name: &str) -> Result<TempDir> {
        let dir = tempfile::Builder::new()
            .prefix("readme-template-updater-")
            .tempdir()?;
        GitCheckout::clone_into(
            &self.clone_url(full_name),
            &self.public_clone_url(full_name),
            dir.path(),
        )
        .await?;
        Ok(dir)
    }

    fn push_url(&self, full_name: &str) -> String {
        format!("git@{}:{}.git", self.git_host, full_name)
    }

    async fn create_pull_request(
        &self,
        full_name: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestOutcome> {
        let url = format!("{}/repos/{}/pulls", self.api_url, full_name);
        let request = PullRequestRequest::new(PR_TITLE, PR_BODY, head, base);
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body: PullRequestResponse =
            serde_json::from_str(&text).map_err(|_| Error::host(status, text.clone()))?;

        match outcome::classify_pull_request(status, &body) {
            PullRequestOutcome::Opened { url } => {
                info!("{}", url);
                Ok(PullRequestOutcome::Opened { url })
            }
            PullRequestOutcome::AlreadyCurrent { message } => {
                warn!("{}", message);
                Ok(PullRequestOutcome::AlreadyCurrent { message })
            }
            PullRequestOutcome::Rejected { status, message } => Err(Error::host(status, message)),
        }
    }
}

fn with_per_page(url: &str) -> String {
    if url.contains('?') {
        format!("{}&per_page=100", url)
    } else {
        format!("{}?per_page=100", url)
    }
}

/// Extracts the `rel="next"` target from a `Link` header.
fn next_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == "rel=\"next\"");
        if is_next {
            target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .map(String::from)
        } else {
            None
        }
    })
}
