use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Branch {
    pub name: String,
}

/// Body of `POST /repos/{full_name}/pulls`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PullRequestRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

impl PullRequestRequest {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        head: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            head: head.into(),
            base: base.into(),
        }
    }
}

/// Either shape GitHub answers a pull request creation with.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PullRequestResponse {
    pub html_url: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiError {
    pub message: Option<String>,
}
