//! Classification of git and host results into a closed set of outcomes.
//!
//! Exit status and response fields are consulted first. The substring
//! patterns in [`compat`] only cover cases where git or GitHub report a
//! benign result through free-form text.

use crate::models::PullRequestResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    AlreadyCurrent(String),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestOutcome {
    Opened { url: String },
    AlreadyCurrent { message: String },
    Rejected { status: u16, message: String },
}

/// Pattern matching against raw tool output.
mod compat {
    pub const NOTHING_TO_COMMIT: &str = "nothing to commit";
    pub const BRANCH_UP_TO_DATE: &str = "Your branch is up to date";
    pub const PUSH_UP_TO_DATE: &str = "Everything up-to-date";
    pub const PR_ALREADY_EXISTS: &str = "already exists";
    pub const PR_NO_COMMITS: &str = "No commits between";

    pub fn commit_already_current(output: &str) -> bool {
        output.contains(NOTHING_TO_COMMIT) || output.contains(BRANCH_UP_TO_DATE)
    }

    pub fn push_already_current(output: &str) -> bool {
        output.contains(PUSH_UP_TO_DATE)
    }

    pub fn pull_request_already_current(message: &str) -> bool {
        message.contains(PR_ALREADY_EXISTS) || message.contains(PR_NO_COMMITS)
    }
}

/// Classifies a `git commit` run. `subject` is the commit message the
/// command was given; a successful commit echoes it back.
pub fn classify_commit(success: bool, output: &str, subject: &str) -> Outcome {
    if success {
        if output.contains(subject) {
            Outcome::Success
        } else {
            Outcome::Failure(format!("Could not commit changes: {}", output.trim()))
        }
    } else if compat::commit_already_current(output) {
        Outcome::AlreadyCurrent(output.trim().to_string())
    } else {
        Outcome::Failure(format!("Could not commit changes: {}", output.trim()))
    }
}

/// Classifies a `git push` run. Git reports "Everything up-to-date" on a
/// zero exit, so the text is checked either way.
pub fn classify_push(success: bool, output: &str) -> Outcome {
    if compat::push_already_current(output) {
        Outcome::AlreadyCurrent(output.trim().to_string())
    } else if success {
        Outcome::Success
    } else {
        Outcome::Failure(format!("Could not push changes: {}", output.trim()))
    }
}

pub fn classify_pull_request(status: u16, response: &PullRequestResponse) -> PullRequestOutcome {
    if let Some(url) = &response.html_url {
        if (200..300).contains(&status) {
            return PullRequestOutcome::Opened { url: url.clone() };
        }
    }

    if let Some(message) = response.errors.first().and_then(|e| e.message.clone()) {
        return if compat::pull_request_already_current(&message) {
            PullRequestOutcome::AlreadyCurrent { message }
        } else {
            PullRequestOutcome::Rejected { status, message }
        };
    }

    let message = response
        .message
        .clone()
        .unwrap_or_else(|| format!("unexpected response status {}", status));
    if compat::pull_request_already_current(&message) {
        PullRequestOutcome::AlreadyCurrent { message }
    } else {
        PullRequestOutcome::Rejected { status, message }
    }
}
