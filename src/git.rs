//! Git subprocess operations against an explicit checkout directory.

use crate::error::{Error, Result};
use crate::outcome::{self, Outcome};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Handle on a local working tree. Every command runs with this directory
/// as its working directory; the process-wide cwd is never touched.
#[derive(Debug, Clone)]
pub struct GitCheckout {
    path: PathBuf,
}

impl GitCheckout {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clones `url` into the existing, empty directory `dir`. `display_url`
    /// is what appears in logs and errors in place of `url`.
    pub async fn clone_into(url: &str, display_url: &str, dir: &Path) -> Result<Self> {
        debug!("git clone {} {}", display_url, dir.display());
        let output = Command::new("git")
            .arg("clone")
            .arg(url)
            .arg(dir)
            .output()
            .await?;
        if !output.status.success() {
            let text = combined(&output).replace(url, display_url);
            return Err(Error::git("clone", text));
        }
        Ok(Self::new(dir))
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("git {} (in {})", args.join(" "), self.path.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .await?;
        Ok(output)
    }

    async fn run_checked(&self, operation: &str, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(Error::git(operation, combined(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn set_remote_url(&self, remote: &str, url: &str) -> Result<()> {
        self.run_checked("remote set-url", &["remote", "set-url", remote, url])
            .await?;
        Ok(())
    }

    /// Fails when the branch exists neither locally nor on a remote.
    pub async fn checkout(&self, branch: &str) -> Result<()> {
        self.run_checked("checkout", &["checkout", branch]).await?;
        Ok(())
    }

    /// Whether the index differs from HEAD, by `git diff --cached` exit code.
    pub async fn has_staged_changes(&self) -> Result<bool> {
        let output = self.run(&["diff", "--cached", "--quiet"]).await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Error::git("diff", combined(&output))),
        }
    }

    /// Stages modified tracked files plus `paths` (when present) and records
    /// a signed-off commit. Nothing staged is `AlreadyCurrent`.
    pub async fn commit_all(&self, message: &str, paths: &[&str]) -> Result<Outcome> {
        self.run_checked("add", &["add", "--update"]).await?;
        for path in paths {
            if self.path.join(path).exists() {
                self.run_checked("add", &["add", "--", path]).await?;
            }
        }
        if !self.has_staged_changes().await? {
            return Ok(Outcome::AlreadyCurrent(
                "nothing to commit, working tree clean".to_string(),
            ));
        }
        let output = self.run(&["commit", "-a", "-s", "-m", message]).await?;
        Ok(outcome::classify_commit(
            output.status.success(),
            &combined(&output),
            message,
        ))
    }

    pub async fn push(&self, remote: &str, branch: &str) -> Result<Outcome> {
        let output = self.run(&["push", remote, branch]).await?;
        Ok(outcome::classify_push(
            output.status.success(),
            &combined(&output),
        ))
    }
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}
