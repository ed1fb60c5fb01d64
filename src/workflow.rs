use crate::branches::{self, BranchRole};
use crate::error::{Error, Result};
use crate::git::GitCheckout;
use crate::github_client::Host;
use crate::models::Repo;
use crate::outcome::{Outcome, PullRequestOutcome};
use crate::templates::{TemplateApplicator, GENERATED_FILES};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

pub const COMMIT_MESSAGE: &str = "Apply Conan Readme Generator [skip ci]";
const REMOTE: &str = "origin";

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub org: String,
    pub repo_prefix: String,
    pub keep_clones: bool,
    pub dry_run: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub repositories: usize,
    pub skipped: usize,
    pub pull_requests: usize,
    pub already_current: usize,
}

/// What happened to one stable/testing pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairResult {
    Opened(String),
    AlreadyCurrent,
    DryRun,
}

pub struct Workflow<H> {
    host: H,
    applicator: TemplateApplicator,
    settings: WorkflowSettings,
}

impl<H: Host> Workflow<H> {
    pub fn new(host: H, applicator: TemplateApplicator, settings: WorkflowSettings) -> Self {
        Self {
            host,
            applicator,
            settings,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let repos = self.host.list_repositories(&self.settings.org).await?;

        for repo in repos {
            if !repo.name.starts_with(&self.settings.repo_prefix) {
                debug!("Skipping {}", repo.full_name);
                summary.skipped += 1;
                continue;
            }
            let results = self.process_repository(&repo).await?;
            summary.repositories += 1;
            for result in results.values() {
                match result {
                    PairResult::Opened(url) => {
                        debug!("{}: opened {}", repo.full_name, url);
                        summary.pull_requests += 1;
                    }
                    PairResult::AlreadyCurrent => summary.already_current += 1,
                    PairResult::DryRun => {}
                }
            }
        }

        info!(
            "Processed {} repositories ({} skipped): {} pull requests opened, {} already current",
            summary.repositories, summary.skipped, summary.pull_requests, summary.already_current
        );
        Ok(summary)
    }

    /// Clones the repository and processes every branch pair. The clone is
    /// removed on return, error paths included, unless clones are kept.
    pub async fn process_repository(&self, repo: &Repo) -> Result<BTreeMap<String, PairResult>> {
        info!("Cloning {} ...", repo.full_name);
        let dir = self.host.clone_repository(&repo.full_name).await?;
        let checkout = GitCheckout::new(dir.path());

        let result = self.process_checkout(&repo.full_name, &checkout).await;

        if self.settings.keep_clones {
            let path = dir.keep();
            info!("Kept clone of {} at {}", repo.full_name, path.display());
        }
        result
    }

    async fn process_checkout(
        &self,
        full_name: &str,
        checkout: &GitCheckout,
    ) -> Result<BTreeMap<String, PairResult>> {
        let branches = self.host.list_branches(full_name).await?;
        let pairs = branches::pair_branches(&branches);
        for branch in &branches {
            if branches::classify(branch) == BranchRole::Testing
                && !pairs.values().any(|t| t == branch)
            {
                debug!("{}: no stable branch matches {}", full_name, branch);
            }
        }
        if pairs.is_empty() {
            info!("{}: no testing/stable branch pairs", full_name);
            return Ok(BTreeMap::new());
        }

        checkout
            .set_remote_url(REMOTE, &self.host.push_url(full_name))
            .await?;

        // Testing branches committed by this run. A testing branch paired with
        // both release/<v> and stable/<v> is only committed once, but each
        // stable branch still gets its own pull request.
        let mut committed = HashSet::new();
        let mut results = BTreeMap::new();
        for (stable, testing) in &pairs {
            let result = self
                .process_pair(full_name, checkout, stable, testing, &mut committed)
                .await?;
            results.insert(stable.clone(), result);
        }
        Ok(results)
    }

    /// Checkout, apply templates, commit, push, open the pull request.
    ///
    /// `committed` holds the testing branches this run already committed and
    /// pushed; finding nothing to commit on one of those still opens the
    /// pull request into `stable`.
    pub async fn process_pair(
        &self,
        full_name: &str,
        checkout: &GitCheckout,
        stable: &str,
        testing: &str,
        committed: &mut HashSet<String>,
    ) -> Result<PairResult> {
        info!("Checkout to branch {}", testing);
        checkout.checkout(testing).await?;

        // A failed generator is already logged and leaves the tree unchanged,
        // so the commit below reports nothing to do.
        if let Outcome::Failure(_) = self.applicator.apply(checkout).await? {
            debug!("{}: continuing {} after generator failure", full_name, testing);
        }

        let fresh_commit = match checkout.commit_all(COMMIT_MESSAGE, GENERATED_FILES).await? {
            Outcome::Success => {
                committed.insert(testing.to_string());
                true
            }
            Outcome::AlreadyCurrent(_) if committed.contains(testing) => {
                debug!("{}: {} was committed earlier in this run", full_name, testing);
                false
            }
            Outcome::AlreadyCurrent(_) => {
                warn!("{}: {} is already up to date", full_name, testing);
                return Ok(PairResult::AlreadyCurrent);
            }
            Outcome::Failure(output) => return Err(Error::git("commit", output)),
        };

        if self.settings.dry_run {
            info!("Dry run: not pushing {} or opening a PR into {}", testing, stable);
            return Ok(PairResult::DryRun);
        }

        if fresh_commit {
            match checkout.push(REMOTE, testing).await? {
                Outcome::Success => {}
                Outcome::AlreadyCurrent(output) => warn!("{}", output.trim()),
                Outcome::Failure(output) => return Err(Error::git("push", output)),
            }
        }

        match self
            .host
            .create_pull_request(full_name, testing, stable)
            .await?
        {
            PullRequestOutcome::Opened { url } => Ok(PairResult::Opened(url)),
            PullRequestOutcome::AlreadyCurrent { .. } => Ok(PairResult::AlreadyCurrent),
            PullRequestOutcome::Rejected { status, message } => Err(Error::host(status, message)),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::git::testing::{clone_remote, make_remote, run_git};
    use crate::templates::testing::fake_generator;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory host backed by a local bare repository.
    struct FakeHost {
        remote: PathBuf,
        repos: Vec<Repo>,
        branches: Vec<String>,
        pull_requests: Mutex<Vec<(String, String, String)>>,
        clones: Mutex<Vec<PathBuf>>,
    }

    impl FakeHost {
        fn new(remote: &TempDir, branches: &[&str]) -> Self {
            Self {
                remote: remote.path().to_path_buf(),
                repos: vec![
                    Repo {
                        name: "conan-zlib".to_string(),
                        full_name: "acme/conan-zlib".to_string(),
                    },
                    Repo {
                        name: "website".to_string(),
                        full_name: "acme/website".to_string(),
                    },
                ],
                branches: branches.iter().map(|b| b.to_string()).collect(),
                pull_requests: Mutex::new(Vec::new()),
                clones: Mutex::new(Vec::new()),
            }
        }

        fn opened(&self) -> Vec<(String, String, String)> {
            self.pull_requests.lock().unwrap().clone()
        }
    }

    impl Host for FakeHost {
        async fn list_repositories(&self, _org: &str) -> Result<Vec<Repo>> {
            Ok(self.repos.clone())
        }

        async fn list_branches(&self, _full_name: &str) -> Result<Vec<String>> {
            Ok(self.branches.clone())
        }

        async fn clone_repository(&self, _full_name: &str) -> Result<TempDir> {
            let dir = tempfile::tempdir()?;
            clone_remote(&self.remote, dir.path());
            self.clones.lock().unwrap().push(dir.path().to_path_buf());
            Ok(dir)
        }

        fn push_url(&self, _full_name: &str) -> String {
            self.remote.to_str().unwrap().to_string()
        }

        async fn create_pull_request(
            &self,
            full_name: &str,
            head: &str,
            base: &str,
        ) -> Result<PullRequestOutcome> {
            let mut prs = self.pull_requests.lock().unwrap();
            let key = (full_name.to_string(), head.to_string(), base.to_string());
            if prs.contains(&key) {
                return Ok(PullRequestOutcome::AlreadyCurrent {
                    message: format!("A pull request already exists for {}", head),
                });
            }
            prs.push(key);
            Ok(PullRequestOutcome::Opened {
                url: format!("https://github.com/{}/pull/{}", full_name, prs.len()),
            })
        }
    }

    fn settings(keep_clones: bool, dry_run: bool) -> WorkflowSettings {
        WorkflowSettings {
            org: "acme".to_string(),
            repo_prefix: "conan-".to_string(),
            keep_clones,
            dry_run,
        }
    }

    fn applicator(bin: &TempDir, script: &str) -> TemplateApplicator {
        let program = fake_generator(bin.path(), script);
        TemplateApplicator::new(program.to_str().unwrap(), "conan/stable", "r.tmpl", "l.tmpl")
    }

    const GENERATE: &str = "echo '# generated readme' > README.md\necho MIT > LICENSE.md";

    #[tokio::test]
    async fn opens_pull_request_then_is_idempotent() {
        let remote = make_remote();
        let bin = tempfile::tempdir().unwrap();
        let host = FakeHost::new(&remote, &["master", "release/1.0", "testing/1.0"]);
        let workflow = Workflow::new(host, applicator(&bin, GENERATE), settings(false, false));

        let first = workflow.run().await.unwrap();
        assert_eq!(
            first,
            RunSummary {
                repositories: 1,
                skipped: 1,
                pull_requests: 1,
                already_current: 0,
            }
        );
        assert_eq!(
            workflow.host.opened(),
            vec![(
                "acme/conan-zlib".to_string(),
                "testing/1.0".to_string(),
                "release/1.0".to_string()
            )]
        );

        let pushed = run_git(remote.path(), &["show", "testing/1.0:README.md"]);
        assert_eq!(pushed, "# generated readme\n");
        let tree = run_git(remote.path(), &["ls-tree", "--name-only", "testing/1.0"]);
        assert!(tree.lines().any(|f| f == "LICENSE"));
        assert!(!tree.lines().any(|f| f == "LICENSE.md"));
        let body = run_git(remote.path(), &["log", "-1", "--format=%B", "testing/1.0"]);
        assert!(body.starts_with(COMMIT_MESSAGE));

        let second = workflow.run().await.unwrap();
        assert_eq!(second.pull_requests, 0);
        assert_eq!(second.already_current, 1);
        assert_eq!(workflow.host.opened().len(), 1);
    }

    #[tokio::test]
    async fn release_and_stable_each_get_a_pull_request() {
        let remote = make_remote();
        let bin = tempfile::tempdir().unwrap();
        let host = FakeHost::new(&remote, &["release/1.0", "stable/1.0", "testing/1.0"]);
        let workflow = Workflow::new(host, applicator(&bin, GENERATE), settings(false, false));

        let first = workflow.run().await.unwrap();
        assert_eq!(first.pull_requests, 2);
        assert_eq!(first.already_current, 0);
        let heads_and_bases: Vec<(String, String)> = workflow
            .host
            .opened()
            .into_iter()
            .map(|(_, head, base)| (head, base))
            .collect();
        assert_eq!(
            heads_and_bases,
            vec![
                ("testing/1.0".to_string(), "release/1.0".to_string()),
                ("testing/1.0".to_string(), "stable/1.0".to_string()),
            ]
        );
        let log = run_git(remote.path(), &["log", "--format=%s", "testing/1.0"]);
        assert_eq!(log.lines().filter(|s| *s == COMMIT_MESSAGE).count(), 1);

        let second = workflow.run().await.unwrap();
        assert_eq!(second.pull_requests, 0);
        assert_eq!(second.already_current, 2);
        assert_eq!(workflow.host.opened().len(), 2);
    }

    #[tokio::test]
    async fn dry_run_reports_every_pair_of_a_shared_testing_branch() {
        let remote = make_remote();
        let bin = tempfile::tempdir().unwrap();
        let host = FakeHost::new(&remote, &["release/1.0", "stable/1.0", "testing/1.0"]);
        let workflow = Workflow::new(host, applicator(&bin, GENERATE), settings(false, true));

        let results = workflow.process_repository(&workflow.host.repos[0]).await.unwrap();
        assert_eq!(results.get("release/1.0"), Some(&PairResult::DryRun));
        assert_eq!(results.get("stable/1.0"), Some(&PairResult::DryRun));
        assert!(workflow.host.opened().is_empty());
    }

    #[tokio::test]
    async fn clones_are_removed_unless_kept() {
        let remote = make_remote();
        let bin = tempfile::tempdir().unwrap();

        let host = FakeHost::new(&remote, &["release/1.0", "testing/1.0"]);
        let workflow = Workflow::new(host, applicator(&bin, GENERATE), settings(false, true));
        workflow.run().await.unwrap();
        let clones = workflow.host.clones.lock().unwrap().clone();
        assert_eq!(clones.len(), 1);
        assert!(!clones[0].exists());

        let host = FakeHost::new(&remote, &["release/1.0", "testing/1.0"]);
        let workflow = Workflow::new(host, applicator(&bin, GENERATE), settings(true, true));
        workflow.run().await.unwrap();
        let clones = workflow.host.clones.lock().unwrap().clone();
        assert!(clones[0].exists());
        std::fs::remove_dir_all(&clones[0]).unwrap();
    }

    #[tokio::test]
    async fn dry_run_commits_without_pushing() {
        let remote = make_remote();
        let bin = tempfile::tempdir().unwrap();
        let host = FakeHost::new(&remote, &["release/1.0", "testing/1.0"]);
        let workflow = Workflow::new(host, applicator(&bin, GENERATE), settings(false, true));

        let results = workflow.process_repository(&workflow.host.repos[0]).await.unwrap();
        assert_eq!(results.get("release/1.0"), Some(&PairResult::DryRun));
        assert!(workflow.host.opened().is_empty());
        let remote_readme = run_git(remote.path(), &["show", "testing/1.0:README.md"]);
        assert_eq!(remote_readme, "# old readme\n");
    }

    #[tokio::test]
    async fn generator_failure_means_nothing_to_commit() {
        let remote = make_remote();
        let bin = tempfile::tempdir().unwrap();
        let host = FakeHost::new(&remote, &["release/1.0", "testing/1.0"]);
        let workflow = Workflow::new(host, applicator(&bin, "exit 1"), settings(false, false));

        let summary = workflow.run().await.unwrap();
        assert_eq!(summary.pull_requests, 0);
        assert_eq!(summary.already_current, 1);
        assert!(workflow.host.opened().is_empty());
    }

    #[tokio::test]
    async fn missing_testing_branch_aborts_the_run() {
        let remote = make_remote();
        let bin = tempfile::tempdir().unwrap();
        let host = FakeHost::new(&remote, &["release/2.0", "testing/2.0"]);
        let workflow = Workflow::new(host, applicator(&bin, GENERATE), settings(false, false));

        let err = workflow.run().await.unwrap_err();
        assert!(matches!(err, Error::Git { ref operation, .. } if operation == "checkout"));
        assert!(workflow.host.opened().is_empty());
    }

    #[tokio::test]
    async fn unpaired_repository_is_left_alone() {
        let remote = make_remote();
        let bin = tempfile::tempdir().unwrap();
        let host = FakeHost::new(&remote, &["master", "release/1.0"]);
        let workflow = Workflow::new(host, applicator(&bin, GENERATE), settings(false, false));

        let results = workflow.process_repository(&workflow.host.repos[0]).await.unwrap();
        assert!(results.is_empty());
        assert!(workflow.host.opened().is_empty());
    }
}
