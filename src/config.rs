use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

const README_TEMPLATE: &str = "readme/README-library.md.tmpl";
const LICENSE_TEMPLATE: &str = "license/LICENSE-mit.md.tmpl";

#[derive(clap::Parser, Debug, Clone)]
#[command(
    name = "readme-template-updater",
    about = "Open pull requests applying README/LICENSE templates across an organization"
)]
pub struct Args {
    #[arg(long, env = "GITHUB_OAUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "GITHUB_ORG", default_value = "conan-community")]
    pub org: String,

    #[arg(long, env = "REPO_PREFIX", default_value = "conan-")]
    pub repo_prefix: String,

    #[arg(long, env = "LOGGING_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, default_value = "templates")]
    pub templates_dir: PathBuf,

    #[arg(long, default_value = "conan-readme-generator")]
    pub generator: String,

    #[arg(long, default_value = "conan/stable")]
    pub channel: String,

    #[arg(long, default_value = "https://api.github.com")]
    pub api_url: String,

    #[arg(long, default_value = "github.com")]
    pub git_host: String,

    #[arg(long, help = "Keep cloned repositories on disk after processing")]
    pub keep_clones: bool,

    #[arg(long, help = "Commit locally but skip push and pull request creation")]
    pub dry_run: bool,
}

/// Validated run configuration. Built once at startup and passed down;
/// nothing below `main` reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub org: String,
    pub repo_prefix: String,
    pub readme_template: PathBuf,
    pub license_template: PathBuf,
    pub generator: String,
    pub channel: String,
    pub api_url: String,
    pub git_host: String,
    pub keep_clones: bool,
    pub dry_run: bool,
}

impl Config {
    /// Validates parsed arguments and resolves template paths against `cwd`.
    pub fn from_args(args: Args, cwd: &Path) -> Result<Self> {
        let token = args
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::config("'GITHUB_OAUTH_TOKEN' must be configured in your environment")
            })?;

        if args.org.trim().is_empty() {
            return Err(Error::config("organization name must not be empty"));
        }

        let templates_dir = if args.templates_dir.is_absolute() {
            args.templates_dir
        } else {
            cwd.join(args.templates_dir)
        };

        Ok(Config {
            token,
            org: args.org,
            repo_prefix: args.repo_prefix,
            readme_template: templates_dir.join(README_TEMPLATE),
            license_template: templates_dir.join(LICENSE_TEMPLATE),
            generator: args.generator,
            channel: args.channel,
            api_url: args.api_url.trim_end_matches('/').to_string(),
            git_host: args.git_host,
            keep_clones: args.keep_clones,
            dry_run: args.dry_run,
        })
    }
}
