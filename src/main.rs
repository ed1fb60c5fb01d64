use anyhow::{Context, Result};
use clap::Parser;

mod branches;
mod config;
mod error;
mod git;
mod github_client;
mod logging;
mod models;
mod outcome;
mod templates;
mod workflow;

use config::{Args, Config};
use github_client::GithubClient;
use templates::TemplateApplicator;
use workflow::{Workflow, WorkflowSettings};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    logging::init(&args.log_level);

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let config = Config::from_args(args, &cwd)?;

    for template in [&config.readme_template, &config.license_template] {
        if !template.is_file() {
            tracing::warn!("Template not found: {}", template.display());
        }
    }

    let client = GithubClient::from_config(&config)?;
    let applicator = TemplateApplicator::new(
        config.generator.clone(),
        config.channel.clone(),
        config.readme_template.clone(),
        config.license_template.clone(),
    );
    let workflow = Workflow::new(
        client,
        applicator,
        WorkflowSettings {
            org: config.org.clone(),
            repo_prefix: config.repo_prefix.clone(),
            keep_clones: config.keep_clones,
            dry_run: config.dry_run,
        },
    );

    workflow
        .run()
        .await
        .with_context(|| format!("Failed to update repositories of {}", config.org))?;
    Ok(())
}
