use crate::error::{Error, Result};
use crate::git::GitCheckout;
use crate::outcome::Outcome;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info};

/// Files the generator is expected to write, after LICENSE normalization.
pub const GENERATED_FILES: &[&str] = &["README.md", "LICENSE"];

/// Runs the external README/LICENSE generator inside a checkout.
#[derive(Debug, Clone)]
pub struct TemplateApplicator {
    program: String,
    channel: String,
    readme_template: PathBuf,
    license_template: PathBuf,
}

impl TemplateApplicator {
    pub fn new(
        program: impl Into<String>,
        channel: impl Into<String>,
        readme_template: impl Into<PathBuf>,
        license_template: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            channel: channel.into(),
            readme_template: readme_template.into(),
            license_template: license_template.into(),
        }
    }

    /// A non-zero exit is logged and returned as `Outcome::Failure`; the
    /// following commit then finds nothing to do. A generator that cannot
    /// be started at all is fatal.
    pub async fn apply(&self, checkout: &GitCheckout) -> Result<Outcome> {
        let output = Command::new(&self.program)
            .arg(&self.channel)
            .arg(&self.readme_template)
            .arg(&self.license_template)
            .current_dir(checkout.path())
            .output()
            .await
            .map_err(|e| Error::Tool(format!("could not run {}: {}", self.program, e)))?;

        let outcome = if output.status.success() {
            Outcome::Success
        } else {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            error!("{} exited with {}: {}", self.program, output.status, text.trim());
            Outcome::Failure(text)
        };

        normalize_license(checkout.path())?;
        Ok(outcome)
    }
}

/// Moves a generated `LICENSE.md` to `LICENSE` unless `LICENSE` already exists.
/// Returns whether a rename happened.
pub fn normalize_license(dir: &Path) -> Result<bool> {
    let license = dir.join("LICENSE");
    let license_md = dir.join("LICENSE.md");
    if license.exists() || !license_md.is_file() {
        return Ok(false);
    }
    std::fs::rename(&license_md, &license)?;
    info!("Renamed LICENSE.md to LICENSE");
    Ok(true)
}
