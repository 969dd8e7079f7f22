//! # Command Line
//!
//! The operator-facing "run self test" action for hosts without a UI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::AlterHtmlOptions;
use crate::error::SelfTestError;
use crate::paths::InstallationPaths;
use crate::report::{TestReport, render};
use crate::storage::load_alter_html_options;

/// Command line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "redirect-selftest",
    version,
    about = "Check that webp-capable clients are redirected to freshly converted webps"
)]
pub struct CliConfig {
    /// Plugin configuration file (JSON).
    #[arg(long)]
    pub config: PathBuf,

    /// Saved alter-html options (JSON). Derived from the configuration when omitted.
    #[arg(long)]
    pub alter_html_options: Option<PathBuf>,

    /// Content directory holding uploads and the webp cache.
    #[arg(long)]
    pub content_dir: PathBuf,

    /// Public URL of the content directory.
    #[arg(long)]
    pub content_url: String,

    /// Upload directory. Defaults to `<content-dir>/uploads`.
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Public URL of the upload directory. Defaults to `<content-url>/uploads`.
    #[arg(long)]
    pub upload_url: Option<String>,

    /// Web server document root, for the doc-root cache structure.
    #[arg(long)]
    pub doc_root: Option<PathBuf>,

    /// Directory containing `test.jpg` and `test.png`.
    #[arg(long)]
    pub fixtures_dir: PathBuf,

    /// Request timeout in seconds; 0 disables it.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl CliConfig {
    pub fn installation_paths(&self) -> InstallationPaths {
        let upload_dir = self
            .upload_dir
            .clone()
            .unwrap_or_else(|| self.content_dir.join("uploads"));
        let upload_url = self
            .upload_url
            .clone()
            .unwrap_or_else(|| format!("{}/uploads", self.content_url.trim_end_matches('/')));

        let paths = InstallationPaths::new(&self.content_dir, &self.content_url, upload_dir, upload_url);
        match &self.doc_root {
            Some(doc_root) => paths.with_doc_root(doc_root),
            None => paths,
        }
    }

    /// Saved alter-html options, if given and readable.
    ///
    /// A broken file is logged and skipped so the run still happens with
    /// options derived from the configuration.
    pub fn alter_html_options(&self) -> Option<AlterHtmlOptions> {
        let path = self.alter_html_options.as_ref()?;
        match load_alter_html_options(path) {
            Ok(options) => options,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring alter-html options");
                None
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Render the report for stdout.
pub fn render_report(report: &TestReport, format: OutputFormat) -> Result<String, SelfTestError> {
    match format {
        OutputFormat::Text => Ok(render::markdown(&report.narrative)),
        OutputFormat::Json => serde_json::to_string_pretty(report).map_err(SelfTestError::Render),
    }
}
