use std::sync::Arc;

use tracing::Instrument;

use crate::artifacts::ArtifactManager;
use crate::config::{AlterHtmlOptions, ImageFormat, ProbeConfig};
use crate::error::SelfTestError;
use crate::http::HttpProbe;
use crate::paths::UploadLocationProvider;
use crate::report::{Narrative, TestReport};
use crate::rewrite::{RewriteDiagnosis, RewriteResolver};
use crate::storage::ConfigProvider;

use super::classifier::SuccessLevel;
use super::lock::RunRegistry;
use super::probe::FormatProbe;

const TITLE: &str = "Testing redirection to converter";

/// Everything a run talks to.
pub struct Collaborators {
    pub config: Box<dyn ConfigProvider>,
    pub paths: Arc<dyn UploadLocationProvider>,
    pub artifacts: ArtifactManager,
    pub resolver: Box<dyn RewriteResolver>,
    pub diagnosis: Box<dyn RewriteDiagnosis>,
    pub client: Box<dyn HttpProbe>,
}

/// The "run self test" action for the redirect-to-converter feature.
pub struct SelfTest {
    parts: Collaborators,
    alter_html: Option<AlterHtmlOptions>,
    runs: Arc<RunRegistry>,
}

/// Intermediate result before final cleanup.
struct Checked {
    success: bool,
    narrative: Narrative,
    artifacts_created: bool,
}

impl Checked {
    fn early(success: bool, narrative: Narrative) -> Self {
        Self {
            success,
            narrative,
            artifacts_created: false,
        }
    }
}

impl SelfTest {
    pub fn new(parts: Collaborators) -> Self {
        Self {
            parts,
            alter_html: None,
            runs: RunRegistry::shared(),
        }
    }

    /// Use saved alter-html options instead of deriving them from the config.
    pub fn with_alter_html_options(mut self, options: AlterHtmlOptions) -> Self {
        self.alter_html = Some(options);
        self
    }

    /// Claim run slots from `runs` instead of the process-wide registry.
    pub fn with_run_registry(mut self, runs: Arc<RunRegistry>) -> Self {
        self.runs = runs;
        self
    }

    /// Run the whole test. Never fails: every problem ends up in the report.
    pub async fn run(&self) -> TestReport {
        let upload_dir = self.parts.paths.upload_dir();
        let _guard = match self.runs.try_acquire(upload_dir) {
            Ok(guard) => guard,
            Err(err) => {
                tracing::warn!(error = %err, "self test refused");
                let mut narrative = Narrative::new();
                narrative.title(TITLE);
                narrative.error(err.to_string());
                return TestReport {
                    overall_success: false,
                    narrative,
                };
            }
        };

        tracing::info!(upload_dir = %upload_dir.display(), "self test started");
        let loaded = self.parts.config.load_config();
        let cleanup_config = loaded
            .as_ref()
            .ok()
            .and_then(Option::as_ref)
            .cloned()
            .unwrap_or_default();

        // A crashed earlier run may have left artifacts behind.
        self.parts.artifacts.cleanup(&cleanup_config);

        let Checked {
            success,
            mut narrative,
            artifacts_created,
        } = self.check(loaded).await;

        if artifacts_created {
            narrative.plain("Deleting test images");
            let summary = self.parts.artifacts.cleanup(&cleanup_config);
            for failure in summary.failures {
                narrative.warn(failure);
            }
        }

        tracing::info!(success, "self test finished");
        TestReport {
            overall_success: success,
            narrative,
        }
    }

    async fn check(&self, loaded: Result<Option<ProbeConfig>, SelfTestError>) -> Checked {
        let mut narrative = Narrative::new();
        narrative.title(TITLE);

        let config = match loaded {
            Ok(Some(config)) => config,
            Ok(None) => {
                narrative.plain(
                    "Hold on. You need to save options before you can run this test. \
                     There is no config file yet.",
                );
                return Checked::early(true, narrative);
            }
            Err(err) => {
                tracing::error!(error = %err, "could not load configuration");
                narrative.error(format!("Could not load the configuration: {err}"));
                narrative.plain("The test cannot be completed");
                return Checked::early(false, narrative);
            }
        };

        if !config.redirection_enabled {
            narrative.plain("Turned off, nothing to test");
            return Checked::early(true, narrative);
        }
        if config.enabled_formats.is_empty() {
            narrative.plain("No image types have been activated, nothing to test");
            return Checked::early(true, narrative);
        }

        let options = self
            .alter_html
            .clone()
            .unwrap_or_else(|| AlterHtmlOptions::from_config(&config));
        let probe = FormatProbe {
            config: &config,
            options: &options,
            paths: self.parts.paths.as_ref(),
            artifacts: &self.parts.artifacts,
            resolver: self.parts.resolver.as_ref(),
            diagnosis: self.parts.diagnosis.as_ref(),
            client: self.parts.client.as_ref(),
        };

        let formats = config.enabled_formats;
        let mut artifacts_created = false;
        let mut worst = SuccessLevel::CleanSuccess;
        let last_level;

        if formats.contains(ImageFormat::Jpeg) {
            let jpeg = run_probe(&probe, ImageFormat::Jpeg).await;
            artifacts_created |= jpeg.artifacts_created;
            narrative.append(jpeg.narrative);
            worst = worst.min(jpeg.level);
            let mut level = jpeg.level;

            if level.is_success() && formats.contains(ImageFormat::Png) {
                narrative.heading(format!("Performing same tests for {}", ImageFormat::Png.label()));
                let png = run_probe(&probe, ImageFormat::Png).await;
                artifacts_created |= png.artifacts_created;
                if png.level == SuccessLevel::CleanSuccess {
                    narrative.ok(format!("All tests passed for {} as well.", ImageFormat::Png.label()));
                    narrative.plain("(I shall spare you the report, which is almost identical to the one above)");
                } else {
                    narrative.append(png.narrative);
                }
                worst = worst.min(png.level);
                level = png.level;
            }
            last_level = level;
        } else {
            // Precheck guarantees a known bit is set, so this is the png bit.
            let png = run_probe(&probe, ImageFormat::Png).await;
            artifacts_created |= png.artifacts_created;
            narrative.append(png.narrative);
            worst = worst.min(png.level);
            last_level = png.level;
        }

        if last_level.is_success() {
            // Notices from an earlier format still qualify the conclusion.
            conclude(worst, &mut narrative);
        }

        Checked {
            success: last_level.is_success(),
            narrative,
            artifacts_created,
        }
    }
}

async fn run_probe(probe: &FormatProbe<'_>, format: ImageFormat) -> super::probe::ProbeOutcome {
    let span = tracing::info_span!("probe", %format);
    probe.run(format).instrument(span).await
}

fn conclude(level: SuccessLevel, narrative: &mut Narrative) {
    narrative.heading("Conclusion");
    if level == SuccessLevel::SuccessWithWarnings {
        narrative.ok("Everything seems to work, apart from the notices above.");
    } else {
        narrative.ok("Everything seems to work as it should.");
    }
    narrative.plain(
        "However, notice that this test only tested an image which was placed in the uploads \
         folder. The rest of the image roots (such as theme images) have not been tested.",
    );
    narrative.plain(
        "Also not tested: that an image type which is disabled is not redirected to the \
         converter. These things probably work, though.",
    );
}
