use crate::artifacts::ArtifactManager;
use crate::config::{ALTERNATE_MIME, AlterHtmlOptions, ImageFormat, ProbeConfig};
use crate::http::{HttpProbe, ProbeRequest, ProbeResponse};
use crate::paths::{UPLOADS_ROOT, UploadLocationProvider};
use crate::report::Narrative;
use crate::rewrite::{RewriteDiagnosis, RewriteResolver};

use super::classifier::{OutcomeClassifier, SuccessLevel};

const CANNOT_COMPLETE: &str = "The test cannot be completed";

/// Result of probing one source format.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub level: SuccessLevel,
    pub narrative: Narrative,
    pub artifacts_created: bool,
}

/// End-to-end check of one format: test image, expected URL, request, verdict.
pub struct FormatProbe<'a> {
    pub config: &'a ProbeConfig,
    pub options: &'a AlterHtmlOptions,
    pub paths: &'a dyn UploadLocationProvider,
    pub artifacts: &'a ArtifactManager,
    pub resolver: &'a dyn RewriteResolver,
    pub diagnosis: &'a dyn RewriteDiagnosis,
    pub client: &'a dyn HttpProbe,
}

impl FormatProbe<'_> {
    pub async fn run(&self, format: ImageFormat) -> ProbeOutcome {
        let mut narrative = Narrative::new();

        let Ok(file_name) = self.artifacts.create_test_image(format, &mut narrative) else {
            narrative.error(CANNOT_COMPLETE);
            return failed(narrative, false);
        };

        let source_url = format!("{}/{file_name}", self.paths.upload_url());
        let request_url = self.resolver.resolve_alternate_url(
            &source_url,
            UPLOADS_ROOT,
            self.paths.upload_url(),
            self.paths.upload_dir(),
            &self.options.for_on_demand_probe(),
        );
        let Some(request_url) = request_url else {
            narrative.plain(format!(
                "Could not work out which URL the webp for {source_url} would be served from."
            ));
            narrative.error(CANNOT_COMPLETE);
            return failed(narrative, true);
        };

        narrative.heading(
            "Lets check that browsers supporting webp get a freshly converted WEBP when a \
             non-existing WEBP is requested",
        );
        narrative.plain(format!(
            "Making a HTTP request for the test image (pretending to be a client that supports \
             webp, by setting the \"Accept\" header to \"{ALTERNATE_MIME}\")"
        ));

        let request = ProbeRequest::negotiate(&request_url, ALTERNATE_MIME);
        let response = match self.client.probe(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %request_url, error = %err, "probe request failed");
                narrative.error("The request FAILED");
                for line in err.error_list() {
                    narrative.info(line);
                }
                narrative.error(CANNOT_COMPLETE);
                return failed(narrative, true);
            }
        };

        narrative.info(&request_url);
        print_response(&response, &mut narrative);

        let classification = OutcomeClassifier::new(self.config, self.diagnosis).classify(
            &response.headers,
            format,
            ALTERNATE_MIME,
        );
        tracing::info!(%format, level = ?classification.level, "probe classified");
        narrative.append(classification.narrative);

        ProbeOutcome {
            level: classification.level,
            narrative,
            artifacts_created: true,
        }
    }
}

fn print_response(response: &ProbeResponse, narrative: &mut Narrative) {
    narrative.plain(format!("Response: {}", response.status_line()));
    if response.headers.is_empty() {
        narrative.plain("The response has no headers");
        return;
    }
    narrative.plain("Response headers:");
    for (name, value) in response.headers.iter() {
        narrative.info(format!("{name}: {value}"));
    }
}

fn failed(narrative: Narrative, artifacts_created: bool) -> ProbeOutcome {
    ProbeOutcome {
        level: SuccessLevel::Fail,
        narrative,
        artifacts_created,
    }
}
