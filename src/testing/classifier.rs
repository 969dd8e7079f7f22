use serde::Serialize;

use crate::config::{ImageFormat, ProbeConfig};
use crate::http::ResponseHeaders;
use crate::report::Narrative;
use crate::rewrite::RewriteDiagnosis;

/// Header the conversion script emits to describe what it did.
pub const CONVERT_LOG_HEADER: &str = "x-webp-convert-log";

/// Conversion log entry written when the converter gave up and served the original.
pub const FAIL_ACTION_MARKER: &str = "Performing fail action: original";

/// Ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessLevel {
    Fail,
    SuccessWithWarnings,
    CleanSuccess,
}

impl SuccessLevel {
    pub fn is_success(self) -> bool {
        !matches!(self, SuccessLevel::Fail)
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub level: SuccessLevel,
    pub narrative: Narrative,
}

/// Classifies a negotiated response and explains the verdict.
pub struct OutcomeClassifier<'a> {
    config: &'a ProbeConfig,
    diagnosis: &'a dyn RewriteDiagnosis,
}

impl<'a> OutcomeClassifier<'a> {
    pub fn new(config: &'a ProbeConfig, diagnosis: &'a dyn RewriteDiagnosis) -> Self {
        Self { config, diagnosis }
    }

    /// First matching rule wins: missing content-type, original served,
    /// unexpected type, then alternate served (possibly with warnings).
    pub fn classify(
        &self,
        headers: &ResponseHeaders,
        original: ImageFormat,
        alternate_mime: &str,
    ) -> Classification {
        let mut narrative = Narrative::new();

        let Some(content_type) = headers.media_type() else {
            narrative.error(
                "Bummer. There is no \"content-type\" response header, so there is no telling \
                 what was served. The test FAILED",
            );
            return fail(narrative);
        };

        if content_type == original.mime() {
            self.explain_original_served(headers, original, &mut narrative);
            return fail(narrative);
        }

        if !content_type.eq_ignore_ascii_case(alternate_mime) {
            narrative.plain(format!(
                "However, as the \"content-type\" header reveals, we did not get a webp. \
                 Surprisingly we got: \"{content_type}\""
            ));
            narrative.error("The test FAILED.");
            return fail(narrative);
        }

        narrative.ok("Alrighty. We got a webp.");
        if headers.contains(CONVERT_LOG_HEADER) {
            narrative.plain(format!(
                "The \"{CONVERT_LOG_HEADER}\" headers reveal we got the webp from the converter. Great!"
            ));
        } else {
            narrative.plain(format!(
                "Interestingly, there are no \"{CONVERT_LOG_HEADER}\" headers even though the \
                 converter always produces them. Could it be a setup that eats these headers?"
            ));
        }

        let mut warned = false;
        if headers.varies_on_accept() {
            narrative.plain("All is however not super-duper:");
            narrative.warn(
                "Notice: We received a Vary:Accept header. That header need not be set. It is a \
                 little bad for performance, as proxies do a poor job of keeping several \
                 cached variants (in many cases they simply do not)",
            );
            warned = true;
        }
        if !headers.contains("cache-control") && !headers.contains("expires") {
            narrative.warn(
                "Notice: No cache-control or expires header has been set. It is recommended to \
                 do so. Set it nice and big once you are sure the webps have a good \
                 quality/compression compromise.",
            );
            warned = true;
        }

        let level = if warned {
            SuccessLevel::SuccessWithWarnings
        } else {
            SuccessLevel::CleanSuccess
        };
        Classification { level, narrative }
    }

    fn explain_original_served(
        &self,
        headers: &ResponseHeaders,
        original: ImageFormat,
        narrative: &mut Narrative,
    ) {
        narrative.plain(format!(
            "Bummer. As the \"content-type\" header reveals, we got the {original}."
        ));
        narrative.error("The test failed.");
        narrative.plain("Now, what went wrong?");

        if headers.contains(CONVERT_LOG_HEADER) {
            if headers.any_value_contains(CONVERT_LOG_HEADER, FAIL_ACTION_MARKER) {
                narrative.plain(format!(
                    "The answer lies in the \"{CONVERT_LOG_HEADER}\" response headers:"
                ));
                narrative.error("The conversion failed.");
            } else {
                narrative.plain(format!(
                    "The converter was reached. Inspect the \"{CONVERT_LOG_HEADER}\" headers above for details."
                ));
            }
            return;
        }

        narrative.plain(format!(
            "Well, there is indication that the redirection isn't working. The converter should \
             set \"{CONVERT_LOG_HEADER}\" response headers, but there are none. While these \
             headers could have been eaten in a Cloudflare-like setup, the problem is probably \
             that the redirection simply failed."
        ));
        narrative.heading("Diagnosing redirection problems");
        narrative.extend(self.diagnosis.diagnose_failed_rewrite(self.config));
    }
}

fn fail(narrative: Narrative) -> Classification {
    Classification {
        level: SuccessLevel::Fail,
        narrative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ALTERNATE_MIME;
    use crate::report::LineKind;
    use crate::testing::fakes::CountingDiagnosis;

    fn classify(headers: &ResponseHeaders, diagnosis: &CountingDiagnosis) -> Classification {
        let config = ProbeConfig::default();
        OutcomeClassifier::new(&config, diagnosis).classify(headers, ImageFormat::Jpeg, ALTERNATE_MIME)
    }

    fn webp() -> ResponseHeaders {
        ResponseHeaders::new().with("Content-Type", "image/webp")
    }

    #[test]
    fn missing_content_type_fails() {
        let diagnosis = CountingDiagnosis::default();
        let result = classify(&ResponseHeaders::new().with("cache-control", "max-age=1"), &diagnosis);
        assert_eq!(result.level, SuccessLevel::Fail);
        assert!(result.narrative.mentions("no \"content-type\""));
        assert_eq!(diagnosis.calls(), 0);
    }

    #[test]
    fn original_without_log_header_delegates_diagnosis() {
        let diagnosis = CountingDiagnosis::default();
        let result = classify(&ResponseHeaders::new().with("content-type", "image/jpeg"), &diagnosis);

        assert_eq!(result.level, SuccessLevel::Fail);
        assert_eq!(diagnosis.calls(), 1);
        assert!(result.narrative.mentions("Diagnosing redirection problems"));
        assert!(result.narrative.mentions(CountingDiagnosis::LINE));
    }

    #[test]
    fn original_with_fail_action_blames_conversion() {
        let diagnosis = CountingDiagnosis::default();
        let headers = ResponseHeaders::new()
            .with("content-type", "image/jpeg")
            .with("X-WebP-Convert-Log", "Converting to webp")
            .with("X-WebP-Convert-Log", "Performing fail action: original");
        let result = classify(&headers, &diagnosis);

        assert_eq!(result.level, SuccessLevel::Fail);
        assert!(result.narrative.mentions("The conversion failed"));
        assert_eq!(diagnosis.calls(), 0);
    }

    #[test]
    fn original_with_other_log_header_points_at_headers() {
        let diagnosis = CountingDiagnosis::default();
        let headers = ResponseHeaders::new()
            .with("content-type", "image/jpeg")
            .with("x-webp-convert-log", "Serving original");
        let result = classify(&headers, &diagnosis);

        assert_eq!(result.level, SuccessLevel::Fail);
        assert!(!result.narrative.mentions("The conversion failed"));
        assert_eq!(diagnosis.calls(), 0);
    }

    #[test]
    fn unexpected_format_fails() {
        let diagnosis = CountingDiagnosis::default();
        let result = classify(&ResponseHeaders::new().with("content-type", "text/html; charset=UTF-8"), &diagnosis);
        assert_eq!(result.level, SuccessLevel::Fail);
        assert!(result.narrative.mentions("Surprisingly we got: \"text/html\""));
    }

    #[test]
    fn alternate_with_cache_header_is_clean() {
        let diagnosis = CountingDiagnosis::default();
        let result = classify(&webp().with("cache-control", "max-age=999"), &diagnosis);
        assert_eq!(result.level, SuccessLevel::CleanSuccess);
        assert_eq!(result.narrative.count_kind(LineKind::Warn), 0);
    }

    #[test]
    fn expires_counts_as_cache_header() {
        let diagnosis = CountingDiagnosis::default();
        let result = classify(&webp().with("expires", "Thu, 01 Jan 2032 00:00:00 GMT"), &diagnosis);
        assert_eq!(result.level, SuccessLevel::CleanSuccess);
    }

    #[test]
    fn missing_cache_headers_is_a_warning() {
        let diagnosis = CountingDiagnosis::default();
        let result = classify(&webp(), &diagnosis);
        assert_eq!(result.level, SuccessLevel::SuccessWithWarnings);
        assert!(result.narrative.mentions("No cache-control or expires header"));
    }

    #[test]
    fn vary_accept_only_adds_a_warning() {
        let diagnosis = CountingDiagnosis::default();
        let clean = classify(&webp().with("cache-control", "max-age=999"), &diagnosis);
        let varied = classify(
            &webp().with("cache-control", "max-age=999").with("Vary", "Accept"),
            &diagnosis,
        );
        assert_eq!(clean.level, SuccessLevel::CleanSuccess);
        assert_eq!(varied.level, SuccessLevel::SuccessWithWarnings);
        assert!(varied.level.is_success());
        assert_eq!(varied.narrative.count_kind(LineKind::Warn), 1);
    }

    #[test]
    fn warnings_accumulate() {
        let diagnosis = CountingDiagnosis::default();
        let result = classify(&webp().with("vary", "Accept"), &diagnosis);
        assert_eq!(result.level, SuccessLevel::SuccessWithWarnings);
        assert_eq!(result.narrative.count_kind(LineKind::Warn), 2);
    }

    #[test]
    fn notes_missing_convert_log_without_warning() {
        let diagnosis = CountingDiagnosis::default();
        let result = classify(&webp().with("cache-control", "max-age=999"), &diagnosis);
        assert!(result.narrative.mentions("there are no \"x-webp-convert-log\" headers"));

        let logged = classify(
            &webp()
                .with("cache-control", "max-age=999")
                .with("x-webp-convert-log", "Converted"),
            &diagnosis,
        );
        assert!(logged.narrative.mentions("we got the webp from the converter"));
    }

    #[test]
    fn levels_order_from_worst_to_best() {
        assert!(SuccessLevel::Fail < SuccessLevel::SuccessWithWarnings);
        assert!(SuccessLevel::SuccessWithWarnings < SuccessLevel::CleanSuccess);
        assert_eq!(
            SuccessLevel::CleanSuccess.min(SuccessLevel::SuccessWithWarnings),
            SuccessLevel::SuccessWithWarnings
        );
    }
}
