use std::io;
use std::path::PathBuf;

use crate::config::ImageFormat;

/// Errors raised by the collaborators around a self test run.
///
/// None of these escape [`crate::testing::SelfTest::run`]; the orchestrator
/// turns them into narrative lines for the operator.
#[derive(Debug, thiserror::Error)]
pub enum SelfTestError {
    #[error("failed to read config file `{}`: {source}", path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("failed to parse config file `{}`: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no test image available for {format}: `{}` is missing", path.display())]
    FixtureMissing { format: ImageFormat, path: PathBuf },

    #[error("upload folder `{}` is not writable: {source}", path.display())]
    UploadNotWritable { path: PathBuf, source: io::Error },

    #[error("failed to write `{}`: {source}", path.display())]
    ArtifactWrite { path: PathBuf, source: io::Error },

    #[error("another self test is already running for `{0}`")]
    RunInProgress(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to render report: {0}")]
    Render(#[source] serde_json::Error),
}

/// Failure to obtain any HTTP response at all.
///
/// Non-2xx statuses are not transport failures; those come back as a
/// regular [`crate::http::ProbeResponse`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("could not connect to {url}")]
    Connect { url: String, chain: Vec<String> },

    #[error("request to {url} timed out")]
    Timeout { url: String, chain: Vec<String> },

    #[error("request to {url} failed")]
    Other { url: String, chain: Vec<String> },
}

impl TransportError {
    /// The raw error messages, headline first. Never empty.
    pub fn error_list(&self) -> Vec<String> {
        let mut errors = vec![self.to_string()];
        match self {
            TransportError::InvalidRequest(_) => {}
            TransportError::Connect { chain, .. }
            | TransportError::Timeout { chain, .. }
            | TransportError::Other { chain, .. } => errors.extend(chain.iter().cloned()),
        }
        errors
    }

    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let mut chain = Vec::new();
        let mut source: Option<&dyn std::error::Error> = Some(err);
        while let Some(current) = source {
            chain.push(current.to_string());
            source = current.source();
        }

        let url = url.to_string();
        if err.is_timeout() {
            TransportError::Timeout { url, chain }
        } else if err.is_connect() {
            TransportError::Connect { url, chain }
        } else if err.is_builder() {
            TransportError::InvalidRequest(chain.join(": "))
        } else {
            TransportError::Other { url, chain }
        }
    }
}
