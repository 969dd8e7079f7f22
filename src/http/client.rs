use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, redirect};

use crate::error::{SelfTestError, TransportError};

use super::request::ProbeRequest;
use super::response::{ProbeResponse, ResponseHeaders};

const MAX_REDIRECTS: usize = 10;

pub type ProbeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProbeResponse, TransportError>> + Send + 'a>>;

/// Issues one outbound request and reports what came back.
///
/// One call is one observation: implementations must not retry.
pub trait HttpProbe: Send + Sync {
    fn probe<'a>(&'a self, request: &'a ProbeRequest) -> ProbeFuture<'a>;
}

/// [`HttpProbe`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestProbeClient {
    client: Client,
}

impl ReqwestProbeClient {
    pub fn new(timeout: Duration) -> Result<Self, SelfTestError> {
        let mut builder = Client::builder().redirect(redirect::Policy::limited(MAX_REDIRECTS));
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(SelfTestError::HttpClient)?;
        Ok(Self { client })
    }
}

impl HttpProbe for ReqwestProbeClient {
    fn probe<'a>(&'a self, request: &'a ProbeRequest) -> ProbeFuture<'a> {
        Box::pin(async move {
            let headers = build_headers(&request.headers)?;

            tracing::debug!(url = %request.url, accept = ?request.accept(), "sending probe request");
            let response = self
                .client
                .get(&request.url)
                .headers(headers)
                .send()
                .await
                .map_err(|err| TransportError::from_reqwest(&request.url, &err))?;

            let status = response.status();
            let headers = ResponseHeaders::from(response.headers());
            tracing::info!(url = %request.url, status = status.as_u16(), "probe response received");

            Ok(ProbeResponse::new(status.as_u16(), headers))
        })
    }
}

fn build_headers(input: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        if key.is_empty() {
            continue;
        }

        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|err| TransportError::InvalidRequest(format!("invalid header name `{key}`: {err}")))?;
        let header_value = HeaderValue::from_str(value).map_err(|err| {
            TransportError::InvalidRequest(format!("invalid header value for `{key}`: {err}"))
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
