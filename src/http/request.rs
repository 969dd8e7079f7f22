/// A single outbound GET issued by a probe.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ProbeRequest {
    /// Request `url` while advertising support for `accept_mime` only.
    pub fn negotiate(url: impl Into<String>, accept_mime: &str) -> Self {
        Self {
            url: url.into(),
            headers: vec![("Accept".to_string(), accept_mime.to_string())],
        }
    }

    /// Value of the `Accept` header that will be sent.
    pub fn accept(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("accept"))
            .map(|(_, value)| value.as_str())
    }
}
