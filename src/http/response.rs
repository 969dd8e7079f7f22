/// Response headers with case-insensitive names.
///
/// A header may repeat; every value is kept in arrival order. A missing
/// header and a header with an empty value are different states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((name.to_ascii_lowercase(), value.into()));
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(move |(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True if any value of `name` contains `needle`.
    pub fn any_value_contains(&self, name: &str, needle: &str) -> bool {
        self.get_all(name).any(|value| value.contains(needle))
    }

    /// Media type of the first `content-type`, lower-cased and without parameters.
    pub fn media_type(&self) -> Option<String> {
        self.get("content-type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// True if a `vary` header lists `Accept`.
    pub fn varies_on_accept(&self) -> bool {
        self.get_all("vary").any(|value| {
            value
                .split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("accept"))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&reqwest::header::HeaderMap> for ResponseHeaders {
    fn from(map: &reqwest::header::HeaderMap) -> Self {
        let mut headers = ResponseHeaders::new();
        for (name, value) in map {
            let value = value.to_str().unwrap_or("<binary>");
            headers.insert(name.as_str(), value);
        }
        headers
    }
}

/// What came back from a probe that reached the server.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: ResponseHeaders,
}

impl ProbeResponse {
    pub fn new(status: u16, headers: ResponseHeaders) -> Self {
        Self {
            status,
            status_text: reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .unwrap_or("Unknown")
                .to_string(),
            headers,
        }
    }

    pub fn status_line(&self) -> String {
        format!("{} {}", self.status, self.status_text)
    }
}
