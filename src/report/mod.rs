//! # Self Test Report
//!
//! The report is an ordered list of tagged lines. Order follows the test's
//! progress, so lines are only ever appended. Turning the tags into markup is
//! left to [`render`].

pub mod render;

use serde::Serialize;

/// Presentation hint attached to every narrative line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Title,
    Heading,
    Plain,
    /// Raw observations such as URLs and response headers.
    Info,
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativeLine {
    pub kind: LineKind,
    pub text: String,
}

impl NarrativeLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Append-only sequence of narrative lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Narrative {
    lines: Vec<NarrativeLine>,
}

impl Narrative {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        self.lines.push(NarrativeLine::new(kind, text));
    }

    pub fn title(&mut self, text: impl Into<String>) {
        self.push(LineKind::Title, text);
    }

    pub fn heading(&mut self, text: impl Into<String>) {
        self.push(LineKind::Heading, text);
    }

    pub fn plain(&mut self, text: impl Into<String>) {
        self.push(LineKind::Plain, text);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(LineKind::Info, text);
    }

    pub fn ok(&mut self, text: impl Into<String>) {
        self.push(LineKind::Ok, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(LineKind::Warn, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(LineKind::Error, text);
    }

    /// Move every line of `other` onto the end of this narrative.
    pub fn append(&mut self, other: Narrative) {
        self.lines.extend(other.lines);
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = NarrativeLine>) {
        self.lines.extend(lines);
    }

    pub fn lines(&self) -> &[NarrativeLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True if any line contains `needle`, case-insensitively.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.lines
            .iter()
            .any(|line| line.text.to_ascii_lowercase().contains(&needle))
    }

    pub fn count_kind(&self, kind: LineKind) -> usize {
        self.lines.iter().filter(|line| line.kind == kind).count()
    }
}

/// Final result of a self test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestReport {
    #[serde(rename = "success")]
    pub overall_success: bool,
    pub narrative: Narrative,
}

impl TestReport {
    /// The `(success, lines)` pair the hosting UI renders.
    pub fn into_parts(self) -> (bool, Vec<String>) {
        let lines = render::markdown_lines(&self.narrative);
        (self.overall_success, lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_insertion_order() {
        let mut narrative = Narrative::new();
        narrative.heading("first");
        narrative.plain("second");
        narrative.warn("third");

        let texts: Vec<&str> = narrative.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(narrative.count_kind(LineKind::Warn), 1);
    }

    #[test]
    fn append_moves_lines_to_the_end() {
        let mut a = Narrative::new();
        a.plain("a");
        let mut b = Narrative::new();
        b.plain("b");
        a.append(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.lines()[1].text, "b");
    }

    #[test]
    fn mentions_ignores_case() {
        let mut narrative = Narrative::new();
        narrative.plain("The test cannot be completed");
        assert!(narrative.mentions("test cannot be completed"));
        assert!(!narrative.mentions("deleting"));
    }

    #[test]
    fn report_serializes_with_tagged_lines() {
        let mut narrative = Narrative::new();
        narrative.ok("We got a webp");
        let report = TestReport {
            overall_success: true,
            narrative,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["narrative"][0]["kind"], "ok");
        assert_eq!(json["narrative"][0]["text"], "We got a webp");
    }
}
