use super::{LineKind, Narrative, NarrativeLine};

/// Render one line as markdown with kramdown class attributes.
pub fn markdown_line(line: &NarrativeLine) -> String {
    let text = &line.text;
    if text.is_empty() {
        return String::new();
    }
    match line.kind {
        LineKind::Title => format!("# {text}"),
        LineKind::Heading => format!("## {text}"),
        LineKind::Plain => text.clone(),
        LineKind::Info => format!("*{text}*"),
        LineKind::Ok => format!("**{text}**{{: .ok}}"),
        LineKind::Warn => format!("**{text}**{{: .warn}}"),
        LineKind::Error => format!("**{text}**{{: .error}}"),
    }
}

pub fn markdown_lines(narrative: &Narrative) -> Vec<String> {
    narrative.lines().iter().map(markdown_line).collect()
}

pub fn markdown(narrative: &Narrative) -> String {
    markdown_lines(narrative).join("\n\n")
}
