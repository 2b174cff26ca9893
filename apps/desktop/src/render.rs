//! Terminal rendering of solver output: `**bold**` spans and leading-`#`
//! heading lines, everything else verbatim.

const BOLD: &str = "\x1b[1m";
const HEADING: &str = "\x1b[1;36m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Bold(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupLine {
    pub heading: bool,
    pub spans: Vec<Span>,
}

pub fn parse_markup(text: &str) -> Vec<MarkupLine> {
    text.split('\n').map(parse_line).collect()
}

fn parse_line(line: &str) -> MarkupLine {
    let heading = line.starts_with('#');
    let content = if heading {
        line.trim_start_matches('#').trim_start()
    } else {
        line
    };
    MarkupLine {
        heading,
        spans: parse_spans(content),
    }
}

fn parse_spans(content: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find("**") {
        let Some(len) = rest[start + 2..].find("**") else {
            // Unterminated marker renders as plain text.
            break;
        };
        if start > 0 {
            spans.push(Span::Plain(rest[..start].to_string()));
        }
        spans.push(Span::Bold(rest[start + 2..start + 2 + len].to_string()));
        rest = &rest[start + 2 + len + 2..];
    }
    if !rest.is_empty() {
        spans.push(Span::Plain(rest.to_string()));
    }

    spans
}

pub fn render_ansi(text: &str) -> String {
    parse_markup(text)
        .iter()
        .map(render_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_line(line: &MarkupLine) -> String {
    let body: String = line
        .spans
        .iter()
        .map(|span| match span {
            Span::Plain(text) => text.clone(),
            Span::Bold(text) => format!("{BOLD}{text}{RESET}"),
        })
        .collect();
    if line.heading {
        format!("{HEADING}{body}{RESET}")
    } else {
        body
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
