//! Gemtext (`text/gemini`) parsing: a forward single-pass state machine
//! that also builds a deduplicated link projection alongside the line list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GemtextLine {
    Text { content: String },
    Link { url: String, text: Option<String> },
    Heading1 { content: String },
    Heading2 { content: String },
    Heading3 { content: String },
    List { content: String },
    Quote { content: String },
    Preformat { alt_text: Option<String>, content: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GemtextLink {
    pub url: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GemtextDocument {
    pub lines: Vec<GemtextLine>,
    pub links: Vec<GemtextLink>,
}

impl GemtextDocument {
    pub fn title(&self) -> Option<&str> {
        self.lines.iter().find_map(|l| match l {
            GemtextLine::Heading1 { content } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Single forward pass over the document. State: `in_preformat`, plus
    /// the alt-text captured when the fence opened. A fence toggles on
    /// every ` ``` `-prefixed line; a second toggle closes the block rather
    /// than nesting.
    pub fn parse(input: &str) -> Self {
        let mut lines = Vec::new();
        let mut links = Vec::new();
        let mut in_preformat = false;
        let mut alt_text: Option<String> = None;

        for raw in input.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            if let Some(rest) = line.strip_prefix("```") {
                if in_preformat {
                    in_preformat = false;
                    alt_text = None;
                } else {
                    in_preformat = true;
                    let text = rest.trim();
                    alt_text = if text.is_empty() { None } else { Some(text.to_string()) };
                }
                continue;
            }

            if in_preformat {
                lines.push(GemtextLine::Preformat { alt_text: alt_text.clone(), content: line.to_string() });
                continue;
            }

            if let Some(rest) = line.strip_prefix("=>") {
                let (url, text) = parse_link_line(rest);
                if !links.iter().any(|l: &GemtextLink| l.url == url) {
                    links.push(GemtextLink { url: url.clone(), text: text.clone() });
                }
                lines.push(GemtextLine::Link { url, text });
            } else if let Some(rest) = line.strip_prefix("### ") {
                lines.push(GemtextLine::Heading3 { content: rest.to_string() });
            } else if let Some(rest) = line.strip_prefix("## ") {
                lines.push(GemtextLine::Heading2 { content: rest.to_string() });
            } else if let Some(rest) = line.strip_prefix("# ") {
                lines.push(GemtextLine::Heading1 { content: rest.to_string() });
            } else if let Some(rest) = line.strip_prefix("* ") {
                lines.push(GemtextLine::List { content: rest.to_string() });
            } else if let Some(rest) = line.strip_prefix("> ") {
                lines.push(GemtextLine::Quote { content: rest.to_string() });
            } else {
                lines.push(GemtextLine::Text { content: line.to_string() });
            }
        }

        GemtextDocument { lines, links }
    }
}

fn parse_link_line(rest: &str) -> (String, Option<String>) {
    let rest = rest.trim_start();
    match rest.split_once(char::is_whitespace) {
        Some((url, text)) => {
            let text = text.trim();
            (url.to_string(), if text.is_empty() { None } else { Some(text.to_string()) })
        }
        None => (rest.to_string(), None),
    }
}
