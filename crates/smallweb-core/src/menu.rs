//! Gopher menu parsing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GopherMenuItem {
    #[serde(rename = "type")]
    pub item_type: char,
    pub title: String,
    pub selector: String,
    pub host: String,
    pub port: u16,
    pub next_url: String,
}

/// Split a single menu line on TAB into the four RFC 1436 fields. Lines
/// with fewer than four fields, or empty, or the lone-`.` terminator, are
/// skipped silently — they are typically server-generated decoration, not
/// errors.
pub fn parse_menu_line(line: &str) -> Option<GopherMenuItem> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line == "." {
        return None;
    }
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 4 {
        return None;
    }

    let mut chars = parts[0].chars();
    let item_type = chars.next().unwrap_or('i');
    let title = chars.as_str().to_string();
    let selector = parts[1].to_string();
    let host = parts[2].to_string();
    let port: u16 = parts[3].parse().unwrap_or(70);

    let next_url = format!("gopher://{host}:{port}/{item_type}{selector}");

    Some(GopherMenuItem { item_type, title, selector, host, port, next_url })
}

/// Parse a full Gopher menu response body. Lines terminate on LF (CR
/// tolerated); a terminator `.` on a line by itself ends the menu but an
/// unterminated stream (socket closed cleanly) is also accepted — both
/// just stop iterating, so no explicit end check is needed here.
pub fn parse_gopher_menu(content: &str) -> Vec<GopherMenuItem> {
    content.split('\n').filter_map(parse_menu_line).collect()
}
