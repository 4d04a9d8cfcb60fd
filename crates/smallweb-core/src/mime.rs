//! Gemini META MIME parsing: `type/subtype; charset=…; lang=…`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mime {
    #[serde(rename = "type")]
    pub type_: String,
    pub subtype: String,
    pub charset: String,
    pub lang: Option<String>,
}

impl Mime {
    pub fn is_gemtext(&self) -> bool {
        self.type_.eq_ignore_ascii_case("text") && self.subtype.eq_ignore_ascii_case("gemini")
    }

    pub fn default_gemtext() -> Self {
        Mime { type_: "text".into(), subtype: "gemini".into(), charset: "utf-8".into(), lang: None }
    }
}

/// Parse a Gemini META MIME string. An empty/absent META on a `20` status
/// defaults to `text/gemini; charset=utf-8`. Unknown parameters are
/// preserved in neither field nor classification — only `charset` and
/// `lang` are recognised, everything else is ignored.
pub fn parse_mime(meta: &str) -> Mime {
    let meta = meta.trim();
    if meta.is_empty() {
        return Mime::default_gemtext();
    }

    let mut parts = meta.split(';');
    let type_subtype = parts.next().unwrap_or_default().trim();
    let (type_, subtype) = match type_subtype.split_once('/') {
        Some((t, s)) => (t.trim().to_lowercase(), s.trim().to_lowercase()),
        None => return Mime::default_gemtext(),
    };

    let mut charset = if type_ == "text" { "utf-8".to_string() } else { String::new() };
    let mut lang = None;

    for param in parts {
        let param = param.trim();
        if let Some((key, value)) = param.split_once('=') {
            let key = key.trim().to_lowercase();
            let value = value.trim().trim_matches('"').to_string();
            match key.as_str() {
                "charset" => charset = value.to_lowercase(),
                "lang" => lang = Some(value),
                _ => {}
            }
        }
    }

    Mime { type_, subtype, charset, lang }
}
