//! Gopher and Gemini URL parsing and canonical formatting.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const GEMINI_URL_MAX_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GopherUrl {
    pub host: String,
    #[serde(default = "default_gopher_port")]
    pub port: u16,
    pub gopher_type: char,
    pub selector: String,
    pub search: Option<String>,
}

fn default_gopher_port() -> u16 {
    70
}

impl GopherUrl {
    /// Canonical `gopher://host:port/{type}{selector}` form, used as the
    /// cache key and as `GopherMenuItem::next_url`. The default port 70 is
    /// always included here (unlike Gemini's `format`) so the cache key stays
    /// unambiguous regardless of whether the caller typed it.
    pub fn canonical(&self) -> String {
        let mut s = format!("gopher://{}:{}/{}{}", self.host, self.port, self.gopher_type, self.selector);
        if let Some(search) = &self.search {
            if self.gopher_type == '7' {
                s.push_str("%09");
                s.push_str(search);
            }
        }
        s
    }
}

/// Parse a `gopher://` URL. The path's first byte after `/` is the item type
/// (defaulting to `1` when the path is empty or `/`), the remainder is the
/// selector, and a literal `%09` inside the selector splits into
/// `(selector, search)` unless a `?query` is present, which takes precedence.
pub fn parse_gopher_url(s: &str) -> Result<GopherUrl> {
    let parsed = url::Url::parse(s).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    if parsed.scheme() != "gopher" {
        return Err(Error::InvalidUrl(format!("scheme must be 'gopher', got '{}'", parsed.scheme())));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidUrl("url must contain a hostname".into()))?
        .to_string();
    let port = parsed.port().unwrap_or(70);

    let path = parsed.path();
    let (gopher_type, mut selector) = if path.len() <= 1 {
        ('1', String::new())
    } else {
        let mut chars = path[1..].chars();
        let t = chars.next().unwrap();
        (t, chars.as_str().to_string())
    };

    let mut search = None;
    if let Some(query) = parsed.query() {
        search = Some(
            percent_encoding::percent_decode_str(query)
                .decode_utf8_lossy()
                .into_owned(),
        );
    } else if let Some(idx) = selector.find("%09") {
        let rest = selector.split_off(idx);
        let rest = &rest[3..];
        search = Some(percent_encoding::percent_decode_str(rest).decode_utf8_lossy().into_owned());
    }

    Ok(GopherUrl { host, port, gopher_type, selector, search })
}

/// Forbidden bytes in a Gopher selector per RFC 1436: TAB, CR, LF.
pub fn sanitize_selector(selector: &str) -> Result<()> {
    if selector.contains(['\t', '\r', '\n']) {
        return Err(Error::SecurityViolation("selector contains a forbidden TAB/CR/LF byte".into()));
    }
    if selector.len() > 255 {
        return Err(Error::SecurityViolation("selector exceeds 255 bytes".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUrl {
    pub host: String,
    #[serde(default = "default_gemini_port")]
    pub port: u16,
    pub path: String,
    pub query: Option<String>,
}

fn default_gemini_port() -> u16 {
    1965
}

impl GeminiUrl {
    /// Default port omitted, path normalised to always start with `/`,
    /// length re-checked against the 1024-byte wire cap.
    pub fn format(&self) -> Result<String> {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        let mut s = format!("gemini://{}", self.host);
        if self.port != 1965 {
            s.push(':');
            s.push_str(&self.port.to_string());
        }
        s.push_str(&path);
        if let Some(q) = &self.query {
            s.push('?');
            s.push_str(q);
        }
        if s.len() > GEMINI_URL_MAX_BYTES {
            return Err(Error::InvalidUrl(format!(
                "formatted gemini url exceeds {GEMINI_URL_MAX_BYTES} bytes ({} bytes)",
                s.len()
            )));
        }
        Ok(s)
    }

    /// Resolve a gemtext link (which may be relative) against this URL.
    /// The gemtext parser itself never resolves links; callers resolve
    /// against the request URL, including for redirect targets.
    pub fn resolve(&self, link: &str) -> Result<String> {
        let base = url::Url::parse(&self.format()?).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let joined = base.join(link).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(joined.to_string())
    }
}

/// Parse a `gemini://` URL. Scheme must be `gemini`, userinfo and fragment
/// are rejected, serialised length must be ≤1024 bytes, default port 1965,
/// default path `/`. The query is kept percent-encoded (it is the wire form
/// of the request).
pub fn parse_gemini_url(s: &str) -> Result<GeminiUrl> {
    if s.len() > GEMINI_URL_MAX_BYTES {
        return Err(Error::InvalidUrl(format!("url exceeds {GEMINI_URL_MAX_BYTES} bytes")));
    }
    let parsed = url::Url::parse(s).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    if parsed.scheme() != "gemini" {
        return Err(Error::InvalidUrl(format!("scheme must be 'gemini', got '{}'", parsed.scheme())));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(Error::InvalidUrl("userinfo is not permitted in a gemini url".into()));
    }
    if parsed.fragment().is_some() {
        return Err(Error::InvalidUrl("fragment is not permitted in a gemini url".into()));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidUrl("url must contain a hostname".into()))?
        .to_string();
    let port = parsed.port().unwrap_or(1965);
    let path = if parsed.path().is_empty() { "/".to_string() } else { parsed.path().to_string() };
    let query = parsed.query().map(str::to_string);

    Ok(GeminiUrl { host, port, path, query })
}
