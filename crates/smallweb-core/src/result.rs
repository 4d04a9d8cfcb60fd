//! The tagged `FetchResult` sum type returned by both `gopher_fetch` and
//! `gemini_fetch`. Serialized with `tag = "kind"` and `rename_all =
//! "camelCase"` so the lowerCamelCase field aliases (`nextUrl`, `mimeType`,
//! `requestInfo`, `newUrl`) fall out of the derive.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::gemtext::GemtextDocument;
use crate::menu::GopherMenuItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    pub url: String,
    /// Unix epoch seconds at which the fetch was issued.
    pub timestamp: u64,
}

impl RequestInfo {
    pub fn now(url: impl Into<String>) -> Self {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        RequestInfo { url: url.into(), timestamp }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

impl From<&Error> for ErrorObject {
    fn from(err: &Error) -> Self {
        ErrorObject { code: err.code().to_string(), message: err.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FetchResult {
    Menu {
        items: Vec<GopherMenuItem>,
        request_info: RequestInfo,
    },
    Text {
        charset: String,
        bytes: u64,
        text: String,
        request_info: RequestInfo,
    },
    Binary {
        bytes: u64,
        mime_type: Option<String>,
        note: String,
        request_info: RequestInfo,
    },
    Gemtext {
        document: GemtextDocument,
        mime_type: String,
        bytes: u64,
        request_info: RequestInfo,
    },
    /// A successful (2x) Gemini response whose MIME type is not
    /// `text/gemini` — the raw decoded text is returned verbatim rather
    /// than run through the gemtext parser.
    GeminiSuccess {
        raw_content: String,
        mime_type: String,
        bytes: u64,
        request_info: RequestInfo,
    },
    Input {
        prompt: String,
        sensitive: bool,
        request_info: RequestInfo,
    },
    Redirect {
        new_url: String,
        permanent: bool,
        request_info: RequestInfo,
    },
    Certificate {
        required: bool,
        message: String,
        request_info: RequestInfo,
    },
    Error {
        error: ErrorObject,
        request_info: RequestInfo,
    },
}

impl FetchResult {
    pub fn from_error(err: &Error, request_info: RequestInfo) -> Self {
        FetchResult::Error { error: err.into(), request_info }
    }

    pub fn request_info(&self) -> &RequestInfo {
        match self {
            FetchResult::Menu { request_info, .. }
            | FetchResult::Text { request_info, .. }
            | FetchResult::Binary { request_info, .. }
            | FetchResult::Gemtext { request_info, .. }
            | FetchResult::GeminiSuccess { request_info, .. }
            | FetchResult::Input { request_info, .. }
            | FetchResult::Redirect { request_info, .. }
            | FetchResult::Certificate { request_info, .. }
            | FetchResult::Error { request_info, .. } => request_info,
        }
    }

    /// Whether this variant is eligible for insertion into the response
    /// cache: successful completions only, never errors, inputs,
    /// redirects, or certificate prompts.
    pub fn is_cacheable(&self) -> bool {
        matches!(
            self,
            FetchResult::Menu { .. }
                | FetchResult::Text { .. }
                | FetchResult::Binary { .. }
                | FetchResult::Gemtext { .. }
                | FetchResult::GeminiSuccess { .. }
        )
    }
}
