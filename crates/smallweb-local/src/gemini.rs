//! Gemini transport: request line, `BufReader`-style status-line read,
//! then dispatch on the status class to build an `Input`/`Gemtext`/
//! `Redirect`/error/`Certificate` result.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use smallweb_core::status::{classify, StatusClass};
use smallweb_core::{mime, Error, FetchResult, GemtextDocument, GeminiUrl, RequestInfo, Result};

use crate::tls::TlsDialer;

pub struct GeminiClient {
    dialer: Arc<TlsDialer>,
    max_response_size: u64,
}

impl GeminiClient {
    pub fn new(dialer: Arc<TlsDialer>, max_response_size: u64) -> Self {
        GeminiClient { dialer, max_response_size }
    }

    pub async fn fetch(&self, url: &GeminiUrl) -> Result<FetchResult> {
        let request_url = url.format()?;
        let info = RequestInfo::now(request_url.clone());

        let mut stream = self.dialer.connect(&url.host, url.port, &url.path).await?;

        let request_line = format!("{request_url}\r\n");
        if request_line.len() > 1024 {
            return Err(Error::InvalidUrl("gemini request line exceeds 1024 bytes".into()));
        }
        stream.write_all(request_line.as_bytes()).await.map_err(|e| Error::NetworkError(e.to_string()))?;

        let mut reader = BufReader::new(&mut stream);
        let status_line = read_status_line(&mut reader).await?;
        let (status, meta) = parse_status_line(&status_line)?;

        let body = if (20..=29).contains(&status) {
            Some(read_capped(&mut reader, self.max_response_size).await?)
        } else {
            None
        };

        Ok(dispatch(status, meta, body, info))
    }
}

async fn read_status_line<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    use tokio::io::AsyncBufReadExt;
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.map_err(|e| Error::NetworkError(e.to_string()))?;
    if n == 0 {
        return Err(Error::ProtocolError("connection closed before a status line was received".into()));
    }
    if !line.ends_with('\n') {
        return Err(Error::ProtocolError("status line was not terminated by CRLF".into()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn parse_status_line(line: &str) -> Result<(u8, String)> {
    let (code_str, meta) = line
        .split_once(' ')
        .ok_or_else(|| Error::ProtocolError("status line missing a space separator".into()))?;
    if code_str.len() != 2 {
        return Err(Error::ProtocolError(format!("status code must be two digits, got '{code_str}'")));
    }
    let status: u8 = code_str.parse().map_err(|_| Error::ProtocolError(format!("invalid status code '{code_str}'")))?;
    if !(10..=69).contains(&status) {
        return Err(Error::ProtocolError(format!("status code {status} outside the valid [10,69] range")));
    }
    if meta.len() > 1024 {
        return Err(Error::ProtocolError("META exceeds 1024 bytes".into()));
    }
    Ok((status, meta.to_string()))
}

async fn read_capped<R: tokio::io::AsyncRead + Unpin>(reader: &mut R, cap: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await.map_err(|e| Error::NetworkError(e.to_string()))?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() as u64 > cap {
            return Err(Error::ResponseTooLarge { actual: buf.len() as u64, cap });
        }
    }
    Ok(buf)
}

fn decode(bytes: &[u8], charset: &str) -> String {
    if charset.eq_ignore_ascii_case("utf-8") || charset.is_empty() {
        match std::str::from_utf8(bytes) {
            Ok(s) => return s.to_string(),
            Err(_) => return bytes.iter().map(|&b| b as char).collect(),
        }
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn dispatch(status: u8, meta: String, body: Option<Vec<u8>>, info: RequestInfo) -> FetchResult {
    match classify(status) {
        StatusClass::Input { sensitive } => FetchResult::Input { prompt: meta, sensitive, request_info: info },
        StatusClass::Success => {
            let parsed_mime = mime::parse_mime(&meta);
            let body = body.unwrap_or_default();
            let bytes = body.len() as u64;
            let text = decode(&body, &parsed_mime.charset);
            if parsed_mime.is_gemtext() {
                let document = GemtextDocument::parse(&text);
                FetchResult::Gemtext {
                    document,
                    mime_type: format!("{}/{}", parsed_mime.type_, parsed_mime.subtype),
                    bytes,
                    request_info: info,
                }
            } else {
                FetchResult::GeminiSuccess {
                    raw_content: text,
                    mime_type: format!("{}/{}", parsed_mime.type_, parsed_mime.subtype),
                    bytes,
                    request_info: info,
                }
            }
        }
        StatusClass::Redirect { permanent } => FetchResult::Redirect { new_url: meta, permanent, request_info: info },
        StatusClass::TemporaryFailure => {
            FetchResult::from_error(&Error::FetchError(format!("temporary failure ({status}): {meta}")), info)
        }
        StatusClass::PermanentFailure => {
            FetchResult::from_error(&Error::FetchError(format!("permanent failure ({status}): {meta}")), info)
        }
        StatusClass::ClientCertificate { required, .. } => {
            FetchResult::Certificate { required, message: meta, request_info: info }
        }
        StatusClass::Unknown => FetchResult::from_error(&Error::ProtocolError(format!("unknown status class for {status}")), info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_status_line() {
        let (status, meta) = parse_status_line("20 text/gemini").unwrap();
        assert_eq!(status, 20);
        assert_eq!(meta, "text/gemini");
    }

    #[test]
    fn rejects_missing_space() {
        assert!(parse_status_line("20text/gemini").is_err());
    }

    #[test]
    fn rejects_non_numeric_status() {
        assert!(parse_status_line("xx hello").is_err());
    }

    #[test]
    fn rejects_out_of_range_status() {
        assert!(parse_status_line("05 too low").is_err());
        assert!(parse_status_line("99 too high").is_err());
    }

    #[test]
    fn rejects_oversize_meta() {
        let meta = "a".repeat(1025);
        let line = format!("20 {meta}");
        assert!(parse_status_line(&line).is_err());
    }

    #[test]
    fn dispatch_input_status() {
        let info = RequestInfo::now("gemini://example.org/");
        let result = dispatch(10, "Enter query".into(), None, info);
        match result {
            FetchResult::Input { prompt, sensitive, .. } => {
                assert_eq!(prompt, "Enter query");
                assert!(!sensitive);
            }
            other => panic!("expected input, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_redirect_permanence() {
        let info = RequestInfo::now("gemini://example.org/");
        match dispatch(31, "gemini://example.org/new".into(), None, info) {
            FetchResult::Redirect { permanent, .. } => assert!(permanent),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_success_defaults_to_gemtext() {
        let info = RequestInfo::now("gemini://example.org/");
        match dispatch(20, String::new(), Some(b"# Hello".to_vec()), info) {
            FetchResult::Gemtext { mime_type, document, .. } => {
                assert_eq!(mime_type, "text/gemini");
                assert_eq!(document.title(), Some("Hello"));
            }
            other => panic!("expected gemtext, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_certificate_required() {
        let info = RequestInfo::now("gemini://example.org/");
        match dispatch(60, "client cert required".into(), None, info) {
            FetchResult::Certificate { required, .. } => assert!(required),
            other => panic!("expected a certificate result, got {other:?}"),
        }
    }
}
