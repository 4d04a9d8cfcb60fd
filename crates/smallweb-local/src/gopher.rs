//! Gopher transport: connect, write the selector, read to EOF or the size
//! cap, then classify the body by the request's item type (not content
//! sniffing).

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use smallweb_core::{menu, Error, FetchResult, GopherUrl, Result};

use crate::mime_guess::guess_gopher_mime;

/// Trailing dot-terminator line some servers append to type-0 bodies;
/// stripped if present, leaving any CRLF that was part of the body's own
/// last line of text intact (it is later normalized to LF along with the
/// rest of the text).
const GOPHER_TEXT_TERMINATOR: &[u8] = b".\r\n";

pub struct GopherClient {
    max_response_size: u64,
}

impl GopherClient {
    pub fn new(max_response_size: u64) -> Self {
        GopherClient { max_response_size }
    }

    pub async fn fetch(&self, url: &GopherUrl, request_url: String) -> Result<FetchResult> {
        let info = smallweb_core::RequestInfo::now(request_url);

        let mut request = url.selector.clone();
        if url.gopher_type == '7' {
            request.push('\t');
            request.push_str(url.search.as_deref().unwrap_or(""));
        }
        request.push_str("\r\n");

        let mut stream = TcpStream::connect((url.host.as_str(), url.port))
            .await
            .map_err(|e| Error::NetworkError(format!("connect to {}:{} failed: {e}", url.host, url.port)))?;
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| Error::NetworkError(e.to_string()))?;

        let body = read_capped(&mut stream, self.max_response_size).await?;

        Ok(classify(url, body, info))
    }
}

async fn read_capped(stream: &mut TcpStream, cap: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await.map_err(|e| Error::NetworkError(e.to_string()))?;
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

fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), "utf-8"),
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), "latin-1"),
    }
}

fn classify(url: &GopherUrl, body: Vec<u8>, info: smallweb_core::RequestInfo) -> FetchResult {
    match url.gopher_type {
        '1' | '7' => {
            let (text, _charset) = decode_text(&body);
            let items = menu::parse_gopher_menu(&text);
            FetchResult::Menu { items, request_info: info }
        }
        '0' => {
            let stripped = body.strip_suffix(GOPHER_TEXT_TERMINATOR).map(<[u8]>::to_vec).unwrap_or(body);
            let bytes = stripped.len() as u64;
            let (text, charset) = decode_text(&stripped);
            let text = text.replace("\r\n", "\n");
            FetchResult::Text { charset: charset.to_string(), bytes, text, request_info: info }
        }
        other => {
            let mime_type = guess_gopher_mime(other, &url.selector);
            FetchResult::Binary {
                bytes: body.len() as u64,
                mime_type: Some(mime_type),
                note: "Binary content not returned to preserve context".to_string(),
                request_info: info,
            }
        }
    }
}
