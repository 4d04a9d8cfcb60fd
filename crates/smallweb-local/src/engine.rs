//! The fetch façade: gate → cache → fetch → classify → cache, one semaphore
//! permit per in-flight fetch, one deadline covering the whole pipeline, a
//! bounded redirect-following loop for Gemini.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use smallweb_core::{url as urlcodec, Error, FetchResult, GeminiUrl, RequestInfo, Result};

use crate::cache::ResponseCache;
use crate::clientcert::ClientCertStore;
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::gopher::GopherClient;
use crate::security::SecurityGate;
use crate::tls::TlsDialer;
use crate::tofu::TofuStore;

/// Process-wide, explicitly owned state: cache, TOFU store, client-cert
/// store, and the two protocol clients. Created once at startup and held
/// by the MCP server for its lifetime -- not a hidden global.
pub struct SmallwebEngine {
    config: Config,
    gopher_gate: SecurityGate,
    gemini_gate: SecurityGate,
    gopher_cache: ResponseCache,
    gemini_cache: ResponseCache,
    gopher_client: GopherClient,
    gemini_client: GeminiClient,
    semaphore: Arc<Semaphore>,
}

impl SmallwebEngine {
    pub fn new(config: Config) -> Self {
        let tofu = Arc::new(TofuStore::load(config.gemini_tofu_storage_path.clone()));
        let client_certs = Arc::new(ClientCertStore::load(&config.gemini_client_cert_storage_path));
        let dialer = Arc::new(TlsDialer::new(
            tofu,
            client_certs,
            config.gemini_tofu_enabled,
            config.gemini_client_certs_enabled,
            config.gemini_tls_verify_hostname,
        ));

        let gopher_gate = SecurityGate::new(
            config.gopher_allowed_hosts.clone(),
            config.gopher_max_selector_length,
            config.gopher_max_search_length,
        );
        let gemini_gate = SecurityGate::new(config.gemini_allowed_hosts.clone(), 1024, 1024);

        let gopher_cache = ResponseCache::new(config.gopher_cache_enabled, config.gopher_cache_ttl_seconds, config.gopher_max_cache_entries);
        let gemini_cache = ResponseCache::new(config.gemini_cache_enabled, config.gemini_cache_ttl_seconds, config.gemini_max_cache_entries);

        let gopher_client = GopherClient::new(config.gopher_max_response_size);
        let gemini_client = GeminiClient::new(dialer, config.gemini_max_response_size);

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_connections));

        SmallwebEngine { config, gopher_gate, gemini_gate, gopher_cache, gemini_cache, gopher_client, gemini_client, semaphore }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches a `gopher://` URL. Never returns `Err` to its caller --
    /// every failure is folded into `FetchResult::Error`.
    pub async fn fetch_gopher(&self, raw_url: &str) -> FetchResult {
        let _permit = self.semaphore.acquire().await;
        let info = RequestInfo::now(raw_url.to_string());
        let deadline = Duration::from_secs(self.config.gopher_timeout_seconds);

        match tokio::time::timeout(deadline, self.fetch_gopher_inner(raw_url)).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => FetchResult::from_error(&err, info),
            Err(_) => FetchResult::from_error(&Error::Timeout(format!("fetch exceeded {}s", self.config.gopher_timeout_seconds)), info),
        }
    }

    async fn fetch_gopher_inner(&self, raw_url: &str) -> Result<FetchResult> {
        let url = urlcodec::parse_gopher_url(raw_url)?;
        urlcodec::sanitize_selector(&url.selector)?;
        self.gopher_gate.check_gopher(&url.host, url.port, &url.selector, url.search.as_deref())?;

        let key = url.canonical();
        if let Some(hit) = self.gopher_cache.get(&key) {
            return Ok(hit);
        }

        let result = self.gopher_client.fetch(&url, raw_url.to_string()).await?;
        if result.is_cacheable() {
            self.gopher_cache.put(key, result.clone());
        }
        Ok(result)
    }

    /// Fetches a `gemini://` URL. Follows redirects up to `MAX_REDIRECTS`
    /// (default 5); each hop re-runs the full pipeline (gate, cache,
    /// fetch). A redirect to a non-`gemini` scheme is surfaced, never
    /// followed.
    pub async fn fetch_gemini(&self, raw_url: &str) -> FetchResult {
        let _permit = self.semaphore.acquire().await;
        let info = RequestInfo::now(raw_url.to_string());
        let deadline = Duration::from_secs(self.config.gemini_timeout_seconds);

        match tokio::time::timeout(deadline, self.fetch_gemini_with_redirects(raw_url)).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => FetchResult::from_error(&err, info),
            Err(_) => FetchResult::from_error(&Error::Timeout(format!("fetch exceeded {}s", self.config.gemini_timeout_seconds)), info),
        }
    }

    async fn fetch_gemini_with_redirects(&self, raw_url: &str) -> Result<FetchResult> {
        let mut current_url = urlcodec::parse_gemini_url(raw_url)?;
        for _hop in 0..=self.config.max_redirects {
            let result = self.fetch_gemini_once(&current_url).await?;
            match &result {
                FetchResult::Redirect { new_url, .. } => {
                    let resolved = current_url.resolve(new_url)?;
                    if !resolved.starts_with("gemini://") {
                        return Ok(result);
                    }
                    current_url = urlcodec::parse_gemini_url(&resolved)?;
                }
                _ => return Ok(result),
            }
        }
        Err(Error::TooManyRedirects(self.config.max_redirects))
    }

    async fn fetch_gemini_once(&self, url: &GeminiUrl) -> Result<FetchResult> {
        let formatted = url.format()?;
        self.gemini_gate.check_gemini(&url.host, url.port, formatted.len())?;

        let key = formatted.clone();
        if let Some(hit) = self.gemini_cache.get(&key) {
            return Ok(hit);
        }

        let result = self.gemini_client.fetch(url).await?;
        if result.is_cacheable() {
            self.gemini_cache.put(key, result.clone());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config(tmp: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.gemini_tofu_storage_path = tmp.join("tofu");
        config.gemini_client_cert_storage_path = tmp.join("certs");
        config
    }

    async fn spawn_gopher_menu_server(response: &'static [u8]) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = sock.read(&mut buf).await;
            sock.write_all(response).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn gopher_fetch_rejects_malformed_url() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = SmallwebEngine::new(test_config(tmp.path()));
        let result = engine.fetch_gopher("not-a-url").await;
        match result {
            FetchResult::Error { error, .. } => assert_eq!(error.code, "InvalidUrl"),
            other => panic!("expected an error result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gopher_fetch_goes_through_cache_on_second_call() {
        let addr = spawn_gopher_menu_server(b"1Home\t/\tfloodgap.com\t70\r\n.\r\n").await;
        let tmp = tempfile::tempdir().unwrap();
        let engine = SmallwebEngine::new(test_config(tmp.path()));
        let url = format!("gopher://{}:{}/1/", addr.ip(), addr.port());

        let first = engine.fetch_gopher(&url).await;
        assert!(matches!(first, FetchResult::Menu { .. }));

        // The server only answers the first connection; a second hit must
        // come from the cache, not a second TCP connection.
        let second = engine.fetch_gopher(&url).await;
        assert!(matches!(second, FetchResult::Menu { .. }));
    }

    async fn spawn_gemini_redirect_server() -> std::net::SocketAddr {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_der = rustls::pki_types::CertificateDer::from(cert.cert.der().to_vec());
        let key_der = rustls::pki_types::PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let provider = std::sync::Arc::new(rustls::crypto::ring::default_provider());
        let server_config = rustls::ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS13])
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .unwrap();
        let acceptor = tokio_rustls::TlsAcceptor::from(std::sync::Arc::new(server_config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for _ in 0..2 {
                let (tcp, _) = listener.accept().await.unwrap();
                let mut tls = acceptor.accept(tcp).await.unwrap();
                let mut buf = [0u8; 256];
                let n = tls.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]);
                if request.contains("/old") {
                    tls.write_all(b"30 /new\r\n").await.unwrap();
                } else {
                    tls.write_all(b"20 text/gemini\r\n# Hello\r\n").await.unwrap();
                }
            }
        });

        addr
    }

    #[tokio::test]
    async fn gemini_fetch_resolves_and_follows_a_relative_redirect() {
        let addr = spawn_gemini_redirect_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let engine = SmallwebEngine::new(test_config(tmp.path()));
        let url = format!("gemini://localhost:{}/old", addr.port());

        let result = engine.fetch_gemini(&url).await;
        match result {
            FetchResult::Gemtext { document, .. } => assert_eq!(document.title(), Some("Hello")),
            other => panic!("expected the redirect to be resolved and followed to gemtext, got {other:?}"),
        }
    }
}
