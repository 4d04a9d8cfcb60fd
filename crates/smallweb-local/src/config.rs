//! Environment-variable configuration, loaded once at startup: env var
//! names read once, the allowlist split on comma, numeric values parsed
//! with a fallback to the documented default rather than panicking on a
//! malformed value.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub gopher_max_response_size: u64,
    pub gopher_timeout_seconds: u64,
    pub gopher_cache_enabled: bool,
    pub gopher_cache_ttl_seconds: u64,
    pub gopher_max_cache_entries: usize,
    pub gopher_allowed_hosts: Option<Vec<String>>,
    pub gopher_max_selector_length: usize,
    pub gopher_max_search_length: usize,

    pub gemini_max_response_size: u64,
    pub gemini_timeout_seconds: u64,
    pub gemini_cache_enabled: bool,
    pub gemini_cache_ttl_seconds: u64,
    pub gemini_max_cache_entries: usize,
    pub gemini_allowed_hosts: Option<Vec<String>>,

    pub gemini_tls_verify_hostname: bool,
    pub gemini_tofu_enabled: bool,
    pub gemini_client_certs_enabled: bool,
    pub gemini_tofu_storage_path: PathBuf,
    pub gemini_client_cert_storage_path: PathBuf,

    pub max_redirects: u32,
    pub max_concurrent_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Config {
            gopher_max_response_size: 1_048_576,
            gopher_timeout_seconds: 30,
            gopher_cache_enabled: true,
            gopher_cache_ttl_seconds: 300,
            gopher_max_cache_entries: 1000,
            gopher_allowed_hosts: None,
            gopher_max_selector_length: 1024,
            gopher_max_search_length: 256,

            gemini_max_response_size: 1_048_576,
            gemini_timeout_seconds: 30,
            gemini_cache_enabled: true,
            gemini_cache_ttl_seconds: 300,
            gemini_max_cache_entries: 1000,
            gemini_allowed_hosts: None,

            gemini_tls_verify_hostname: true,
            gemini_tofu_enabled: true,
            gemini_client_certs_enabled: true,
            gemini_tofu_storage_path: home.join(".gopher-mcp").join("tofu"),
            gemini_client_cert_storage_path: home.join(".gopher-mcp").join("certs"),

            max_redirects: 5,
            max_concurrent_connections: 10,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).ok().map(|v| v.trim().eq_ignore_ascii_case("true")).unwrap_or(default)
}

fn env_hosts(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().filter(|v| !v.trim().is_empty()).map(|v| v.split(',').map(|h| h.trim().to_string()).collect())
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    env::var(key).ok().map(PathBuf::from).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            gopher_max_response_size: env_u64("GOPHER_MAX_RESPONSE_SIZE", defaults.gopher_max_response_size),
            gopher_timeout_seconds: env_u64("GOPHER_TIMEOUT_SECONDS", defaults.gopher_timeout_seconds),
            gopher_cache_enabled: env_bool("GOPHER_CACHE_ENABLED", defaults.gopher_cache_enabled),
            gopher_cache_ttl_seconds: env_u64("GOPHER_CACHE_TTL_SECONDS", defaults.gopher_cache_ttl_seconds),
            gopher_max_cache_entries: env_usize("GOPHER_MAX_CACHE_ENTRIES", defaults.gopher_max_cache_entries),
            gopher_allowed_hosts: env_hosts("GOPHER_ALLOWED_HOSTS"),
            gopher_max_selector_length: env_usize("GOPHER_MAX_SELECTOR_LENGTH", defaults.gopher_max_selector_length),
            gopher_max_search_length: env_usize("GOPHER_MAX_SEARCH_LENGTH", defaults.gopher_max_search_length),

            gemini_max_response_size: env_u64("GEMINI_MAX_RESPONSE_SIZE", defaults.gemini_max_response_size),
            gemini_timeout_seconds: env_u64("GEMINI_TIMEOUT_SECONDS", defaults.gemini_timeout_seconds),
            gemini_cache_enabled: env_bool("GEMINI_CACHE_ENABLED", defaults.gemini_cache_enabled),
            gemini_cache_ttl_seconds: env_u64("GEMINI_CACHE_TTL_SECONDS", defaults.gemini_cache_ttl_seconds),
            gemini_max_cache_entries: env_usize("GEMINI_MAX_CACHE_ENTRIES", defaults.gemini_max_cache_entries),
            gemini_allowed_hosts: env_hosts("GEMINI_ALLOWED_HOSTS"),

            gemini_tls_verify_hostname: env_bool("GEMINI_TLS_VERIFY_HOSTNAME", defaults.gemini_tls_verify_hostname),
            gemini_tofu_enabled: env_bool("GEMINI_TOFU_ENABLED", defaults.gemini_tofu_enabled),
            gemini_client_certs_enabled: env_bool("GEMINI_CLIENT_CERTS_ENABLED", defaults.gemini_client_certs_enabled),
            gemini_tofu_storage_path: env_path("GEMINI_TOFU_STORAGE_PATH", defaults.gemini_tofu_storage_path),
            gemini_client_cert_storage_path: env_path(
                "GEMINI_CLIENT_CERT_STORAGE_PATH",
                defaults.gemini_client_cert_storage_path,
            ),

            max_redirects: env_u32("MAX_REDIRECTS", defaults.max_redirects),
            max_concurrent_connections: env_usize("MAX_CONCURRENT_CONNECTIONS", defaults.max_concurrent_connections),
        }
    }
}
