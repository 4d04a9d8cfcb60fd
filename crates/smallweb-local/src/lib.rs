//! The real Gopher/Gemini engine: URL codecs live in `smallweb-core`, and
//! everything stateful or I/O-bound — TOFU persistence, client-cert
//! selection, the TLS dialer, the Gopher/Gemini transports, the response
//! cache, the security gate, and the fetch façade that glues them — lives
//! here.

pub mod cache;
pub mod clientcert;
pub mod config;
pub mod engine;
pub mod gemini;
pub mod gopher;
pub mod mime_guess;
pub mod security;
pub mod tls;
pub mod tofu;

pub use cache::ResponseCache;
pub use clientcert::ClientCertStore;
pub use config::Config;
pub use engine::SmallwebEngine;
pub use gemini::GeminiClient;
pub use gopher::GopherClient;
pub use security::SecurityGate;
pub use tofu::TofuStore;
