//! Backend-agnostic data model and error taxonomy for the smallweb
//! Gopher/Gemini fetch engine.
//!
//! Nothing in this crate touches a socket or a filesystem: URL parsing,
//! menu/gemtext/MIME parsing and the `FetchResult` sum type are pure
//! functions over already-buffered bytes. The stateful pieces (TOFU
//! persistence, the response cache, the actual TCP/TLS transports) live in
//! `smallweb-local`, which depends on this crate for its vocabulary.

pub mod cache;
pub mod clientcert;
pub mod error;
pub mod gemtext;
pub mod menu;
pub mod mime;
pub mod result;
pub mod status;
pub mod tofu;
pub mod url;

pub use cache::CacheEntry;
pub use clientcert::{ClientCertEntry, ClientCertScope};
pub use error::{Error, Result};
pub use gemtext::{GemtextDocument, GemtextLine, GemtextLink};
pub use menu::GopherMenuItem;
pub use mime::Mime;
pub use result::{ErrorObject, FetchResult, RequestInfo};
pub use status::StatusClass;
pub use tofu::{TofuEntry, TofuOutcome};
pub use url::{GeminiUrl, GopherUrl};
