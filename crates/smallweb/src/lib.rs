//! Public facade crate for `smallweb`.
//!
//! This crate intentionally contains no IO. It re-exports the
//! backend-agnostic types from `smallweb-core` for embedders that only
//! need the data model (e.g. to deserialize tool results) without the
//! transport/engine dependency tree of `smallweb-local`.

pub use smallweb_core as core;
pub use smallweb_core::*;
