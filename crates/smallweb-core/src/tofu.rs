//! TOFU (Trust-On-First-Use) entry data model. The store's
//! `check`/`remember` operations and file persistence live in
//! `smallweb-local::tofu`; this is just the record shape and outcome enum.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TofuEntry {
    pub host: String,
    pub port: u16,
    /// SHA-256 hex of the peer leaf certificate's DER encoding.
    pub fingerprint: String,
    pub first_seen: u64,
    pub last_seen: u64,
    pub expires: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TofuOutcome {
    TrustedNew,
    TrustedMatch,
    Mismatch,
    Expired,
}
