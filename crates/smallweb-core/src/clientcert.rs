//! Client-certificate entry data model. Selection and on-disk storage live
//! in `smallweb-local::clientcert`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCertScope {
    pub host: String,
    pub port: u16,
    pub path_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCertEntry {
    pub scope: ClientCertScope,
    pub key_material: Vec<u8>,
    pub cert_material: Vec<u8>,
    pub fingerprint: String,
    pub not_before: u64,
    pub not_after: u64,
}

impl ClientCertEntry {
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.not_after || now < self.not_before
    }
}
