//! Client-certificate store and scope selection. Creation and import are
//! out-of-band admin operations; this store only reads material that
//! already exists on disk, laid out as
//! `{storage_dir}/{scope_hash}.key` / `.crt` / `.meta.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use smallweb_core::{ClientCertEntry, ClientCertScope};

#[derive(Serialize, Deserialize)]
struct ScopeMeta {
    host: String,
    port: u16,
    path_prefix: String,
    fingerprint: String,
    not_before: u64,
    not_after: u64,
}

pub struct ClientCertStore {
    entries: Vec<ClientCertEntry>,
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn scope_hash(host: &str, port: u16, path_prefix: &str) -> String {
    let mut h = Sha256::new();
    h.update(host.as_bytes());
    h.update(b":");
    h.update(port.to_string().as_bytes());
    h.update(b":");
    h.update(path_prefix.as_bytes());
    hex::encode(h.finalize())
}

impl ClientCertStore {
    /// A missing directory is an empty store, not an error.
    pub fn load(dir: &Path) -> Self {
        let mut entries = Vec::new();
        let Ok(read_dir) = fs::read_dir(dir) else {
            return ClientCertStore { entries };
        };
        for item in read_dir.flatten() {
            let meta_path = item.path();
            if meta_path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(meta_bytes) = fs::read(&meta_path) else { continue };
            let Ok(meta): std::result::Result<ScopeMeta, _> = serde_json::from_slice(&meta_bytes) else { continue };
            let stem = meta_path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let key_path = dir.join(format!("{stem}.key"));
            let cert_path = dir.join(format!("{stem}.crt"));
            let (Ok(key_material), Ok(cert_material)) = (fs::read(&key_path), fs::read(&cert_path)) else { continue };
            entries.push(ClientCertEntry {
                scope: ClientCertScope { host: meta.host, port: meta.port, path_prefix: meta.path_prefix },
                key_material,
                cert_material,
                fingerprint: meta.fingerprint,
                not_before: meta.not_before,
                not_after: meta.not_after,
            });
        }
        ClientCertStore { entries }
    }

    /// Select by exact `(host, port)` and longest-prefix `path_prefix`
    /// match. Expired certificates are treated as "no cert" (logged, not
    /// returned) rather than presented.
    pub fn select(&self, host: &str, port: u16, path: &str) -> Option<&ClientCertEntry> {
        let now = now_secs();
        self.entries
            .iter()
            .filter(|e| e.scope.host.eq_ignore_ascii_case(host) && e.scope.port == port && path.starts_with(&e.scope.path_prefix))
            .filter(|e| {
                if e.is_expired(now) {
                    tracing::warn!(host, port, "client certificate expired, not presenting");
                    false
                } else {
                    true
                }
            })
            .max_by_key(|e| e.scope.path_prefix.len())
    }

    /// Persist a pre-existing key/cert pair under a scope. Out-of-band
    /// admin helper; the fetch path only calls `select`.
    pub fn import(dir: &Path, entry: &ClientCertEntry) -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        let stem = scope_hash(&entry.scope.host, entry.scope.port, &entry.scope.path_prefix);
        fs::write(dir.join(format!("{stem}.key")), &entry.key_material)?;
        fs::write(dir.join(format!("{stem}.crt")), &entry.cert_material)?;
        let meta = ScopeMeta {
            host: entry.scope.host.clone(),
            port: entry.scope.port,
            path_prefix: entry.scope.path_prefix.clone(),
            fingerprint: entry.fingerprint.clone(),
            not_before: entry.not_before,
            not_after: entry.not_after,
        };
        fs::write(dir.join(format!("{stem}.json")), serde_json::to_vec(&meta)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path_prefix: &str, not_after: u64) -> ClientCertEntry {
        ClientCertEntry {
            scope: ClientCertScope { host: "example.org".into(), port: 1965, path_prefix: path_prefix.into() },
            key_material: b"key".to_vec(),
            cert_material: b"cert".to_vec(),
            fingerprint: "fp".into(),
            not_before: 0,
            not_after,
        }
    }

    #[test]
    fn missing_dir_is_empty_store() {
        let store = ClientCertStore::load(Path::new("/does/not/exist"));
        assert!(store.select("example.org", 1965, "/").is_none());
    }

    #[test]
    fn import_then_select_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        ClientCertStore::import(dir.path(), &entry("/secure", now_secs() + 3600)).unwrap();
        let store = ClientCertStore::load(dir.path());
        let selected = store.select("example.org", 1965, "/secure/area").unwrap();
        assert_eq!(selected.scope.path_prefix, "/secure");
    }

    #[test]
    fn no_match_when_host_or_port_differ() {
        let dir = tempfile::tempdir().unwrap();
        ClientCertStore::import(dir.path(), &entry("/", now_secs() + 3600)).unwrap();
        let store = ClientCertStore::load(dir.path());
        assert!(store.select("other.org", 1965, "/").is_none());
        assert!(store.select("example.org", 70, "/").is_none());
    }

    #[test]
    fn expired_cert_is_treated_as_no_cert() {
        let dir = tempfile::tempdir().unwrap();
        ClientCertStore::import(dir.path(), &entry("/", 0)).unwrap();
        let store = ClientCertStore::load(dir.path());
        assert!(store.select("example.org", 1965, "/").is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let dir = tempfile::tempdir().unwrap();
        ClientCertStore::import(dir.path(), &entry("/", now_secs() + 3600)).unwrap();
        ClientCertStore::import(dir.path(), &entry("/secure", now_secs() + 3600)).unwrap();
        let store = ClientCertStore::load(dir.path());
        let selected = store.select("example.org", 1965, "/secure/area").unwrap();
        assert_eq!(selected.scope.path_prefix, "/secure");
    }
}
