//! TOFU (Trust-On-First-Use) fingerprint store: first-use-wins, a
//! mismatch is rejected rather than silently replaced, and persistence
//! uses an atomic rename on write (via `tempfile`) so a crash mid-write
//! never leaves a half-written store.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use smallweb_core::{TofuEntry, TofuOutcome};

pub struct TofuStore {
    path: PathBuf,
    entries: Mutex<HashMap<(String, u16), TofuEntry>>,
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

impl TofuStore {
    /// Loads the persisted store, if present. A missing path is treated as
    /// an empty store; corrupt lines are skipped with a warning rather than
    /// refusing to start.
    pub fn load(path: PathBuf) -> Self {
        let mut entries = HashMap::new();
        if let Ok(file) = fs::File::open(&path) {
            let reader = std::io::BufReader::new(file);
            for line in reader.lines().map_while(std::result::Result::ok) {
                match parse_line(&line) {
                    Some(entry) => {
                        entries.insert((entry.host.clone(), entry.port), entry);
                    }
                    None if line.trim().is_empty() => {}
                    None => tracing::warn!(%line, "skipping corrupt tofu store line"),
                }
            }
        }
        TofuStore { path, entries: Mutex::new(entries) }
    }

    pub fn check(&self, host: &str, port: u16, fingerprint: &str) -> TofuOutcome {
        let now = now_secs();
        let mut guard = self.entries.lock().unwrap();
        match guard.get_mut(&(host.to_string(), port)) {
            None => TofuOutcome::TrustedNew,
            Some(entry) => {
                if let Some(expires) = entry.expires {
                    if expires < now {
                        return TofuOutcome::Expired;
                    }
                }
                if entry.fingerprint == fingerprint {
                    entry.last_seen = now;
                    TofuOutcome::TrustedMatch
                } else {
                    TofuOutcome::Mismatch
                }
            }
        }
    }

    /// Atomic upsert. Only called after `check` returns `TrustedNew` (a
    /// mismatch never silently replaces — the caller surfaces
    /// `CertificateMismatch` instead of calling `remember`).
    pub fn remember(&self, host: &str, port: u16, fingerprint: &str, expires: Option<u64>) -> std::io::Result<()> {
        let now = now_secs();
        {
            let mut guard = self.entries.lock().unwrap();
            let key = (host.to_string(), port);
            let first_seen = guard.get(&key).map(|e| e.first_seen).unwrap_or(now);
            guard.insert(
                key,
                TofuEntry { host: host.to_string(), port, fingerprint: fingerprint.to_string(), first_seen, last_seen: now, expires },
            );
        }
        self.persist()
    }

    fn persist(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let guard = self.entries.lock().unwrap();
        let mut body = String::new();
        for entry in guard.values() {
            body.push_str(&format_line(entry));
            body.push('\n');
        }
        write_atomic(&self.path, body.as_bytes())
    }
}

fn format_line(entry: &TofuEntry) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        entry.host,
        entry.port,
        entry.fingerprint,
        entry.first_seen,
        entry.last_seen,
        entry.expires.map(|e| e.to_string()).unwrap_or_else(|| "-".to_string())
    )
}

fn parse_line(line: &str) -> Option<TofuEntry> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() != 6 {
        return None;
    }
    Some(TofuEntry {
        host: parts[0].to_string(),
        port: parts[1].parse().ok()?,
        fingerprint: parts[2].to_string(),
        first_seen: parts[3].parse().ok()?,
        last_seen: parts[4].parse().ok()?,
        expires: if parts[5] == "-" { None } else { parts[5].parse().ok() },
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
