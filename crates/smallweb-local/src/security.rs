//! Host allowlist and length/port perimeter checked before any socket is
//! opened. Error message wording ("Host not allowed", "Invalid port
//! number") is kept stable since callers match on it.

use smallweb_core::Error;

#[derive(Debug, Clone)]
pub struct SecurityGate {
    allowed_hosts: Option<Vec<String>>,
    max_selector_length: usize,
    max_search_length: usize,
}

impl SecurityGate {
    pub fn new(allowed_hosts: Option<Vec<String>>, max_selector_length: usize, max_search_length: usize) -> Self {
        SecurityGate { allowed_hosts, max_selector_length, max_search_length }
    }

    fn check_host_and_port(&self, host: &str, port: u16) -> Result<(), Error> {
        if !(1..=65535).contains(&port) {
            return Err(Error::SecurityViolation(format!("invalid port number: {port}")));
        }
        if let Some(allowed) = &self.allowed_hosts {
            let ok = allowed.iter().any(|h| h.eq_ignore_ascii_case(host));
            if !ok {
                return Err(Error::SecurityViolation(format!("host not allowed: {host}")));
            }
        }
        Ok(())
    }

    pub fn check_gopher(&self, host: &str, port: u16, selector: &str, search: Option<&str>) -> Result<(), Error> {
        self.check_host_and_port(host, port)?;
        if selector.len() > self.max_selector_length {
            return Err(Error::SecurityViolation(format!(
                "selector exceeds max length of {}",
                self.max_selector_length
            )));
        }
        if let Some(search) = search {
            if search.len() > self.max_search_length {
                return Err(Error::SecurityViolation(format!(
                    "search exceeds max length of {}",
                    self.max_search_length
                )));
            }
        }
        Ok(())
    }

    pub fn check_gemini(&self, host: &str, port: u16, serialised_url_len: usize) -> Result<(), Error> {
        self.check_host_and_port(host, port)?;
        if serialised_url_len > 1024 {
            return Err(Error::SecurityViolation("gemini url exceeds 1024 bytes".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_allowlist_permits_any_host() {
        let gate = SecurityGate::new(None, 1024, 256);
        assert!(gate.check_gopher("anything.example.org", 70, "/", None).is_ok());
    }

    #[test]
    fn allowlist_rejects_nonmember_host() {
        let gate = SecurityGate::new(Some(vec!["allowed.example.org".into()]), 1024, 256);
        assert!(gate.check_gopher("other.example.org", 70, "/", None).is_err());
        assert!(gate.check_gopher("ALLOWED.example.org", 70, "/", None).is_ok());
    }

    #[test]
    fn rejects_out_of_range_port() {
        let gate = SecurityGate::new(None, 1024, 256);
        assert!(gate.check_gopher("example.org", 0, "/", None).is_err());
        assert!(gate.check_gemini("example.org", 70000, 10).is_err());
    }

    #[test]
    fn rejects_oversize_selector_and_search() {
        let gate = SecurityGate::new(None, 10, 5);
        assert!(gate.check_gopher("example.org", 70, &"a".repeat(11), None).is_err());
        assert!(gate.check_gopher("example.org", 70, "/", Some(&"a".repeat(6))).is_err());
    }

    #[test]
    fn rejects_oversize_gemini_url() {
        let gate = SecurityGate::new(None, 1024, 256);
        assert!(gate.check_gemini("example.org", 1965, 1025).is_ok() == false);
        assert!(gate.check_gemini("example.org", 1965, 1024).is_ok());
    }
}
