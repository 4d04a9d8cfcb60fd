#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("security violation: {0}")]
    SecurityViolation(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("tls error: {0}")]
    TlsError(String),
    #[error("certificate mismatch for {host}:{port}")]
    CertificateMismatch { host: String, port: u16 },
    #[error("certificate expired for {host}:{port}")]
    CertificateExpired { host: String, port: u16 },
    #[error("protocol error: {0}")]
    ProtocolError(String),
    #[error("response too large: {actual} bytes exceeds cap of {cap} bytes")]
    ResponseTooLarge { actual: u64, cap: u64 },
    #[error("too many redirects: exceeded max of {0}")]
    TooManyRedirects(u32),
    #[error("fetch failed: {0}")]
    FetchError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The `ErrorResult.error.code` string from the error taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidUrl(_) => "InvalidUrl",
            Error::SecurityViolation(_) => "SecurityViolation",
            Error::Timeout(_) => "Timeout",
            Error::NetworkError(_) => "NetworkError",
            Error::TlsError(_) => "TLSError",
            Error::CertificateMismatch { .. } => "CertificateMismatch",
            Error::CertificateExpired { .. } => "CertificateExpired",
            Error::ProtocolError(_) => "ProtocolError",
            Error::ResponseTooLarge { .. } => "ResponseTooLarge",
            Error::TooManyRedirects(_) => "TooManyRedirects",
            Error::FetchError(_) => "FetchError",
        }
    }

    /// Whether the error was recovered from a transient condition and a
    /// retry by the host might succeed. Nothing here is retried
    /// automatically; this is advisory only.
    pub fn retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::NetworkError(_))
    }
}
