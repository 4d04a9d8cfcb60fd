//! Gemini status-code classification. Pure classification only — reading
//! the status line and the body is the transport's job, in `smallweb-local`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Input { sensitive: bool },
    Success,
    Redirect { permanent: bool },
    TemporaryFailure,
    PermanentFailure,
    ClientCertificate { required: bool, not_authorised: bool, not_valid: bool },
    Unknown,
}

/// Classify a two-digit Gemini status code. Statuses outside any known
/// sub-range within a valid class ([10,69]) degrade to that class's
/// generic variant (`Input`/`Success`/etc.); a status outside `[10,69]`
/// entirely is `Unknown` (caller surfaces `ProtocolError`).
pub fn classify(status: u8) -> StatusClass {
    match status {
        10 => StatusClass::Input { sensitive: false },
        11 => StatusClass::Input { sensitive: true },
        20..=29 => StatusClass::Success,
        30 => StatusClass::Redirect { permanent: false },
        31 => StatusClass::Redirect { permanent: true },
        32..=39 => StatusClass::Redirect { permanent: false },
        40..=49 => StatusClass::TemporaryFailure,
        50..=59 => StatusClass::PermanentFailure,
        60 => StatusClass::ClientCertificate { required: true, not_authorised: false, not_valid: false },
        61 => StatusClass::ClientCertificate { required: false, not_authorised: true, not_valid: false },
        62 => StatusClass::ClientCertificate { required: false, not_authorised: false, not_valid: true },
        63..=69 => StatusClass::ClientCertificate { required: false, not_authorised: false, not_valid: false },
        _ => StatusClass::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_statuses() {
        assert_eq!(classify(10), StatusClass::Input { sensitive: false });
        assert_eq!(classify(11), StatusClass::Input { sensitive: true });
    }

    #[test]
    fn success_range() {
        assert_eq!(classify(20), StatusClass::Success);
        assert_eq!(classify(29), StatusClass::Success);
    }

    #[test]
    fn redirect_permanence() {
        assert_eq!(classify(30), StatusClass::Redirect { permanent: false });
        assert_eq!(classify(31), StatusClass::Redirect { permanent: true });
    }

    #[test]
    fn client_cert_subcodes() {
        assert_eq!(classify(60), StatusClass::ClientCertificate { required: true, not_authorised: false, not_valid: false });
        assert_eq!(classify(61), StatusClass::ClientCertificate { required: false, not_authorised: true, not_valid: false });
        assert_eq!(classify(62), StatusClass::ClientCertificate { required: false, not_authorised: false, not_valid: true });
    }

    #[test]
    fn out_of_range_is_unknown() {
        assert_eq!(classify(5), StatusClass::Unknown);
        assert_eq!(classify(70), StatusClass::Unknown);
    }
}
