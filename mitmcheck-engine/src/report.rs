use serde::{Serialize, Serializer};

use mitmcheck_fp::MitmType;
use mitmcheck_types::{Grade, Match};

/// Why a check could not produce a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// The user agent does not match any known browser signature.
    #[error("unknown_user_agent")]
    UnknownUserAgent,
}

impl Serialize for CheckError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// MITM detection results for one request.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Report {
    /// The matched browser user agent signature.
    pub matched_ua_signature: String,

    /// The request signature of the matched browser.
    pub browser_signature: String,

    /// Match result of the actual fingerprint versus the browser signature.
    pub browser_signature_match: Match,

    /// Reason for a mismatch between the fingerprint and the signature.
    pub reason: String,

    /// Additional detail for the reason ("<signature field> vs <observed>").
    pub reason_details: String,

    /// Expected security grade for the browser without interference.
    pub browser_grade: Grade,

    /// Actual security grade of the request.
    pub actual_grade: Grade,

    /// True if the request offers ciphers with known attacks.
    pub weak_ciphers: bool,

    /// True if an interceptor cost the session perfect forward secrecy.
    pub loses_pfs: bool,

    /// Request signature of the matched MITM software, if any.
    pub matched_mitm_signature: String,

    /// Canonical vendor names of the matched MITM software, if any.
    pub matched_mitm_name: String,

    /// Classification of the matched MITM software, if any.
    pub matched_mitm_type: MitmType,

    /// Set when the user agent matches no known browser signature.
    pub error: Option<CheckError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_to_readable_json() {
        let report = Report {
            browser_signature_match: Match::Impossible,
            reason: "impossible_cipher".to_string(),
            browser_grade: Grade::A,
            actual_grade: Grade::B,
            matched_mitm_name: "bluecoat".to_string(),
            matched_mitm_type: MitmType::Proxy,
            ..Report::default()
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["browser_signature_match"], "impossible");
        assert_eq!(json["reason"], "impossible_cipher");
        assert_eq!(json["browser_grade"], "A");
        assert_eq!(json["actual_grade"], "B");
        assert_eq!(json["matched_mitm_type"], "proxy");
        assert_eq!(json["error"], serde_json::Value::Null);
        assert_eq!(json["loses_pfs"], false);
    }

    #[test]
    fn unknown_user_agent_serializes_as_sentinel() {
        let report = Report {
            error: Some(CheckError::UnknownUserAgent),
            ..Report::default()
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["error"], "unknown_user_agent");
        assert_eq!(json["browser_signature_match"], "empty");
    }
}
