use std::fmt;

use crate::{Grade, ParseError};

/// A TLS protocol version as seen on the wire.
///
/// Known codes:
///  - SSL2.0: https://www-archive.mozilla.org/projects/security/pki/nss/ssl/draft02.html
///  - SSL3.0: https://tools.ietf.org/html/draft-ietf-tls-ssl-version3-00#appendix-A.1.1
///  - TLS1.0: https://tools.ietf.org/html/draft-ietf-tls-protocol-01#appendix-A.2
///  - TLS1.1: https://www.ietf.org/rfc/rfc4346.txt
///  - TLS1.2: https://www.ietf.org/rfc/rfc5246.txt
///  - TLS1.3: https://tools.ietf.org/html/rfc8446#section-4.2.1
///
/// Unknown codes round-trip as opaque hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TlsVersion(pub u16);

impl TlsVersion {
    pub const EMPTY: TlsVersion = TlsVersion(0);
    pub const SSL2: TlsVersion = TlsVersion(0x0200);
    pub const SSL3: TlsVersion = TlsVersion(0x0300);
    pub const TLS1_0: TlsVersion = TlsVersion(0x0301);
    pub const TLS1_1: TlsVersion = TlsVersion(0x0302);
    pub const TLS1_2: TlsVersion = TlsVersion(0x0303);
    pub const TLS1_3: TlsVersion = TlsVersion(0x0304);

    /// Parse a version from its hex wire form. The empty string is the
    /// empty sentinel; leading zeros are accepted ("303" == "0303").
    pub fn parse(s: &str) -> Result<TlsVersion, ParseError> {
        if s.is_empty() {
            return Ok(TlsVersion::EMPTY);
        }
        u16::from_str_radix(s, 16)
            .map(TlsVersion)
            .map_err(|_| ParseError::InvalidVersion(s.to_string()))
    }

    pub fn is_empty(self) -> bool {
        self == TlsVersion::EMPTY
    }

    /// Security grade for the version alone.
    pub fn grade(self) -> Grade {
        match self {
            TlsVersion::EMPTY => Grade::Empty,
            TlsVersion::TLS1_2 | TlsVersion::TLS1_3 => Grade::A,
            TlsVersion::TLS1_0 | TlsVersion::TLS1_1 => Grade::B,
            TlsVersion::SSL3 => Grade::C,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            Ok(())
        } else {
            write!(f, "{:x}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_versions() {
        assert_eq!(TlsVersion::parse("").unwrap(), TlsVersion::EMPTY);
        assert_eq!(TlsVersion::parse("200").unwrap(), TlsVersion::SSL2);
        assert_eq!(TlsVersion::parse("0200").unwrap(), TlsVersion::SSL2);
        assert_eq!(TlsVersion::parse("300").unwrap(), TlsVersion::SSL3);
        assert_eq!(TlsVersion::parse("301").unwrap(), TlsVersion::TLS1_0);
        assert_eq!(TlsVersion::parse("302").unwrap(), TlsVersion::TLS1_1);
        assert_eq!(TlsVersion::parse("303").unwrap(), TlsVersion::TLS1_2);
        assert_eq!(TlsVersion::parse("0304").unwrap(), TlsVersion::TLS1_3);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(TlsVersion::parse("3.3").is_err());
        assert!(TlsVersion::parse("30303").is_err());
        assert!(TlsVersion::parse("xyz").is_err());
    }

    #[test]
    fn unknown_codes_round_trip() {
        let v = TlsVersion::parse("7f14").unwrap();
        assert_eq!(v, TlsVersion(0x7f14));
        assert_eq!(v.to_string(), "7f14");
    }

    #[test]
    fn format_round_trip() {
        for s in ["", "200", "300", "301", "302", "303", "304"] {
            assert_eq!(TlsVersion::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn version_ordering() {
        assert!(TlsVersion::SSL2 < TlsVersion::SSL3);
        assert!(TlsVersion::SSL3 < TlsVersion::TLS1_0);
        assert!(TlsVersion::TLS1_2 < TlsVersion::TLS1_3);
        assert!(TlsVersion::EMPTY < TlsVersion::SSL2);
    }

    #[test]
    fn grades() {
        assert_eq!(TlsVersion::EMPTY.grade(), Grade::Empty);
        assert_eq!(TlsVersion::TLS1_3.grade(), Grade::A);
        assert_eq!(TlsVersion::TLS1_2.grade(), Grade::A);
        assert_eq!(TlsVersion::TLS1_1.grade(), Grade::B);
        assert_eq!(TlsVersion::TLS1_0.grade(), Grade::B);
        assert_eq!(TlsVersion::SSL3.grade(), Grade::C);
        assert_eq!(TlsVersion::SSL2.grade(), Grade::F);
        assert_eq!(TlsVersion(0x7f14).grade(), Grade::F);
    }
}
