use std::fmt;
use std::sync::OnceLock;

use mitmcheck_types::{
    CipherCheck, Grade, IntList, Match, ParseError, StringList, TlsVersion,
};

use crate::signature::{IntSignature, StringSignature};

// Client request signature and fingerprint strings have the format
//   <version>:<cipher>:<extension>:<curve>:<ecpointfmt>:<header>:<quirk>
//
// For fingerprints, <version> is a single hex TLS version (or empty), the
// middle four parts are comma-separated hex int lists, and <header>/<quirk>
// are comma-separated string lists. For signatures, <version> is either one
// version or <min>,<exp>,<max>, and the list parts use the signature grammar
// of the signature module.

const REQUEST_FIELD_COUNT: usize = 7;
const REQUEST_FIELD_SEP: char = ':';

/// The observed TLS and HTTP features of one client request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestFingerprint {
    pub version: TlsVersion,
    pub cipher: IntList,
    pub extension: IntList,
    pub curve: IntList,
    pub ec_point_fmt: IntList,
    pub header: StringList,
    pub quirk: StringList,
}

impl RequestFingerprint {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = s.split(REQUEST_FIELD_SEP).collect();
        if fields.len() != REQUEST_FIELD_COUNT {
            return Err(ParseError::FieldCount {
                input: s.to_string(),
                expected: REQUEST_FIELD_COUNT,
                actual: fields.len(),
            });
        }
        Ok(RequestFingerprint {
            version: TlsVersion::parse(fields[0])?,
            cipher: IntList::parse(fields[1])?,
            extension: IntList::parse(fields[2])?,
            curve: IntList::parse(fields[3])?,
            ec_point_fmt: IntList::parse(fields[4])?,
            header: StringList::parse(fields[5])?,
            quirk: StringList::parse(fields[6])?,
        })
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            self.version,
            self.cipher,
            self.extension,
            self.curve,
            self.ec_point_fmt,
            self.header,
            self.quirk
        )
    }
}

/// A range constraint on the TLS version: `min`/`max` bound what is
/// acceptable at all, `exp` is the lowest version an unmodified client would
/// offer. Empty fields are unconstrained on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionSignature {
    pub min: TlsVersion,
    pub exp: TlsVersion,
    pub max: TlsVersion,
}

impl VersionSignature {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let mut sig = VersionSignature::default();
        if s.is_empty() {
            return Ok(sig);
        }
        let fields: Vec<&str> = s.split(',').collect();
        match fields.len() {
            1 => {
                sig.min = TlsVersion::parse(fields[0])?;
                sig.exp = sig.min;
                sig.max = sig.min;
            }
            3 => {
                sig.min = TlsVersion::parse(fields[0])?;
                sig.exp = TlsVersion::parse(fields[1])?;
                sig.max = TlsVersion::parse(fields[2])?;
            }
            _ => return Err(ParseError::InvalidVersion(s.to_string())),
        }
        if !sig.min.is_empty() {
            if !sig.exp.is_empty() && sig.min > sig.exp {
                return Err(ParseError::VersionOrder("min > exp"));
            }
            if !sig.max.is_empty() && sig.min > sig.max {
                return Err(ParseError::VersionOrder("min > max"));
            }
        }
        if !sig.exp.is_empty() && !sig.max.is_empty() && sig.exp > sig.max {
            return Err(ParseError::VersionOrder("exp > max"));
        }
        Ok(sig)
    }

    /// Match an observed version: below min or above max is impossible,
    /// below the expected version is unlikely.
    pub fn matches(&self, version: TlsVersion) -> Match {
        if !self.min.is_empty() && version < self.min {
            return Match::Impossible;
        }
        if !self.max.is_empty() && version > self.max {
            return Match::Impossible;
        }
        if !self.exp.is_empty() && version < self.exp {
            return Match::Unlikely;
        }
        Match::Possible
    }

    /// Widen to cover both inputs; an empty component on either side makes
    /// that edge unconstrained.
    pub fn merge(&self, other: &VersionSignature) -> VersionSignature {
        let low = |a: TlsVersion, b: TlsVersion| {
            if a.is_empty() || b.is_empty() {
                TlsVersion::EMPTY
            } else {
                a.min(b)
            }
        };
        let high = |a: TlsVersion, b: TlsVersion| {
            if a.is_empty() || b.is_empty() {
                TlsVersion::EMPTY
            } else {
                a.max(b)
            }
        };
        VersionSignature {
            min: low(self.min, other.min),
            exp: low(self.exp, other.exp),
            max: high(self.max, other.max),
        }
    }
}

impl fmt::Display for VersionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.exp && self.max == self.exp {
            write!(f, "{}", self.exp)
        } else {
            write!(f, "{},{},{}", self.min, self.exp, self.max)
        }
    }
}

/// A set of acceptable client requests. Many TLS/HTTPS implementations can
/// be uniquely identified by their request signature.
#[derive(Debug, Default)]
pub struct RequestSignature {
    pub version: VersionSignature,
    pub cipher: IntSignature,
    pub extension: IntSignature,
    pub curve: IntSignature,
    pub ec_point_fmt: IntSignature,
    pub header: StringSignature,
    pub quirk: StringSignature,

    grade: OnceLock<Grade>,
    pfs: OnceLock<bool>,
}

/// Per-field verdicts of a request signature match, in report priority
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestMatchMap {
    pub version: Match,
    pub cipher: Match,
    pub extension: Match,
    pub curve: Match,
    pub ec_point_fmt: Match,
    pub header: Match,
    pub quirk: Match,
}

impl RequestMatchMap {
    fn worst(&self) -> Match {
        let fields = [
            self.version,
            self.cipher,
            self.extension,
            self.curve,
            self.ec_point_fmt,
            self.header,
            self.quirk,
        ];
        if fields.contains(&Match::Impossible) {
            Match::Impossible
        } else if fields.contains(&Match::Unlikely) {
            Match::Unlikely
        } else {
            Match::Possible
        }
    }
}

impl RequestSignature {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = s.split(REQUEST_FIELD_SEP).collect();
        if fields.len() != REQUEST_FIELD_COUNT {
            return Err(ParseError::FieldCount {
                input: s.to_string(),
                expected: REQUEST_FIELD_COUNT,
                actual: fields.len(),
            });
        }
        Ok(RequestSignature {
            version: VersionSignature::parse(fields[0])?,
            cipher: IntSignature::parse(fields[1])?,
            extension: IntSignature::parse(fields[2])?,
            curve: IntSignature::parse(fields[3])?,
            ec_point_fmt: IntSignature::parse(fields[4])?,
            header: StringSignature::parse(fields[5])?,
            quirk: StringSignature::parse(fields[6])?,
            grade: OnceLock::new(),
            pfs: OnceLock::new(),
        })
    }

    /// The security grade of the ciphers this signature orders. Cached
    /// after the first call.
    pub fn grade(&self) -> Grade {
        *self.grade.get_or_init(|| match &self.cipher.ordered {
            Some(list) => CipherCheck::global().grade(list),
            None => Grade::Empty,
        })
    }

    /// True if the signature's cipher ordering offers perfect forward
    /// secrecy. Cached after the first call.
    pub fn is_pfs(&self) -> bool {
        *self.pfs.get_or_init(|| match &self.cipher.ordered {
            Some(list) => CipherCheck::global().is_first_pfs(list),
            None => false,
        })
    }

    /// Match a fingerprint against the signature: the worst per-field
    /// verdict, plus the similarity score summed over the four integer
    /// fields (used to pick the closest record when nothing is possible).
    pub fn matches(&self, fingerprint: &RequestFingerprint) -> (Match, usize) {
        let (map, similarity) = self.match_map(fingerprint);
        (map.worst(), similarity)
    }

    /// The per-field match verdicts and the similarity score.
    pub fn match_map(&self, fingerprint: &RequestFingerprint) -> (RequestMatchMap, usize) {
        let (cipher, s1) = self.cipher.matches(&fingerprint.cipher);
        let (extension, s2) = self.extension.matches(&fingerprint.extension);
        let (curve, s3) = self.curve.matches(&fingerprint.curve);
        let (ec_point_fmt, s4) = self.ec_point_fmt.matches(&fingerprint.ec_point_fmt);
        let map = RequestMatchMap {
            version: self.version.matches(fingerprint.version),
            cipher,
            extension,
            curve,
            ec_point_fmt,
            header: self.header.matches(&fingerprint.header).0,
            quirk: self.quirk.matches(&fingerprint.quirk).0,
        };
        (map, s1 + s2 + s3 + s4)
    }

    /// Merge field-wise; the caches start cold on the result.
    pub fn merge(&self, other: &RequestSignature) -> RequestSignature {
        RequestSignature {
            version: self.version.merge(&other.version),
            cipher: self.cipher.merge(&other.cipher),
            extension: self.extension.merge(&other.extension),
            curve: self.curve.merge(&other.curve),
            ec_point_fmt: self.ec_point_fmt.merge(&other.ec_point_fmt),
            header: self.header.merge(&other.header),
            quirk: self.quirk.merge(&other.quirk),
            grade: OnceLock::new(),
            pfs: OnceLock::new(),
        }
    }
}

impl Clone for RequestSignature {
    fn clone(&self) -> Self {
        RequestSignature {
            version: self.version,
            cipher: self.cipher.clone(),
            extension: self.extension.clone(),
            curve: self.curve.clone(),
            ec_point_fmt: self.ec_point_fmt.clone(),
            header: self.header.clone(),
            quirk: self.quirk.clone(),
            grade: OnceLock::new(),
            pfs: OnceLock::new(),
        }
    }
}

impl PartialEq for RequestSignature {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.cipher == other.cipher
            && self.extension == other.extension
            && self.curve == other.curve
            && self.ec_point_fmt == other.ec_point_fmt
            && self.header == other.header
            && self.quirk == other.quirk
    }
}

impl Eq for RequestSignature {}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            self.version,
            self.cipher,
            self.extension,
            self.curve,
            self.ec_point_fmt,
            self.header,
            self.quirk
        )
    }
}
