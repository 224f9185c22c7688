use std::fmt;

use mitmcheck_types::{Match, ParseError, StringList};

use crate::signature::StringSignature;

// User agent signature and fingerprint strings have the format
//   <br-name>:<br-vers>:<os-plat>:<os-name>:<os-vers>:<dev-type>:<quirk>
//
// The identity fields are the decimal enumerations produced by the external
// User-Agent parser; versions are <major>[.<minor>[.<patch>]] with empty
// components meaning "any" (unknown), and signature versions may carry a
// range <lo>-<hi>. On the signature side, an identity field of 0 is a
// wildcard.

const UA_FIELD_COUNT: usize = 7;
const UA_FIELD_SEP: char = ':';
const UA_VERSION_FIELD_SEP: char = '.';
const UA_VERSION_RANGE_SEP: char = '-';

/// Version component sentinel for "any" (unknown).
pub const ANY_VERSION: i32 = -1;

/// A browser or OS version triple. `-1` components are unknown; on the
/// fingerprint side unknown does not wildcard-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UaVersion {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl UaVersion {
    pub const ANY: UaVersion = UaVersion {
        major: ANY_VERSION,
        minor: ANY_VERSION,
        patch: ANY_VERSION,
    };

    pub fn new(major: i32, minor: i32, patch: i32) -> UaVersion {
        UaVersion {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(s: &str) -> Result<UaVersion, ParseError> {
        let mut version = UaVersion::ANY;
        if s.is_empty() {
            return Ok(version);
        }
        let fields: Vec<&str> = s.split(UA_VERSION_FIELD_SEP).collect();
        if fields.len() > 3 {
            return Err(ParseError::InvalidVersion(s.to_string()));
        }
        let parse_component = |field: &str| -> Result<i32, ParseError> {
            if field.is_empty() {
                Ok(ANY_VERSION)
            } else {
                field
                    .parse::<i32>()
                    .map_err(|_| ParseError::InvalidInt(field.to_string()))
            }
        };
        version.major = parse_component(fields[0])?;
        if let Some(minor) = fields.get(1).copied() {
            version.minor = parse_component(minor)?;
        }
        if let Some(patch) = fields.get(2).copied() {
            version.patch = parse_component(patch)?;
        }
        Ok(version)
    }

    /// True if a fingerprint version is at or above this lower bound.
    /// Comparison is lexicographic; an "any" signature component accepts
    /// everything from that level down.
    fn min_match(self, fingerprint: UaVersion) -> bool {
        if self.major == ANY_VERSION {
            return true;
        }
        if self.major != fingerprint.major {
            return self.major < fingerprint.major;
        }
        if self.minor == ANY_VERSION {
            return true;
        }
        if self.minor != fingerprint.minor {
            return self.minor < fingerprint.minor;
        }
        if self.patch == ANY_VERSION {
            return true;
        }
        self.patch <= fingerprint.patch
    }

    /// True if a fingerprint version is at or below this upper bound.
    fn max_match(self, fingerprint: UaVersion) -> bool {
        if self.major == ANY_VERSION {
            return true;
        }
        if self.major != fingerprint.major {
            return self.major > fingerprint.major;
        }
        if self.minor == ANY_VERSION {
            return true;
        }
        if self.minor != fingerprint.minor {
            return self.minor > fingerprint.minor;
        }
        if self.patch == ANY_VERSION {
            return true;
        }
        self.patch >= fingerprint.patch
    }

    /// The lower of two versions; disagreement at a level makes everything
    /// below it "any".
    fn min_merge(self, other: UaVersion) -> UaVersion {
        if self.major == ANY_VERSION || other.major == ANY_VERSION {
            return UaVersion::ANY;
        }
        if self.major != other.major {
            return if self.major < other.major { self } else { other };
        }
        if self.minor == ANY_VERSION || other.minor == ANY_VERSION {
            return UaVersion::new(self.major, ANY_VERSION, ANY_VERSION);
        }
        if self.minor != other.minor {
            return if self.minor < other.minor { self } else { other };
        }
        if self.patch == ANY_VERSION || other.patch == ANY_VERSION {
            return UaVersion::new(self.major, self.minor, ANY_VERSION);
        }
        if self.patch <= other.patch { self } else { other }
    }

    /// The higher of two versions, widening to "any" on disagreement as
    /// `min_merge` does.
    fn max_merge(self, other: UaVersion) -> UaVersion {
        if self.major == ANY_VERSION || other.major == ANY_VERSION {
            return UaVersion::ANY;
        }
        if self.major != other.major {
            return if self.major > other.major { self } else { other };
        }
        if self.minor == ANY_VERSION || other.minor == ANY_VERSION {
            return UaVersion::new(self.major, ANY_VERSION, ANY_VERSION);
        }
        if self.minor != other.minor {
            return if self.minor > other.minor { self } else { other };
        }
        if self.patch == ANY_VERSION || other.patch == ANY_VERSION {
            return UaVersion::new(self.major, self.minor, ANY_VERSION);
        }
        if self.patch >= other.patch { self } else { other }
    }
}

impl fmt::Display for UaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.major == ANY_VERSION {
            return Ok(());
        }
        write!(f, "{}", self.major)?;
        if self.minor == ANY_VERSION {
            return Ok(());
        }
        write!(f, ".{}", self.minor)?;
        if self.patch == ANY_VERSION {
            return Ok(());
        }
        write!(f, ".{}", self.patch)
    }
}

/// An inclusive range of acceptable user agent versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UaVersionSignature {
    pub min: UaVersion,
    pub max: UaVersion,
}

impl UaVersionSignature {
    pub fn parse(s: &str) -> Result<UaVersionSignature, ParseError> {
        let mut sig = UaVersionSignature::default();
        match s.split_once(UA_VERSION_RANGE_SEP) {
            Some((lo, hi)) => {
                sig.min = UaVersion::parse(lo)?;
                sig.max = UaVersion::parse(hi)?;
            }
            None => {
                sig.min = UaVersion::parse(s)?;
                sig.max = sig.min;
            }
        }
        Ok(sig)
    }

    pub fn matches(&self, fingerprint: UaVersion) -> Match {
        if self.min.min_match(fingerprint) && self.max.max_match(fingerprint) {
            Match::Possible
        } else {
            Match::Impossible
        }
    }

    pub fn merge(&self, other: &UaVersionSignature) -> UaVersionSignature {
        UaVersionSignature {
            min: self.min.min_merge(other.min),
            max: self.max.max_merge(other.max),
        }
    }
}

impl fmt::Display for UaVersionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

/// The parsed identity of one client's User-Agent header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UaFingerprint {
    pub browser_name: i32,
    pub browser_version: UaVersion,
    pub os_platform: i32,
    pub os_name: i32,
    pub os_version: UaVersion,
    pub device_type: i32,
    pub quirk: StringList,
}

impl UaFingerprint {
    pub fn parse(s: &str) -> Result<UaFingerprint, ParseError> {
        let fields: Vec<&str> = s.split(UA_FIELD_SEP).collect();
        if fields.len() != UA_FIELD_COUNT {
            return Err(ParseError::FieldCount {
                input: s.to_string(),
                expected: UA_FIELD_COUNT,
                actual: fields.len(),
            });
        }
        Ok(UaFingerprint {
            browser_name: parse_int(fields[0])?,
            browser_version: UaVersion::parse(fields[1])?,
            os_platform: parse_int(fields[2])?,
            os_name: parse_int(fields[3])?,
            os_version: UaVersion::parse(fields[4])?,
            device_type: parse_int(fields[5])?,
            quirk: StringList::parse(fields[6])?,
        })
    }
}

impl fmt::Display for UaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            self.browser_name,
            self.browser_version,
            self.os_platform,
            self.os_name,
            self.os_version,
            self.device_type,
            self.quirk
        )
    }
}

/// A set of user agents: identity fields (0 = wildcard), version ranges,
/// and a quirk signature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UaSignature {
    pub browser_name: i32,
    pub browser_version: UaVersionSignature,
    pub os_platform: i32,
    pub os_name: i32,
    pub os_version: UaVersionSignature,
    pub device_type: i32,
    pub quirk: StringSignature,
}

impl UaSignature {
    pub fn parse(s: &str) -> Result<UaSignature, ParseError> {
        let fields: Vec<&str> = s.split(UA_FIELD_SEP).collect();
        if fields.len() != UA_FIELD_COUNT {
            return Err(ParseError::FieldCount {
                input: s.to_string(),
                expected: UA_FIELD_COUNT,
                actual: fields.len(),
            });
        }
        Ok(UaSignature {
            browser_name: parse_int(fields[0])?,
            browser_version: UaVersionSignature::parse(fields[1])?,
            os_platform: parse_int(fields[2])?,
            os_name: parse_int(fields[3])?,
            os_version: UaVersionSignature::parse(fields[4])?,
            device_type: parse_int(fields[5])?,
            quirk: StringSignature::parse(fields[6])?,
        })
    }

    /// Match a user agent fingerprint: non-wildcard identity fields must
    /// agree, versions must fall in range, quirks match by the string
    /// signature rules.
    pub fn matches(&self, fingerprint: &UaFingerprint) -> Match {
        if self.browser_name != 0 && self.browser_name != fingerprint.browser_name {
            return Match::Impossible;
        }
        if self.os_platform != 0 && self.os_platform != fingerprint.os_platform {
            return Match::Impossible;
        }
        if self.os_name != 0 && self.os_name != fingerprint.os_name {
            return Match::Impossible;
        }
        if self.device_type != 0 && self.device_type != fingerprint.device_type {
            return Match::Impossible;
        }

        let browser_version = self.browser_version.matches(fingerprint.browser_version);
        let os_version = self.os_version.matches(fingerprint.os_version);
        let (quirk, _) = self.quirk.matches(&fingerprint.quirk);
        for verdict in [browser_version, os_version, quirk] {
            if verdict == Match::Impossible {
                return Match::Impossible;
            }
        }
        for verdict in [browser_version, os_version, quirk] {
            if verdict == Match::Unlikely {
                return Match::Unlikely;
            }
        }
        Match::Possible
    }

    /// Merge to cover both signatures: disagreeing identity fields widen to
    /// the wildcard (and their version ranges to "any"), agreeing fields
    /// keep their value and merge the ranges.
    pub fn merge(&self, other: &UaSignature) -> UaSignature {
        let mut merged = UaSignature::default();
        if self.browser_name == other.browser_name {
            merged.browser_name = self.browser_name;
            merged.browser_version = self.browser_version.merge(&other.browser_version);
        } else {
            merged.browser_version = UaVersionSignature {
                min: UaVersion::ANY,
                max: UaVersion::ANY,
            };
        }
        if self.os_platform == other.os_platform {
            merged.os_platform = self.os_platform;
        }
        if self.os_name == other.os_name {
            merged.os_name = self.os_name;
            merged.os_version = self.os_version.merge(&other.os_version);
        } else {
            merged.os_version = UaVersionSignature {
                min: UaVersion::ANY,
                max: UaVersion::ANY,
            };
        }
        if self.device_type == other.device_type {
            merged.device_type = self.device_type;
        }
        merged.quirk = self.quirk.merge(&other.quirk);
        merged
    }
}

impl fmt::Display for UaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            self.browser_name,
            self.browser_version,
            self.os_platform,
            self.os_name,
            self.os_version,
            self.device_type,
            self.quirk
        )
    }
}

fn parse_int(s: &str) -> Result<i32, ParseError> {
    s.parse::<i32>()
        .map_err(|_| ParseError::InvalidInt(s.to_string()))
}
