use std::fmt;

use serde::{Serialize, Serializer};

use mitmcheck_types::{Grade, Match, ParseError, StringList};

/// Classification of interception software
/// (https://jhalderm.com/pub/papers/interception-ndss17.pdf).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MitmType {
    #[default]
    Empty,
    Antivirus,
    FakeBrowser,
    Malware,
    Parental,
    Proxy,
}

impl MitmType {
    fn code(self) -> u8 {
        match self {
            MitmType::Empty => 0,
            MitmType::Antivirus => 1,
            MitmType::FakeBrowser => 2,
            MitmType::Malware => 3,
            MitmType::Parental => 4,
            MitmType::Proxy => 5,
        }
    }

    fn from_code(code: u8) -> Option<MitmType> {
        match code {
            0 => Some(MitmType::Empty),
            1 => Some(MitmType::Antivirus),
            2 => Some(MitmType::FakeBrowser),
            3 => Some(MitmType::Malware),
            4 => Some(MitmType::Parental),
            5 => Some(MitmType::Proxy),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MitmType::Empty => "empty",
            MitmType::Antivirus => "antivirus",
            MitmType::FakeBrowser => "fake-browser",
            MitmType::Malware => "malware",
            MitmType::Parental => "parental",
            MitmType::Proxy => "proxy",
        }
    }
}

impl Serialize for MitmType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// What is known about a piece of interception software: its canonical
/// vendor names, classification, and the security grade it imposes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MitmInfo {
    pub name_list: StringList,
    pub mitm_type: MitmType,
    pub grade: Grade,
}

impl MitmInfo {
    /// Parse `<name-list>:<type>:<grade>`. Names are lowercased, dashes
    /// stripped, and replaced by the canonical vendor token they contain.
    pub fn parse(s: &str) -> Result<MitmInfo, ParseError> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != 3 {
            return Err(ParseError::InvalidMitmInfo(s.to_string()));
        }
        let raw_names = StringList::parse(fields[0])?;
        let name_list = raw_names
            .iter()
            .map(|name| canonical_vendor(name))
            .collect();

        let type_code: u8 = fields[1]
            .parse()
            .map_err(|_| ParseError::InvalidMitmInfo(s.to_string()))?;
        let mitm_type = MitmType::from_code(type_code)
            .ok_or_else(|| ParseError::InvalidMitmInfo(s.to_string()))?;

        let grade_code: u8 = fields[2]
            .parse()
            .map_err(|_| ParseError::InvalidMitmInfo(s.to_string()))?;
        let grade = grade_from_code(grade_code)
            .ok_or_else(|| ParseError::InvalidMitmInfo(s.to_string()))?;

        Ok(MitmInfo {
            name_list,
            mitm_type,
            grade,
        })
    }

    /// Merge: union of names (sorted), type collapses to empty on
    /// disagreement, grade is the worse of the two.
    pub fn merge(&self, other: &MitmInfo) -> MitmInfo {
        MitmInfo {
            name_list: self
                .name_list
                .to_set()
                .union(&other.name_list.to_set())
                .sorted_list(),
            mitm_type: if self.mitm_type == other.mitm_type {
                self.mitm_type
            } else {
                MitmType::Empty
            },
            grade: self.grade.merge(other.grade),
        }
    }

    /// Possible when the name lists are identical or share a vendor,
    /// impossible otherwise.
    pub fn matches(&self, other: &MitmInfo) -> Match {
        if self.name_list == other.name_list
            || !self
                .name_list
                .to_set()
                .inter(&other.name_list.to_set())
                .is_empty()
        {
            Match::Possible
        } else {
            Match::Impossible
        }
    }
}

impl fmt::Display for MitmInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.name_list,
            self.mitm_type.code(),
            grade_code(self.grade)
        )
    }
}

fn grade_code(grade: Grade) -> u8 {
    match grade {
        Grade::Empty => 0,
        Grade::A => 1,
        Grade::B => 2,
        Grade::C => 3,
        Grade::F => 4,
    }
}

fn grade_from_code(code: u8) -> Option<Grade> {
    match code {
        0 => Some(Grade::Empty),
        1 => Some(Grade::A),
        2 => Some(Grade::B),
        3 => Some(Grade::C),
        4 => Some(Grade::F),
        _ => None,
    }
}

/// Reduce a vendor name to its canonical token: lowercase, drop dashes,
/// and collapse to the first known vendor appearing as a substring.
fn canonical_vendor(name: &str) -> String {
    let simplified = name.to_lowercase().replace('-', "");
    for vendor in MITM_VENDORS {
        if simplified.contains(vendor) {
            return (*vendor).to_string();
        }
    }
    simplified
}

/// Known HTTPS interception software vendors.
const MITM_VENDORS: &[&str] = &[
    "avast",
    "avg",
    "barracuda",
    "bitdefender",
    "bluecoat",
    "bullguard",
    "chromodo",
    "ciscows",
    "citrix",
    "cybersitter",
    "drweb",
    "eset",
    "forcepoint",
    "fortigate",
    "gdata",
    "hidemyip",
    "junipersrx",
    "kaspersky",
    "keepmyfamilysecure",
    "kindergate",
    "komodiasuperfish",
    "microsofttmg",
    "netnanny",
    "pcpandora",
    "privdog",
    "qustodio",
    "sophos",
    "staffcop",
    "untangle",
    "wajam",
    "webtitan",
    "adguard",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonicalises_names() {
        let info = MitmInfo::parse("Blue-Coat ProxySG:5:2").unwrap();
        assert_eq!(info.name_list.to_string(), "bluecoat");
        assert_eq!(info.mitm_type, MitmType::Proxy);
        assert_eq!(info.grade, Grade::B);

        let info = MitmInfo::parse("Kaspersky Internet Security,ESET NOD32:1:3").unwrap();
        assert_eq!(info.name_list.to_string(), "kaspersky,eset");
        assert_eq!(info.mitm_type, MitmType::Antivirus);
    }

    #[test]
    fn parse_unknown_vendor_kept_simplified() {
        let info = MitmInfo::parse("Some-Unknown Thing:3:4").unwrap();
        assert_eq!(info.name_list.to_string(), "someunknown thing");
        assert_eq!(info.grade, Grade::F);
    }

    #[test]
    fn parse_empty_fields() {
        let info = MitmInfo::parse(":0:0").unwrap();
        assert_eq!(info, MitmInfo::default());
        assert_eq!(info.to_string(), ":0:0");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(MitmInfo::parse("a:b").is_err());
        assert!(MitmInfo::parse("a:9:0").is_err());
        assert!(MitmInfo::parse("a:0:9").is_err());
        assert!(MitmInfo::parse("a:x:0").is_err());
    }

    #[test]
    fn merge_names_and_grade() {
        let a = MitmInfo::parse("avast:1:2").unwrap();
        let b = MitmInfo::parse("avg:1:3").unwrap();
        let merged = a.merge(&b);
        assert_eq!(merged.name_list.to_string(), "avast,avg");
        assert_eq!(merged.mitm_type, MitmType::Antivirus);
        assert_eq!(merged.grade, Grade::C);

        let c = MitmInfo::parse("bluecoat:5:1").unwrap();
        assert_eq!(a.merge(&c).mitm_type, MitmType::Empty);
    }

    #[test]
    fn matches_on_shared_vendor() {
        let a = MitmInfo::parse("avast,avg:1:0").unwrap();
        let b = MitmInfo::parse("avg:0:0").unwrap();
        let c = MitmInfo::parse("sophos:0:0").unwrap();
        assert_eq!(a.matches(&b), Match::Possible);
        assert_eq!(a.matches(&c), Match::Impossible);
        assert_eq!(c.matches(&c), Match::Possible);
    }
}
