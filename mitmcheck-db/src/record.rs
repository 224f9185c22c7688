use std::fmt;

use mitmcheck_fp::{MitmInfo, RequestSignature, UaSignature};
use mitmcheck_types::ParseError;

/// One corpus entry: the software's user agent signature, its request
/// signature, and what is known about it as an interceptor. Browser records
/// carry an empty `MitmInfo`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub ua_signature: UaSignature,
    pub request_signature: RequestSignature,
    pub mitm_info: MitmInfo,
}

impl Record {
    /// Parse the three-pipe form `UA-SIG|REQUEST-SIG|MITM-INFO`.
    pub fn parse(s: &str) -> Result<Record, ParseError> {
        let split: Vec<&str> = s.split('|').collect();
        if split.len() != 3 {
            return Err(ParseError::FieldCount {
                input: s.to_string(),
                expected: 3,
                actual: split.len(),
            });
        }
        Ok(Record {
            ua_signature: UaSignature::parse(split[0])?,
            request_signature: RequestSignature::parse(split[1])?,
            mitm_info: MitmInfo::parse(split[2])?,
        })
    }

    /// Merge field-wise into a record matching everything either input
    /// matches.
    pub fn merge(&self, other: &Record) -> Record {
        Record {
            ua_signature: self.ua_signature.merge(&other.ua_signature),
            request_signature: self.request_signature.merge(&other.request_signature),
            mitm_info: self.mitm_info.merge(&other.mitm_info),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.ua_signature, self.request_signature, self.mitm_info
        )
    }
}
