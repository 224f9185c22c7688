//! Core feature types shared by the mitmcheck crates: primitive ordered
//! lists and frozen sets, the TLS version and security grade enums, the
//! three-valued match verdict, and the cipher-security classifier.

mod cipher;
mod collection;
mod error;
mod grade;
mod verdict;
mod version;

pub use cipher::{CipherCheck, CipherSecurity};
pub use collection::{FeatureList, FeatureSet, FeatureValue, IntList, IntSet, StringList, StringSet};
pub use error::ParseError;
pub use grade::Grade;
pub use verdict::Match;
pub use version::TlsVersion;
