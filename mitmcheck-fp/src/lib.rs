//! Fingerprints and the signature language of the mitmcheck interception
//! detector.
//!
//! A *fingerprint* is an exact observation from one client (TLS ClientHello
//! features plus HTTP headers); a *signature* is a compact acceptance
//! predicate over fingerprints. Signatures are authored in a textual DSL
//! with optionality tiers (required / optional / unlikely / excluded) and an
//! optional strict ordering; matching yields a three-valued
//! impossible/unlikely/possible verdict.

mod mitm_info;
mod request;
mod signature;
mod ua;

pub use mitm_info::{MitmInfo, MitmType};
pub use request::{
    RequestFingerprint, RequestMatchMap, RequestSignature, VersionSignature,
};
pub use signature::{IntSignature, ListSignature, OptionalItems, StringSignature};
pub use ua::{
    ANY_VERSION, UaFingerprint, UaSignature, UaVersion, UaVersionSignature,
};
