//! Detection engine for HTTPS interception (monster-in-the-middle) from the
//! server's vantage point, based on heuristics developed in
//! https://zakird.com/papers/https_interception.pdf.
//!
//! The engine compares what a client claims to be (its parsed User-Agent)
//! against how it behaves on the wire (its ClientHello shape and HTTP
//! headers), consulting a corpus of known browser and known interceptor
//! signatures.

mod config;
mod processor;
mod report;

pub use config::Config;
pub use processor::{LoadError, Processor};
pub use report::{CheckError, Report};
