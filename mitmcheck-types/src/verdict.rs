use std::fmt;

use serde::{Serialize, Serializer};

/// Result of comparing a fingerprint against a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Match {
    /// Uninitialized value for a match.
    #[default]
    Empty,
    /// A match is not possible.
    Impossible,
    /// A match is possible, but only with an unlikely configuration.
    Unlikely,
    /// A match is possible.
    Possible,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Match::Empty => f.write_str("empty"),
            Match::Impossible => f.write_str("impossible"),
            Match::Unlikely => f.write_str("unlikely"),
            Match::Possible => f.write_str("possible"),
        }
    }
}

impl Serialize for Match {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
