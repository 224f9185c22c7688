use std::fmt;

use serde::{Serialize, Serializer};

/// TLS client security grade, ordered from ungraded to worst.
///
/// Grading follows the interception study heuristics
/// (https://jhalderm.com/pub/papers/interception-ndss17.pdf).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Grade {
    /// No grade assigned.
    #[default]
    Empty,
    /// Optimal configuration.
    A,
    /// Suboptimal configuration.
    B,
    /// Known attack against the configuration.
    C,
    /// Trivially broken.
    F,
}

impl Grade {
    /// The weaker of two grades. `Empty` loses to any concrete grade.
    pub fn merge(self, other: Grade) -> Grade {
        self.max(other)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Empty => f.write_str("empty"),
            Grade::A => f.write_str("A"),
            Grade::B => f.write_str("B"),
            Grade::C => f.write_str("C"),
            Grade::F => f.write_str("F"),
        }
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_returns_weaker() {
        assert_eq!(Grade::A.merge(Grade::B), Grade::B);
        assert_eq!(Grade::B.merge(Grade::A), Grade::B);
        assert_eq!(Grade::F.merge(Grade::A), Grade::F);
        assert_eq!(Grade::C.merge(Grade::C), Grade::C);
    }

    #[test]
    fn empty_is_identity() {
        for grade in [Grade::A, Grade::B, Grade::C, Grade::F] {
            assert_eq!(Grade::Empty.merge(grade), grade);
            assert_eq!(grade.merge(Grade::Empty), grade);
        }
        assert_eq!(Grade::Empty.merge(Grade::Empty), Grade::Empty);
    }

    #[test]
    fn merge_commutative_associative() {
        let grades = [Grade::Empty, Grade::A, Grade::B, Grade::C, Grade::F];
        for a in grades {
            for b in grades {
                assert_eq!(a.merge(b), b.merge(a));
                for c in grades {
                    assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
                }
            }
        }
    }

    #[test]
    fn display() {
        assert_eq!(Grade::Empty.to_string(), "empty");
        assert_eq!(Grade::A.to_string(), "A");
        assert_eq!(Grade::F.to_string(), "F");
    }
}
