use std::fmt::{self, Write as _};

use mitmcheck_types::{FeatureList, FeatureSet, FeatureValue, Match, ParseError};

// Signature list fields have the grammar
//
//   field        := [listPrefix] [ item (',' item)* ]
//   listPrefix   := '*' | '~'
//   item         := [itemPrefix] value
//   itemPrefix   := '!' | '?' | '^'
//
// List prefixes:
//   '*'  allow extra items and any ordering of items
//   '~'  allow any ordering of items
//   ''   enforce ordering of items (default)
// Item prefixes:
//   '!'  the item is possible, but not expected (unlikely)
//   '?'  the item is expected, but not required (optional)
//   '^'  the item is excluded, and not possible
//   ''   the item is required (default)

const FLAG_ANY_ITEMS: char = '*';
const FLAG_ANY_ORDER: char = '~';
const FLAG_UNLIKELY: char = '!';
const FLAG_OPTIONAL: char = '?';
const FLAG_EXCLUDED: char = '^';

/// The optional tier of a signature. `Any` (the `*` field prefix) accepts
/// arbitrary extra items and is a distinct state from an empty finite set;
/// the distinction drives matching, merging, and formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionalItems<T: FeatureValue> {
    Finite(FeatureSet<T>),
    Any,
}

impl<T: FeatureValue> OptionalItems<T> {
    pub fn is_any(&self) -> bool {
        matches!(self, OptionalItems::Any)
    }

    fn finite(&self) -> Option<&FeatureSet<T>> {
        match self {
            OptionalItems::Finite(set) => Some(set),
            OptionalItems::Any => None,
        }
    }

    fn contains(&self, value: &T) -> bool {
        self.finite().is_some_and(|set| set.contains(value))
    }
}

/// A signature over an ordered feature list: the acceptance tiers plus an
/// optional strict ordering. The ordered list, when present, is the authored
/// order of the required, optional, and unlikely items (excluded items are
/// not listed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSignature<T: FeatureValue> {
    pub ordered: Option<FeatureList<T>>,
    pub required: FeatureSet<T>,
    pub optional: OptionalItems<T>,
    pub unlikely: FeatureSet<T>,
    pub excluded: FeatureSet<T>,
}

/// Signature over 16-bit wire values (ciphers, extensions, curves).
pub type IntSignature = ListSignature<u16>;
/// Signature over strings (header names, quirk tags).
pub type StringSignature = ListSignature<String>;

impl<T: FeatureValue> Default for ListSignature<T> {
    fn default() -> Self {
        ListSignature {
            ordered: Some(FeatureList::new()),
            required: FeatureSet::new(),
            optional: OptionalItems::Finite(FeatureSet::new()),
            unlikely: FeatureSet::new(),
            excluded: FeatureSet::new(),
        }
    }
}

impl<T: FeatureValue> ListSignature<T> {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let mut sig = ListSignature::default();
        if s.is_empty() {
            return Ok(sig);
        }

        let (any_items, any_order, rest) = match s.chars().next() {
            Some(FLAG_ANY_ITEMS) => (true, false, &s[1..]),
            Some(FLAG_ANY_ORDER) => (false, true, &s[1..]),
            _ => (false, false, s),
        };

        let mut ordered = FeatureList::new();
        let mut optional = FeatureSet::new();
        if !rest.is_empty() {
            for item in rest.split(',') {
                if item.is_empty() {
                    return Err(ParseError::EmptyElement(s.to_string()));
                }
                let flag = item.chars().next().unwrap_or_default();
                let value_str = match flag {
                    FLAG_OPTIONAL | FLAG_UNLIKELY | FLAG_EXCLUDED => &item[1..],
                    _ => item,
                };
                let value = T::parse_value(value_str)?;
                match flag {
                    FLAG_OPTIONAL => {
                        optional.insert(value.clone());
                    }
                    FLAG_UNLIKELY => {
                        sig.unlikely.insert(value.clone());
                    }
                    FLAG_EXCLUDED => {
                        sig.excluded.insert(value);
                        continue; // excluded items stay off the ordered list
                    }
                    _ => {
                        sig.required.insert(value.clone());
                    }
                }
                ordered.push(value);
            }
        }

        if any_items {
            // Any ordering and any extra items; required, unlikely, and
            // excluded items are still enforced.
            sig.ordered = None;
            sig.optional = OptionalItems::Any;
        } else if any_order {
            sig.ordered = None;
            sig.optional = OptionalItems::Finite(optional);
        } else {
            sig.ordered = Some(ordered);
            sig.optional = OptionalItems::Finite(optional);
        }
        Ok(sig)
    }

    /// Match a fingerprint list against the signature, returning the verdict
    /// and a similarity score: the count of fingerprint elements that appear
    /// in the required or finite-optional sets. The score lets a caller pick
    /// the closest record when nothing matches outright.
    pub fn matches(&self, list: &FeatureList<T>) -> (Match, usize) {
        let set = list.to_set();
        let mut similarity = set.inter(&self.required).len();
        if let Some(optional) = self.optional.finite() {
            similarity += set.inter(optional).len();
        }

        // ordering is strict unless the signature dropped it
        if let Some(ordered) = &self.ordered
            && !ordered.contains(list)
        {
            return (Match::Impossible, similarity);
        }
        if !set.inter(&self.excluded).is_empty() {
            return (Match::Impossible, similarity);
        }
        if !self.required.diff(&set).is_empty() {
            return (Match::Impossible, similarity);
        }

        // what remains after removing required and optional items
        let mut residue = set.diff(&self.required);
        if let Some(optional) = self.optional.finite() {
            residue = residue.diff(optional);
            if !residue.is_empty() {
                if residue.diff(&self.unlikely).is_empty() {
                    return (Match::Unlikely, similarity);
                }
                return (Match::Impossible, similarity);
            }
        }
        if !residue.inter(&self.unlikely).is_empty() {
            return (Match::Unlikely, similarity);
        }
        (Match::Possible, similarity)
    }

    /// Merge two signatures into the smallest signature matching every
    /// fingerprint either input matches. The merge is lossy: the result may
    /// match more fingerprints still.
    pub fn merge(&self, other: &Self) -> Self {
        // Ordered lists interleave, preserving both internal orders and
        // deduplicating; a conflict between the orders drops the merged
        // ordering entirely.
        let mut any_order = false;
        let mut merged_list = FeatureList::new();
        if let (Some(a_list), Some(b_list)) = (&self.ordered, &other.ordered) {
            let mut merged_set: FeatureSet<T> = FeatureSet::new();
            let mut b_set = other.required.union(&other.unlikely);
            if let Some(optional) = other.optional.finite() {
                b_set = b_set.union(optional);
            }
            let mut b_idx = 0;
            for elem in a_list {
                if merged_set.contains(elem) {
                    // elem was already merged from b, so the interleaving is
                    // ambiguous; accept any ordering
                    any_order = true;
                    break;
                }
                if b_set.contains(elem) {
                    // bring over b's not-yet-merged predecessors of elem
                    while b_idx < b_list.len() && b_list.0[b_idx] != *elem {
                        merged_list.push(b_list.0[b_idx].clone());
                        merged_set.insert(b_list.0[b_idx].clone());
                        b_idx += 1;
                    }
                    b_idx += 1; // elem itself is appended below
                }
                merged_list.push(elem.clone());
                merged_set.insert(elem.clone());
            }
            for elem in b_list.0.iter().skip(b_idx) {
                merged_list.push(elem.clone());
            }
        } else {
            any_order = true;
        }

        let required = self.required.inter(&other.required);
        let excluded = self.excluded.inter(&other.excluded);

        // An element required on only one side becomes optional; the Any
        // sentinel absorbs everything.
        let optional = match (self.optional.finite(), other.optional.finite()) {
            (Some(a_opt), Some(b_opt)) => OptionalItems::Finite(
                a_opt
                    .union(b_opt)
                    .union(&self.required)
                    .union(&other.required)
                    .diff(&required),
            ),
            _ => OptionalItems::Any,
        };

        // An element optional on only one side becomes unlikely.
        let mut unlikely = self.unlikely.union(&other.unlikely);
        if let Some(a_opt) = self.optional.finite() {
            unlikely = unlikely.union(a_opt);
        }
        if let Some(b_opt) = other.optional.finite() {
            unlikely = unlikely.union(b_opt);
        }
        if let Some(merged_opt) = optional.finite() {
            unlikely = unlikely.diff(merged_opt);
        }

        ListSignature {
            ordered: if any_order { None } else { Some(merged_list) },
            required,
            optional,
            unlikely,
            excluded,
        }
    }
}

impl<T: FeatureValue> fmt::Display for ListSignature<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list: Vec<T>;
        match &self.ordered {
            Some(ordered) => {
                list = ordered.0.clone();
                let mut tail = self.excluded.sorted_list();
                list.append(&mut tail.0);
            }
            None => {
                f.write_char(if self.optional.is_any() {
                    FLAG_ANY_ITEMS
                } else {
                    FLAG_ANY_ORDER
                })?;
                list = self.required.iter().cloned().collect();
                if let Some(optional) = self.optional.finite() {
                    list.extend(optional.iter().cloned());
                }
                list.extend(self.unlikely.iter().cloned());
                list.extend(self.excluded.iter().cloned());
                list.sort();
            }
        }
        for (idx, elem) in list.iter().enumerate() {
            if idx != 0 {
                f.write_char(',')?;
            }
            if self.optional.contains(elem) {
                f.write_char(FLAG_OPTIONAL)?;
            } else if self.unlikely.contains(elem) {
                f.write_char(FLAG_UNLIKELY)?;
            } else if self.excluded.contains(elem) {
                f.write_char(FLAG_EXCLUDED)?;
            }
            elem.fmt_value(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitmcheck_types::{IntList, StringList};

    fn int_sig(s: &str) -> IntSignature {
        IntSignature::parse(s).unwrap()
    }

    fn str_sig(s: &str) -> StringSignature {
        StringSignature::parse(s).unwrap()
    }

    const MATCH_CASES: &[(&str, &str, Match)] = &[
        ("", "", Match::Possible),
        ("*", "1", Match::Possible),
        ("*", "1,2", Match::Possible),
        ("*1,^2", "1,2", Match::Impossible),
        ("*1,^2", "1", Match::Possible),
        ("~1,2", "2,1", Match::Possible),
        ("~1,^2", "1,2", Match::Impossible),
        ("1,2", "2,1", Match::Impossible),
        ("1,?2", "2,1", Match::Impossible),
        ("~1,?2", "2,1", Match::Possible),
        ("1,2", "1,2,3", Match::Impossible),
        ("1,2,?3", "1,2,3", Match::Possible),
        ("*1,2", "1,2,3", Match::Possible),
        ("*1,2", "3,2,1", Match::Possible),
        ("?1,2,?3", "1,2", Match::Possible),
        ("?1,2,?3", "2,3", Match::Possible),
        ("?1,2,?3", "1,3", Match::Impossible),
        ("!1", "1", Match::Unlikely),
        ("*!1", "1", Match::Unlikely),
        ("!1,2,?3", "1,2", Match::Unlikely),
    ];

    #[test]
    fn int_signature_match_matrix() {
        for &(sig, fp, expected) in MATCH_CASES {
            let (verdict, _) = int_sig(sig).matches(&IntList::parse(fp).unwrap());
            assert_eq!(verdict, expected, "{sig} vs {fp}");
        }
    }

    #[test]
    fn string_signature_match_matrix() {
        for &(sig, fp, expected) in MATCH_CASES {
            let (verdict, _) = str_sig(sig).matches(&StringList::parse(fp).unwrap());
            assert_eq!(verdict, expected, "{sig} vs {fp}");
        }
    }

    const MERGE_CASES: &[(&str, &str, &str)] = &[
        ("", "", ""),
        ("*", "1", "*"),
        ("*", "1,^2", "*"),
        ("*^2", "1,^2", "*^2"),
        ("1,2", "2,1", "~1,2"),
        ("1,2", "1,2,3", "1,2,?3"),
        ("1,4", "2,3", "?1,?4,?2,?3"),
        ("1,2", "3,2,1", "~1,2,?3"),
        ("1,2", "3,1,2", "?3,1,2"),
    ];

    #[test]
    fn int_signature_merge_matrix() {
        for &(a, b, expected) in MERGE_CASES {
            assert_eq!(
                int_sig(a).merge(&int_sig(b)).to_string(),
                expected,
                "{a} + {b}"
            );
        }
    }

    #[test]
    fn string_signature_merge_matrix() {
        for &(a, b, expected) in MERGE_CASES {
            assert_eq!(
                str_sig(a).merge(&str_sig(b)).to_string(),
                expected,
                "{a} + {b}"
            );
        }
    }

    #[test]
    fn parse_format_round_trip() {
        for s in [
            "",
            "*",
            "~1,2",
            "*^2",
            "1,2,?3",
            "!1,2,?3",
            "1,2,^0",
            "*1,!2,^3",
            "c02b,c02f,?cca8",
        ] {
            assert_eq!(int_sig(s).to_string(), s, "round trip of '{s}'");
        }
        for s in ["", "*", "~a,b", "grease,?badhdr", "*!dragon"] {
            assert_eq!(str_sig(s).to_string(), s, "round trip of '{s}'");
        }
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(IntSignature::parse("1,,2").is_err());
        assert!(IntSignature::parse("zz").is_err());
        assert!(IntSignature::parse("?").is_err());
        assert!(IntSignature::parse("1,?").is_err());
    }

    #[test]
    fn any_prefix_is_distinct_from_any_order() {
        let star = int_sig("*");
        let tilde = int_sig("~");
        assert!(star.optional.is_any());
        assert!(!tilde.optional.is_any());
        // '~' with no items rejects everything extra, '*' accepts it
        let fp = IntList::parse("5").unwrap();
        assert_eq!(star.matches(&fp).0, Match::Possible);
        assert_eq!(tilde.matches(&fp).0, Match::Impossible);
    }

    #[test]
    fn similarity_counts_required_and_optional_overlap() {
        let sig = int_sig("1,2,?3,!4");
        let (_, similarity) = sig.matches(&IntList::parse("1,2,3,4").unwrap());
        // 1 and 2 required, 3 optional; the unlikely 4 does not count
        assert_eq!(similarity, 3);

        let any = int_sig("*1");
        let (_, similarity) = any.matches(&IntList::parse("1,2,3").unwrap());
        // the Any optional contributes nothing
        assert_eq!(similarity, 1);
    }

    #[test]
    fn signature_from_fingerprint_matches_itself() {
        // strict ordering, all elements required
        for fp in ["1,2,3", "c02b,1301", ""] {
            let list = IntList::parse(fp).unwrap();
            let sig = int_sig(fp);
            assert_eq!(sig.matches(&list).0, Match::Possible, "{fp}");
        }
    }

    #[test]
    fn merge_is_monotone() {
        // whatever either input accepts, the merge must not reject
        let sigs = ["", "*", "~1,2", "1,2", "1,2,?3", "!1,2", "*1,^2", "1,4"];
        let fps = ["", "1", "1,2", "2,1", "1,2,3", "1,4", "4"];
        for a in sigs {
            for b in sigs {
                let merged = int_sig(a).merge(&int_sig(b));
                for fp in fps {
                    let list = IntList::parse(fp).unwrap();
                    let a_match = int_sig(a).matches(&list).0;
                    let b_match = int_sig(b).matches(&list).0;
                    if a_match == Match::Possible || b_match == Match::Possible {
                        assert_ne!(
                            merged.matches(&list).0,
                            Match::Impossible,
                            "merge({a}, {b}) = {merged} rejected {fp}"
                        );
                    }
                }
            }
        }
    }
}
