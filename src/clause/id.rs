//! Dotted-decimal clause identifiers (`6`, `6.2`, `6.2.1`).
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound applied to the first segment when no explicit bound is given.
pub const DEFAULT_MAX_TOP_SEGMENT: u32 = 50;
/// Maximum nesting depth of a clause number.
pub const MAX_SEGMENTS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedClauseId {
    #[error("clause id is empty")]
    Empty,
    #[error("clause id '{input}' has an empty segment at position {position}")]
    EmptySegment { input: String, position: usize },
    #[error("clause id '{input}' has a non-digit segment '{segment}'")]
    NonDigit { input: String, segment: String },
    #[error("clause id '{input}' has a segment with a leading zero '{segment}'")]
    LeadingZero { input: String, segment: String },
    #[error("clause id '{input}' has a zero segment")]
    ZeroSegment { input: String },
    #[error("clause id '{input}' has {count} segments, at most {limit} allowed", limit = MAX_SEGMENTS)]
    TooManySegments { input: String, count: usize },
    #[error("clause id '{input}' has a segment too large to represent")]
    Overflow { input: String },
    #[error("clause id '{input}' starts with {value}, which exceeds the bound {max}")]
    TopSegmentOutOfRange { input: String, value: u32, max: u32 },
}

/// A validated clause number.
///
/// The derived `Ord` compares segments lexicographically. Because every
/// segment is at least 1, this is the same as padding the shorter id with
/// `-1`: a prefix sorts before its children (`6` < `6.1` < `6.2` < `6.10`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClauseId {
    segments: SmallVec<[u32; MAX_SEGMENTS]>,
}

impl ClauseId {
    /// Parses with the default top-level bound.
    pub fn parse(text: &str) -> Result<Self, MalformedClauseId> {
        Self::parse_with_bound(text, DEFAULT_MAX_TOP_SEGMENT)
    }

    pub fn parse_with_bound(text: &str, max_top_segment: u32) -> Result<Self, MalformedClauseId> {
        if text.is_empty() {
            return Err(MalformedClauseId::Empty);
        }

        let mut segments = SmallVec::new();
        for (position, part) in text.split('.').enumerate() {
            if position >= MAX_SEGMENTS {
                return Err(MalformedClauseId::TooManySegments {
                    input: text.to_string(),
                    count: text.split('.').count(),
                });
            }
            segments.push(Self::parse_segment(text, part, position)?);
        }

        let top = segments[0];
        if top > max_top_segment {
            return Err(MalformedClauseId::TopSegmentOutOfRange {
                input: text.to_string(),
                value: top,
                max: max_top_segment,
            });
        }

        Ok(Self { segments })
    }

    fn parse_segment(input: &str, part: &str, position: usize) -> Result<u32, MalformedClauseId> {
        if part.is_empty() {
            return Err(MalformedClauseId::EmptySegment { input: input.to_string(), position });
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MalformedClauseId::NonDigit {
                input: input.to_string(),
                segment: part.to_string(),
            });
        }
        if part == "0" {
            return Err(MalformedClauseId::ZeroSegment { input: input.to_string() });
        }
        if part.starts_with('0') {
            return Err(MalformedClauseId::LeadingZero {
                input: input.to_string(),
                segment: part.to_string(),
            });
        }
        part.parse::<u32>()
            .map_err(|_| MalformedClauseId::Overflow { input: input.to_string() })
    }

    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The enclosing clause (`6.2.1` -> `6.2`), or `None` for a top-level clause.
    pub fn parent(&self) -> Option<ClauseId> {
        if self.segments.len() <= 1 {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// True when `other` lies strictly below `self` in the numbering.
    pub fn is_ancestor_of(&self, other: &ClauseId) -> bool {
        self.segments.len() < other.segments.len() && other.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for ClauseId {
    type Err = MalformedClauseId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClauseId {
    type Error = MalformedClauseId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClauseId> for String {
    fn from(id: ClauseId) -> Self {
        id.to_string()
    }
}

/// Total order over raw clause labels as they come out of storage.
///
/// Valid ids compare by `ClauseId`'s order, valid ids sort before malformed
/// ones, and malformed labels fall back to plain string order. Used for
/// table-of-contents listings where a stray label must not break sorting.
pub fn compare_clause_labels(a: &str, b: &str) -> Ordering {
    // The bound is irrelevant for ordering, so accept any top segment here.
    match (ClauseId::parse_with_bound(a, u32::MAX), ClauseId::parse_with_bound(b, u32::MAX)) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sorts raw labels in place using [`compare_clause_labels`].
pub fn sort_clause_labels<S: AsRef<str>>(labels: &mut [S]) {
    labels.sort_by(|a, b| compare_clause_labels(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("6", &[6])]
    #[case("6.2", &[6, 2])]
    #[case("6.2.1", &[6, 2, 1])]
    #[case("50.10.3.7", &[50, 10, 3, 7])]
    fn test_parse_valid(#[case] input: &str, #[case] expected: &[u32]) {
        let id = ClauseId::parse(input).unwrap();
        assert_eq!(id.segments(), expected);
        assert_eq!(id.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("6.")]
    #[case(".6")]
    #[case("6..1")]
    #[case("6.a")]
    #[case("6.-1")]
    #[case(" 6")]
    #[case("06.1")]
    #[case("6.01")]
    #[case("0")]
    #[case("6.0")]
    #[case("1.2.3.4.5")]
    #[case("51")]
    #[case("6.99999999999")]
    fn test_parse_rejects_malformed(#[case] input: &str) {
        assert!(ClauseId::parse(input).is_err(), "should reject '{}'", input);
    }

    #[test]
    fn test_top_segment_bound_is_configurable() {
        assert!(ClauseId::parse_with_bound("21", 20).is_err());
        assert!(ClauseId::parse_with_bound("20.4", 20).is_ok());
        let err = ClauseId::parse("51.1").unwrap_err();
        assert!(matches!(err, MalformedClauseId::TopSegmentOutOfRange { value: 51, max: 50, .. }));
    }

    #[test]
    fn test_sort_is_numeric_not_lexical() {
        let mut ids: Vec<ClauseId> = ["6", "6.1", "6.10", "6.2"]
            .iter()
            .map(|s| ClauseId::parse(s).unwrap())
            .collect();
        ids.sort();
        let sorted: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(sorted, vec!["6", "6.1", "6.2", "6.10"]);
    }

    #[test]
    fn test_parent_and_ancestry() {
        let id = ClauseId::parse("6.2.1").unwrap();
        let parent = id.parent().unwrap();
        assert_eq!(parent.to_string(), "6.2");
        assert_eq!(parent.parent().unwrap().to_string(), "6");
        assert!(parent.parent().unwrap().parent().is_none());
        assert!(parent.is_ancestor_of(&id));
        assert!(!id.is_ancestor_of(&id));
        assert!(!ClauseId::parse("6.3").unwrap().is_ancestor_of(&id));
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ClauseId::parse("7.4").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7.4\"");
        let back: ClauseId = serde_json::from_str("\"7.4\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ClauseId>("\"7.04\"").is_err());
    }

    #[test]
    fn test_labels_sort_malformed_last() {
        let mut labels = vec!["Annex A", "6.10", "6", "6.2", "appendix"];
        sort_clause_labels(&mut labels);
        assert_eq!(labels, vec!["6", "6.2", "6.10", "Annex A", "appendix"]);
    }

    fn clause_id() -> impl Strategy<Value = ClauseId> {
        (1u32..=DEFAULT_MAX_TOP_SEGMENT, prop::collection::vec(1u32..=30, 0..MAX_SEGMENTS))
            .prop_map(|(top, rest)| {
                let mut segments = SmallVec::new();
                segments.push(top);
                segments.extend(rest);
                ClauseId { segments }
            })
    }

    proptest! {
        #[test]
        fn prop_round_trip(id in clause_id()) {
            prop_assert_eq!(ClauseId::parse(&id.to_string()).unwrap(), id);
        }

        #[test]
        fn prop_order_is_antisymmetric(a in clause_id(), b in clause_id()) {
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
        }

        #[test]
        fn prop_order_is_transitive(a in clause_id(), b in clause_id(), c in clause_id()) {
            if a <= b && b <= c {
                prop_assert!(a <= c);
            }
        }

        #[test]
        fn prop_sorting_random_sets_is_stable(mut ids in prop::collection::vec(clause_id(), 0..40)) {
            ids.sort();
            for pair in ids.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
            let mut labels: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            labels.reverse();
            sort_clause_labels(&mut labels);
            let expected: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            prop_assert_eq!(labels, expected);
        }
    }
}
