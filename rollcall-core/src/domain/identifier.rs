//! Identifier normalization
//!
//! An operator types an email address or a phone number in whatever shape
//! they have it. Stored records may hold the same value in a different case,
//! with or without a country code, and as text or as a number. Normalization
//! fans one raw string out into every typed form worth asking the store about.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Digits kept when a long phone number is stripped of its country code
pub const NATIONAL_NUMBER_LEN: usize = 10;

fn non_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ASCII only: `\D` would let other scripts' digits through
    RE.get_or_init(|| Regex::new(r"[^0-9]+").expect("non-digit pattern is valid"))
}

/// Operator-supplied identifier, guaranteed non-blank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIdentifier(String);

impl RawIdentifier {
    /// Wrap a raw input string
    ///
    /// Blank input is a usage error: the caller asked nothing, which is
    /// different from asking something that matches nothing.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::usage("identifier must not be empty"));
        }
        Ok(Self(raw))
    }

    /// The input exactly as given
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The input without surrounding whitespace
    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Display for RawIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One typed interpretation of a raw identifier
///
/// `Text("123")` and `Integer(123)` are different candidates: a stored field
/// holds one type or the other and the store compares types strictly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CandidateValue {
    Text(String),
    Integer(i64),
}

impl CandidateValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CandidateValue::Text(s) => Some(s),
            CandidateValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CandidateValue::Text(_) => None,
            CandidateValue::Integer(n) => Some(*n),
        }
    }
}

impl fmt::Display for CandidateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateValue::Text(s) => write!(f, "\"{}\"", s),
            CandidateValue::Integer(n) => write!(f, "{}", n),
        }
    }
}

/// Deduplicated set of candidate values. Never holds an empty text value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateSet(BTreeSet<CandidateValue>);

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text candidate; empty strings are dropped
    pub fn insert_text(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.0.insert(CandidateValue::Text(value));
        }
    }

    pub fn insert_integer(&mut self, value: i64) {
        self.0.insert(CandidateValue::Integer(value));
    }

    /// Add the integer reading of an all-digit string, if it fits in an i64
    fn insert_parsed(&mut self, digits: &str) {
        if let Ok(n) = digits.parse::<i64>() {
            self.insert_integer(n);
        }
    }

    pub fn contains(&self, value: &CandidateValue) -> bool {
        self.0.contains(value)
    }

    pub fn contains_text(&self, value: &str) -> bool {
        self.0.contains(&CandidateValue::Text(value.to_string()))
    }

    pub fn contains_integer(&self, value: i64) -> bool {
        self.0.contains(&CandidateValue::Integer(value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in a stable order: text candidates first, then integers
    pub fn iter(&self) -> impl Iterator<Item = &CandidateValue> {
        self.0.iter()
    }

    pub fn has_integers(&self) -> bool {
        self.0.iter().any(|v| matches!(v, CandidateValue::Integer(_)))
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a CandidateValue;
    type IntoIter = std::collections::btree_set::Iter<'a, CandidateValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Expand a raw identifier into every candidate value worth matching on
///
/// Every step adds to the set; nothing is replaced:
/// - the trimmed input, as typed and lower-cased
/// - the integer value of an all-digit input
/// - the digits of a formatted phone number (`+91 94388-04293`), as text and integer
/// - for more than ten digits, the last ten as text and integer. This drops a
///   country code under a ten-digit national numbering plan and nothing more
///   general; other plans get no special treatment.
pub fn normalize(raw: &RawIdentifier) -> CandidateSet {
    let mut set = CandidateSet::new();

    let trimmed = raw.trimmed();
    set.insert_text(trimmed);
    set.insert_text(trimmed.to_lowercase());

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        set.insert_parsed(trimmed);
    }

    let digits = non_digit_re().replace_all(trimmed, "");
    if digits.is_empty() {
        return set;
    }
    if digits != trimmed {
        set.insert_text(&*digits);
    }
    set.insert_parsed(&digits);

    if digits.len() > NATIONAL_NUMBER_LEN {
        // digits is pure ASCII, so byte slicing is on char boundaries
        let national = &digits[digits.len() - NATIONAL_NUMBER_LEN..];
        set.insert_text(national);
        set.insert_parsed(national);
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(raw: &str) -> CandidateSet {
        normalize(&RawIdentifier::new(raw).unwrap())
    }

    #[test]
    fn test_blank_identifier_is_usage_error() {
        assert!(RawIdentifier::new("").unwrap_err().is_usage());
        assert!(RawIdentifier::new("   \t ").unwrap_err().is_usage());
    }

    #[test]
    fn test_email_keeps_case_and_lowercase() {
        let set = candidates("Foo@Bar.com");
        assert!(set.contains_text("Foo@Bar.com"));
        assert!(set.contains_text("foo@bar.com"));
        assert!(!set.has_integers());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_lowercase_email_collapses_to_one() {
        let set = candidates("jane@x.com");
        assert_eq!(set.len(), 1);
        assert!(set.contains_text("jane@x.com"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let set = candidates("  JANE@X.COM  ");
        assert!(set.contains_text("JANE@X.COM"));
        assert!(set.contains_text("jane@x.com"));
        assert!(!set.contains_text("  JANE@X.COM  "));
    }

    #[test]
    fn test_bare_phone_number() {
        let set = candidates("9438804293");
        assert!(set.contains_text("9438804293"));
        assert!(set.contains_integer(9438804293));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_formatted_phone_with_country_code() {
        let set = candidates("+91 94388 04293");
        assert!(set.contains_text("+91 94388 04293"));
        assert!(set.contains_text("919438804293"));
        assert!(set.contains_integer(919438804293));
        assert!(set.contains_text("9438804293"));
        assert!(set.contains_integer(9438804293));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_unformatted_long_number_gets_national_suffix() {
        let set = candidates("919438804293");
        assert!(set.contains_text("919438804293"));
        assert!(set.contains_integer(919438804293));
        assert!(set.contains_text("9438804293"));
        assert!(set.contains_integer(9438804293));
    }

    #[test]
    fn test_leading_zeros_keep_text_form() {
        let set = candidates("0000000000");
        assert!(set.contains_text("0000000000"));
        assert!(set.contains_integer(0));
    }

    #[test]
    fn test_overflowing_digits_skip_integer() {
        let set = candidates("123456789012345678901234");
        assert!(set.contains_text("123456789012345678901234"));
        assert!(set.contains_text("5678901234"));
        assert!(set.contains_integer(5678901234));
        assert!(!set.contains_integer(i64::MAX));
    }

    #[test]
    fn test_email_with_digits_yields_digit_candidates() {
        let set = candidates("user42@x.com");
        assert!(set.contains_text("42"));
        assert!(set.contains_integer(42));
    }

    #[test]
    fn test_non_ascii_digits_are_stripped() {
        // Devanagari digits are not phone digits here
        let set = candidates("९४३८");
        assert!(!set.has_integers());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        for raw in ["Foo@Bar.com", "+91 94388 04293", "  98-76 ", "x"] {
            assert_eq!(candidates(raw), candidates(raw));
        }
    }

    #[test]
    fn test_no_empty_candidates() {
        for raw in ["---", "+", "a", " 1 "] {
            let set = candidates(raw);
            assert!(set.iter().all(|v| v.as_text().map_or(true, |s| !s.is_empty())));
        }
    }

    #[test]
    fn test_text_and_integer_are_distinct() {
        let text = CandidateValue::Text("123".to_string());
        let int = CandidateValue::Integer(123);
        assert_ne!(text, int);

        let mut set = CandidateSet::new();
        set.insert_text("123");
        set.insert_integer(123);
        set.insert_text("123");
        assert_eq!(set.len(), 2);
    }
}
