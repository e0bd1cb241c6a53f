//! Field-match predicates built from candidate values

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::identifier::{CandidateSet, CandidateValue};

/// User record fields an identifier can match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Email,
    Phone,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Phone => "phone",
        }
    }
}

/// A single-field equality test
///
/// Email is always text, so an email predicate cannot carry an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum Predicate {
    Email(String),
    Phone(CandidateValue),
}

impl Predicate {
    pub fn field(&self) -> Field {
        match self {
            Predicate::Email(_) => Field::Email,
            Predicate::Phone(_) => Field::Phone,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Email(v) => write!(f, "{{{} = \"{}\"}}", self.field().as_str(), v),
            Predicate::Phone(v) => write!(f, "{{{} = {}}}", self.field().as_str(), v),
        }
    }
}

/// Deduplicated set of predicates, compared structurally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PredicateSet(BTreeSet<Predicate>);

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, predicate: Predicate) -> bool {
        self.0.insert(predicate)
    }

    pub fn contains(&self, predicate: &Predicate) -> bool {
        self.0.contains(predicate)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a PredicateSet {
    type Item = &'a Predicate;
    type IntoIter = std::collections::btree_set::Iter<'a, Predicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Predicate> for PredicateSet {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Predicates derived from one candidate value
///
/// Text is tried against both fields, as given and lower-cased, since the
/// write path never normalized either field. Integers only ever match phone.
pub fn predicates_for(candidate: &CandidateValue) -> PredicateSet {
    let mut set = PredicateSet::new();
    match candidate {
        CandidateValue::Text(v) => {
            let lower = v.to_lowercase();
            set.insert(Predicate::Email(lower.clone()));
            set.insert(Predicate::Email(v.clone()));
            set.insert(Predicate::Phone(CandidateValue::Text(v.clone())));
            set.insert(Predicate::Phone(CandidateValue::Text(lower)));
        }
        CandidateValue::Integer(n) => {
            set.insert(Predicate::Phone(CandidateValue::Integer(*n)));
        }
    }
    set
}

/// Build the full predicate set for a candidate set
pub fn build_predicates(candidates: &CandidateSet) -> PredicateSet {
    candidates
        .iter()
        .flat_map(|c| predicates_for(c).0)
        .collect()
}
