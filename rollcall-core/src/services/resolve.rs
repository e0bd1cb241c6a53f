//! Resolve service - which stored user, if any, an identifier refers to
//!
//! Two strategies with different contracts:
//! - filtered (`resolve`): one query over every predicate, active records only
//! - quick (`resolve_quick`): one query per candidate, first hit wins, no
//!   active filter. Meant for diagnostics, where a deactivated record is
//!   still worth seeing.
//!
//! When several records match, the filtered strategy returns the first in
//! store order. `resolve_all` lists every active match for callers that
//! need to see the ambiguity.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{
    build_predicates, normalize, predicates_for, CandidateSet, PredicateSet, RawIdentifier,
    UserRecord,
};
use crate::ports::{UserQuery, UserStore};

/// Resolution strategy, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveStrategy {
    Filtered,
    Quick,
    All,
}

impl ResolveStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveStrategy::Filtered => "filtered",
            ResolveStrategy::Quick => "quick",
            ResolveStrategy::All => "all",
        }
    }
}

/// What a lookup would ask the store, without asking it
#[derive(Debug, Clone, Serialize)]
pub struct LookupPlan {
    pub candidates: CandidateSet,
    pub predicates: PredicateSet,
}

impl LookupPlan {
    /// Normalize a raw identifier and derive its predicates
    pub fn for_identifier(raw: &str) -> Result<Self> {
        let raw = RawIdentifier::new(raw)?;
        let candidates = normalize(&raw);
        let predicates = build_predicates(&candidates);
        Ok(Self {
            candidates,
            predicates,
        })
    }
}

/// Resolve service for identifier lookups
pub struct ResolveService {
    store: Arc<dyn UserStore>,
}

impl ResolveService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// First active record matching any predicate, in one query
    pub fn resolve(&self, predicates: &PredicateSet) -> Result<Option<UserRecord>> {
        if predicates.is_empty() {
            return Err(Error::usage("nothing to match on"));
        }
        self.store.find_first(&UserQuery::active(predicates.clone()))
    }

    /// First record matching any candidate, one query per candidate, ignoring the active flag
    pub fn resolve_quick(&self, candidates: &CandidateSet) -> Result<Option<UserRecord>> {
        if candidates.is_empty() {
            return Err(Error::usage("nothing to match on"));
        }
        for candidate in candidates {
            let query = UserQuery::unfiltered(predicates_for(candidate));
            if let Some(user) = self.store.find_first(&query)? {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    /// Every active record matching any predicate, in store order
    pub fn resolve_all(&self, predicates: &PredicateSet) -> Result<Vec<UserRecord>> {
        if predicates.is_empty() {
            return Err(Error::usage("nothing to match on"));
        }
        self.store.find_all(&UserQuery::active(predicates.clone()))
    }

    /// Filtered lookup from raw operator input
    pub fn lookup(&self, raw: &str) -> Result<Option<UserRecord>> {
        let plan = LookupPlan::for_identifier(raw)?;
        self.resolve(&plan.predicates)
    }

    /// Quick (unfiltered) lookup from raw operator input
    pub fn lookup_quick(&self, raw: &str) -> Result<Option<UserRecord>> {
        let plan = LookupPlan::for_identifier(raw)?;
        self.resolve_quick(&plan.candidates)
    }

    /// All active matches for raw operator input
    pub fn lookup_all(&self, raw: &str) -> Result<Vec<UserRecord>> {
        let plan = LookupPlan::for_identifier(raw)?;
        self.resolve_all(&plan.predicates)
    }
}
