//! Chaining guards for nested builders.
//!
//! A parent builder may have at most one nested builder open at a time;
//! the guard tracks the open builder by an identity token and rejects any
//! out-of-order start/end. CTE builders use [`GuardSet`], which permits
//! the non-recursive and recursive part of one CTE to be open together.

use std::collections::BTreeSet;

use crate::error::{QueryError, QueryResult};

/// Identity of one nested builder instance.
///
/// Tokens are compared by value and never reused within a guard, so a
/// stale child-builder handle can not impersonate a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BuilderToken(u64);

/// Single-slot chaining guard: IDLE or OPEN(token).
#[derive(Debug, Default)]
pub struct BuilderGuard {
    open: Option<BuilderToken>,
    next_token: u64,
    label: &'static str,
}

impl BuilderGuard {
    /// Create a guard with a label used in error messages.
    pub fn new(label: &'static str) -> Self {
        Self {
            open: None,
            next_token: 0,
            label,
        }
    }

    /// Transition IDLE → OPEN, returning the new builder's token.
    pub fn on_started(&mut self) -> QueryResult<BuilderToken> {
        if self.open.is_some() {
            return Err(QueryError::chaining(format!(
                "a {} builder is already open; end it before starting another",
                self.label
            )));
        }
        let token = BuilderToken(self.next_token);
        self.next_token += 1;
        self.open = Some(token);
        Ok(token)
    }

    /// Transition OPEN(token) → IDLE.
    pub fn on_ended(&mut self, token: BuilderToken) -> QueryResult<()> {
        match self.open {
            Some(open) if open == token => {
                self.open = None;
                Ok(())
            }
            Some(_) => Err(QueryError::chaining(format!(
                "ended a {} builder that is not the currently open one",
                self.label
            ))),
            None => Err(QueryError::chaining(format!(
                "ended a {} builder but none is open",
                self.label
            ))),
        }
    }

    /// Transition OPEN(old) → OPEN(new); the replacement gets a fresh
    /// token.
    pub fn on_replaced(&mut self, old: BuilderToken) -> QueryResult<BuilderToken> {
        match self.open {
            Some(open) if open == old => {
                let token = BuilderToken(self.next_token);
                self.next_token += 1;
                self.open = Some(token);
                Ok(token)
            }
            _ => Err(QueryError::chaining(format!(
                "replaced a {} builder that is not the currently open one",
                self.label
            ))),
        }
    }

    /// Assert the guard is IDLE; called before the parent may finalize.
    pub fn verify_ended(&self) -> QueryResult<()> {
        if self.open.is_some() {
            return Err(QueryError::chaining(format!(
                "a {} builder was started but never ended",
                self.label
            )));
        }
        Ok(())
    }

    /// Whether a nested builder is currently open.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

/// Multi-slot guard: several builders may be open concurrently, each
/// tracked by token.
#[derive(Debug, Default)]
pub struct GuardSet {
    open: BTreeSet<BuilderToken>,
    next_token: u64,
    label: &'static str,
}

impl GuardSet {
    /// Create a guard set with a label used in error messages.
    pub fn new(label: &'static str) -> Self {
        Self {
            open: BTreeSet::new(),
            next_token: 0,
            label,
        }
    }

    /// Register a newly opened builder.
    pub fn on_started(&mut self) -> BuilderToken {
        let token = BuilderToken(self.next_token);
        self.next_token += 1;
        self.open.insert(token);
        token
    }

    /// Unregister an ended builder.
    pub fn on_ended(&mut self, token: BuilderToken) -> QueryResult<()> {
        if !self.open.remove(&token) {
            return Err(QueryError::chaining(format!(
                "ended a {} builder that was not started",
                self.label
            )));
        }
        Ok(())
    }

    /// Assert no builder remains open.
    pub fn verify_ended(&self) -> QueryResult<()> {
        if !self.open.is_empty() {
            return Err(QueryError::chaining(format!(
                "{} {} builder(s) were started but never ended",
                self.open.len(),
                self.label
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_happy_path() {
        let mut guard = BuilderGuard::new("predicate");
        let token = guard.on_started().unwrap();
        assert!(guard.is_open());
        guard.on_ended(token).unwrap();
        guard.verify_ended().unwrap();
    }

    #[test]
    fn test_second_start_fails() {
        let mut guard = BuilderGuard::new("predicate");
        let _token = guard.on_started().unwrap();
        assert!(matches!(
            guard.on_started(),
            Err(QueryError::BuilderChaining(_))
        ));
    }

    #[test]
    fn test_end_without_start_fails() {
        let mut guard = BuilderGuard::new("predicate");
        let token = guard.on_started().unwrap();
        guard.on_ended(token).unwrap();
        assert!(matches!(
            guard.on_ended(token),
            Err(QueryError::BuilderChaining(_))
        ));
    }

    #[test]
    fn test_stale_token_rejected() {
        let mut guard = BuilderGuard::new("subquery");
        let first = guard.on_started().unwrap();
        guard.on_ended(first).unwrap();
        let _second = guard.on_started().unwrap();
        // The stale handle must not be able to end the newer builder.
        assert!(matches!(
            guard.on_ended(first),
            Err(QueryError::BuilderChaining(_))
        ));
    }

    #[test]
    fn test_replace_swaps_identity() {
        let mut guard = BuilderGuard::new("subquery");
        let init = guard.on_started().unwrap();
        let full = guard.on_replaced(init).unwrap();
        assert!(guard.on_ended(init).is_err());
        guard.on_ended(full).unwrap();
        guard.verify_ended().unwrap();
    }

    #[test]
    fn test_replace_requires_open_match() {
        let mut guard = BuilderGuard::new("subquery");
        let token = guard.on_started().unwrap();
        guard.on_ended(token).unwrap();
        assert!(guard.on_replaced(token).is_err());
    }

    #[test]
    fn test_verify_fails_while_open() {
        let mut guard = BuilderGuard::new("on");
        let _token = guard.on_started().unwrap();
        assert!(guard.verify_ended().is_err());
    }

    #[test]
    fn test_guard_set_allows_concurrent_builders() {
        let mut set = GuardSet::new("CTE");
        let a = set.on_started();
        let b = set.on_started();
        assert!(set.verify_ended().is_err());
        set.on_ended(a).unwrap();
        set.on_ended(b).unwrap();
        set.verify_ended().unwrap();
        assert!(set.on_ended(b).is_err());
    }
}
