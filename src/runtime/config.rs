//! Per-realm configuration.
//!
//! This module also owns the settlement-protocol name table: the member
//! spellings that dynamic layers reserve for their own suspension protocol.

use std::collections::HashSet;

/// What to do when a shape declares a member whose spelling collides with the
/// settlement protocol (`then`, `catch`, `finally`).
///
/// In this crate navigation and settlement are structurally distinct, so such
/// members are unambiguous; the policy exists for embedders that re-expose
/// handles to a dynamic layer where the spelling is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasPolicy {
    /// Wrap the shape; navigating the colliding spelling logs a warning.
    Allow,
    /// Refuse to wrap the shape.
    Reject,
}

/// Configuration for a realm.
#[derive(Debug, Clone)]
pub struct RealmConfig {
    /// Maximum number of jobs a single await may execute. None means unlimited.
    pub job_budget: Option<usize>,
    /// How to treat shapes that declare settlement-protocol spellings.
    pub alias_policy: AliasPolicy,
}

impl RealmConfig {
    /// Create a configuration with no job budget.
    pub fn unlimited() -> Self {
        RealmConfig {
            job_budget: None,
            alias_policy: AliasPolicy::Allow,
        }
    }

    /// Create a configuration with a job budget per await.
    pub fn with_job_budget(job_budget: usize) -> Self {
        RealmConfig {
            job_budget: Some(job_budget),
            alias_policy: AliasPolicy::Allow,
        }
    }

    /// Switch to the rejecting alias policy.
    pub fn rejecting_aliases(mut self) -> Self {
        self.alias_policy = AliasPolicy::Reject;
        self
    }
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

lazy_static! {
    /// Member spellings reserved by dynamic settlement protocols.
    pub static ref PROTOCOL_NAMES: HashSet<&'static str> = {
        let mut names = HashSet::new();
        names.insert("then");
        names.insert("catch");
        names.insert("finally");
        names
    };
}

pub fn is_protocol_name(name: &str) -> bool {
    PROTOCOL_NAMES.contains(name)
}
