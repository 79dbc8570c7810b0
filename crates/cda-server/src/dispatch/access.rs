//! Role-gated access to resource operations
//!
//! Each resource carries two rules: an open rule covering the reads and a
//! restricted rule covering the writes. A rule with an empty role set lets
//! everybody through; otherwise the caller needs any one of its roles.

use std::collections::BTreeSet;

use cda_common::{ConfigResult, ConfigurationError};

use super::Operation;

/// Role-set required for a set of operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    operations: BTreeSet<Operation>,
    roles: BTreeSet<String>,
}

impl AccessRule {
    pub fn operations(&self) -> &BTreeSet<Operation> {
        &self.operations
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn is_open(&self) -> bool {
        self.roles.is_empty()
    }

    fn permits(&self, caller_roles: &BTreeSet<String>) -> bool {
        self.is_open() || self.roles.iter().any(|role| caller_roles.contains(role))
    }
}

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

/// The pair of access rules guarding one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    reads: AccessRule,
    writes: AccessRule,
}

impl AccessPolicy {
    /// Open reads; writes need one of `write_roles`
    pub fn new<I, R>(write_roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            reads: AccessRule {
                operations: [Operation::FetchOne, Operation::FetchAll].into(),
                roles: BTreeSet::new(),
            },
            writes: AccessRule {
                operations: [Operation::Create, Operation::Update, Operation::Delete].into(),
                roles: write_roles.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Require the write roles for reads too
    pub fn restrict_reads(mut self) -> Self {
        self.reads.roles = self.writes.roles.clone();
        self
    }

    /// Reject policies that would leave writes open to anyone
    pub fn check(&self, template: &str) -> ConfigResult<()> {
        if self.writes.is_open() {
            return Err(ConfigurationError::NoWriteRoles {
                template: template.to_string(),
            });
        }
        Ok(())
    }

    pub fn reads_restricted(&self) -> bool {
        !self.reads.is_open()
    }

    /// The rule covering `operation`
    pub fn rule_for(&self, operation: Operation) -> &AccessRule {
        if operation.is_read() {
            &self.reads
        } else {
            &self.writes
        }
    }
}

/// Decide whether a caller holding `caller_roles` may perform `operation`
///
/// Anonymous callers are passed an empty role set.
pub fn authorize(
    operation: Operation,
    caller_roles: &BTreeSet<String>,
    policy: &AccessPolicy,
) -> Decision {
    if policy.rule_for(operation).permits(caller_roles) {
        Decision::Allow
    } else {
        Decision::Deny("missing role")
    }
}
