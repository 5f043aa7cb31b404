// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Capability checks.
//!
//! Authorization is a pass/fail question: may this principal use this
//! capability? Capabilities are named after the operation they guard
//! (e.g. `mutation.rcRecipeImport`).

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

/// Grants every capability to the subject holding it.
pub const WILDCARD: &str = "*";

/// The caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    /// A named principal.
    pub fn new(subject: impl Into<String>) -> Self {
        Self(subject.into())
    }

    /// The principal used when a request carries no identity.
    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }

    /// Subject name.
    pub fn subject(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides whether a principal holds a capability.
pub trait Authorizer: Send + Sync {
    /// Whether `principal` may use `capability`.
    fn is_allowed(&self, principal: &Principal, capability: &str) -> bool;
}

/// A malformed entry in a grant list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantParseError {
    /// The entry has no `=` between subject and capabilities.
    #[error("Grant '{0}' is missing '='")]
    MissingSeparator(String),
    /// The entry has nothing before `=`.
    #[error("Grant '{0}' has an empty subject")]
    EmptySubject(String),
}

/// Static subject → capabilities table.
///
/// Parsed from `subject=cap1|cap2;other=cap3`. A capability of `*` grants
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantTable {
    grants: HashMap<String, HashSet<String>>,
}

impl GrantTable {
    /// An empty table that denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a capability (builder style).
    pub fn grant(mut self, subject: impl Into<String>, capability: impl Into<String>) -> Self {
        self.grants
            .entry(subject.into())
            .or_default()
            .insert(capability.into());
        self
    }

    /// Parse the `RECIPE_GRANTS` format.
    pub fn parse(raw: &str) -> Result<Self, GrantParseError> {
        let mut table = Self::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (subject, capabilities) = entry
                .split_once('=')
                .ok_or_else(|| GrantParseError::MissingSeparator(entry.to_string()))?;
            let subject = subject.trim();
            if subject.is_empty() {
                return Err(GrantParseError::EmptySubject(entry.to_string()));
            }
            for capability in capabilities.split('|').map(str::trim).filter(|c| !c.is_empty()) {
                table = table.grant(subject, capability);
            }
        }
        Ok(table)
    }

    /// Number of subjects with at least one grant.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether no subject holds any grant.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl Authorizer for GrantTable {
    fn is_allowed(&self, principal: &Principal, capability: &str) -> bool {
        self.grants
            .get(principal.subject())
            .is_some_and(|caps| caps.contains(capability) || caps.contains(WILDCARD))
    }
}
