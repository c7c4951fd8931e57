//! Permission evaluation.
//!
//! A permission is an opaque code such as `"marches.create"`. Matching is
//! exact and case-sensitive; there is no hierarchy. The single wildcard
//! [`WILDCARD`] grants every code.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Grants every permission.
pub const WILDCARD: &str = "*";

/// Whether `permissions` grants `code`.
pub fn has<S: AsRef<str>>(permissions: &[S], code: &str) -> bool {
    permissions
        .iter()
        .any(|p| p.as_ref() == code || p.as_ref() == WILDCARD)
}

/// Whether `permissions` grants at least one of `codes`.
///
/// An empty `codes` is never satisfied.
pub fn has_any<S: AsRef<str>, C: AsRef<str>>(permissions: &[S], codes: &[C]) -> bool {
    codes.iter().any(|c| has(permissions, c.as_ref()))
}

/// Whether `permissions` grants every one of `codes`.
///
/// An empty `codes` is always satisfied.
pub fn has_all<S: AsRef<str>, C: AsRef<str>>(permissions: &[S], codes: &[C]) -> bool {
    codes.iter().all(|c| has(permissions, c.as_ref()))
}

// ---------------------------------------------------------------------------
// PermissionSet
// ---------------------------------------------------------------------------

/// A principal's permission codes, deduplicated.
///
/// Serialized as a plain JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>) -> bool {
        self.0.insert(code.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Holds the wildcard.
    pub fn is_superuser(&self) -> bool {
        self.0.contains(WILDCARD)
    }

    /// See [`has`].
    pub fn has(&self, code: &str) -> bool {
        self.is_superuser() || self.0.contains(code)
    }

    /// See [`has_any`].
    pub fn has_any<C: AsRef<str>>(&self, codes: &[C]) -> bool {
        codes.iter().any(|c| self.has(c.as_ref()))
    }

    /// See [`has_all`].
    pub fn has_all<C: AsRef<str>>(&self, codes: &[C]) -> bool {
        codes.iter().all(|c| self.has(c.as_ref()))
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
