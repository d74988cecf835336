use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

pub const MAX_SLUG_LEN: usize = 64;

/// Primary key of a user in the surrounding application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary key of a location, review, comment or photo row.
pub type EntityId = i64;

/// Sequence number assigned to every handled activity event.
///
/// Allocated by the ledger, strictly increasing, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable public identifier of a badge.
///
/// Lowercase ASCII letters, digits and single hyphens (`first-light`). Used
/// for icon lookup, so a slug is never reassigned to a different badge.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BadgeSlug(String);

impl BadgeSlug {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if let Some(reason) = slug_defect(&raw) {
            return Err(DomainError::InvalidSlug { slug: raw, reason });
        }
        Ok(Self(raw))
    }

    /// Slug from a literal in source, e.g. the seed catalog.
    ///
    /// Literals are not re-validated in release builds.
    pub fn from_static(raw: &'static str) -> Self {
        debug_assert!(slug_defect(raw).is_none(), "malformed slug literal {raw:?}");
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn slug_defect(raw: &str) -> Option<&'static str> {
    if raw.is_empty() {
        return Some("empty");
    }
    if raw.len() > MAX_SLUG_LEN {
        return Some("too long");
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Some("only lowercase letters, digits and '-' are allowed");
    }
    if raw.starts_with('-') || raw.ends_with('-') || raw.contains("--") {
        return Some("hyphens must separate words");
    }
    None
}

impl TryFrom<String> for BadgeSlug {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for BadgeSlug {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BadgeSlug> for String {
    fn from(slug: BadgeSlug) -> Self {
        slug.0
    }
}

impl Borrow<str> for BadgeSlug {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BadgeSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
