//! Type-safe identifiers.
//!
//! Newtype wrappers keep message sequence numbers, entity identifiers and
//! credentials from being mixed up at compile time.
//!
//! | Type | Wraps | Purpose |
//! |------|-------|---------|
//! | [`MessageId`] | `i64` | Per-connection command sequence number |
//! | [`EntityId`] | `String` | Validated `domain.object_id` |
//! | [`AccessToken`] | `String` | Long-lived access token (redacted in `Debug`) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicI64, Ordering};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// MessageId
// ============================================================================

/// Command sequence number used for request/response correlation.
///
/// Issued by [`MessageSequence`]; never reused within one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Wraps a raw sequence number.
    #[inline]
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw sequence number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// MessageSequence
// ============================================================================

/// Monotonic per-connection issuer of [`MessageId`]s.
///
/// The first issued id is `1`. Safe to share between concurrent senders.
#[derive(Debug, Default)]
pub struct MessageSequence {
    last: AtomicI64,
}

impl MessageSequence {
    /// Creates a sequence that has issued nothing yet.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Issues the next id.
    #[inline]
    pub fn issue(&self) -> MessageId {
        MessageId(self.last.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Returns the last issued id (`0` if none).
    #[inline]
    #[must_use]
    pub fn last(&self) -> MessageId {
        MessageId(self.last.load(Ordering::Acquire))
    }
}

// ============================================================================
// EntityId
// ============================================================================

/// `domain.object_id`, lowercase alphanumerics and underscores.
static ENTITY_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+\.[a-z0-9_]+$").expect("static pattern compiles"));

/// A validated `domain.object_id` entity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Parses and validates an entity identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the value is not `domain.object_id`.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if ENTITY_ID_PATTERN.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(Error::invalid_argument(format!(
                "invalid entity id '{value}', expected 'domain.object_id'"
            )))
        }
    }

    /// Builds an entity id from a domain and an object id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the result is not valid.
    pub fn from_parts(domain: &str, object_id: &str) -> Result<Self> {
        Self::parse(format!("{domain}.{object_id}"))
    }

    /// Returns the domain part (`light` in `light.kitchen`).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map(|(d, _)| d).unwrap_or_default()
    }

    /// Returns the object id part (`kitchen` in `light.kitchen`).
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.0.split_once('.').map(|(_, o)| o).unwrap_or_default()
    }

    /// Returns the full identifier.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// AccessToken
// ============================================================================

/// Long-lived access token for the hub.
///
/// `Debug` output never contains the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a token string.
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the secret value.
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the token is empty or whitespace.
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<&str> for AccessToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
