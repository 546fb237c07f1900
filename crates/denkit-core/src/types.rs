//! Strong type definitions shared across the denkit crates.
//!
//! Identifiers are newtypes so a den id can never be confused with a
//! document name or a namespace label at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Maximum accepted den identifier length in bytes.
pub const MAX_DEN_ID_LEN: usize = 128;

/// A stable, globally unique den identifier.
///
/// Den ids name on-disk documents, so the alphabet is restricted to
/// characters that are safe inside storage keys: ASCII alphanumerics plus
/// `.`, `_`, and `-`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenId(String);

impl DenId {
    /// Validate and wrap a den identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::InvalidInput("den id is empty".to_string()));
        }
        if id.len() > MAX_DEN_ID_LEN {
            return Err(CoreError::InvalidInput(format!(
                "den id exceeds {} bytes",
                MAX_DEN_ID_LEN
            )));
        }
        if !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
        {
            return Err(CoreError::InvalidInput(format!(
                "den id contains invalid characters: {:?}",
                id
            )));
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DenId({})", self.0)
    }
}

impl fmt::Display for DenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DenId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A named partition of the shared document.
///
/// Each namespace is independently key-scoped: holding the key for one
/// grants nothing about the others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Namespace {
    SharedNotes,
    VoiceThread,
    Dropbox,
    Presence,
}

impl Namespace {
    /// All namespaces, in canonical order.
    pub const ALL: [Namespace; 4] = [
        Namespace::SharedNotes,
        Namespace::VoiceThread,
        Namespace::Dropbox,
        Namespace::Presence,
    ];

    /// The wire name for this namespace.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Namespace::SharedNotes => "sharedNotes",
            Namespace::VoiceThread => "voiceThread",
            Namespace::Dropbox => "dropbox",
            Namespace::Presence => "presence",
        }
    }

    /// Parse a wire name.
    ///
    /// Returns `None` for unrecognized names so callers can skip namespaces
    /// introduced by newer peers instead of failing.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sharedNotes" => Some(Namespace::SharedNotes),
            "voiceThread" => Some(Namespace::VoiceThread),
            "dropbox" => Some(Namespace::Dropbox),
            "presence" => Some(Namespace::Presence),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which of a den's two documents an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocRole {
    /// The never-shared document, encrypted at rest under the device key.
    Private,
    /// The namespace-partitioned document visible to granted participants.
    Shared,
}

impl DocRole {
    /// The storage-name segment for this role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocRole::Private => "private",
            DocRole::Shared => "shared",
        }
    }
}

impl fmt::Display for DocRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
