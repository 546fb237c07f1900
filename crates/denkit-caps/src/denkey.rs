//! DenKey capability payloads.
//!
//! A [`DenKey`] is the unit of trust transfer between a den owner and a
//! participant: which den, which namespaces, which rights, until when,
//! and the namespace keys needed to exercise it. It travels sealed
//! inside an [`EncryptedBundle`](crate::bundle::EncryptedBundle).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use denkit_core::{DenId, Namespace};

use crate::error::Result;
use crate::namespace::NamespaceKeySet;

/// Rights conferred by a DenKey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenKeyScope {
    /// Namespaces the grant covers; mirrors the embedded keys.
    pub namespaces: Vec<Namespace>,
    pub read: bool,
    pub write: bool,
    /// Whether the holder may keep a durable local replica.
    pub offline: bool,
}

/// A capability token granting scoped access to one den.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenKey {
    /// The den this capability applies to.
    pub den_id: DenId,

    /// Free-form tier label, e.g. `"owner"` or `"guest"`.
    pub key_type: String,

    /// Rights and namespace coverage.
    pub scope: DenKeyScope,

    /// Expiry in Unix milliseconds; `None` never expires.
    pub expires_at: Option<i64>,

    /// Namespace name to base64url key material.
    pub namespace_keys: BTreeMap<String, String>,
}

impl DenKey {
    /// Start building a capability for a den.
    pub fn builder(den_id: DenId) -> DenKeyBuilder {
        DenKeyBuilder::new(den_id)
    }

    /// Whether the capability has expired as of `now` (Unix milliseconds).
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// Recover the embedded namespace keys.
    pub fn keys(&self) -> Result<NamespaceKeySet> {
        NamespaceKeySet::deserialize(&self.namespace_keys)
    }
}

/// Builder for [`DenKey`] payloads.
///
/// Defaults to a read-only guest grant with no keys and no expiry.
pub struct DenKeyBuilder {
    den_id: DenId,
    key_type: String,
    read: bool,
    write: bool,
    offline: bool,
    expires_at: Option<i64>,
    keys: NamespaceKeySet,
}

impl DenKeyBuilder {
    fn new(den_id: DenId) -> Self {
        Self {
            den_id,
            key_type: "guest".to_string(),
            read: true,
            write: false,
            offline: false,
            expires_at: None,
            keys: NamespaceKeySet::new(),
        }
    }

    /// Set the tier label.
    pub fn key_type(mut self, kind: impl Into<String>) -> Self {
        self.key_type = kind.into();
        self
    }

    /// Allow or deny reads.
    pub fn read(mut self, allow: bool) -> Self {
        self.read = allow;
        self
    }

    /// Allow or deny writes.
    pub fn write(mut self, allow: bool) -> Self {
        self.write = allow;
        self
    }

    /// Allow or deny durable offline replicas.
    pub fn offline(mut self, allow: bool) -> Self {
        self.offline = allow;
        self
    }

    /// Set an expiry in Unix milliseconds.
    pub fn expires_at(mut self, at: i64) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Embed the namespace keys; the scope's namespace list follows them.
    pub fn keys(mut self, keys: NamespaceKeySet) -> Self {
        self.keys = keys;
        self
    }

    /// Finish the capability payload.
    pub fn build(self) -> DenKey {
        DenKey {
            den_id: self.den_id,
            key_type: self.key_type,
            scope: DenKeyScope {
                namespaces: self.keys.namespaces(),
                read: self.read,
                write: self.write,
                offline: self.offline,
            },
            expires_at: self.expires_at,
            namespace_keys: self.keys.serialize(),
        }
    }
}
