//! Cache key construction.
//!
//! Every cached repository read lives under
//! `{prefix}:{namespace}:{method}:{args..}:v{version}`. The version counter
//! of a namespace is stored at `{prefix}:{namespace}:v` and the namespace
//! tag is `{prefix}:{namespace}`. Empty segments are dropped.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::content::{Entity, EntityId};
use crate::storage::Columns;

use super::{Result, SerializationError};

/// Number of digest bytes kept for structured arguments.
const DIGEST_BYTES: usize = 16;

/// Version a namespace starts at when no counter is stored.
pub const INITIAL_VERSION: u64 = 1;

/// Cache partition of one entity type. The unit of invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    /// Creates a namespace from a raw name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The namespace of entity type `E`.
    pub fn of<E: Entity>() -> Self {
        Self(E::NAME.to_string())
    }

    /// Returns the namespace name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One normalized argument of a cached call.
///
/// Scalars are kept as their string form. Structured values are replaced by
/// a fixed-length digest of their serialized form so keys stay bounded.
/// Argument order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPart(String);

impl KeyPart {
    /// A scalar argument, kept verbatim.
    pub fn scalar(value: impl fmt::Display) -> Self {
        Self(value.to_string())
    }

    /// A structured argument, digested from its JSON form.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| SerializationError::SerializeFailed(e.to_string()))?;
        Ok(Self::digest(bytes))
    }

    /// A digest of raw bytes.
    pub fn digest(bytes: impl AsRef<[u8]>) -> Self {
        let hash = Sha256::digest(bytes.as_ref());
        Self(hex::encode(&hash[..DIGEST_BYTES]))
    }

    /// Returns the normalized segment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        Self::scalar(value)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        Self::scalar(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::scalar(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        Self::scalar(value)
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::scalar(value)
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Column lists are short identifier lists and render as `[a,b]`.
impl From<&Columns> for KeyPart {
    fn from(columns: &Columns) -> Self {
        Self::scalar(columns)
    }
}

impl From<&[EntityId]> for KeyPart {
    fn from(ids: &[EntityId]) -> Self {
        let joined = ids
            .iter()
            .map(EntityId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self::digest(format!("[{joined}]"))
    }
}

/// Builds the keys of one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    prefix: String,
    namespace: Namespace,
}

impl CacheKeyBuilder {
    /// Creates a key builder for `namespace` under `prefix`.
    pub fn new(prefix: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            prefix: prefix.into(),
            namespace,
        }
    }

    /// Returns the namespace these keys belong to.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Key of the namespace's version counter.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_core::cache::{CacheKeyBuilder, Namespace};
    ///
    /// let keys = CacheKeyBuilder::new("repo", Namespace::new("Post"));
    /// assert_eq!(keys.version_key(), "repo:Post:v");
    /// ```
    pub fn version_key(&self) -> String {
        join([self.prefix.as_str(), self.namespace.as_str(), "v"])
    }

    /// Tag grouping every entry of the namespace.
    pub fn tag(&self) -> String {
        join([self.prefix.as_str(), self.namespace.as_str()])
    }

    /// Key of a call, without the version suffix.
    pub fn key(&self, method: &str, args: &[KeyPart]) -> String {
        join(
            [self.prefix.as_str(), self.namespace.as_str(), method]
                .into_iter()
                .chain(args.iter().map(KeyPart::as_str)),
        )
    }

    /// Key of a call at `version`.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_core::cache::{CacheKeyBuilder, KeyPart, Namespace};
    /// use folio_core::storage::Columns;
    ///
    /// let keys = CacheKeyBuilder::new("repo", Namespace::new("Post"));
    /// let args = [KeyPart::from(15u64), KeyPart::from(&Columns::all()), KeyPart::from(1u64)];
    /// assert_eq!(
    ///     keys.versioned_key("paginate", &args, 1),
    ///     "repo:Post:paginate:15:[*]:1:v1"
    /// );
    /// ```
    pub fn versioned_key(&self, method: &str, args: &[KeyPart], version: u64) -> String {
        format!("{}:v{}", self.key(method, args), version)
    }
}

fn join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}
