//! Deterministic cache keys derived from a caller identity and its arguments.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CacheError;
use crate::utils::build_cache_key;

/// The logical operation a cached value belongs to.
///
/// Two consumers sharing one backing store must use different identities,
/// otherwise their entries (and in-flight revalidations) are shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    namespace: String,
    operation: String,
}

impl Identity {
    /// Create an identity from an explicit namespace and operation name.
    pub fn new(namespace: impl Into<String>, operation: impl Into<String>) -> Self {
        Identity {
            namespace: namespace.into(),
            operation: operation.into(),
        }
    }

    /// Identity for a method on `T`, namespaced by the type's short name.
    ///
    /// # Example
    /// ```ignore
    /// let id = Identity::of::<UserClient>("fetch_user");
    /// assert_eq!(id.namespace(), "UserClient");
    /// ```
    pub fn of<T: ?Sized>(operation: impl Into<String>) -> Self {
        Identity::new(short_type_name::<T>(), operation)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.operation)
    }
}

/// Opaque key identifying one (identity, arguments) pair in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds cache keys.
///
/// Arguments are hashed structurally: they are serialized to JSON, object
/// fields are sorted, and the canonical bytes are digested with SHA-256
/// together with the identity. Structurally equal arguments therefore always
/// map to the same key regardless of how they were constructed (for example
/// the insertion order of a `HashMap`).
///
/// Key format: `{namespace}::{operation}::{sha256-hex}`. The readable prefix
/// is for debugging; the digest alone separates identities.
///
/// Non-finite floats have no JSON form and serialize as `null`, so an `f64`
/// argument of `NaN` or infinity shares its key with `None`. Wrap such
/// arguments in a type that serializes them explicitly if they must be
/// distinguished.
pub struct KeyBuilder;

impl KeyBuilder {
    pub fn build<A>(identity: &Identity, args: &A) -> Result<CacheKey, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let value = serde_json::to_value(args)?;
        let canonical = serde_json::to_vec(&canonicalize(value))?;

        let mut hasher = Sha256::new();
        for part in [identity.namespace.as_bytes(), identity.operation.as_bytes()] {
            // Length prefixes keep ("a::b", "c") and ("a", "b::c") apart.
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        hasher.update(&canonical);
        let digest = hex::encode(hasher.finalize());

        Ok(CacheKey(build_cache_key(&[
            &identity.namespace,
            &identity.operation,
            &digest,
        ])))
    }
}

/// Rebuild every object with its fields in sorted order.
///
/// Without serde_json's `preserve_order` feature `Map` is already sorted, but
/// any crate in the dependency graph can turn that feature on, and then
/// field order would follow insertion order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(String, Value)> = map.into_iter().collect();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = Map::with_capacity(fields.len());
            for (k, v) in fields {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
