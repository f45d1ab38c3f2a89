//! xxh64 fingerprints of serializable values.
//!
//! Two things get hashed: the sorted `(parent, notation, child, count)`
//! edge list behind a [`RepertoireSnapshot`](crate::graph::RepertoireSnapshot)
//! and the [`EngineConfig`](crate::config::EngineConfig) a report was built
//! with. Both are plain structs, tuples and vectors of strings and integers,
//! so their compact JSON form is already canonical. Anything keyed that is
//! hashed must use `BTreeMap`.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Compact JSON bytes of `value`.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    // Only string-keyed values are hashed, which serde_json cannot reject.
    serde_json::to_vec(value).expect("hashed values serialize to JSON")
}

/// xxh64 (seed 0) of the canonical bytes.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// [`canonical_hash`] as 16 lowercase hex digits.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
