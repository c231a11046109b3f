//! Content digests.
//!
//! All digests are blake3 based, so they are stable across platforms and runs.

/// Number of digest bytes kept for uids (128 bits, rendered as 32 hex chars).
const UID_BYTES: usize = 16;

/// Hash a sequence of byte parts into a hex digest.
///
/// Parts are length-prefixed, so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn digest_parts<I, P>(parts: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        let part = part.as_ref();
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize().as_bytes())
}

/// Deterministic one-way uid for an organization identifier.
pub fn make_uid(org_id: &str) -> String {
    let hash = blake3::hash(org_id.as_bytes());
    hex::encode(&hash.as_bytes()[..UID_BYTES])
}

/// Short digest of a JSON value, used for generated node ids.
pub fn value_id(value: &serde_json::Value) -> String {
    let hash = blake3::hash(value.to_string().as_bytes());
    hex::encode(&hash.as_bytes()[..UID_BYTES])
}
