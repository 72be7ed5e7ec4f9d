//! PL-010: BLAKE3 fingerprints for resource descriptors.

use crate::core::types::ResourceDescriptor;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Fingerprint a descriptor over its identity and rendered body.
/// Deterministic: `serde_json::Value` renders object keys in a stable order.
pub fn fingerprint(descriptor: &ResourceDescriptor) -> String {
    let identity = format!(
        "{}\0{}\0{}\0{}\0{}",
        descriptor.kind,
        descriptor.name,
        descriptor.project,
        descriptor.environment,
        descriptor.body
    );
    hash_string(&identity)
}
