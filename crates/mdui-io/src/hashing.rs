//! Hash helpers for canonical JSON, document fingerprints and cache keys.

use serde::Serialize;

use mdui_core::canonical_json::to_canonical_json_bytes;
use mdui_core::model::Document;

use crate::version::SCHEMA_BUNDLE_V;

/// Return lowercase hex SHA-256 of bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash canonical JSON bytes using SHA-256 and return lowercase hex.
pub fn sha256_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/// Fingerprint of a compiled document: SHA-256 of its canonical JSON.
///
/// Two documents have the same fingerprint iff they are value-equal.
pub fn document_fingerprint(ir: &Document) -> Result<String, serde_json::Error> {
    sha256_canonical_json(ir)
}

/// Deterministic cache key for a compile of `source` under the given options.
///
///   mdui-compile|ir=<version>|schema=v<n>|options=sha256:<...>|source=sha256:<...>
pub fn compile_cache_key(source: &str, options: &impl Serialize) -> Result<String, serde_json::Error> {
    let ir = mdui_core::version::IR_VERSION;
    let options_hash = sha256_canonical_json(options)?;
    let source_hash = sha256_hex(source.as_bytes());
    Ok(format!(
        "mdui-compile|ir={ir}|schema=v{SCHEMA_BUNDLE_V}|options=sha256:{options_hash}|source=sha256:{source_hash}"
    ))
}
