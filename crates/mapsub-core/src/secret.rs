use std::hash::{Hash, Hasher};

use chrono::Utc;

/// Generate an account-linking secret: the current nanosecond timestamp run
/// through a non-cryptographic hash, folded to 32 bits and rendered in
/// decimal.
///
/// Uniqueness is best-effort only. The store rejects duplicates and the
/// caller draws again.
pub fn generate_secret() -> String {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros().saturating_mul(1_000));
    secret_from_seed(nanos)
}

/// Deterministic core of `generate_secret`.
pub fn secret_from_seed(seed: i64) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    seed.to_string().hash(&mut hasher);
    let hash = hasher.finish();

    // Fold the high half in so every input bit still affects the output
    let folded = (hash as u32) ^ ((hash >> 32) as u32);
    folded.to_string()
}
