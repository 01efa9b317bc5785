//! One-shot deprecation notices.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::warn;

static EMITTED: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Log `message` as a deprecation warning the first time it is seen.
/// Returns `true` when the notice was actually emitted.
pub fn deprecate(message: &str) -> bool {
    let first = EMITTED.lock().insert(message.to_string());
    if first {
        warn!(target: "deprecation", "DEPRECATED: {}", message);
    }
    first
}
