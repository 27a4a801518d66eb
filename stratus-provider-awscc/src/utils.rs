//! Naming helpers

use std::sync::atomic::{AtomicU32, Ordering};

/// Length of the suffix appended by [`prefixed_unique_id`]
pub const UNIQUE_ID_SUFFIX_LENGTH: usize = 26;

static UNIQUE_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate a unique name starting with `prefix`.
///
/// The suffix is a UTC timestamp with microseconds followed by a six digit
/// hex counter, so names sort by creation time.
pub fn prefixed_unique_id(prefix: &str) -> String {
    let counter = UNIQUE_ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S%6f");
    format!("{}{}{:06x}", prefix, timestamp, counter)
}

/// Recover the prefix of a name produced by [`prefixed_unique_id`]
pub fn name_prefix_from_name(name: &str) -> Option<String> {
    let split = name.len().checked_sub(UNIQUE_ID_SUFFIX_LENGTH)?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (prefix, suffix) = name.split_at(split);
    if !suffix.is_ascii() {
        return None;
    }
    let (timestamp, counter) = suffix.split_at(20);
    let is_suffix = timestamp.chars().all(|c| c.is_ascii_digit())
        && counter
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    is_suffix.then(|| prefix.to_string())
}
