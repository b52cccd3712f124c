// Requested capability sets

use std::collections::HashSet;

/// Clean up a requested capability list.
///
/// Names are trimmed, blanks dropped and repeats removed, keeping the first
/// occurrence so the caller's order survives.
pub fn dedup_requested<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .map(|name| name.as_ref().trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
