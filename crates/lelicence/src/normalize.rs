// Tier name normalization
//
// Pricing sources and role configuration rarely agree on spelling:
// "Operations - Activity", "operations_activity" and "OPERATIONS  ACTIVITY"
// all name the same tier.

use unicode_normalization::UnicodeNormalization;

/// Normalize a tier name for comparison.
///
/// Applies NFKC, lowercases, folds runs of whitespace, `-` and `_` into a
/// single space and trims the result.
pub fn normalize_tier_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;

    for ch in name.nfkc().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    out
}
