//! General utilities shared across the library.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Secret Handling
// ─────────────────────────────────────────────────────────────────────────────

/// Masks a credential for log and `Debug` output.
///
/// Keeps the last four characters so two tokens can still be told apart.
#[must_use]
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn redact_keeps_last_four_characters() {
        assert_eq!(redact("abcdef123456"), "****3456");
    }

    #[test]
    fn redact_hides_short_secrets_entirely() {
        assert_eq!(redact("abc"), "****");
        assert_eq!(redact(""), "****");
    }
}
