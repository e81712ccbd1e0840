//! Wall-clock helpers.
//!
//! Trade timestamps, token expiries and session bookkeeping all use
//! milliseconds since the Unix epoch.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as **milliseconds** since the Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Current time as **seconds** since the Unix epoch.
#[inline]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_consistent_with_now_secs() {
        let ms = now_ms();
        let secs = now_secs();
        assert!(ms / 1000 >= secs.saturating_sub(1));
        assert!(ms / 1000 <= secs + 1);
    }
}
