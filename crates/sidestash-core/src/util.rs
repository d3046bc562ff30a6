//! Small shared helpers

use chrono::Utc;

/// Current wall-clock time as Unix milliseconds
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        // Some time after 2020-01-01
        assert!(now_ms() > 1_577_836_800_000);
    }
}
