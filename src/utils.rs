//! Utility functions for the league service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique session ID
pub fn generate_session_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique group ID
pub fn generate_group_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique match ID
pub fn generate_match_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique player ID
pub fn generate_player_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Normalize a session date to midnight UTC
pub fn normalize_session_date(date: DateTime<Utc>) -> DateTime<Utc> {
    date.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_session_id();
        let id2 = generate_session_id();
        assert_ne!(id1, id2);

        let player_id1 = generate_player_id();
        let player_id2 = generate_player_id();
        assert_ne!(player_id1, player_id2);
    }

    #[test]
    fn test_normalize_session_date() {
        let afternoon = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let normalized = normalize_session_date(afternoon);

        assert_eq!(normalized, Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let midnight = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        assert_eq!(normalize_session_date(midnight), midnight);
    }
}
