use super::ApiError;
use crate::entities::readings;
use crate::services::pairing;

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;
pub const DEFAULT_HISTORY_HOURS: i64 = 24;
const MAX_HISTORY_HOURS: i64 = 24 * 90;

pub fn validate_pairing_code(code: &str) -> Result<&str, ApiError> {
    if !pairing::is_valid_code(code) {
        return Err(ApiError::validation(
            "Pairing code must be exactly 5 digits",
        ));
    }
    Ok(code)
}

pub fn validate_page(page: Option<u64>) -> Result<u64, ApiError> {
    match page {
        None => Ok(1),
        Some(0) => Err(ApiError::validation("page must be at least 1")),
        Some(p) => Ok(p),
    }
}

/// Defaults to 20; zero is rejected, oversized requests are clamped.
pub fn validate_limit(limit: Option<u64>) -> Result<u64, ApiError> {
    match limit {
        None => Ok(DEFAULT_LIMIT),
        Some(0) => Err(ApiError::validation("limit must be greater than 0")),
        Some(l) => Ok(l.min(MAX_LIMIT)),
    }
}

/// Maps a `sortBy` parameter onto the reading column allow-list.
/// Anything outside the list is rejected rather than ignored.
pub fn validate_sort_column(sort_by: Option<&str>) -> Result<readings::Column, ApiError> {
    let Some(field) = sort_by else {
        return Ok(readings::Column::Ts);
    };

    match field {
        "id" => Ok(readings::Column::Id),
        "ts" | "timestamp" => Ok(readings::Column::Ts),
        "device_id" | "device" => Ok(readings::Column::DeviceId),
        "temperature_c" | "temperature" => Ok(readings::Column::TemperatureC),
        "humidity_pct" | "humidity" => Ok(readings::Column::HumidityPct),
        "lux" => Ok(readings::Column::Lux),
        "sound" => Ok(readings::Column::Sound),
        "co2_ppm" | "co2" => Ok(readings::Column::Co2Ppm),
        other => Err(ApiError::validation(format!(
            "Unknown sort field: {}",
            other
        ))),
    }
}

/// `sortOrder` is ASC or DESC (case-insensitive), default DESC.
pub fn validate_sort_order(sort_order: Option<&str>) -> Result<bool, ApiError> {
    match sort_order {
        None => Ok(false),
        Some(order) => match order.to_ascii_uppercase().as_str() {
            "ASC" => Ok(true),
            "DESC" => Ok(false),
            other => Err(ApiError::validation(format!(
                "Invalid sort order: {}. Use ASC or DESC",
                other
            ))),
        },
    }
}

pub fn validate_history_hours(hours: Option<i64>) -> Result<i64, ApiError> {
    match hours {
        None => Ok(DEFAULT_HISTORY_HOURS),
        Some(h) if h <= 0 => Err(ApiError::validation("hours must be greater than 0")),
        Some(h) => Ok(h.min(MAX_HISTORY_HOURS)),
    }
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }
    if trimmed.len() > 64 {
        return Err(ApiError::validation(
            "Username must be 64 characters or less",
        ));
    }
    Ok(trimmed)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();
    if trimmed.is_empty() || !trimmed.contains('@') || trimmed.len() > 254 {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(trimmed)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(password)
}

/// Purge cutoffs must be RFC 3339, and are normalized to UTC in the
/// stored `+00:00` rendering: the purge compares strings
/// lexicographically, so a cutoff carried in another offset would
/// otherwise delete the wrong rows.
pub fn validate_timestamp(value: &str) -> Result<String, ApiError> {
    let parsed = chrono::DateTime::parse_from_rfc3339(value)
        .map_err(|_| ApiError::validation(format!("Invalid RFC 3339 timestamp: {}", value)))?;
    Ok(parsed.with_timezone(&chrono::Utc).to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pairing_code() {
        assert!(validate_pairing_code("12345").is_ok());
        assert!(validate_pairing_code("00000").is_ok());
        assert!(validate_pairing_code("12").is_err());
        assert!(validate_pairing_code("abcde").is_err());
        assert!(validate_pairing_code("123456").is_err());
    }

    #[test]
    fn test_validate_page_and_limit() {
        assert_eq!(validate_page(None).unwrap(), 1);
        assert_eq!(validate_page(Some(7)).unwrap(), 7);
        assert!(validate_page(Some(0)).is_err());

        assert_eq!(validate_limit(None).unwrap(), DEFAULT_LIMIT);
        assert_eq!(validate_limit(Some(50)).unwrap(), 50);
        assert_eq!(validate_limit(Some(5000)).unwrap(), MAX_LIMIT);
        assert!(validate_limit(Some(0)).is_err());
    }

    #[test]
    fn test_validate_sort_column() {
        assert!(matches!(
            validate_sort_column(None).unwrap(),
            readings::Column::Ts
        ));
        assert!(matches!(
            validate_sort_column(Some("temperature_c")).unwrap(),
            readings::Column::TemperatureC
        ));
        assert!(matches!(
            validate_sort_column(Some("id")).unwrap(),
            readings::Column::Id
        ));
        assert!(validate_sort_column(Some("password_hash")).is_err());
        assert!(validate_sort_column(Some("ts; DROP TABLE readings")).is_err());
    }

    #[test]
    fn test_validate_sort_order() {
        assert!(validate_sort_order(Some("asc")).unwrap());
        assert!(validate_sort_order(Some("ASC")).unwrap());
        assert!(!validate_sort_order(Some("desc")).unwrap());
        assert!(!validate_sort_order(None).unwrap());
        assert!(validate_sort_order(Some("sideways")).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("dev@roomsense.local").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_validate_timestamp() {
        assert!(validate_timestamp("yesterday").is_err());
        assert!(validate_timestamp("2026-01-01").is_err());
    }

    #[test]
    fn test_validate_timestamp_normalizes_to_utc() {
        assert_eq!(
            validate_timestamp("2026-01-01T00:00:00Z").unwrap(),
            "2026-01-01T00:00:00+00:00"
        );
        assert_eq!(
            validate_timestamp("2026-01-01T12:00:00+02:00").unwrap(),
            "2026-01-01T10:00:00+00:00"
        );
        assert_eq!(
            validate_timestamp("2026-01-01T22:30:00-05:00").unwrap(),
            "2026-01-02T03:30:00+00:00"
        );
    }
}
