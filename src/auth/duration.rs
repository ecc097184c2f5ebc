/// Duration Parser
///
/// Converts human-readable TTL strings such as `"15m"` or `"7d"` into seconds.

use crate::auth::TokenError;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;
// No leap adjustment
const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

/// Parse a duration string into seconds
///
/// The input is an unsigned integer followed by exactly one unit:
/// `s` (seconds), `m` (minutes), `h` (hours), `d` (days), `w` (weeks), `y` (years).
///
/// # Errors
/// Returns `TokenError::InvalidDurationFormat` for an unknown unit, a missing or
/// non-numeric magnitude, or a value that overflows `i64` seconds
pub fn parse_duration(input: &str) -> Result<i64, TokenError> {
    let invalid = || TokenError::InvalidDurationFormat(input.to_string());

    let unit = input.chars().last().ok_or_else(invalid)?;
    let magnitude = &input[..input.len() - unit.len_utf8()];

    if magnitude.is_empty() || !magnitude.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let multiplier = match unit {
        's' => 1,
        'm' => SECONDS_PER_MINUTE,
        'h' => SECONDS_PER_HOUR,
        'd' => SECONDS_PER_DAY,
        'w' => SECONDS_PER_WEEK,
        'y' => SECONDS_PER_YEAR,
        _ => return Err(invalid()),
    };

    let value: i64 = magnitude.parse().map_err(|_| invalid())?;
    value.checked_mul(multiplier).ok_or_else(invalid)
}
