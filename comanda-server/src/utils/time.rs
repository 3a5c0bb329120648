//! Time helpers for availability rules

use chrono::Datelike;

/// Weekday names as stored on `Product::available_days`, Sunday-first.
pub const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Today's weekday name in local time.
pub fn today_name() -> &'static str {
    let idx = chrono::Local::now().weekday().num_days_from_sunday() as usize;
    DAY_NAMES[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn today_is_a_known_day() {
        assert!(DAY_NAMES.contains(&today_name()));
    }
}
