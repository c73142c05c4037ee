//! Time and date labels shown on summary screens.

use chrono::NaiveDate;

use crate::error::FormatError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Twelve-hour clock label for minutes past midnight, e.g. `545` → `9:05 AM`.
pub fn format_time(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    let period = if hours % 24 >= 12 { "PM" } else { "AM" };
    let display_hours = match hours % 12 {
        0 => 12,
        hours => hours,
    };
    format!("{display_hours}:{mins:02} {period}")
}

/// Human duration between two times of day, in minutes past midnight.
///
/// An end before the start is taken to be on the following day, measured
/// between the two times of day.
pub fn calculate_duration(start_minutes: u32, end_minutes: u32) -> String {
    let diff = if end_minutes >= start_minutes {
        end_minutes - start_minutes
    } else {
        (end_minutes % MINUTES_PER_DAY + MINUTES_PER_DAY - start_minutes % MINUTES_PER_DAY)
            % MINUTES_PER_DAY
    };
    let hours = diff / 60;
    let minutes = diff % 60;
    let hour_label = |hours: u32| {
        if hours > 1 {
            format!("{hours} hours")
        } else {
            format!("{hours} hour")
        }
    };
    match (hours, minutes) {
        (0, minutes) => format!("{minutes} minutes"),
        (hours, 0) => hour_label(hours),
        (hours, minutes) => format!("{} {minutes} minutes", hour_label(hours)),
    }
}

/// Parses a `YYYY-MM-DD` date as stored by date inputs.
pub fn parse_date(input: &str) -> Result<NaiveDate, FormatError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| FormatError::InvalidDate {
        input: input.to_owned(),
    })
}

/// Long form of a stored date, e.g. `2024-03-15` → `March 15, 2024`.
pub fn format_date(input: &str) -> Result<String, FormatError> {
    Ok(parse_date(input)?.format("%B %-d, %Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(format_time(0), "12:00 AM");
        assert_eq!(format_time(545), "9:05 AM");
        assert_eq!(format_time(720), "12:00 PM");
        assert_eq!(format_time(1439), "11:59 PM");
    }

    #[test]
    fn durations() {
        assert_eq!(calculate_duration(540, 540), "0 minutes");
        assert_eq!(calculate_duration(540, 585), "45 minutes");
        assert_eq!(calculate_duration(540, 600), "1 hour");
        assert_eq!(calculate_duration(540, 720), "3 hours");
        assert_eq!(calculate_duration(540, 630), "1 hour 30 minutes");
        assert_eq!(calculate_duration(1320, 90), "3 hours 30 minutes");
    }

    #[test]
    fn start_past_a_day_wraps_to_time_of_day() {
        assert_eq!(calculate_duration(5000, 0), "12 hours 40 minutes");
        assert_eq!(calculate_duration(1980, 600), "1 hour");
        assert_eq!(calculate_duration(u32::MAX, 0), calculate_duration(u32::MAX % MINUTES_PER_DAY, 0));
    }

    #[test]
    fn dates() {
        assert_eq!(format_date("2024-03-15").unwrap(), "March 15, 2024");
        assert_eq!(format_date("2024-12-01").unwrap(), "December 1, 2024");
        assert_eq!(
            format_date("15/03/2024"),
            Err(FormatError::InvalidDate {
                input: "15/03/2024".to_owned()
            })
        );
        assert!(parse_date("2024-02-30").is_err());
    }
}
