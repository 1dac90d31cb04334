use chrono::{NaiveTime, Timelike};
use serde::de::{Error, Unexpected};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Wall-clock time of day an alarm goes off at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AlarmTime(NaiveTime);

impl AlarmTime {
    pub fn new(hour: u32, minute: u32, second: u32) -> Result<Self, ValidationError> {
        if hour > 23 {
            return Err(ValidationError::Hour(hour));
        }
        if minute > 59 {
            return Err(ValidationError::Minute(minute));
        }
        if second > 59 {
            return Err(ValidationError::Second(second));
        }

        NaiveTime::from_hms_opt(hour, minute, second)
            .map(AlarmTime)
            .ok_or_else(|| ValidationError::Format(format!("{hour}:{minute}:{second}")))
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn second(&self) -> u32 {
        self.0.second()
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

impl FromStr for AlarmTime {
    type Err = ValidationError;

    /// Accepts `HH:MM` and `HH:MM:SS`, seconds default to zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute, second) = split_time(s)?;
        AlarmTime::new(hour, minute, second)
    }
}

/// Splits a `HH:MM[:SS]` string into its raw components without range checks.
pub fn split_time(s: &str) -> Result<(u32, u32, u32), ValidationError> {
    let invalid = || ValidationError::Format(s.to_string());
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid());
    }

    if parts[0].is_empty() || parts[0].len() > 2 || parts[1..].iter().any(|part| part.len() != 2) {
        return Err(invalid());
    }

    let mut numbers = parts.iter().map(|part| part.parse::<u32>().map_err(|_| invalid()));
    let hour = numbers.next().ok_or_else(invalid)??;
    let minute = numbers.next().ok_or_else(invalid)??;
    let second = numbers.next().transpose()?.unwrap_or(0);

    Ok((hour, minute, second))
}

impl<'de> Deserialize<'de> for AlarmTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value
            .parse::<AlarmTime>()
            .map_err(|_| Error::invalid_value(Unexpected::Str(&value), &"a time in HH:MM:SS format"))
    }
}

/// A single entry of the alarm list. Its position in the list is the only identity it has.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlarmEntry {
    pub time: AlarmTime,
    pub active: bool,
}

impl AlarmEntry {
    pub fn new(time: AlarmTime, active: bool) -> Self {
        AlarmEntry { time, active }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("hour {0} is out of range, expected 0-23")]
    Hour(u32),
    #[error("minute {0} is out of range, expected 0-59")]
    Minute(u32),
    #[error("second {0} is out of range, expected 0-59")]
    Second(u32),
    #[error("invalid time '{0}', expected HH:MM or HH:MM:SS")]
    Format(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("7:30", "07:30:00")]
    #[case("07:30:00", "07:30:00")]
    #[case("00:00", "00:00:00")]
    #[case("23:59:59", "23:59:59")]
    fn parses_a_valid_time(#[case] input: &str, #[case] expected: &str) {
        let time = input.parse::<AlarmTime>().unwrap();
        assert_eq!(time.to_string(), expected);
    }

    #[rstest]
    #[case::missing_colon("0730")]
    #[case::missing_minutes("07:")]
    #[case::too_many_parts("07:30:00:00")]
    #[case::invalid_hour("a7:30")]
    #[case::hour_too_large("24:00")]
    #[case::minutes_too_large("07:60")]
    #[case::seconds_too_large("07:30:60")]
    #[case::minutes_too_short("07:3")]
    fn fails_for_an_invalid_time(#[case] input: &str) {
        assert!(input.parse::<AlarmTime>().is_err());
    }

    #[rstest]
    #[case(24, 0, 0, ValidationError::Hour(24))]
    #[case(7, 60, 0, ValidationError::Minute(60))]
    #[case(7, 30, 61, ValidationError::Second(61))]
    fn rejects_out_of_range_components(#[case] hour: u32, #[case] minute: u32, #[case] second: u32, #[case] expected: ValidationError) {
        assert_eq!(AlarmTime::new(hour, minute, second), Err(expected));
    }

    #[test]
    fn deserializes_an_alarm_entry() {
        let entry = serde_json::from_value::<AlarmEntry>(json!({ "time": "06:45:00", "active": false })).unwrap();

        assert_eq!(entry, AlarmEntry::new(AlarmTime::new(6, 45, 0).unwrap(), false));
        assert_eq!(entry.time.hour(), 6);
        assert_eq!(entry.time.minute(), 45);
        assert_eq!(entry.time.second(), 0);
    }

    #[test]
    fn fails_to_deserialize_an_entry_with_an_invalid_time() {
        let result = serde_json::from_value::<AlarmEntry>(json!({ "time": "25:00:00", "active": true }));
        assert!(result.is_err());
    }
}
