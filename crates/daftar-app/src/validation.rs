// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Time;
use time::macros::format_description;

pub const DATE_LAYOUT: &str = "YYYY/MM/DD";
pub const TIME_LAYOUT: &str = "HH:MM";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidDate,
    InvalidTime,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate => write!(f, "invalid date, expected {DATE_LAYOUT}"),
            Self::InvalidTime => write!(f, "invalid time, expected {TIME_LAYOUT}"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Calendar date in the Jalali calendar, as committed by the date
/// picker. No Gregorian conversion happens anywhere in the grid; the
/// backend stores the formatted string as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct JalaliDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl JalaliDate {
    pub fn format(self) -> String {
        format!("{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

/// Parses `YYYY/MM/DD`. Months 1-6 allow 31 days, months 7-12 allow 30;
/// leap-year day 30 of month 12 is accepted without a leap check.
pub fn parse_jalali_date(input: &str) -> ValidationResult<JalaliDate> {
    let trimmed = input.trim();
    let mut parts = trimmed.split('/');
    let year = parse_component(parts.next(), 1, 9999)?;
    let month = parse_component(parts.next(), 1, 12)?;
    let day_cap = if month <= 6 { 31 } else { 30 };
    let day = parse_component(parts.next(), 1, day_cap)?;
    if parts.next().is_some() {
        return Err(ValidationError::InvalidDate);
    }
    Ok(JalaliDate {
        year,
        month: month as u8,
        day: day as u8,
    })
}

fn parse_component(part: Option<&str>, min: i32, max: i32) -> ValidationResult<i32> {
    let value = part
        .ok_or(ValidationError::InvalidDate)?
        .trim()
        .parse::<i32>()
        .map_err(|_| ValidationError::InvalidDate)?;
    if !(min..=max).contains(&value) {
        return Err(ValidationError::InvalidDate);
    }
    Ok(value)
}

pub fn parse_time_of_day(input: &str) -> ValidationResult<Time> {
    Time::parse(
        input.trim(),
        &format_description!("[hour]:[minute]"),
    )
    .map_err(|_| ValidationError::InvalidTime)
}

pub fn format_time_of_day(value: Time) -> String {
    format!("{:02}:{:02}", value.hour(), value.minute())
}

#[cfg(test)]
mod tests {
    use super::{
        JalaliDate, ValidationError, format_time_of_day, parse_jalali_date, parse_time_of_day,
    };

    #[test]
    fn jalali_date_round_trips_through_format() {
        let parsed = parse_jalali_date("1403/02/14").expect("valid date");
        assert_eq!(
            parsed,
            JalaliDate {
                year: 1403,
                month: 2,
                day: 14
            }
        );
        assert_eq!(parsed.format(), "1403/02/14");
    }

    #[test]
    fn jalali_day_caps_follow_month_halves() {
        assert!(parse_jalali_date("1403/06/31").is_ok());
        assert_eq!(
            parse_jalali_date("1403/07/31"),
            Err(ValidationError::InvalidDate)
        );
        assert!(parse_jalali_date("1403/12/30").is_ok());
    }

    #[test]
    fn jalali_rejects_malformed_inputs() {
        for input in ["", "1403-02-14", "1403/13/01", "1403/02", "1403/02/14/9"] {
            assert_eq!(
                parse_jalali_date(input),
                Err(ValidationError::InvalidDate),
                "{input:?}"
            );
        }
    }

    #[test]
    fn time_of_day_parses_and_formats() {
        let time = parse_time_of_day(" 09:30 ").expect("valid time");
        assert_eq!(format_time_of_day(time), "09:30");
        assert_eq!(parse_time_of_day("24:00"), Err(ValidationError::InvalidTime));
        assert_eq!(parse_time_of_day("nine"), Err(ValidationError::InvalidTime));
    }
}
