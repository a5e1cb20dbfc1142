//! Local calendar date keys.
//!
//! Every ledger key is the caller's local calendar day formatted as
//! `YYYY-MM-DD`. Never derive keys from UTC: near midnight that shifts
//! the active date by one.

use crate::errors::LedgerError;
use chrono::{Datelike, Duration, Local, NaiveDate};

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn today_key() -> String {
    date_key(today())
}

/// Parses a canonical `YYYY-MM-DD` key. Non-padded forms are rejected so
/// one calendar day can never be stored under two keys.
pub fn parse_date_key(key: &str) -> Result<NaiveDate, LedgerError> {
    let date = NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidDate(key.to_string()))?;
    if date_key(date) != key {
        return Err(LedgerError::InvalidDate(key.to_string()));
    }
    Ok(date)
}

pub fn validate_month(month: u32) -> Result<(), LedgerError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(LedgerError::InvalidMonth(month))
    }
}

/// `"2026-03-"` for March 2026; matches every date key in that month.
pub fn month_prefix(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}-")
}

pub fn year_prefix(year: i32) -> String {
    format!("{year:04}-")
}

pub fn in_month(key: &str, year: i32, month: u32) -> bool {
    key.starts_with(&month_prefix(year, month))
}

/// The calendar month before `(year, month)`; January rolls back to
/// December of the prior year.
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, LedgerError> {
    validate_month(month)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or(LedgerError::InvalidMonth(month))?;
    Ok((first_of_next - Duration::days(1)).day())
}

/// Date keys for every day of the month, in order.
pub fn month_days(year: i32, month: u32) -> Result<Vec<String>, LedgerError> {
    let days = days_in_month(year, month)?;
    Ok((1..=days)
        .map(|day| format!("{year:04}-{month:02}-{day:02}"))
        .collect())
}
