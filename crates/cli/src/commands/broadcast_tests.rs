// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Timelike};

fn noon() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 7, 29, 12, 0, 0).unwrap()
}

#[test]
fn relative_minutes() {
    let parsed = parse_time_expression("+30m", noon()).unwrap();
    assert_eq!(parsed.delay_ms, 30 * 60 * 1000);
    assert_eq!(parsed.matched_parser, "relative");
}

#[test]
fn relative_hours() {
    let parsed = parse_time_expression("+2h", noon()).unwrap();
    assert_eq!(parsed.delay_ms, 2 * 3600 * 1000);
}

#[test]
fn relative_rejects_out_of_range() {
    let err = parse_time_expression("+25h", noon()).unwrap_err();
    assert!(matches!(err, oj_core::CoreError::InvalidArgument(_)));
}

#[test]
fn natural_language_minutes() {
    let parsed = parse_time_expression("in 15 minutes", noon()).unwrap();
    assert_eq!(parsed.delay_ms, 15 * 60 * 1000);
    assert_eq!(parsed.matched_parser, "natural");
}

#[test]
fn natural_language_singular_hour() {
    let parsed = parse_time_expression("in 1 hour", noon()).unwrap();
    assert_eq!(parsed.delay_ms, 3600 * 1000);
}

#[test]
fn twelve_hour_pm_today() {
    let parsed = parse_time_expression("2:30pm", noon()).unwrap();
    assert_eq!(parsed.target.hour(), 14);
    assert_eq!(parsed.target.minute(), 30);
    assert_eq!(parsed.matched_parser, "12-hour");
}

#[test]
fn twelve_hour_am_rolls_to_tomorrow() {
    let parsed = parse_time_expression("2:30am", noon()).unwrap();
    assert_eq!(parsed.target.date_naive(), noon().date_naive() + chrono::Duration::days(1));
    assert_eq!(parsed.target.hour(), 2);
}

#[test]
fn twelve_hour_noon_and_midnight() {
    let noon_parsed = parse_time_expression("12:00pm", noon()).unwrap();
    assert_eq!(noon_parsed.target.hour(), 12);

    let midnight_parsed = parse_time_expression("12:00am", noon()).unwrap();
    assert_eq!(midnight_parsed.target.hour(), 0);
}

#[test]
fn twenty_four_hour_unambiguous_past_today_rolls_over() {
    let parsed = parse_time_expression("09:00", noon()).unwrap();
    assert_eq!(parsed.target.hour(), 9);
    assert_eq!(parsed.target.date_naive(), noon().date_naive() + chrono::Duration::days(1));
}

#[test]
fn twenty_four_hour_unambiguous_later_today() {
    let parsed = parse_time_expression("23:30", noon()).unwrap();
    assert_eq!(parsed.target.hour(), 23);
    assert_eq!(parsed.target.date_naive(), noon().date_naive());
}

#[test]
fn ambiguous_hour_without_am_pm_is_rejected() {
    let err = parse_time_expression("3:30", noon()).unwrap_err();
    assert!(matches!(err, oj_core::CoreError::AmbiguousTime(_)));
}

#[test]
fn unrecognized_expression_is_invalid_argument() {
    let err = parse_time_expression("whenever", noon()).unwrap_err();
    assert!(matches!(err, oj_core::CoreError::InvalidArgument(_)));
}
