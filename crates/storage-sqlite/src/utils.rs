//! Small conversion helpers shared by the storage models.
//!
//! Timestamps are persisted as naive UTC; JSON documents and decimals as
//! TEXT columns.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

pub(crate) fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

pub(crate) fn to_utc_opt(naive: Option<NaiveDateTime>) -> Option<DateTime<Utc>> {
    naive.map(to_utc)
}

pub(crate) fn to_naive_opt(utc: Option<DateTime<Utc>>) -> Option<NaiveDateTime> {
    utc.map(|t| t.naive_utc())
}

pub(crate) fn json_to_text(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

pub(crate) fn text_to_json(text: Option<String>) -> Option<serde_json::Value> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}

pub(crate) fn decimal_to_text(value: Decimal) -> String {
    value.to_string()
}

pub(crate) fn text_to_decimal(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap_or_default()
}

pub(crate) fn text_to_decimal_opt(text: Option<&str>) -> Option<Decimal> {
    text.and_then(|t| Decimal::from_str(t).ok())
}
