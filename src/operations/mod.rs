//! Operations module provides the commands the `redwatch` binary runs

pub mod comments;
pub mod messages;
pub mod monitor;
pub mod posts;

use chrono::DateTime;
use chrono_tz::Tz;

/// Render a Reddit `created_utc` value in `tz`
pub fn format_timestamp(created_utc: f64, tz: Tz, format: &str) -> String {
    match DateTime::from_timestamp(created_utc as i64, 0) {
        Some(utc) => utc.with_timezone(&tz).format(format).to_string(),
        None => "unknown time".to_string(),
    }
}
