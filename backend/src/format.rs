use std::time::SystemTime;

use chrono::{DateTime, Local};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Formats a byte count with binary units, e.g. `512 B` or `1.25 KB`.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

/// Renders an RFC 3339 timestamp as local `YYYY-MM-DD HH:MM:SS`.
///
/// Input that does not parse is returned unchanged.
pub fn format_timestamp(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| {
            parsed
                .with_timezone(&Local)
                .format(DISPLAY_FORMAT)
                .to_string()
        })
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_system_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(DISPLAY_FORMAT).to_string()
}
