//! Value converters: scalar to display text.

use std::fmt;
use std::sync::Arc;

use crate::value::Scalar;

type ConvertFn = Arc<dyn Fn(&Scalar) -> String + Send + Sync>;

/// Turns a projected scalar into the text shown in a cell.
///
/// Converters are applied to entries and aggregates alike. Non-numeric input
/// to a numeric converter falls back to [`Converter::Display`].
#[derive(Clone, Default)]
pub enum Converter {
    /// Integers as-is, floats with at most two decimals.
    #[default]
    Display,
    /// Binary byte units: `512 B`, `1.5 KB`, `2 GB`.
    Bytes,
    /// Durations: `1d 2h 3m 4s`.
    Seconds,
    /// Percentages: `42.5%`.
    Percent,
    /// Fixed number of decimals.
    Precision(usize),
    Custom(ConvertFn),
}

impl Converter {
    /// Wraps a closure as a converter.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Scalar) -> String + Send + Sync + 'static,
    {
        Converter::Custom(Arc::new(f))
    }

    pub fn convert(&self, value: &Scalar) -> String {
        match self {
            Converter::Display => display(value),
            Converter::Bytes => value.as_f64().map(bytes).unwrap_or_else(|| display(value)),
            Converter::Seconds => match value.as_f64() {
                Some(secs) if secs >= 0.0 => seconds(secs as u64),
                _ => display(value),
            },
            Converter::Percent => value
                .as_f64()
                .map(|p| format!("{}%", trim_decimals(p, 2)))
                .unwrap_or_else(|| display(value)),
            Converter::Precision(n) => value
                .as_f64()
                .map(|v| format!("{:.*}", *n, v))
                .unwrap_or_else(|| display(value)),
            Converter::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Converter::Display => write!(f, "Display"),
            Converter::Bytes => write!(f, "Bytes"),
            Converter::Seconds => write!(f, "Seconds"),
            Converter::Percent => write!(f, "Percent"),
            Converter::Precision(n) => write!(f, "Precision({})", n),
            Converter::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

fn display(value: &Scalar) -> String {
    match value {
        Scalar::Float(x) => trim_decimals(*x, 2),
        other => other.to_string(),
    }
}

/// Formats with `decimals` places, then drops trailing zeros and a bare dot.
fn trim_decimals(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

const BYTE_UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];

fn bytes(value: f64) -> String {
    if value.abs() < 1024.0 {
        return format!("{} B", trim_decimals(value, 2));
    }
    let mut scaled = value;
    let mut unit = BYTE_UNITS[0];
    for candidate in BYTE_UNITS {
        scaled /= 1024.0;
        unit = candidate;
        if scaled.abs() < 1024.0 {
            break;
        }
    }
    format!("{} {}", trim_decimals(scaled, 2), unit)
}

fn seconds(total: u64) -> String {
    if total == 0 {
        return "0s".to_string();
    }
    let parts = [
        (total / 86_400, "d"),
        ((total % 86_400) / 3_600, "h"),
        ((total % 3_600) / 60, "m"),
        (total % 60, "s"),
    ];
    parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{}{}", n, unit))
        .collect::<Vec<_>>()
        .join(" ")
}
