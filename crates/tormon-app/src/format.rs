//! Text helpers used by the dashboard: byte sizes, progress bars and clocks.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the formatting helpers.
#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    /// Argument outside the accepted domain.
    #[error("invalid formatting argument")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}

/// Unit band chosen by [`humanize_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ByteUnit {
    /// Bytes.
    B,
    /// Kilobytes (10^3).
    Kb,
    /// Megabytes (10^6).
    Mb,
    /// Gigabytes (10^9).
    Gb,
    /// Terabytes (10^12).
    Tb,
    /// Petabytes (10^15).
    Pb,
}

const UNITS: [ByteUnit; 6] = [
    ByteUnit::B,
    ByteUnit::Kb,
    ByteUnit::Mb,
    ByteUnit::Gb,
    ByteUnit::Tb,
    ByteUnit::Pb,
];

impl ByteUnit {
    /// Suffix appended to the mantissa.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::Kb => "kB",
            Self::Mb => "MB",
            Self::Gb => "GB",
            Self::Tb => "TB",
            Self::Pb => "PB",
        }
    }

    /// Unit band of a string produced by [`humanize_bytes`].
    #[must_use]
    pub fn of_rendered(rendered: &str) -> Option<Self> {
        let suffix = rendered
            .trim()
            .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-');
        suffix.parse().ok()
    }
}

impl fmt::Display for ByteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for ByteUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UNITS
            .into_iter()
            .find(|unit| unit.suffix() == s)
            .ok_or(())
    }
}

/// Render `value` with three significant digits and trailing zeros trimmed.
fn three_significant(value: f64) -> String {
    let decimals = if value >= 100.0 {
        0
    } else if value >= 10.0 {
        1
    } else {
        2
    };
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Human-readable size with a decimal unit suffix, e.g. `" 1.5MB"` or `"  512B"`.
///
/// The mantissa is right-aligned (width 5 for bytes, 4 otherwise) and never
/// reaches 1000: a value that rounds up to 1000 moves to the next unit.
/// Negative inputs (engine sentinels) keep their sign.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn humanize_bytes(bytes: i64) -> String {
    let negative = bytes < 0;
    let mut value = bytes.unsigned_abs() as f64;
    let mut index = 0;
    while value >= 1000.0 && index < UNITS.len() - 1 {
        value /= 1000.0;
        index += 1;
    }
    let mut mantissa = three_significant(value);
    if mantissa.parse::<f64>().is_ok_and(|rounded| rounded >= 1000.0) && index < UNITS.len() - 1 {
        value /= 1000.0;
        index += 1;
        mantissa = three_significant(value);
    }
    if negative {
        mantissa.insert(0, '-');
    }
    let unit = UNITS[index];
    if unit == ByteUnit::B {
        format!("{mantissa:>5}{unit}")
    } else {
        format!("{mantissa:>4}{unit}")
    }
}

/// Fixed-width bar of `#` followed by `-` padding.
///
/// # Errors
///
/// Returns [`FormatError::InvalidArgument`] when `fraction` exceeds 1 or is NaN.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn progress_bar(fraction: f64, width: usize) -> Result<String, FormatError> {
    if fraction.is_nan() || fraction > 1.0 {
        return Err(FormatError::InvalidArgument {
            name: "fraction",
            value: fraction,
        });
    }
    let filled = if fraction <= 0.0 {
        0
    } else {
        ((fraction * width as f64 + 0.5).floor() as usize).min(width)
    };
    let mut bar = "#".repeat(filled);
    bar.push_str(&"-".repeat(width - filled));
    Ok(bar)
}

/// `HH:MM:SS` with unbounded hours.
#[must_use]
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
