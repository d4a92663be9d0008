//! Display formatting for snapshot values.

/// Placeholder for a missing or unsampled reading.
pub const NOT_AVAILABLE: &str = "N/A";

/// Formats `value` with `decimals` places and a unit suffix, or "N/A".
pub fn with_unit(value: Option<f32>, decimals: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.decimals$} {unit}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Formats a number using the shortest representation, e.g. `3600` or `3624.5`.
pub fn plain(value: f32) -> String {
    format!("{value}")
}

/// Parses the leading numeric token of a formatted value such as "2.67 GHz".
///
/// Returns `None` for "N/A", empty strings and anything else non-numeric.
pub fn leading_number(formatted: &str) -> Option<f64> {
    let token = formatted.split_whitespace().next()?;
    let token = token.trim_end_matches(|c: char| !c.is_ascii_digit());
    let value: f64 = token.parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_unit() {
        assert_eq!(with_unit(Some(45.26), 1, "°C"), "45.3 °C");
        assert_eq!(with_unit(Some(1200.0), 0, "RPM"), "1200 RPM");
        assert_eq!(with_unit(None, 2, "RPM"), "N/A");
    }

    #[test]
    fn test_plain() {
        assert_eq!(plain(3600.0), "3600");
        assert_eq!(plain(3624.5), "3624.5");
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("2.67 GHz"), Some(2.67));
        assert_eq!(leading_number("17%"), Some(17.0));
        assert_eq!(leading_number("N/A"), None);
        assert_eq!(leading_number(""), None);
        assert_eq!(leading_number("NaN °C"), None);
    }
}
