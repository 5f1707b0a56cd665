//! Display formatting contracts: currency and purchase-order dates.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Render a currency amount with two decimals and thousands separators,
/// e.g. `1234.5` becomes `"1,234.50"`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let text = format!("{:.2}", rounded);
    let (number, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}.{fraction}")
}

/// Render a LAST PO date as `YYYY/MM/DD`.
pub fn format_last_po(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Parse a LAST PO value from the input shapes operators actually produce:
/// `YYYY-MM-DD`, `MM/DD/YYYY`, `YYYY/MM/DD`, or a raw datetime.
pub fn parse_last_po(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn currency_groups_thousands_and_pads_cents() {
        assert_eq!(format_currency(Decimal::new(12345, 1)), "1,234.50");
        assert_eq!(format_currency(Decimal::new(250, 2)), "2.50");
        assert_eq!(format_currency(Decimal::from(1_000_000)), "1,000,000.00");
        assert_eq!(format_currency(Decimal::ZERO), "0.00");
    }

    #[test]
    fn currency_handles_negative_amounts() {
        assert_eq!(format_currency(Decimal::new(-12345, 2)), "-123.45");
    }

    #[test]
    fn currency_rounds_to_two_decimals() {
        assert_eq!(format_currency(Decimal::new(12399, 3)), "12.40");
    }

    #[test]
    fn last_po_parses_common_input_shapes() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(parse_last_po("2025-03-14"), Some(expected));
        assert_eq!(parse_last_po("03/14/2025"), Some(expected));
        assert_eq!(parse_last_po("2025/03/14"), Some(expected));
        assert_eq!(parse_last_po("2025-03-14 10:22:31"), Some(expected));
        assert_eq!(parse_last_po("last tuesday"), None);
        assert_eq!(parse_last_po(""), None);
    }

    #[test]
    fn last_po_renders_with_slashes() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(format_last_po(date), "2025/03/14");
    }
}
