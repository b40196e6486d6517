//! Monetary value normalization
//!
//! Every monetary amount in the system is an integer count of cents. These
//! helpers turn user-typed strings into cents and cents back into BRL display
//! strings.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Number formatting convention of a typed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    /// `1.234,56`
    PtBr,
    /// `1,234.56`
    EnUs,
}

impl Locale {
    fn separators(self) -> (char, char) {
        match self {
            Locale::PtBr => ('.', ','),
            Locale::EnUs => (',', '.'),
        }
    }
}

/// Parse a typed amount into cents, guessing the separator convention.
///
/// Both `.` and `,` present: `.` groups thousands and `,` is the decimal
/// mark. Only `,` present: it is the decimal mark. Otherwise the string is
/// parsed as is, so `"3.000"` means three, not three thousand. Use
/// [`parse_currency_in`] when the locale is known.
pub fn parse_currency_to_cents(raw: Option<&str>) -> Option<i64> {
    let cleaned = strip_currency_noise(raw?);
    if cleaned.is_empty() {
        return None;
    }

    let has_dot = cleaned.contains('.');
    let has_comma = cleaned.contains(',');

    let normalized = if has_dot && has_comma {
        cleaned.replace('.', "").replacen(',', ".", 1)
    } else if has_comma {
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    decimal_to_cents(&normalized)
}

/// Parse a typed amount into cents using an explicit locale.
pub fn parse_currency_in(raw: &str, locale: Locale) -> Option<i64> {
    let cleaned = strip_currency_noise(raw);
    if cleaned.is_empty() {
        return None;
    }

    let (thousands, decimal) = locale.separators();
    let normalized: String = cleaned
        .chars()
        .filter(|c| *c != thousands)
        .map(|c| if c == decimal { '.' } else { c })
        .collect();

    decimal_to_cents(&normalized)
}

/// Render cents as a BRL amount, e.g. `150050` → `"R$ 1.500,50"`.
pub fn format_cents_to_brl(cents: Option<i64>) -> Option<String> {
    let cents = cents?;
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();

    Some(format!(
        "{}R$ {},{:02}",
        sign,
        group_thousands(magnitude / 100, '.'),
        magnitude % 100
    ))
}

/// Drop the currency symbol and any whitespace.
fn strip_currency_noise(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, 'R' | 'r' | '$') && !c.is_whitespace())
        .collect()
}

/// Plain decimal notation only: no digit grouping underscores, no exponents.
fn decimal_to_cents(normalized: &str) -> Option<i64> {
    if !normalized.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        return None;
    }

    let amount = Decimal::from_str(normalized).ok()?;
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_blank_input() {
        assert_eq!(parse_currency_to_cents(None), None);
        assert_eq!(parse_currency_to_cents(Some("")), None);
        assert_eq!(parse_currency_to_cents(Some("   ")), None);
        assert_eq!(parse_currency_to_cents(Some("R$ ")), None);
    }

    #[test]
    fn test_rejects_non_plain_numbers() {
        assert_eq!(parse_currency_to_cents(Some("1_000")), None);
        assert_eq!(parse_currency_to_cents(Some("1e3")), None);
        assert_eq!(parse_currency_to_cents(Some("abc")), None);
        assert_eq!(parse_currency_in("1_000,00", Locale::PtBr), None);
        assert_eq!(parse_currency_in("1E3", Locale::EnUs), None);
        assert_eq!(parse_currency_to_cents(Some("-12,5")), Some(-1250));
    }

    #[test]
    fn test_separator_sniffing_table() {
        let cases = [
            ("3000", Some(300000)),
            ("3.000,50", Some(300050)),
            ("R$ 3.000,50", Some(300050)),
            ("r$3.000,50", Some(300050)),
            ("12,5", Some(1250)),
            ("3000.50", Some(300050)),
            // dot-only stays a decimal point
            ("3.000", Some(300)),
            ("1.234.567,89", Some(123456789)),
            ("1.000,00,5", None),
            ("1,000,50", None),
            ("abc", None),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_currency_to_cents(Some(input)), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_rounds_to_nearest_cent() {
        assert_eq!(parse_currency_to_cents(Some("0,005")), Some(1));
        assert_eq!(parse_currency_to_cents(Some("0,004")), Some(0));
        assert_eq!(parse_currency_to_cents(Some("10.999")), Some(1100));
    }

    #[test]
    fn test_explicit_locale() {
        assert_eq!(parse_currency_in("3.000", Locale::PtBr), Some(300000));
        assert_eq!(parse_currency_in("3.000", Locale::EnUs), Some(300));
        assert_eq!(parse_currency_in("R$ 1.500,50", Locale::PtBr), Some(150050));
        assert_eq!(parse_currency_in("$1,500.50", Locale::EnUs), Some(150050));
        assert_eq!(parse_currency_in("", Locale::PtBr), None);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_cents_to_brl(None), None);
        assert_eq!(format_cents_to_brl(Some(150050)).as_deref(), Some("R$ 1.500,50"));
        assert_eq!(format_cents_to_brl(Some(0)).as_deref(), Some("R$ 0,00"));
        assert_eq!(format_cents_to_brl(Some(7)).as_deref(), Some("R$ 0,07"));
        assert_eq!(format_cents_to_brl(Some(123456789)).as_deref(), Some("R$ 1.234.567,89"));
        assert_eq!(format_cents_to_brl(Some(-150050)).as_deref(), Some("-R$ 1.500,50"));
    }

    #[test]
    fn test_format_then_parse_is_identity() {
        for cents in [0, 5, 99, 100, 2999, 100000, 150050, 98765432, -150050] {
            let formatted = format_cents_to_brl(Some(cents));
            assert_eq!(parse_currency_to_cents(formatted.as_deref()), Some(cents));
        }
    }
}
