//! Numeric input sanitization.
//!
//! Every quantity and price a user types passes through [`sanitize`] before it
//! is stored, so stored text only ever contains ASCII digits and at most one
//! decimal point. [`to_number`] turns that text into a fixed-point value.
//!
//! Values are bounded to [`MAX_INTEGER_DIGITS`] integer and
//! [`MAX_FRACTION_DIGITS`] fractional digits. A quantity × price product then
//! has a mantissa below 10^24, and sums of up to 79,000 such products stay
//! below the 96-bit mantissa of `Decimal`, so totals are never rounded.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Significant integer digits kept in a quantity or price.
pub const MAX_INTEGER_DIGITS: usize = 8;
/// Fractional digits kept in a quantity or price; a configured limit may
/// only lower it.
pub const MAX_FRACTION_DIGITS: usize = 4;

/// Strip everything but digits and `.`; digits after the first `.` form a
/// single fractional run (`"12.3.4"` becomes `"12.34"`).
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, None)
}

/// Like [`sanitize`], additionally truncating the fractional run to
/// `max_fraction_digits` digits.
pub fn sanitize_with_limit(input: &str, max_fraction_digits: Option<usize>) -> String {
    let mut integer = String::new();
    let mut fraction = String::new();
    let mut seen_point = false;

    for ch in input.chars() {
        match ch {
            '0'..='9' if seen_point => fraction.push(ch),
            '0'..='9' => integer.push(ch),
            '.' => seen_point = true,
            _ => {}
        }
    }

    if integer.len() > MAX_INTEGER_DIGITS {
        integer = integer.trim_start_matches('0').to_string();
        integer.truncate(MAX_INTEGER_DIGITS);
    }
    fraction.truncate(fraction_limit(max_fraction_digits));

    if seen_point {
        format!("{integer}.{fraction}")
    } else {
        integer
    }
}

fn fraction_limit(max_fraction_digits: Option<usize>) -> usize {
    max_fraction_digits.map_or(MAX_FRACTION_DIGITS, |limit| limit.min(MAX_FRACTION_DIGITS))
}

/// Largest value [`to_number`] yields: eight nines, four decimals.
pub fn max_value() -> Decimal {
    Decimal::new(999_999_999_999, MAX_FRACTION_DIGITS as u32)
}

/// Parse sanitized text into a non-negative value. Empty text, a lone `.`,
/// and anything unparseable map to zero; oversized values saturate at
/// [`max_value`].
pub fn to_number(text: &str) -> Decimal {
    let (integer, fraction) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };

    let integer = integer.trim_start_matches('0');
    if integer.len() > MAX_INTEGER_DIGITS {
        return max_value();
    }
    let fraction: String = fraction.chars().take(MAX_FRACTION_DIGITS).collect();

    let normalized = match (integer.is_empty(), fraction.is_empty()) {
        (true, true) => return Decimal::ZERO,
        (true, false) => format!("0.{fraction}"),
        (false, true) => integer.to_string(),
        (false, false) => format!("{integer}.{fraction}"),
    };

    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

/// Render a decimal as sanitized numeric text, e.g. for values loaded from
/// the server. Extra fraction digits are cut to `max_fraction_digits`.
/// Negative values and values too large to store yield `None`.
pub fn from_number(value: Decimal, max_fraction_digits: Option<usize>) -> Option<String> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let scale = fraction_limit(max_fraction_digits) as u32;
    let value = value
        .round_dp_with_strategy(scale, RoundingStrategy::ToZero)
        .normalize();
    if value > max_value() {
        return None;
    }
    Some(sanitize(&value.to_string()))
}
