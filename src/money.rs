//! Prices are stored as whole cents and shown as two-place decimals.

use rust_decimal::{Decimal, prelude::ToPrimitive};

/// 99,999,999.99, the largest amount a price or total may hold.
pub const MAX_CENTS: i64 = 9_999_999_999;

pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn format_cents(cents: i64) -> String {
    format!("{:.2}", cents_to_decimal(cents))
}

/// Parses a non-negative amount with at most two decimal places.
pub fn parse_cents(input: &str) -> Result<i64, String> {
    let amount: Decimal = input
        .trim()
        .parse()
        .map_err(|_| "must be a number, e.g. 89.50".to_string())?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err("must not be negative".to_string());
    }
    if amount.scale() > 2 && amount != amount.round_dp(2) {
        return Err("must have at most two decimal places".to_string());
    }

    (amount * Decimal::ONE_HUNDRED)
        .to_i64()
        .filter(|cents| *cents <= MAX_CENTS)
        .ok_or_else(|| format!("must be at most {}", format_cents(MAX_CENTS)))
}
