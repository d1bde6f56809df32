//! Rupiah formatting for notification messages.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount as Indonesian Rupiah, e.g. `Rp 2.050.000`.
///
/// Rupiah amounts are shown without fractional digits; the value is rounded
/// half-up to whole rupiah first.
#[must_use]
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_rupiah(Decimal::new(2_000_000, 0)), "Rp 2.000.000");
        assert_eq!(format_rupiah(Decimal::new(2_080_000, 0)), "Rp 2.080.000");
        assert_eq!(format_rupiah(Decimal::new(50_000, 0)), "Rp 50.000");
    }

    #[test]
    fn test_format_small_and_zero() {
        assert_eq!(format_rupiah(Decimal::ZERO), "Rp 0");
        assert_eq!(format_rupiah(Decimal::new(999, 0)), "Rp 999");
    }

    #[test]
    fn test_format_rounds_cents() {
        // 1500.50 with two decimal places from NUMERIC(15,2)
        assert_eq!(format_rupiah(Decimal::new(150_050, 2)), "Rp 1.501");
        assert_eq!(format_rupiah(Decimal::new(200_000_000, 2)), "Rp 2.000.000");
    }
}
