//! Billing ledger arithmetic shared by every order write path.
//!
//! The three derived fields on an order (`grand_total`, `dp_amount`,
//! `remaining_balance`) are recomputed together here before each write so
//! they can never drift from one another. All amounts are integer rupiah.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The derived ledger triple persisted on every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Ledger {
    pub grand_total: i64,
    pub dp_amount: i64,
    /// May be negative when the client overpaid; rendered as settled,
    /// never as negative debt.
    pub remaining_balance: i64,
}

impl Ledger {
    /// Computes the ledger from `(quantity, price_per_unit)` lines and the
    /// cumulative deposit. Zero lines yield a grand total of zero.
    pub fn compute<I>(lines: I, dp_amount: i64) -> Self
    where
        I: IntoIterator<Item = (i32, i64)>,
    {
        let grand_total = lines
            .into_iter()
            .map(|(quantity, price_per_unit)| line_total(quantity, price_per_unit))
            .sum();

        Self {
            grand_total,
            dp_amount,
            remaining_balance: grand_total - dp_amount,
        }
    }

    /// An order is settled ("LUNAS") once nothing remains to collect,
    /// including the overpaid case.
    pub fn is_settled(&self) -> bool {
        self.remaining_balance <= 0
    }
}

/// Line total persisted redundantly on each item row.
pub fn line_total(quantity: i32, price_per_unit: i64) -> i64 {
    i64::from(quantity) * price_per_unit
}

/// Formats an integer rupiah amount with id-ID digit grouping, e.g.
/// `130000` -> `"130.000"`. Used verbatim in generated history text.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn computes_grand_total_and_balance() {
        let ledger = Ledger::compute([(2, 50_000), (1, 30_000)], 50_000);
        assert_eq!(ledger.grand_total, 130_000);
        assert_eq!(ledger.remaining_balance, 80_000);
        assert!(!ledger.is_settled());
    }

    #[test]
    fn zero_items_yield_zero_total() {
        let ledger = Ledger::compute([], 25_000);
        assert_eq!(ledger.grand_total, 0);
        assert_eq!(ledger.remaining_balance, -25_000);
    }

    #[test]
    fn overpayment_is_valid_and_settled() {
        let ledger = Ledger::compute([(1, 10_000)], 15_000);
        assert_eq!(ledger.remaining_balance, -5_000);
        assert!(ledger.is_settled());
    }

    #[test]
    fn exact_payment_is_settled() {
        let ledger = Ledger::compute([(3, 10_000)], 30_000);
        assert_eq!(ledger.remaining_balance, 0);
        assert!(ledger.is_settled());
    }

    #[test]
    fn formats_rupiah_with_dot_grouping() {
        assert_eq!(format_rupiah(0), "0");
        assert_eq!(format_rupiah(500), "500");
        assert_eq!(format_rupiah(50_000), "50.000");
        assert_eq!(format_rupiah(130_000), "130.000");
        assert_eq!(format_rupiah(1_234_567), "1.234.567");
        assert_eq!(format_rupiah(-1_500), "-1.500");
    }

    proptest! {
        #[test]
        fn grand_total_is_sum_of_line_totals(
            lines in proptest::collection::vec((1i32..500, 0i64..5_000_000), 0..12),
            dp in 0i64..100_000_000,
        ) {
            let ledger = Ledger::compute(lines.iter().copied(), dp);
            let expected: i64 = lines
                .iter()
                .map(|&(q, p)| i64::from(q) * p)
                .sum();
            prop_assert_eq!(ledger.grand_total, expected);
            prop_assert_eq!(ledger.remaining_balance, expected - dp);
        }

        #[test]
        fn settled_iff_balance_not_positive(
            total in 0i64..1_000_000_000,
            dp in 0i64..1_000_000_000,
        ) {
            let ledger = Ledger {
                grand_total: total,
                dp_amount: dp,
                remaining_balance: total - dp,
            };
            prop_assert_eq!(ledger.is_settled(), total <= dp);
        }
    }
}
