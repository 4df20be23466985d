//! Human-readable audit text for the edit flow.
//!
//! An immutable snapshot of the order is captured when the edit loads;
//! on submit the snapshot is diffed against the edited state and every
//! changed field contributes one sentence to the history entry.

use chrono::NaiveDate;

use crate::billing::{format_rupiah, Ledger};
use crate::lifecycle::OrderStatus;

/// Header fields plus item lines as they stood at a point in time.
/// The phone is kept as a plain string ("" when absent) so the diff
/// mirrors exactly what the edit form round-trips.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
    pub client_name: String,
    pub client_phone: String,
    pub current_status: OrderStatus,
    pub estimated_date: Option<NaiveDate>,
    pub dp_amount: i64,
    /// `(quantity, price_per_unit)` per line.
    pub items: Vec<(i32, i64)>,
}

impl OrderSnapshot {
    fn grand_total(&self) -> i64 {
        Ledger::compute(self.items.iter().copied(), self.dp_amount).grand_total
    }
}

fn format_estimate(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}

/// Builds the history description for an edit. Rules run in a fixed
/// order; each triggered rule contributes one fragment, joined with
/// `". "` and closed with a period. Deposit decreases are deliberately
/// not reported; only new payments are newsworthy.
pub fn generate_change_log(
    original: &OrderSnapshot,
    current: &OrderSnapshot,
    actor: &str,
) -> String {
    let mut changes: Vec<String> = Vec::new();

    if current.client_name != original.client_name {
        changes.push(format!(
            "Nama klien berubah: \"{}\" -> \"{}\"",
            original.client_name, current.client_name
        ));
    }

    if current.client_phone != original.client_phone {
        changes.push(format!(
            "No HP berubah: \"{}\" -> \"{}\"",
            original.client_phone, current.client_phone
        ));
    }

    if current.current_status != original.current_status {
        changes.push(format!(
            "Status berubah: {} -> {}",
            original.current_status, current.current_status
        ));
    }

    if current.estimated_date != original.estimated_date {
        changes.push(format!(
            "Estimasi selesai berubah: {} -> {}",
            format_estimate(original.estimated_date),
            format_estimate(current.estimated_date)
        ));
    }

    let dp_delta = current.dp_amount - original.dp_amount;
    if dp_delta > 0 {
        changes.push(format!(
            "Menambahkan pembayaran DP sebesar Rp {}",
            format_rupiah(dp_delta)
        ));
    }

    let total_delta = current.grand_total() - original.grand_total();
    if total_delta != 0 {
        changes.push(format!(
            "Nilai proyek berubah: Rp {}",
            format_rupiah(total_delta)
        ));
    }

    if changes.is_empty() {
        return format!("Data disimpan ulang oleh {actor} tanpa perubahan signifikan.");
    }
    changes.join(". ") + "."
}
