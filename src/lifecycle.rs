//! Order production lifecycle: the fixed status vocabulary, its display
//! ordering, and the canned history titles attached to each transition.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Production status of an order.
///
/// The first six statuses form the linear progress sequence shown to
/// customers; `cancelled` is an orthogonal terminal state reachable from
/// any of them and carries no progress index. The allow-list is the only
/// transition guard: any listed status may be set from any other, since
/// statuses get skipped and reverted in day-to-day shop operation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cutting,
    Production,
    Packing,
    Completed,
    Cancelled,
}

/// The ordered progress sequence, excluding `cancelled`.
pub const PROGRESS_SEQUENCE: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Cutting,
    OrderStatus::Production,
    OrderStatus::Packing,
    OrderStatus::Completed,
];

impl OrderStatus {
    /// Zero-based position in the progress sequence; `None` for
    /// `cancelled`, which has no place on the progress bar.
    pub fn progress_index(self) -> Option<usize> {
        PROGRESS_SEQUENCE.iter().position(|s| *s == self)
    }

    /// Progress-bar percentage, `(index + 1) / 6 * 100`.
    pub fn progress_percent(self) -> Option<f32> {
        self.progress_index()
            .map(|idx| (idx as f32 + 1.0) / PROGRESS_SEQUENCE.len() as f32 * 100.0)
    }

    /// Canned history title recorded on a transition into this status.
    /// Statuses outside the fixed table fall back to a generic label.
    pub fn history_title(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Menunggu DP",
            OrderStatus::Confirmed => "DP Masuk / Pesanan Dikonfirmasi",
            OrderStatus::Cutting => "Pemotongan Kain",
            OrderStatus::Production => "Proses Sablon & Jahit",
            OrderStatus::Packing => "QC & Packing",
            OrderStatus::Completed => "Pesanan Selesai",
            OrderStatus::Cancelled => "Update Status",
        }
    }

    /// Customer-facing label on the public tracking view.
    pub fn tracking_label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Menunggu Konfirmasi",
            OrderStatus::Confirmed => "Dikonfirmasi",
            OrderStatus::Cutting => "Proses Potong",
            OrderStatus::Production => "Proses Jahit",
            OrderStatus::Packing => "Packing",
            OrderStatus::Completed => "Selesai",
            OrderStatus::Cancelled => "Dibatalkan",
        }
    }

    /// Whether the order sits in the "in active production" group used by
    /// the summary statistics.
    pub fn is_active_production(self) -> bool {
        matches!(
            self,
            OrderStatus::Cutting | OrderStatus::Production | OrderStatus::Packing
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Product category vocabulary for line items.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Setelan,
    Atasan,
    Bawahan,
    Aksesoris,
}
