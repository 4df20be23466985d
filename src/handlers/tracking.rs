use std::str::FromStr;

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::order_history;
use crate::handlers::orders::OrderItemResponse;
use crate::lifecycle::OrderStatus;
use crate::services::orders::OrderDetails;
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Customer-facing projection of one order. No admin-only fields, and the
/// phone number is masked.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrackingResponse {
    pub order_number: String,
    pub client_name: String,
    /// First four digits, `****`, last three; `-` when absent or short.
    pub client_phone_masked: String,
    pub current_status: String,
    pub status_label: String,
    /// Absent for cancelled orders; they have no place on the progress bar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<f32>,
    pub estimated_date: Option<NaiveDate>,
    pub grand_total: i64,
    pub dp_amount: i64,
    pub remaining_balance: i64,
    pub is_settled: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
    /// Newest first.
    pub history: Vec<HistoryEntryResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub actor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Shows the first 4 digits and the last 3, masking the middle.
fn mask_phone(phone: Option<&str>) -> String {
    match phone {
        Some(p) if p.len() >= 8 => {
            format!("{}****{}", &p[..4], &p[p.len() - 3..])
        }
        _ => "-".to_string(),
    }
}

fn map_history(model: &order_history::Model) -> HistoryEntryResponse {
    HistoryEntryResponse {
        id: model.id,
        title: model.title.clone(),
        description: model.description.clone(),
        status: model.status.clone(),
        actor_name: model.actor_name.clone(),
        created_at: model.created_at,
    }
}

fn map_tracking(details: &OrderDetails) -> TrackingResponse {
    let order = &details.order;
    let status = OrderStatus::from_str(&order.current_status).ok();

    TrackingResponse {
        order_number: order.order_number.clone(),
        client_name: order.client_name.clone(),
        client_phone_masked: mask_phone(order.client_phone.as_deref()),
        current_status: order.current_status.clone(),
        status_label: status
            .map(OrderStatus::tracking_label)
            .unwrap_or("-")
            .to_string(),
        progress_percent: status.and_then(OrderStatus::progress_percent),
        estimated_date: order.estimated_date,
        grand_total: order.grand_total,
        dp_amount: order.dp_amount,
        remaining_balance: order.remaining_balance,
        is_settled: order.remaining_balance <= 0,
        created_at: order.created_at,
        items: details
            .items
            .iter()
            .map(|item| OrderItemResponse {
                id: item.id,
                product_name: item.product_name.clone(),
                category: item.category.clone(),
                quantity: item.quantity,
                notes: item.notes.clone(),
                price_per_unit: item.price_per_unit,
                total_price: item.total_price,
            })
            .collect(),
        history: details.history.iter().map(map_history).collect(),
    }
}

/// Public tracking lookup. The reference is an order number; a value that
/// misses and looks id-shaped falls back to an internal id lookup.
#[utoipa::path(
    get,
    path = "/api/v1/tracking/{reference}",
    summary = "Track an order",
    params(("reference" = String, Path, description = "Order number, or internal id as fallback")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<TrackingResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn track_order(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<TrackingResponse>>, ServiceError> {
    let details = state
        .services
        .order
        .get_order_details(&reference)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Pesanan tidak ditemukan.".to_string()))?;

    Ok(Json(ApiResponse::success(map_tracking(&details))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_middle_digits() {
        assert_eq!(mask_phone(Some("08123456789")), "0812****789");
        assert_eq!(mask_phone(Some("08123456")), "0812****456");
    }

    #[test]
    fn short_or_missing_phone_renders_dash() {
        assert_eq!(mask_phone(Some("0812345")), "-");
        assert_eq!(mask_phone(Some("")), "-");
        assert_eq!(mask_phone(None), "-");
    }
}
