use std::collections::BTreeMap;

use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::lifecycle::OrderStatus;
use crate::services::orders::OrderWithItems;
use crate::services::stats::{self, CategoryQuantity, MonthlyRevenue};
use crate::{errors::ServiceError, ApiResponse, AppState};

/// Business analytics over every non-cancelled order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsSummary {
    pub total_revenue: i64,
    pub total_orders: u64,
    /// Outstanding receivables (Σ remaining_balance)
    pub total_receivables: i64,
    /// Integer rupiah; zero when there are no orders
    pub average_order_value: i64,
    /// Most recent six months, chronological
    pub monthly_revenue: Vec<MonthlyRevenue>,
    /// Quantities per category, best-selling first
    pub category_totals: Vec<CategoryQuantity>,
    pub status_distribution: BTreeMap<String, u64>,
}

fn summarize(orders: &[OrderWithItems]) -> AnalyticsSummary {
    let cancelled = OrderStatus::Cancelled.to_string();
    let working_set: Vec<&OrderWithItems> = orders
        .iter()
        .filter(|entry| entry.order.current_status != cancelled)
        .collect();

    let stats = stats::production_stats(&working_set);
    let total_orders = working_set.len() as u64;
    let average_order_value = if total_orders > 0 {
        stats.total_revenue / total_orders as i64
    } else {
        0
    };

    AnalyticsSummary {
        total_revenue: stats.total_revenue,
        total_orders,
        total_receivables: stats.total_receivables,
        average_order_value,
        monthly_revenue: stats::monthly_revenue_trend(&working_set),
        category_totals: stats::category_quantities(&working_set),
        status_distribution: stats.status_counts,
    }
}

/// Financial and production analytics for the admin dashboard.
#[utoipa::path(
    get,
    path = "/api/v1/analytics/summary",
    summary = "Business analytics summary",
    responses(
        (status = 200, description = "Summary computed", body = ApiResponse<AnalyticsSummary>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn analytics_summary(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AnalyticsSummary>>, ServiceError> {
    let orders = state.services.order.list_orders().await?;
    Ok(Json(ApiResponse::success(summarize(&orders))))
}
