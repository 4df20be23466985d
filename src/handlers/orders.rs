use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::entities::order_item;
use crate::lifecycle::{ItemCategory, OrderStatus};
use crate::services::orders::{CreateOrderInput, EditOrderInput, OrderItemInput, OrderWithItems};
use crate::services::stats::{
    self, ListingFilter, PaymentFilter, Period, ProductionStats, ScheduleStatus,
};
use crate::{errors::ServiceError, ApiResponse, AppState};

// Order DTOs

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub current_status: String,
    pub estimated_date: Option<NaiveDate>,
    pub grand_total: i64,
    pub dp_amount: i64,
    pub remaining_balance: i64,
    /// Settled ("LUNAS"): nothing left to collect, overpayment included.
    pub is_settled: bool,
    /// Deadline pressure relative to today; absent without an estimate or
    /// once the order is completed/cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleStatus>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_name: String,
    pub category: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub price_per_unit: i64,
    pub total_price: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    /// Generated server-side (`INV-<year><month>-<random4>`) when absent.
    pub order_number: Option<String>,

    #[validate(length(min = 1, message = "Nama Klien wajib diisi"))]
    pub client_name: String,

    #[validate(
        length(min = 1, message = "Nomor WhatsApp wajib diisi"),
        custom = "validate_digits_only"
    )]
    pub client_phone: String,

    /// Initial status, defaults to `pending`.
    #[serde(default)]
    pub current_status: Option<OrderStatus>,

    pub estimated_date: Option<NaiveDate>,

    #[serde(default)]
    #[validate(range(min = 0, message = "DP tidak boleh negatif"))]
    pub dp_amount: i64,

    #[validate(length(min = 1, message = "Pesanan harus memiliki minimal satu item"))]
    pub items: Vec<OrderItemRequest>,

    /// Display name of the acting admin; auth lives outside this service.
    pub actor_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, message = "Nama Klien wajib diisi"))]
    pub client_name: String,

    /// Digits only; empty clears the stored phone.
    #[serde(default)]
    #[validate(custom = "validate_digits_only")]
    pub client_phone: String,

    pub current_status: OrderStatus,

    pub estimated_date: Option<NaiveDate>,

    #[serde(default)]
    #[validate(range(min = 0, message = "DP tidak boleh negatif"))]
    pub dp_amount: i64,

    #[validate(length(min = 1, message = "Pesanan harus memiliki minimal satu item"))]
    pub items: Vec<OrderItemRequest>,

    pub actor_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderItemRequest {
    #[validate(length(min = 1, message = "Nama Produk tidak boleh kosong"))]
    pub product_name: String,

    #[serde(default = "default_category")]
    pub category: ItemCategory,

    #[validate(range(min = 1, message = "Qty minimal 1"))]
    pub quantity: i32,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "Harga satuan tidak boleh negatif"))]
    pub price_per_unit: i64,
}

/// Body of the narrow status-transition endpoint. The status arrives as a
/// raw string so the allow-list check owns the rejection, not serde.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Acknowledgement body of the status-transition endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusUpdated {
    pub ok: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersQuery {
    pub search: Option<String>,
    /// Exact status or `all`
    pub status: Option<String>,
    /// `lunas`, `belum_lunas`, or `all`
    pub payment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatsQuery {
    /// Calendar month 1-12; absent means every month
    pub month: Option<u32>,
    /// Absent means every year
    pub year: Option<i32>,
}

fn default_category() -> ItemCategory {
    ItemCategory::Atasan
}

fn validate_digits_only(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("digits_only");
        err.message = Some("Nomor WhatsApp hanya boleh berisi angka".into());
        Err(err)
    }
}

/// Flattens validator output into the single banner message the clients
/// display.
fn validation_message(errors: &ValidationErrors) -> String {
    let collected: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field = field.to_string();
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect();
    collected.join("; ")
}

fn check_request<T: Validate>(request: &T) -> Result<(), ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(validation_message(&e)))
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>, ServiceError> {
    match raw {
        None | Some("") | Some("all") => Ok(None),
        Some(other) => OrderStatus::from_str(other).map(Some).map_err(|_| {
            ServiceError::ValidationError(format!("Unknown order status: {other}"))
        }),
    }
}

fn parse_payment_filter(raw: Option<&str>) -> Result<Option<PaymentFilter>, ServiceError> {
    match raw {
        None | Some("") | Some("all") => Ok(None),
        Some(other) => PaymentFilter::from_str(other).map(Some).map_err(|_| {
            ServiceError::ValidationError(format!("Unknown payment filter: {other}"))
        }),
    }
}

fn map_item(model: &order_item::Model) -> OrderItemResponse {
    OrderItemResponse {
        id: model.id,
        product_name: model.product_name.clone(),
        category: model.category.clone(),
        quantity: model.quantity,
        notes: model.notes.clone(),
        price_per_unit: model.price_per_unit,
        total_price: model.total_price,
    }
}

fn map_order(entry: &OrderWithItems, today: NaiveDate) -> OrderResponse {
    let order = &entry.order;
    let schedule = OrderStatus::from_str(&order.current_status)
        .ok()
        .and_then(|status| stats::schedule_status(order.estimated_date, status, today));

    OrderResponse {
        id: order.id,
        order_number: order.order_number.clone(),
        client_name: order.client_name.clone(),
        client_phone: order.client_phone.clone(),
        current_status: order.current_status.clone(),
        estimated_date: order.estimated_date,
        grand_total: order.grand_total,
        dp_amount: order.dp_amount,
        remaining_balance: order.remaining_balance,
        is_settled: order.remaining_balance <= 0,
        schedule,
        created_by: order.created_by.clone(),
        created_at: order.created_at,
        items: entry.items.iter().map(map_item).collect(),
    }
}

fn item_inputs(items: &[OrderItemRequest]) -> Vec<OrderItemInput> {
    items
        .iter()
        .map(|item| OrderItemInput {
            product_name: item.product_name.clone(),
            category: item.category,
            quantity: item.quantity,
            notes: item.notes.clone(),
            price_per_unit: item.price_per_unit,
        })
        .collect()
}

/// List orders with their items, newest first, filtered by the three
/// composable predicates.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    params(
        ("search" = Option<String>, Query, description = "Substring match on client name or order number"),
        ("status" = Option<String>, Query, description = "Exact status or 'all'"),
        ("payment" = Option<String>, Query, description = "'lunas', 'belum_lunas', or 'all'"),
    ),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<Vec<OrderResponse>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let filter = ListingFilter {
        search: query.search.clone(),
        status: parse_status_filter(query.status.as_deref())?,
        payment: parse_payment_filter(query.payment.as_deref())?,
    };

    let orders = state.services.order.list_orders().await?;
    let today = Utc::now().date_naive();
    let filtered: Vec<OrderResponse> = stats::filter_orders(&orders, &filter)
        .into_iter()
        .map(|entry| map_order(entry, today))
        .collect();

    Ok(Json(ApiResponse::success(filtered)))
}

/// Create a new order with its items and the initial history entry.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    check_request(&request)?;
    for item in &request.items {
        check_request(item)?;
    }

    let input = CreateOrderInput {
        order_number: request.order_number.clone(),
        client_name: request.client_name.clone(),
        client_phone: request.client_phone.clone(),
        current_status: request.current_status.unwrap_or(OrderStatus::Pending),
        estimated_date: request.estimated_date,
        dp_amount: request.dp_amount,
        items: item_inputs(&request.items),
        actor_name: request.actor_name.clone(),
    };

    let created = state.services.order.create_order(input).await?;
    let today = Utc::now().date_naive();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_order(&created, today))),
    ))
}

/// Get one order by its public order number.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_number}",
    summary = "Get order",
    params(("order_number" = String, Path, description = "Public order number")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let entry = state
        .services
        .order
        .get_order_with_items(&order_number)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Order with number {order_number} not found"))
        })?;

    let today = Utc::now().date_naive();
    Ok(Json(ApiResponse::success(map_order(&entry, today))))
}

/// Edit an order: header fields plus a full replacement of the item set,
/// with the generated change-log appended to the history trail.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{order_number}",
    summary = "Edit order",
    params(("order_number" = String, Path, description = "Public order number (immutable)")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated successfully", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    check_request(&request)?;
    for item in &request.items {
        check_request(item)?;
    }

    let input = EditOrderInput {
        client_name: request.client_name.clone(),
        client_phone: request.client_phone.clone(),
        current_status: request.current_status,
        estimated_date: request.estimated_date,
        dp_amount: request.dp_amount,
        items: item_inputs(&request.items),
        actor_name: request.actor_name.clone(),
    };

    let updated = state.services.order.edit_order(&order_number, input).await?;
    let today = Utc::now().date_naive();
    Ok(Json(ApiResponse::success(map_order(&updated, today))))
}

/// Hard delete; items and history cascade with the order.
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{order_number}",
    summary = "Delete order",
    params(("order_number" = String, Path, description = "Public order number")),
    responses(
        (status = 204, description = "Order deleted successfully"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.services.order.delete_order(&order_number).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Narrow status-transition endpoint. The requested status is lower-cased
/// and checked against the allow-list; nothing is written on rejection.
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{order_number}/status",
    summary = "Update order status",
    params(("order_number" = String, Path, description = "Public order number")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = StatusUpdated),
        (status = 400, description = "Invalid status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<StatusUpdated>, ServiceError> {
    let status = OrderStatus::from_str(request.status.to_lowercase().trim())
        .map_err(|_| ServiceError::InvalidStatus("Invalid status".to_string()))?;

    state
        .services
        .order
        .update_status(&order_number, status, request.description.clone())
        .await?;

    Ok(Json(StatusUpdated { ok: true }))
}

/// Pay off the remaining balance. A settled order is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{order_number}/pay-off",
    summary = "Pay off remaining balance",
    params(("order_number" = String, Path, description = "Public order number")),
    responses(
        (status = 200, description = "Balance settled", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn pay_off_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.order.pay_off(&order_number).await?;
    let entry = state
        .services
        .order
        .get_order_with_items(&order.order_number)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Order with number {order_number} not found"))
        })?;

    let today = Utc::now().date_naive();
    Ok(Json(ApiResponse::success(map_order(&entry, today))))
}

/// Production summary over a calendar period.
#[utoipa::path(
    get,
    path = "/api/v1/orders/stats",
    summary = "Production summary statistics",
    params(
        ("month" = Option<u32>, Query, description = "Calendar month 1-12; absent = all"),
        ("year" = Option<i32>, Query, description = "Calendar year; absent = all"),
    ),
    responses(
        (status = 200, description = "Summary computed", body = ApiResponse<ProductionStats>),
        (status = 400, description = "Invalid period", body = crate::errors::ErrorResponse),
    )
)]
pub async fn order_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<ProductionStats>>, ServiceError> {
    if let Some(month) = query.month {
        if !(1..=12).contains(&month) {
            return Err(ServiceError::ValidationError(format!(
                "Month must be between 1 and 12, got {month}"
            )));
        }
    }

    let orders = state.services.order.list_orders().await?;
    let period = Period {
        month: query.month,
        year: query.year,
    };
    let working_set = stats::filter_by_period(&orders, period);
    Ok(Json(ApiResponse::success(stats::production_stats(
        &working_set,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_validator() {
        assert!(validate_digits_only("08123456789").is_ok());
        assert!(validate_digits_only("").is_ok());
        assert!(validate_digits_only("0812-345").is_err());
        assert!(validate_digits_only("+62812").is_err());
    }

    #[test]
    fn status_filter_wildcards_and_rejects_unknown() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some("all")).unwrap(), None);
        assert_eq!(
            parse_status_filter(Some("packing")).unwrap(),
            Some(OrderStatus::Packing)
        );
        assert!(parse_status_filter(Some("shipped")).is_err());
    }

    #[test]
    fn payment_filter_parses_known_values() {
        assert_eq!(parse_payment_filter(Some("all")).unwrap(), None);
        assert_eq!(
            parse_payment_filter(Some("lunas")).unwrap(),
            Some(PaymentFilter::Lunas)
        );
        assert_eq!(
            parse_payment_filter(Some("belum_lunas")).unwrap(),
            Some(PaymentFilter::BelumLunas)
        );
        assert!(parse_payment_filter(Some("dp")).is_err());
    }
}
