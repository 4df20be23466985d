use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Konveksi API",
        version = "0.3.0",
        description = r#"
# Konveksi Order Management API

Backend for a garment production shop: order intake with line items and a
running deposit ledger, a linear production-status pipeline with an audit
trail, listing and summary statistics for the admin dashboard, business
analytics, and a customer-facing tracking projection.

## Error Handling

Every error is returned as `{"error": "<message>"}` with a matching HTTP
status code.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order management endpoints"),
        (name = "Tracking", description = "Public order tracking"),
        (name = "Analytics", description = "Business analytics endpoints"),
    ),
    paths(
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::pay_off_order,
        crate::handlers::orders::order_stats,
        crate::handlers::tracking::track_order,
        crate::handlers::analytics::analytics_summary,
    ),
    components(schemas(
        crate::handlers::orders::OrderResponse,
        crate::handlers::orders::OrderItemResponse,
        crate::handlers::orders::CreateOrderRequest,
        crate::handlers::orders::UpdateOrderRequest,
        crate::handlers::orders::OrderItemRequest,
        crate::handlers::orders::UpdateOrderStatusRequest,
        crate::handlers::tracking::TrackingResponse,
        crate::handlers::tracking::HistoryEntryResponse,
        crate::handlers::analytics::AnalyticsSummary,
        crate::lifecycle::OrderStatus,
        crate::lifecycle::ItemCategory,
        crate::errors::ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Swagger UI router serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
