use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::work_order_service::WorkOrderOperations;
use crate::domain::attributes::CustomAttribute;
use crate::domain::ids::Gid;
use crate::domain::order::{LineItemSnapshot, LinkReport, OrderSnapshot};
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

/// An order or draft order with its complete line item list.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderWebhook {
    /// `gid://shopify/Order/<id>` or `gid://shopify/DraftOrder/<id>`
    #[schema(value_type = String)]
    pub id: Gid,
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub custom_attributes: Vec<CustomAttribute>,
    /// Must contain every line item, not a single page.
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub line_items: Vec<LineItemSnapshot>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncOrderResponse {
    /// Absent when the order does not belong to a known work order.
    #[schema(value_type = Option<Object>)]
    pub report: Option<LinkReport>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderDeletedWebhook {
    #[schema(value_type = String)]
    pub id: Gid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveOrderResponse {
    pub removed: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /webhooks/orders
///
/// Mirrors the order and links its tagged line items to work order items and
/// charges. Draft orders left without any linked row are deleted on the
/// platform within the same transaction.
#[utoipa::path(
    post,
    path = "/webhooks/orders",
    request_body = OrderWebhook,
    responses(
        (status = 200, description = "Order synced", body = SyncOrderResponse),
        (status = 400, description = "Malformed id"),
        (status = 502, description = "Platform call failed; nothing was committed"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "webhooks"
)]
pub async fn sync_order(
    ops: web::Data<dyn WorkOrderOperations>,
    body: web::Json<OrderWebhook>,
) -> Result<HttpResponse, AppError> {
    let OrderWebhook {
        id,
        name,
        custom_attributes,
        line_items,
    } = body.into_inner();
    let order = OrderSnapshot {
        id,
        name,
        custom_attributes,
    };

    let report = web::block(move || ops.sync_order(&order, &line_items)).await??;

    Ok(HttpResponse::Ok().json(SyncOrderResponse { report }))
}

/// POST /webhooks/orders/delete
#[utoipa::path(
    post,
    path = "/webhooks/orders/delete",
    request_body = OrderDeletedWebhook,
    responses(
        (status = 200, description = "Local mirror removed if present", body = RemoveOrderResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "webhooks"
)]
pub async fn remove_order(
    ops: web::Data<dyn WorkOrderOperations>,
    body: web::Json<OrderDeletedWebhook>,
) -> Result<HttpResponse, AppError> {
    let id = body.into_inner().id;

    let removed = web::block(move || ops.remove_order(&id)).await??;

    Ok(HttpResponse::Ok().json(RemoveOrderResponse { removed }))
}
