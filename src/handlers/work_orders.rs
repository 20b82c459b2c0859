use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::work_order_service::WorkOrderOperations;
use crate::domain::order_context::CommittedOrderContextDto;
use crate::domain::reducer::WorkOrderAction;
use crate::domain::work_order::WipWorkOrder;
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderBody {
    #[schema(value_type = Object)]
    pub work_order: WipWorkOrder,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderResponse {
    #[schema(value_type = Object)]
    pub work_order: WipWorkOrder,
    /// Items and charges already realized by an order or draft order;
    /// `locked` rows belong to a real order.
    #[schema(value_type = Object)]
    pub context: CommittedOrderContextDto,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReduceDraftRequest {
    /// Name of the stored work order whose committed context applies.
    /// Omit for work orders that were never saved.
    pub name: Option<String>,
    #[schema(value_type = Object)]
    pub work_order: WipWorkOrder,
    /// Applied in order, e.g. `{"type": "addItems", "items": [...]}`.
    #[schema(value_type = Vec<Object>)]
    pub actions: Vec<WorkOrderAction>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// PUT /work-orders/{name}
#[utoipa::path(
    put,
    path = "/work-orders/{name}",
    params(
        ("name" = String, Path, description = "Work order name"),
    ),
    request_body = WorkOrderBody,
    responses(
        (status = 200, description = "Work order saved", body = WorkOrderBody),
        (status = 400, description = "Invalid work order"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "work-orders"
)]
pub async fn save_work_order(
    ops: web::Data<dyn WorkOrderOperations>,
    path: web::Path<String>,
    body: web::Json<WorkOrderBody>,
) -> Result<HttpResponse, AppError> {
    let name = path.into_inner();
    let work_order = body.into_inner().work_order;

    let work_order = web::block(move || ops.save_work_order(&name, &work_order)).await??;

    Ok(HttpResponse::Ok().json(WorkOrderBody { work_order }))
}

/// GET /work-orders/{name}
///
/// Returns the work order together with its committed order context, which
/// editing clients pass back to the reducer.
#[utoipa::path(
    get,
    path = "/work-orders/{name}",
    params(
        ("name" = String, Path, description = "Work order name"),
    ),
    responses(
        (status = 200, description = "Work order found", body = WorkOrderResponse),
        (status = 404, description = "Work order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "work-orders"
)]
pub async fn get_work_order(
    ops: web::Data<dyn WorkOrderOperations>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let name = path.into_inner();

    let loaded = web::block(move || ops.load_work_order(&name)).await??;

    Ok(HttpResponse::Ok().json(WorkOrderResponse {
        work_order: loaded.work_order,
        context: loaded.context,
    }))
}

/// POST /work-orders/draft
///
/// Folds the actions over the given state. Nothing is persisted.
#[utoipa::path(
    post,
    path = "/work-orders/draft",
    request_body = ReduceDraftRequest,
    responses(
        (status = 200, description = "Reduced work order", body = WorkOrderBody),
        (status = 400, description = "Malformed action"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "work-orders"
)]
pub async fn reduce_draft(
    ops: web::Data<dyn WorkOrderOperations>,
    body: web::Json<ReduceDraftRequest>,
) -> Result<HttpResponse, AppError> {
    let ReduceDraftRequest {
        name,
        work_order,
        actions,
    } = body.into_inner();

    let work_order =
        web::block(move || ops.reduce_draft(name.as_deref(), work_order, actions)).await??;

    Ok(HttpResponse::Ok().json(WorkOrderBody { work_order }))
}
