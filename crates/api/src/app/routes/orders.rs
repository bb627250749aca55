use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};

use kitroom_core::{ItemCode, OrderId};

use crate::app::AppServices;
use crate::app::dto;
use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", post(place).get(list))
        .route("/pending", get(list_pending))
        .route("/by-item/:code", get(list_for_item))
        .route("/:id", get(get_order))
        .route("/:id/complete", patch(complete))
        .route("/:id/cancel", patch(cancel))
}

fn parse_id(raw: &str) -> Result<OrderId, axum::response::Response> {
    raw.parse::<OrderId>()
        .map_err(errors::domain_error_to_response)
}

pub async fn place(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let code = match ItemCode::new(body.item_code) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .replenishment
        .place(code, body.quantity, body.supplier, body.note, body.ordered_at)
        .await
    {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn complete(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.replenishment.fulfill(id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.replenishment.cancel(id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.replenishment.get(id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.replenishment.list().await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_pending(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.replenishment.list_pending().await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_for_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match code.parse::<ItemCode>() {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.replenishment.list_for_item(code).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
