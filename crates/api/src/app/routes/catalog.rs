use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use kitroom_catalog::{ItemDraft, ItemPatch};
use kitroom_core::ItemCode;

use crate::app::AppServices;
use crate::app::dto;
use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/items", post(create_item).get(list_items))
        .route("/items/search", get(search_items))
        .route(
            "/items/:code",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/items/:code/stock", get(get_item_stock))
}

fn parse_code(raw: &str) -> Result<ItemCode, axum::response::Response> {
    raw.parse::<ItemCode>().map_err(errors::domain_error_to_response)
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterItemRequest>,
) -> axum::response::Response {
    let draft = match ItemDraft::new(body.kind, body.color, body.size) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog.register(draft).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog.list().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn search_items(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::SearchQuery>,
) -> axum::response::Response {
    let text = query.q.unwrap_or_default();
    match services.catalog.search(&text).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(r) => return r,
    };
    match services.catalog.lookup(code).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
    Json(body): Json<dto::UpdateItemRequest>,
) -> axum::response::Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let patch = ItemPatch {
        kind: body.kind,
        color: body.color,
        size: body.size,
    };
    match services.catalog.update(code, patch).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(r) => return r,
    };
    match services.catalog.remove(code).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(r) => return r,
    };
    match services.stock.buckets_for_item(code).await {
        Ok(buckets) => (StatusCode::OK, Json(buckets)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
