use std::sync::Arc;

use axum::{
    Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::get,
};

use crate::app::AppServices;
use crate::app::errors;

pub fn router() -> Router {
    Router::new().route("/total", get(total))
}

pub async fn total(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.stock.total_on_hand().await {
        Ok(total) => (
            StatusCode::OK,
            Json(serde_json::json!({ "total_on_hand": total })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
