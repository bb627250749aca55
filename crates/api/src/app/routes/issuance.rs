use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};

use kitroom_core::{EmployeeId, ItemCode, MovementId};

use crate::app::AppServices;
use crate::app::dto;
use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/", post(issue).get(list))
        .route("/active", get(list_active))
        .route("/returned", get(list_returned))
        .route("/by-employee/:employee_id", get(list_for_employee))
        .route("/by-item/:code", get(list_for_item))
        .route("/return-batch", post(return_batch))
        .route("/:id", get(get_movement).delete(delete_movement))
        .route("/:id/return", patch(mark_return))
        .route("/:id/grade", patch(correct_grade))
}

fn parse_id(raw: &str) -> Result<MovementId, axum::response::Response> {
    raw.parse::<MovementId>()
        .map_err(errors::domain_error_to_response)
}

pub async fn issue(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::IssueRequest>,
) -> axum::response::Response {
    let code = match ItemCode::new(body.item_code) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .issuance
        .issue(
            body.employee_id,
            code,
            body.quantity,
            &body.reason,
            body.issued_at,
        )
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn mark_return(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReturnRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services
        .issuance
        .mark_return(id, body.grade, body.returned_at)
        .await
    {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn return_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::BatchReturnRequest>,
) -> axum::response::Response {
    match services
        .issuance
        .mark_return_batch(&body.returns, body.returned_at)
        .await
    {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn correct_grade(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CorrectGradeRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.issuance.correct_return_grade(id, body.grade).await {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.issuance.get(id).await {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    match services.issuance.remove(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.issuance.list().await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_active(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.issuance.list_active().await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_returned(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.issuance.list_returned().await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_for_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Path(employee_id): Path<String>,
) -> axum::response::Response {
    let employee_id = match employee_id.parse::<EmployeeId>() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.issuance.list_for_employee(employee_id).await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
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
    match services.issuance.list_for_item(code).await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
