use std::sync::Arc;

use axum::{Extension, Router, http::StatusCode, routing::get};
use tower::ServiceBuilder;

use kitroom_store::{CatalogService, Db, IssuanceService, ReplenishmentService, StockService};

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared service handles for the HTTP layer.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub issuance: IssuanceService,
    pub replenishment: ReplenishmentService,
    pub stock: StockService,
}

impl AppServices {
    pub fn new(db: Db) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            issuance: IssuanceService::new(db.clone()),
            replenishment: ReplenishmentService::new(db.clone()),
            stock: StockService::new(db),
        }
    }
}

/// Assemble the full router over an opened database.
pub fn build_app(db: Db) -> Router {
    let services = Arc::new(AppServices::new(db));

    Router::new()
        .route("/health", get(health))
        .nest("/catalog", routes::catalog::router())
        .nest("/issuance", routes::issuance::router())
        .nest("/orders", routes::orders::router())
        .nest("/stock", routes::stock::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}

async fn health() -> StatusCode {
    StatusCode::OK
}
