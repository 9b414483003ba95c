pub mod listings;
pub mod requests;
pub mod users;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use campusmart_core::lifecycle::RequestLifecycleEngine;
use campusmart_db::{
    DbPool, ItemRepository, SqlItemRepository, SqlRequestGateway, SqlUserRepository,
    UserRepository,
};

use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub engine: RequestLifecycleEngine,
    pub users: Arc<dyn UserRepository>,
    pub items: Arc<dyn ItemRepository>,
}

impl AppState {
    pub fn from_pool(db_pool: DbPool) -> Self {
        Self {
            engine: RequestLifecycleEngine::new(Arc::new(SqlRequestGateway::new(db_pool.clone()))),
            users: Arc::new(SqlUserRepository::new(db_pool.clone())),
            items: Arc::new(SqlItemRepository::new(db_pool)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub message: &'static str,
}

pub async fn home() -> Json<Banner> {
    Json(Banner { message: "Campus Marketplace API running!" })
}

/// Full HTTP surface: marketplace routes, `/health`, permissive CORS and request tracing.
pub fn app(db_pool: DbPool) -> Router {
    Router::new()
        .route("/", get(home))
        .merge(requests::routes())
        .merge(listings::routes())
        .merge(users::routes())
        .with_state(AppState::from_pool(db_pool.clone()))
        .merge(health::router(db_pool))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
