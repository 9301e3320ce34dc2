mod health;
mod products;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route(
            "/products",
            post(products::add_product).get(products::get_products),
        )
        .route("/products/search", get(products::search_products))
        .route("/products/delete_all", delete(products::delete_all_products))
        .route("/products/{id}", delete(products::delete_product))
}
