use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    config::{self, AppConfig},
    database,
    error::{AppError, Result},
    repository::PgProductRepository,
    routes,
    services::CatalogService,
    storage::S3BlobStore,
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub catalog: Arc<CatalogService>,
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let pool = database::create_pool(&config.database).await?;
    let s3_client = config::load_s3_client(&config.storage.region).await?;

    let repository = Arc::new(PgProductRepository::new(pool.clone()));
    let blob_store = Arc::new(S3BlobStore::new(s3_client, &config.storage));
    let catalog = Arc::new(CatalogService::new(repository, blob_store));

    let state = AppState { db: pool, catalog };

    let app = routes::create_router()
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors_layer(config)?)
        .with_state(state);

    Ok(app)
}

fn cors_layer(config: &AppConfig) -> Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins = config
            .cors
            .allowed_origins
            .iter()
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|_| {
                    AppError::ConfigError(format!("Invalid CORS origin: {}", origin))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_origin(allow_origin))
}
