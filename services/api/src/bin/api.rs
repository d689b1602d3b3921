//! services/api/src/bin/api.rs

use api_lib::{
    adapters::db::DbAdapter,
    config::Config,
    error::ApiError,
    web::{
        add_category_handler, add_favorite_handler, advanced_search_handler,
        advanced_search_submit_handler, browse_handler, delete_category_handler, download_handler,
        my_account_handler, recent_activity_handler, remove_favorite_handler, require_admin,
        require_auth, resource_detail_handler, rest::ApiDoc, search_handler,
        search_history_handler, state::AppState, suggestions_handler,
    },
};
use axum::{
    http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        resources: db_adapter.clone(),
        search_logs: db_adapter.clone(),
        sessions: db_adapter.clone(),
        categories: db_adapter.clone(),
        favorites: db_adapter.clone(),
        downloads: db_adapter,
        config: config.clone(),
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new().route("/search/suggestions", get(suggestions_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/search", get(search_handler))
        .route(
            "/advanced-search",
            get(advanced_search_handler).post(advanced_search_submit_handler),
        )
        .route("/browse", get(browse_handler))
        .route("/resource/{id}", get(resource_detail_handler))
        .route("/my-account", get(my_account_handler))
        .route("/my-account/history", get(search_history_handler))
        .route("/add-favorite/{id}", post(add_favorite_handler))
        .route("/remove-favorite/{id}", post(remove_favorite_handler))
        .route("/download/{id}", get(download_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Admin routes (auth, then the admin role). The last layer added runs first.
    let admin_routes = Router::new()
        .route("/admin/category/add", post(add_category_handler))
        .route("/admin/category/delete/{id}", post(delete_category_handler))
        .route("/admin/activity", get(recent_activity_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_admin,
        ))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
