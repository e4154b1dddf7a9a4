mod error;
mod routes;
mod state;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use pokeprice_sdk::PokePriceSdkBuilder;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,pokeprice_sdk=debug")),
        )
        .init();

    let sdk = PokePriceSdkBuilder::from_env()
        .build()
        .expect("Failed to initialize pokeprice SDK");
    tracing::info!(%sdk, "SDK ready");

    let state = Arc::new(AppState { sdk });

    let app = Router::new()
        .route("/api/sets", get(routes::sets::list_sets))
        .route("/api/sets/grouped", get(routes::sets::grouped_sets))
        .route("/api/sets/{set_id}/cards", get(routes::cards::list_cards))
        .route("/api/pricing/{card_id}", get(routes::pricing::get_pricing))
        .route("/api/status", get(routes::status::get_status))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = std::env::var("PORT")
        .map(|p| format!("0.0.0.0:{p}"))
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    tracing::info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
