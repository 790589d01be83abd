pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let session_routes = Router::new()
        .route("/", post(routes::session::start).get(routes::session::list))
        .route("/{session_id}", get(routes::session::get))
        .route("/{session_id}/end", post(routes::session::end))
        .route("/{session_id}/chunk", post(routes::chunk::ingest))
        .route(
            "/{session_id}/chunk/{chunk_index}/analyze",
            post(routes::analysis::analyze),
        )
        .route(
            "/{session_id}/chunk/{chunk_index}/analysis",
            get(routes::analysis::get),
        )
        .route("/{session_id}/analysis", get(routes::analysis::list))
        .route(
            "/{session_id}/report",
            post(routes::report::generate).get(routes::report::get),
        );

    let diarization_routes =
        Router::new().route("/callback", post(routes::diarization::callback));

    let api = Router::new()
        .nest("/session", session_routes)
        .nest("/diarization", diarization_routes);

    let media_dir = state.settings.app.media_dir.clone();

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .route("/ws", get(ws::handler::ws_upgrade))
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
