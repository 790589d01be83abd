use stylecoach_api::{build_router, state::AppState};
use stylecoach_config::Settings;
use stylecoach_db::{connect, indexes::ensure_indexes};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "stylecoach_api=debug,stylecoach_services=debug,stylecoach_db=debug,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!(
        "Starting StyleCoach API on {}:{}",
        settings.app.host, settings.app.port
    );
    info!(
        diarization = settings.diarization.base_url.is_some(),
        claude = settings.claude.api_key.is_some(),
        similarity = settings.similarity.endpoint.is_some(),
        "Collaborator config"
    );

    let db = connect(&settings).await?;
    ensure_indexes(&db).await?;

    let app_state = AppState::new(db, settings.clone());

    // Re-drive report tasks stranded by a previous crash, then keep
    // sweeping in the background.
    app_state.pipeline.resume_stale().await?;
    app_state.pipeline.spawn_sweeper();

    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
