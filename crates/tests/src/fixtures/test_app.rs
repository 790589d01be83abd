use mongodb::{Client, Database, options::ClientOptions};
use std::net::SocketAddr;
use stylecoach_api::{build_router, state::AppState};
use stylecoach_config::Settings;
use stylecoach_db::indexes::ensure_indexes;
use tokio::net::TcpListener;

/// A running test application with its own MongoDB database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub db: Database,
    pub settings: Settings,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn a new test server connected to the test MongoDB.
    ///
    /// Requires a running MongoDB at localhost:27017.
    /// Set STYLECOACH__DATABASE__URL to override the connection string.
    /// Each test gets a unique database name for isolation.
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawn a test server with customized settings. The `mutator`
    /// closure receives a `&mut Settings` after test defaults are
    /// applied.
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let db_name = format!("stylecoach_test_{suffix}");

        let mut settings = Settings::load().expect("Failed to load settings");
        if let Ok(url) = std::env::var("STYLECOACH__DATABASE__URL") {
            settings.database.url = url;
        }
        settings.database.name = db_name.clone();
        // Per-test media root so parallel tests never collide on disk.
        settings.app.media_dir = std::env::temp_dir()
            .join(format!("stylecoach-test-media-{suffix}"))
            .to_string_lossy()
            .into_owned();

        mutator(&mut settings);

        let client_options = ClientOptions::parse(&settings.database.url)
            .await
            .expect("Failed to parse MongoDB URL");
        let mongo_client =
            Client::with_options(client_options).expect("Failed to create MongoDB client");
        let db = mongo_client.database(&db_name);

        ensure_indexes(&db).await.expect("Failed to create indexes");

        let app_state = AppState::new(db.clone(), settings.clone());
        let app = build_router(app_state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::new();

        Self {
            addr,
            base_url,
            db,
            settings,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let db = self.db.clone();
        // Best effort cleanup: drop the test database
        tokio::spawn(async move {
            let _ = db.drop().await;
        });
    }
}
