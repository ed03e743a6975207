use std::sync::Arc;

use backend::repo::JsonDirRepo;
use backend::{app, AppState};
use common::auth::User;
use common::tree::NamePolicy;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_path = std::env::var("STUDIO_DATA_PATH").unwrap_or_else(|_| "studio_data".to_string());
    let users_path = std::env::var("STUDIO_USERS_PATH").unwrap_or_else(|_| "users.json".to_string());
    let policy = match std::env::var("STUDIO_NAME_POLICY").as_deref() {
        Ok("reject") => NamePolicy::RejectDuplicates,
        _ => NamePolicy::AllowDuplicates,
    };

    let users: Vec<User> = match std::fs::read_to_string(&users_path) {
        Ok(text) => serde_json::from_str(&text).expect("users file is not valid JSON"),
        Err(_) => {
            warn!(path = %users_path, "users file missing, starting with no accounts");
            Vec::new()
        }
    };

    let repo = JsonDirRepo::new(&data_path).expect("cannot open data directory");
    let state = Arc::new(AppState::new(Arc::new(repo), users, policy));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 3000));
    info!(%addr, data = %data_path, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app(state)).await.unwrap();
}
