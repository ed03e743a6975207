pub mod auth;
pub mod error;
pub mod files;
pub mod projects;
pub mod repo;
pub mod workspace;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use common::auth::User;
use common::tree::NamePolicy;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use error::ApiError;
use repo::ProjectRepo;
use workspace::Workspace;

pub struct AppState {
    pub repo: Arc<dyn ProjectRepo>,
    pub users: Vec<User>,
    pub policy: NamePolicy,
    sessions: Mutex<HashMap<String, Workspace>>,
}

impl AppState {
    pub fn new(repo: Arc<dyn ProjectRepo>, users: Vec<User>, policy: NamePolicy) -> Self {
        Self {
            repo,
            users,
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` against the caller's editing session, hydrating it from
    /// durable storage on first use. One mutex guards the whole session:
    /// its pieces of state are only consistent as a unit.
    pub fn with_workspace<T>(
        &self,
        owner: &str,
        f: impl FnOnce(&mut Workspace) -> T,
    ) -> Result<T, ApiError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ApiError::Unavailable("session lock poisoned".to_string()))?;
        let ws = match sessions.entry(owner.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut projects = Vec::new();
                for summary in self.repo.list(owner)? {
                    projects.push(self.repo.get(owner, &summary.id)?);
                }
                entry.insert(Workspace::new(owner, projects, self.policy))
            }
        };
        Ok(f(ws))
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);

    Router::new()
        .route("/api/login", post(auth::handlers::login))
        .route("/api/logout", post(auth::handlers::logout))
        .route("/api/auth/check", get(auth::handlers::check_auth))
        .merge(projects::routes())
        .merge(files::routes())
        .layer(session_layer)
        .with_state(state)
}
