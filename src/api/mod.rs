mod drafts;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::backend::CatalogBackend;
use crate::db::Database;

pub use drafts::{DraftStore, DEFAULT_DRAFT_TTL};

/// In-progress session builds, shared by all handlers.
///
/// Handlers hold the lock only for synchronous composer calls, never across
/// a catalog fetch.
pub type Drafts = Arc<Mutex<DraftStore>>;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Where drafts look up drills. May differ from `db` in remote mode.
    pub catalog: CatalogBackend,
    pub drafts: Drafts,
}

impl AppState {
    pub fn new(db: Database, catalog: CatalogBackend) -> Self {
        Self {
            db,
            catalog,
            drafts: Arc::new(Mutex::new(DraftStore::default())),
        }
    }

    /// Replace the draft store with an empty one using `ttl`.
    pub fn with_draft_ttl(mut self, ttl: Duration) -> Self {
        self.drafts = Arc::new(Mutex::new(DraftStore::new(ttl)));
        self
    }

    /// Periodically drop drafts nobody has touched within their TTL.
    pub fn spawn_draft_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let drafts = self.drafts.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                drafts.lock().await.sweep();
            }
        })
    }

    /// State whose drafts use `db` as their catalog.
    pub fn local(db: Database) -> Self {
        let catalog = CatalogBackend::Local(db.clone());
        Self::new(db, catalog)
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Drill catalog
        .route("/drills", get(handlers::list_drills).post(handlers::create_drill))
        .route(
            "/drills/{id}",
            get(handlers::get_drill).delete(handlers::delete_drill),
        )
        // Drafts (session builds in progress)
        .route("/drafts", post(handlers::create_draft))
        .route(
            "/drafts/{id}",
            get(handlers::get_draft).delete(handlers::discard_draft),
        )
        .route("/drafts/{id}/retime", post(handlers::retime_component))
        .route(
            "/drafts/{id}/components/{component}/catalog",
            get(handlers::open_catalog),
        )
        .route(
            "/drafts/{id}/components/{component}/assignments",
            post(handlers::add_drill),
        )
        .route(
            "/drafts/{id}/components/{component}/assignments/{assignment_id}",
            axum::routing::delete(handlers::remove_drill),
        )
        .route("/drafts/{id}/save", post(handlers::save_draft))
        // Saved sessions
        .route("/sessions", get(handlers::list_sessions))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
