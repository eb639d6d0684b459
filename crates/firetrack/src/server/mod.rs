//! HTTP JSON API.
//!
//! The store sits behind a single mutex, so every request's storage work is
//! serialized in the process; the database's own write lock covers other
//! processes sharing the file.

mod handlers;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;

pub use handlers::{Actor, ApiError, ACTOR_HEADER, STATION_HEADER};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    storage: Arc<Mutex<Storage>>,
    recent_incidents: usize,
}

impl AppState {
    /// Wrap a store for sharing between requests.
    #[must_use]
    pub fn new(storage: Storage, recent_incidents: usize) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            recent_incidents,
        }
    }

    fn storage(&self) -> Result<MutexGuard<'_, Storage>> {
        self.storage
            .lock()
            .map_err(|_| Error::server("storage lock poisoned"))
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/dashboard", get(handlers::dashboard))
        .route(
            "/api/incidents",
            get(handlers::list_incidents)
                .post(handlers::create_incident)
                .delete(handlers::delete_all_incidents),
        )
        .route(
            "/api/incidents/:id",
            get(handlers::get_incident).delete(handlers::delete_incident),
        )
        .route("/api/incidents/:id/update", post(handlers::update_incident))
        .route("/api/incidents/:id/vehicles", post(handlers::assign_vehicles))
        .route(
            "/api/incidents/:id/personnel",
            post(handlers::assign_personnel),
        )
        .route(
            "/api/incidents/:id/notes",
            get(handlers::list_notes).post(handlers::add_note),
        )
        .route(
            "/api/vehicles",
            get(handlers::list_vehicles).post(handlers::add_vehicle),
        )
        .route(
            "/api/vehicles/:id/status",
            post(handlers::set_vehicle_status),
        )
        .route(
            "/api/stations",
            get(handlers::list_stations).post(handlers::add_station),
        )
        .route(
            "/api/personnel",
            get(handlers::list_personnel).post(handlers::add_personnel),
        )
        .route(
            "/api/equipment",
            get(handlers::list_equipment).post(handlers::add_equipment),
        )
        .route(
            "/api/maintenance",
            get(handlers::list_maintenance).post(handlers::add_maintenance),
        )
        .route(
            "/api/training",
            get(handlers::list_training).post(handlers::add_training),
        )
        .route(
            "/api/contacts",
            get(handlers::list_contacts).post(handlers::add_contact),
        )
        .with_state(state)
}

/// Serve the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the bind address is invalid or cannot be bound.
pub async fn serve(config: &Config, storage: Storage) -> Result<()> {
    let addr = config.bind_address()?;
    let state = AppState::new(storage, config.dashboard.recent_incidents);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::server(format!("failed to bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::server(e.to_string()))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
