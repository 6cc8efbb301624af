use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::factory::CrewFactory;
use crate::storage::RunStore;
use crate::types::{CrewEvent, RunEvent, RunId};

const EVENT_BUFFER: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RunStore>,
    pub factory: Arc<CrewFactory>,
    pub events: broadcast::Sender<RunEvent>,
}

impl AppState {
    pub fn new(store: Arc<dyn RunStore>, factory: Arc<CrewFactory>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            store,
            factory,
            events,
        }
    }

    /// Stores a run event and forwards it to live subscribers.
    pub fn record(&self, run_id: RunId, event: CrewEvent) {
        log::debug!("run {}: {}", run_id, event.describe());
        let event = RunEvent::new(run_id, event);
        if let Err(e) = self.store.append_event(event.clone()) {
            log::warn!("dropping event for run {}: {}", run_id, e);
            return;
        }
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/config", get(handlers::get_config))
        .route("/generate", post(handlers::generate))
        .route("/runs", post(handlers::create_run))
        .route("/runs", get(handlers::list_runs))
        .route("/runs/:id", get(handlers::get_run))
        .route("/runs/:id/events", get(handlers::stream_run_events))
        .route("/runs/:id/download", get(handlers::download_run))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    log::info!("blog writer UI listening on http://localhost:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
