pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod provisioner;
pub mod routes;
pub mod schema;
pub mod site;
pub mod state;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::SchemaStore;
use crate::events::SiteEvents;
use crate::provisioner::{Provisioner, PROVISIONER_PRIORITY};
use crate::state::{AppState, SharedState};

/// Wires the provisioner into the site event registry.
pub fn build_state(store: Arc<dyn SchemaStore>, config: Config) -> SharedState {
    let provisioner = Arc::new(Provisioner::new(
        store,
        config.table_prefix.clone(),
        config.table_options(),
    ));

    let mut events = SiteEvents::new();
    events.register(PROVISIONER_PRIORITY, provisioner.clone());

    Arc::new(AppState {
        config,
        provisioner,
        events,
    })
}

pub fn build_app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::hook_routes())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
