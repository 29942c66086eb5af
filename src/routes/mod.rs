pub mod sites;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn hook_routes() -> Router<SharedState> {
    Router::new()
        .route("/v1/sites", post(sites::site_created))
        .route("/v1/sites/{site_id}/tables", get(sites::site_tables))
}
