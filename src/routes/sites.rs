use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::HookCaller;
use crate::error::AppError;
use crate::events::SiteCreated;
use crate::provisioner::SiteInspection;
use crate::site::SiteId;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SiteCreatedRequest {
    pub site_id: u64,
}

fn site_id(raw: u64) -> Result<SiteId, AppError> {
    if raw == 0 {
        return Err(AppError::BadRequest(
            "site_id must be a positive integer".to_string(),
        ));
    }
    Ok(SiteId(raw))
}

pub async fn site_created(
    _caller: HookCaller,
    State(state): State<SharedState>,
    Json(req): Json<SiteCreatedRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let site = site_id(req.site_id)?;
    tracing::info!("Site {site} created");

    let results = state
        .events
        .dispatch_site_created(&SiteCreated { site_id: site })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "site_id": site,
            "prefix": state.provisioner.prefix_for(site),
            "listeners": results,
        })),
    ))
}

pub async fn site_tables(
    _caller: HookCaller,
    State(state): State<SharedState>,
    Path(raw): Path<u64>,
) -> Result<Json<SiteInspection>, AppError> {
    let site = site_id(raw)?;
    let inspection = state.provisioner.inspect(site).await?;
    Ok(Json(inspection))
}
