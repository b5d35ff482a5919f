//! HTTP handlers for RoastTime import endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use shared::lot::RoastLevel;

use crate::error::AppResult;
use crate::services::roast_import::{
    guess_roast_level, RoastImportService, RoastTimeRoast, RoastTimeSummary,
};
use crate::AppState;

/// RoastTime roast with the guessed roast level attached
#[derive(Debug, Serialize)]
pub struct RoastTimeRoastResponse {
    #[serde(flatten)]
    pub roast: RoastTimeRoast,
    pub guessed_level: RoastLevel,
}

impl From<RoastTimeRoast> for RoastTimeRoastResponse {
    fn from(roast: RoastTimeRoast) -> Self {
        let guessed_level = guess_roast_level(&roast);
        Self {
            roast,
            guessed_level,
        }
    }
}

/// Query parameters for roast listing
#[derive(Debug, Deserialize)]
pub struct ListRoastsQuery {
    #[serde(default = "default_roast_limit")]
    pub limit: usize,
}

fn default_roast_limit() -> usize {
    50
}

/// List RoastTime roasts available for import, newest first
pub async fn list_roasttime_roasts(
    State(state): State<AppState>,
    Query(query): Query<ListRoastsQuery>,
) -> AppResult<Json<Vec<RoastTimeRoastResponse>>> {
    let service = RoastImportService::new(&state.config.roasttime.roasts_dir);
    let roasts = service.list_roasts(query.limit).await?;
    Ok(Json(roasts.into_iter().map(Into::into).collect()))
}

/// Get one RoastTime roast by uid
pub async fn get_roasttime_roast(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Json<RoastTimeRoastResponse>> {
    let service = RoastImportService::new(&state.config.roasttime.roasts_dir);
    let roast = service.get_roast(&uid).await?;
    Ok(Json(roast.into()))
}

/// Summary statistics over every RoastTime roast
pub async fn roasttime_summary(
    State(state): State<AppState>,
) -> AppResult<Json<RoastTimeSummary>> {
    let service = RoastImportService::new(&state.config.roasttime.roasts_dir);
    let summary = service.summary().await?;
    Ok(Json(summary))
}
