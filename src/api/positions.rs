use crate::api::AppState;
use crate::domain::{Address, Position, PositionKey};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsQuery {
    /// Also return every decoded slot keyed by position key.
    pub include_map: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub chain_id: u64,
    pub account: Option<Address>,
    pub epoch: u64,
    pub loaded: bool,
    pub pending_count: usize,
    pub updated_count: usize,
    pub computed_at_ms: i64,
    pub positions: Vec<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions_map: Option<BTreeMap<PositionKey, Position>>,
}

pub async fn get_positions(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    let view = state.session.view();
    let include_map = params.include_map.unwrap_or(false);

    Ok(Json(PositionsResponse {
        chain_id: state.chain_id,
        account: view.account,
        epoch: view.epoch,
        loaded: view.loaded,
        pending_count: view.pending_count,
        updated_count: view.updated_count,
        computed_at_ms: view.computed_at.as_ms(),
        positions: view.snapshot.positions.clone(),
        positions_map: include_map.then(|| view.snapshot.positions_map.clone()),
    }))
}

pub async fn get_position(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Position>, AppError> {
    let not_found = || AppError::NotFound(format!("No position for key {}", key));
    let parsed: PositionKey = key.parse().map_err(|_| not_found())?;
    let view = state.session.view();
    view.snapshot
        .get(&parsed)
        .cloned()
        .map(Json)
        .ok_or_else(not_found)
}
