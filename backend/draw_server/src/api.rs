//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fair_draw::{
    can_draw, cycle_progress, generate_stats, AnimationConfig, CycleProgress, DrawError,
    DrawResult, DrawStats, LotteryConfig, LotteryState, Prize,
};
use serde::Serialize;

use crate::db::SqliteStore;
use crate::errors::ServerError;
use crate::session::Session;

pub struct ApiState {
    pub session: Session<SqliteStore>,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Reveal timings for the client, in milliseconds.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealPlan {
    pub prepare_ms: u128,
    pub spin_min_ms: u128,
    pub spin_max_ms: u128,
    pub slowing_ms: u128,
    pub result_ms: u128,
    pub target_fps: u32,
    pub performance_threshold: u32,
}

impl RevealPlan {
    fn for_config(config: &LotteryConfig) -> Option<Self> {
        if !config.enable_animations {
            return None;
        }
        let timing = AnimationConfig::for_lottery(config);
        Some(Self {
            prepare_ms: timing.prepare_duration.as_millis(),
            spin_min_ms: timing.spin_duration_range.0.as_millis(),
            spin_max_ms: timing.spin_duration_range.1.as_millis(),
            slowing_ms: timing.slowing_duration.as_millis(),
            result_ms: timing.result_duration.as_millis(),
            target_fps: timing.target_fps,
            performance_threshold: timing.performance_threshold,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResponse {
    pub result: DrawResult,
    pub prize: Option<Prize>,
    /// The draw finished its cycle, which is now in history.
    pub cycle_completed: bool,
    pub progress: CycleProgress,
    pub can_draw: bool,
    /// Absent when animations are disabled; show the result immediately.
    pub reveal: Option<RevealPlan>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub cycle_id: String,
    pub can_draw: bool,
    pub progress: CycleProgress,
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DrawStats,
    pub history: usize,
}

#[derive(Serialize)]
pub struct BackupResponse {
    pub locator: String,
}

#[derive(Serialize)]
pub struct BackupListResponse {
    pub count: usize,
    pub backups: Vec<String>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn status_for(e: &ServerError) -> StatusCode {
    match e {
        ServerError::Draw(DrawError::NoAvailablePrizes { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        ServerError::Draw(_) | ServerError::NothingToBackup => StatusCode::CONFLICT,
        ServerError::BackupNotFound(_) => StatusCode::NOT_FOUND,
        ServerError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: ServerError) -> Response {
    (
        status_for(&e),
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn progress_of(state: &LotteryState) -> ProgressResponse {
    ProgressResponse {
        cycle_id: state.current_cycle.id.clone(),
        can_draw: can_draw(&state.current_cycle, &state.config),
        progress: cycle_progress(&state.current_cycle, &state.config),
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /state`
///
/// The whole committed state: current cycle, history, catalog and config.
pub async fn get_state(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.session.snapshot().await)
}

/// `POST /draw`
pub async fn draw(State(state): State<Arc<ApiState>>) -> Response {
    match state.session.draw().await {
        Ok((result, next)) => {
            let body = DrawResponse {
                prize: next.prize(&result.prize_id).cloned(),
                cycle_completed: result.cycle_id != next.current_cycle.id,
                progress: cycle_progress(&next.current_cycle, &next.config),
                can_draw: can_draw(&next.current_cycle, &next.config),
                reveal: RevealPlan::for_config(&next.config),
                result,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `POST /cycles`
///
/// Start a new cycle now, abandoning the current one.
pub async fn new_cycle(State(state): State<Arc<ApiState>>) -> Response {
    match state.session.new_cycle().await {
        Ok(next) => (StatusCode::CREATED, Json(progress_of(&next))).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /progress`
pub async fn get_progress(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(progress_of(&state.session.snapshot().await))
}

/// `GET /stats`
///
/// Fairness and color totals over all completed cycles.
pub async fn get_stats(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let snapshot = state.session.snapshot().await;
    let stats = generate_stats(
        &snapshot.history,
        &snapshot.catalog,
        snapshot.config.draws_per_color,
    );
    Json(StatsResponse {
        stats,
        history: snapshot.history.len(),
    })
}

/// `POST /backups`
pub async fn create_backup(State(state): State<Arc<ApiState>>) -> Response {
    match state.session.backup().await {
        Ok(locator) => (StatusCode::CREATED, Json(BackupResponse { locator })).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /backups`
pub async fn list_backups(State(state): State<Arc<ApiState>>) -> Response {
    match state.session.list_backups().await {
        Ok(backups) => (
            StatusCode::OK,
            Json(BackupListResponse {
                count: backups.len(),
                backups,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /backups/:locator/restore`
pub async fn restore_backup(
    State(state): State<Arc<ApiState>>,
    Path(locator): Path<String>,
) -> Response {
    match state.session.restore(&locator).await {
        Ok(restored) => (StatusCode::OK, Json(progress_of(&restored))).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /validate`
pub async fn validate(State(state): State<Arc<ApiState>>) -> Response {
    match state.session.validate_saved().await {
        Ok(valid) => (StatusCode::OK, Json(ValidateResponse { valid })).into_response(),
        Err(e) => error_response(e),
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
