use axum::{extract::State, Json};
use cron_core::SchedulerStatus;

use super::super::AppState;

pub async fn status(State(state): State<AppState>) -> Json<Vec<SchedulerStatus>> {
    Json(state.schedulers.status())
}
