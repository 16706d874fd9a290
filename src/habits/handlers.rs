use axum::{extract::State, Json};
use tracing::{error, instrument};

use crate::{auth::services::AuthUser, error::ApiError, state::AppState};

use super::dto::CreateHabitRequest;
use super::repo::Habit;

#[instrument(skip(state, body))]
pub async fn create_habit(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateHabitRequest>,
) -> Result<Json<Habit>, ApiError> {
    let habit = state
        .habits
        .create(user_id, &body.name)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "create_habit failed");
            ApiError::BadRequest("Failed to create habit")
        })?;
    Ok(Json(habit))
}

#[instrument(skip(state))]
pub async fn list_habits(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Habit>>, ApiError> {
    let habits = state.habits.list_by_user(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "list_habits failed");
        ApiError::BadRequest("Failed to get habits")
    })?;
    Ok(Json(habits))
}
