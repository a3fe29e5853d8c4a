use axum::extract::State;
use axum::http::StatusCode;

use crate::application::error::AppError;
use crate::infra::error::InfraError;

use super::super::state::ApiState;

pub async fn database(State(state): State<ApiState>) -> Result<StatusCode, AppError> {
    state
        .health
        .ping()
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
