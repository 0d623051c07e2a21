use axum::{extract::State, Json};
use chrono::Utc;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::insights::orchestrator::get_industry_insights;
use crate::models::insight::IndustryInsight;
use crate::state::AppState;

/// GET /api/v1/insights
pub async fn handle_get_insights(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<IndustryInsight>, AppError> {
    let insight =
        get_industry_insights(state.store.as_ref(), state.model.as_ref(), user.id(), Utc::now())
            .await?;
    Ok(Json(insight))
}
