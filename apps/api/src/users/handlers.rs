use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::insights::orchestrator::{update_user_profile, ProfileUpdateOutcome};
use crate::models::user::{NewUserProfile, User};
use crate::state::AppState;
use crate::users::profile::{ensure_user, get_onboarding_status, ProfileInput};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ProfileUpdateOutcome,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatusResponse {
    pub is_onboarded: bool,
}

/// PUT /api/v1/users/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> Result<Json<ProfileUpdateResponse>, AppError> {
    let Json(input) = payload.map_err(|rejection| {
        warn!("Rejected profile body: {}", rejection.body_text());
        AppError::Validation("Invalid profile data".to_string())
    })?;
    let outcome = update_user_profile(
        state.store.as_ref(),
        state.model.as_ref(),
        user.id(),
        input,
        state.config.profile_tx_timeout(),
        Utc::now(),
    )
    .await?;
    Ok(Json(ProfileUpdateResponse {
        success: true,
        outcome,
    }))
}

/// GET /api/v1/users/onboarding-status
pub async fn handle_onboarding_status(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<OnboardingStatusResponse> {
    let status = get_onboarding_status(state.store.as_ref(), user.id()).await;
    Json(OnboardingStatusResponse {
        is_onboarded: status.is_onboarded(),
    })
}

/// POST /api/v1/users/me
///
/// First-login sync. The body is optional profile data from the identity provider.
pub async fn handle_sync_user(
    State(state): State<AppState>,
    user: CurrentUser,
    profile: Option<Json<NewUserProfile>>,
) -> Result<Json<User>, AppError> {
    let profile = profile.map(|Json(p)| p).unwrap_or_default();
    let synced = ensure_user(state.store.as_ref(), user.id(), &profile).await?;
    Ok(Json(synced))
}
