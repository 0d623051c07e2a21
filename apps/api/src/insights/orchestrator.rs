//! Upsert Orchestrator: keeps exactly one insight row per industry.
//!
//! Two entry points:
//! - `get_industry_insights`: dashboard read path (read → create or repair).
//! - `update_user_profile`: profile edit, one transaction covering the insight
//!   insert and the user update.
//!
//! The unique key on `industry` is the only concurrency guard. A lost insert race
//! comes back as `InsertOutcome::AlreadyExists` and the caller re-reads.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::insights::generator::generate_or_default;
use crate::llm_client::TextGenerator;
use crate::models::insight::IndustryInsight;
use crate::models::user::{OnboardingState, ProfileUpdate, User};
use crate::store::{InsertOutcome, InsightStore, StoreError};
use crate::users::profile::ProfileInput;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateOutcome {
    pub updated_user: User,
    pub industry_insight: IndustryInsight,
}

/// Read-or-create for the signed-in user's industry.
pub async fn get_industry_insights(
    store: &dyn InsightStore,
    model: &dyn TextGenerator,
    user_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<IndustryInsight, AppError> {
    let external_id = user_id.ok_or(AppError::Unauthorized)?;
    let user = store
        .find_user(external_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let industry = match user.onboarding_state() {
        OnboardingState::Onboarded { industry } => industry,
        OnboardingState::NotOnboarded => return Err(AppError::NotOnboarded),
    };

    match store.find_insight(&industry).await? {
        Some(existing) if existing.needs_repair() => {
            info!("Repairing stored insight for '{industry}'");
            let patched = IndustryInsight {
                fields: existing.fields.clone().repaired(),
                ..existing
            };
            Ok(store.update_insight(&patched).await?)
        }
        Some(existing) => Ok(existing),
        None => {
            let fields = generate_or_default(model, &industry).await;
            let candidate = IndustryInsight::new(&industry, fields, now);
            match store.insert_insight(&candidate).await? {
                InsertOutcome::Inserted(created) => {
                    info!("Created insight for '{industry}'");
                    Ok(created)
                }
                InsertOutcome::AlreadyExists => {
                    info!("Insight for '{industry}' was created concurrently; re-reading");
                    store
                        .find_insight(&industry)
                        .await?
                        .ok_or_else(|| missing_after_conflict(&industry).into())
                }
            }
        }
    }
}

/// Update-and-ensure for the profile form. Either both the insight (when new) and the
/// user row are written, or neither is.
pub async fn update_user_profile(
    store: &dyn InsightStore,
    model: &dyn TextGenerator,
    user_id: Option<&str>,
    input: ProfileInput,
    tx_timeout: Duration,
    now: DateTime<Utc>,
) -> Result<ProfileUpdateOutcome, AppError> {
    let external_id = user_id.ok_or(AppError::Unauthorized)?;
    let user = match store.find_user(external_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AppError::UserNotFound),
        Err(e) => {
            error!("ERROR updating user and industry: {e}");
            return Err(AppError::ProfileUpdateFailed);
        }
    };
    let update = input.normalize()?;

    let work = ensure_insight_and_update_user(store, model, user.id, &update, now);
    match tokio::time::timeout(tx_timeout, work).await {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => {
            error!("ERROR updating user and industry: {e}");
            Err(AppError::ProfileUpdateFailed)
        }
        Err(_) => {
            error!(
                "ERROR updating user and industry: transaction exceeded {}s",
                tx_timeout.as_secs()
            );
            Err(AppError::ProfileUpdateFailed)
        }
    }
}

async fn ensure_insight_and_update_user(
    store: &dyn InsightStore,
    model: &dyn TextGenerator,
    user_id: Uuid,
    update: &ProfileUpdate,
    now: DateTime<Utc>,
) -> Result<ProfileUpdateOutcome, StoreError> {
    let mut tx = store.begin().await?;

    let industry_insight = match tx.find_insight(&update.industry).await? {
        Some(existing) => existing,
        None => {
            let fields = generate_or_default(model, &update.industry).await;
            let candidate = IndustryInsight::new(&update.industry, fields, now);
            match tx.insert_insight(&candidate).await? {
                InsertOutcome::Inserted(created) => created,
                InsertOutcome::AlreadyExists => tx
                    .find_insight(&update.industry)
                    .await?
                    .ok_or_else(|| missing_after_conflict(&update.industry))?,
            }
        }
    };

    let updated_user = tx.update_user_profile(user_id, update).await?;
    tx.commit().await?;

    info!(
        "Updated profile for user {} (industry '{}')",
        user_id, update.industry
    );

    Ok(ProfileUpdateOutcome {
        updated_user,
        industry_insight,
    })
}

fn missing_after_conflict(industry: &str) -> StoreError {
    StoreError::NotFound(format!("insight '{industry}' after insert conflict"))
}
