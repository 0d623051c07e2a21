use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// Identity provider's user id.
    pub external_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub industry: Option<String>,
    pub experience: Option<i32>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingState {
    NotOnboarded,
    Onboarded { industry: String },
}

impl OnboardingState {
    pub fn is_onboarded(&self) -> bool {
        matches!(self, Self::Onboarded { .. })
    }
}

impl User {
    pub fn onboarding_state(&self) -> OnboardingState {
        match self.industry.as_deref().map(str::trim) {
            Some(industry) if !industry.is_empty() => OnboardingState::Onboarded {
                industry: industry.to_string(),
            },
            _ => OnboardingState::NotOnboarded,
        }
    }
}

/// Identity details captured the first time a user signs in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserProfile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

/// Normalized onboarding / profile-edit payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub industry: String,
    pub experience: i32,
    pub bio: Option<String>,
    pub skills: Vec<String>,
}
