use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::user::{NewUserProfile, OnboardingState, ProfileUpdate, User};
use crate::store::{InsertOutcome, InsightStore};

/// Raw onboarding / profile form as the client sends it. Every field accepts any
/// JSON value; `normalize` coerces what it can and falls back otherwise.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    pub industry: Option<Value>,
    pub experience: Option<ExperienceInput>,
    pub bio: Option<Value>,
    pub skills: Option<SkillsInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExperienceInput {
    Years(f64),
    Text(String),
    Other(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillsInput {
    List(Vec<Value>),
    /// Comma-separated, e.g. `"Rust, SQL"`.
    Csv(String),
    Other(Value),
}

impl ProfileInput {
    pub fn normalize(self) -> Result<ProfileUpdate, AppError> {
        let industry = self
            .industry
            .as_ref()
            .and_then(scalar_text)
            .map(|i| i.trim().to_string())
            .unwrap_or_default();
        if industry.is_empty() {
            return Err(AppError::Validation("industry is required".to_string()));
        }

        let experience = match self.experience {
            Some(ExperienceInput::Years(years)) if years.is_finite() => years.trunc() as i32,
            Some(ExperienceInput::Text(text)) => leading_integer(&text).unwrap_or(0),
            _ => 0,
        };

        let bio = self
            .bio
            .as_ref()
            .and_then(scalar_text)
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        let skills: Vec<String> = match self.skills {
            Some(SkillsInput::List(list)) => list.iter().filter_map(scalar_text).collect(),
            Some(SkillsInput::Csv(csv)) => csv.split(',').map(str::to_string).collect(),
            Some(SkillsInput::Other(_)) | None => vec![],
        };
        let skills = skills
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(ProfileUpdate {
            industry,
            experience,
            bio,
            skills,
        })
    }
}

/// Text form of a JSON scalar. `null`, arrays and objects have none.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parses the integer prefix of `text` ("5 years" → 5), ignoring leading whitespace.
fn leading_integer(text: &str) -> Option<i32> {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i32>().ok().map(|n| sign * n)
}

/// Never fails: lookup errors are logged and reported as not onboarded so the
/// client does not loop on redirects.
pub async fn get_onboarding_status(
    store: &dyn InsightStore,
    user_id: Option<&str>,
) -> OnboardingState {
    let Some(external_id) = user_id else {
        return OnboardingState::NotOnboarded;
    };

    match store.find_user(external_id).await {
        Ok(Some(user)) => user.onboarding_state(),
        Ok(None) => OnboardingState::NotOnboarded,
        Err(e) => {
            error!("Error checking onboarding status for {external_id}: {e}");
            OnboardingState::NotOnboarded
        }
    }
}

/// Returns the signed-in user's row, creating it on first sign-in.
pub async fn ensure_user(
    store: &dyn InsightStore,
    user_id: Option<&str>,
    profile: &NewUserProfile,
) -> Result<User, AppError> {
    let external_id = user_id.ok_or(AppError::Unauthorized)?;

    if let Some(user) = store.find_user(external_id).await? {
        return Ok(user);
    }

    match store.create_user(external_id, profile).await? {
        InsertOutcome::Inserted(user) => {
            info!("Created user {} for identity {external_id}", user.id);
            Ok(user)
        }
        InsertOutcome::AlreadyExists => store.find_user(external_id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "user {external_id} vanished after a concurrent create"
            ))
        }),
    }
}
