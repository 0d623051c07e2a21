//! Insight Generator: prompt → model → repair → normalize.
//!
//! One model call per invocation. Transport retries belong to the client.

use thiserror::Error;
use tracing::{info, warn};

use crate::insights::normalize::{default_insight_fields, normalize};
use crate::insights::prompts::INSIGHT_PROMPT_TEMPLATE;
use crate::insights::repair::{repair_to_object, NonJsonContent};
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::insight::InsightFields;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Insight generation failed: {0}")]
    GenerationFailed(#[from] LlmError),

    #[error(transparent)]
    NonJsonContent(#[from] NonJsonContent),
}

pub fn build_insight_prompt(industry: &str) -> String {
    INSIGHT_PROMPT_TEMPLATE.replace("{industry}", industry)
}

pub async fn generate_insights(
    model: &dyn TextGenerator,
    industry: &str,
) -> Result<InsightFields, InsightError> {
    let prompt = build_insight_prompt(industry);
    let raw = model.generate_content(&prompt).await?;

    let candidate = repair_to_object(&raw).map_err(|e| {
        warn!(
            "Unrecoverable model output for '{}': {:?}",
            industry,
            raw.chars().take(120).collect::<String>()
        );
        e
    })?;

    info!("Generated insights for '{industry}'");
    Ok(normalize(&candidate))
}

/// Generation with the fixed-default fallback used wherever a missing row must be filled.
pub async fn generate_or_default(model: &dyn TextGenerator, industry: &str) -> InsightFields {
    match generate_insights(model, industry).await {
        Ok(fields) => fields,
        Err(e) => {
            warn!("Falling back to default insights for '{industry}': {e}");
            default_insight_fields()
        }
    }
}
