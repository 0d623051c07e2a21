//! Test doubles shared across module tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{LlmError, TextGenerator};

/// A `TextGenerator` that replays a fixed reply and records every prompt.
pub struct ScriptedModel {
    reply: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if the API were down.
    pub fn failing() -> Self {
        Self {
            reply: None,
            ..Self::replying("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedModel {
    async fn generate_content(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().ok_or(LlmError::Api {
            status: 503,
            message: "model unavailable".to_string(),
        })
    }
}

/// A well-formed model reply for a software industry.
pub const SOFTWARE_INSIGHT_REPLY: &str = r#"```json
{
  "salaryRanges": [
    {"role": "Backend Engineer", "min": 110000, "median": 140000, "max": 185000, "location": "US"},
    {"role": "Frontend Engineer", "min": 95000, "median": 125000, "max": 165000, "location": "US"},
    {"role": "SRE", "min": 120000, "median": 150000, "max": 195000, "location": "US"},
    {"role": "Data Engineer", "min": 105000, "median": 135000, "max": 175000, "location": "US"},
    {"role": "Engineering Manager", "min": 150000, "median": 185000, "max": 240000, "location": "US"}
  ],
  "growthRate": 8.5,
  "demandLevel": "High",
  "topSkills": ["Rust", "Go", "Kubernetes", "PostgreSQL", "AWS"],
  "marketOutlook": "Positive",
  "keyTrends": ["AI-assisted coding", "Platform engineering", "Memory-safe languages", "FinOps", "Edge compute"],
  "recommendedSkills": ["Distributed systems", "Observability", "Security"]
}
```"#;
