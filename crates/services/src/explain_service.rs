use std::env;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::Question;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ExplainError;

/// Shown when the service answers but produces no text.
pub const EMPTY_FALLBACK: &str = "Sorry, I couldn't generate an explanation at this time.";

/// Shown when the service is unreachable, failing or not configured.
pub const UNAVAILABLE_FALLBACK: &str =
    "AI explanation unavailable. Check your internet connection.";

/// Produces a natural-language explanation for a graded answer.
///
/// Implementations never fail; problems turn into fallback text.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, question: &Question, selected_labels: &[String]) -> String;
}

#[derive(Clone, Debug)]
pub struct ExplanationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl ExplanationConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("QUIZ_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("QUIZ_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("QUIZ_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        let timeout = env::var("QUIZ_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map_or(Duration::from_secs(20), Duration::from_secs);
        Some(Self {
            base_url,
            api_key,
            model,
            timeout,
        })
    }
}

/// Chat-completions client used for "explain this answer".
#[derive(Clone)]
pub struct ExplanationService {
    client: Client,
    config: Option<ExplanationConfig>,
}

impl ExplanationService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ExplanationConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<ExplanationConfig>) -> Self {
        let client = config
            .as_ref()
            .and_then(|c| Client::builder().timeout(c.timeout).build().ok())
            .unwrap_or_default();
        Self { client, config }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Ask the model to explain `question` given the user's picks.
    ///
    /// # Errors
    ///
    /// Returns `ExplainError` when the service is disabled, the request fails,
    /// or the response is empty.
    pub async fn try_explain(
        &self,
        question: &Question,
        selected_labels: &[String],
    ) -> Result<String, ExplainError> {
        let config = self.config.as_ref().ok_or(ExplainError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(question, selected_labels),
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExplainError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ExplainError::EmptyResponse)?;

        Ok(content)
    }
}

#[async_trait]
impl Explainer for ExplanationService {
    async fn explain(&self, question: &Question, selected_labels: &[String]) -> String {
        match self.try_explain(question, selected_labels).await {
            Ok(text) => {
                debug!(question_id = %question.id, len = text.len(), "explanation received");
                text
            }
            Err(err) => {
                warn!(question_id = %question.id, error = %err, "explanation unavailable");
                fallback_for(&err).to_owned()
            }
        }
    }
}

/// Fixed text substituted for a failed explanation.
#[must_use]
pub fn fallback_for(err: &ExplainError) -> &'static str {
    match err {
        ExplainError::EmptyResponse => EMPTY_FALLBACK,
        _ => UNAVAILABLE_FALLBACK,
    }
}

fn build_prompt(question: &Question, selected_labels: &[String]) -> String {
    let correct: Vec<String> = question
        .correct_indices
        .iter()
        .map(ToString::to_string)
        .collect();
    format!(
        "Question: {}\n\
         Options: {}\n\
         Correct Answer Indices: {}\n\
         User selected: {}\n\n\
         Provide a concise, professional explanation of why the correct answers are right \
         and why the incorrect ones are wrong. Make it helpful for a student learning the \
         topic. Keep it under 100 words.",
        question.text,
        question.options.join(", "),
        correct.join(", "),
        selected_labels.join(", "),
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
