use crate::ranker::{ScoreModel, SCORE_MAX, SCORE_MIN};
use crate::summarizer::SummaryModel;
use crate::types::{DigestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

// Keep scoring prompts inside typical context limits.
const MAX_PROMPT_CHARS: usize = 6000;

/// Thin chat-completions adapter implementing both model capabilities.
/// Temperature 0 keeps scoring reproducible for identical inputs.
pub struct OpenAiModel {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiModel {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create HTTP client");
        Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Build from `OPENAI_API_KEY` if it is set.
    pub fn from_env() -> Option<Self> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(Self::new)
    }

    async fn chat(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };
        let response: ChatResponse = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DigestError::Model("chat response contained no choices".to_string()))
    }
}

#[async_trait]
impl ScoreModel for OpenAiModel {
    async fn score(&self, text: &str) -> Result<f64> {
        let excerpt = truncate_chars(text, MAX_PROMPT_CHARS);
        let prompt = format!(
            "Rate the importance of the following news story on a scale from {} to {}, \
             where {} means a routine local item and {} means a major event with wide impact. \
             Respond with a single number and nothing else.\n\n{}",
            SCORE_MIN as i64, SCORE_MAX as i64, SCORE_MIN as i64, SCORE_MAX as i64, excerpt
        );
        let reply = self.chat(prompt).await?;
        reply
            .trim()
            .parse::<f64>()
            .map(|s| s.clamp(SCORE_MIN, SCORE_MAX))
            .map_err(|_| DigestError::Model(format!("unparseable score reply: {:?}", reply)))
    }
}

#[async_trait]
impl SummaryModel for OpenAiModel {
    async fn generate_summary(&self, category: &str, items: &[(String, String)]) -> Result<String> {
        let mut prompt = format!(
            "You are a news digest writer. Summarize the following {} stories into one \
             concise paragraph of about 120 words for a reader who has not followed the \
             news this week. Highlight only the most important and impactful events and \
             weave them into a coherent narrative.\n\n",
            category
        );
        for (title, text) in items {
            prompt.push_str(&format!(
                "- {}:\n{}\n\n",
                title,
                truncate_chars(text, MAX_PROMPT_CHARS / items.len().max(1))
            ));
        }
        debug!(category, stories = items.len(), "requesting category summary");
        self.chat(prompt).await
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: String,
}

/// Deterministic offline model used when no API key is configured and by
/// tests. Scoring is a monotonic function of text length; summaries are
/// extractive.
pub struct HeuristicModel;

#[async_trait]
impl ScoreModel for HeuristicModel {
    async fn score(&self, text: &str) -> Result<f64> {
        let words = text.split_whitespace().count();
        Ok(((words.min(400) as f64) / 400.0) * SCORE_MAX)
    }
}

#[async_trait]
impl SummaryModel for HeuristicModel {
    async fn generate_summary(&self, _category: &str, items: &[(String, String)]) -> Result<String> {
        let parts: Vec<String> = items
            .iter()
            .map(|(title, text)| format!("{}: {}", title, first_sentence(text)))
            .collect();
        Ok(parts.join(" "))
    }
}

fn first_sentence(text: &str) -> String {
    match text.find('.') {
        Some(idx) => text[..=idx].trim().to_string(),
        None => truncate_chars(text, 160).trim().to_string(),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
