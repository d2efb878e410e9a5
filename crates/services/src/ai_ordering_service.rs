use std::collections::HashSet;
use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mathquest_core::model::{Question, QuestionId};

use crate::error::AiOrderingError;

#[derive(Clone, Debug)]
pub struct AiOrderingConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl AiOrderingConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("MATHQUEST_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("MATHQUEST_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("MATHQUEST_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Asks a chat-completions model to order practice questions easiest first.
///
/// Content authoring aid only; the progression rules never depend on it.
#[derive(Clone)]
pub struct AiOrderingService {
    client: Client,
    config: Option<AiOrderingConfig>,
}

impl AiOrderingService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(AiOrderingConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<AiOrderingConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Suggest an easiest-first order for `questions`.
    ///
    /// The returned ids are always a permutation of the input ids, whatever
    /// the model answered.
    ///
    /// # Errors
    ///
    /// Returns `AiOrderingError` when the service is disabled, the request fails,
    /// or the response is empty.
    pub async fn suggest_order(
        &self,
        questions: &[Question],
    ) -> Result<Vec<QuestionId>, AiOrderingError> {
        let config = self.config.as_ref().ok_or(AiOrderingError::Disabled)?;
        let ids: Vec<QuestionId> = questions.iter().map(|q| q.id).collect();
        if questions.len() < 2 {
            return Ok(ids);
        }

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: ordering_prompt(questions),
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
            return Err(AiOrderingError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AiOrderingError::EmptyResponse)?;

        let ordered = parse_ordering(&content, &ids);
        info!(questions = ids.len(), "question order suggested");
        Ok(ordered)
    }
}

fn ordering_prompt(questions: &[Question]) -> String {
    let mut prompt = String::from(
        "Order these children's math practice questions from easiest to hardest. \
         Reply with only a JSON array of their ids.\n",
    );
    for question in questions {
        prompt.push_str(&format!(
            "- id {}: [{}] {}\n",
            question.id,
            question.kind.name(),
            question.prompt.as_str()
        ));
    }
    prompt
}

/// Read a JSON id array out of a free-form reply.
///
/// Tolerates prose and code fences around the array and ids given as strings.
/// Unknown and repeated ids are dropped; ids the reply left out are appended
/// in their original order. An unreadable reply yields `known` unchanged.
#[must_use]
pub fn parse_ordering(reply: &str, known: &[QuestionId]) -> Vec<QuestionId> {
    let parsed = extract_array(reply).unwrap_or_else(|| {
        warn!("question ordering reply had no readable id array");
        Vec::new()
    });

    let known_set: HashSet<QuestionId> = known.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut ordered: Vec<QuestionId> = parsed
        .into_iter()
        .filter(|id| known_set.contains(id) && seen.insert(*id))
        .collect();
    ordered.extend(known.iter().copied().filter(|id| !seen.contains(id)));
    ordered
}

fn extract_array(reply: &str) -> Option<Vec<QuestionId>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }
    let values: Vec<serde_json::Value> = serde_json::from_str(&reply[start..=end]).ok()?;
    Some(
        values
            .iter()
            .filter_map(|value| match value {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .map(QuestionId::new)
            .collect(),
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
