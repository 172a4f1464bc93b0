//! Language-model assistant: summarize matched incidents for a query.
//!
//! Sends an OpenAI-style chat completion with a Spanish-language prompt
//! listing the matched incidents. An API failure is surfaced as a
//! human-readable error string, never a panic.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use incidesk_shared::{CleanReport, IncideskError, Result};

/// Default chat-completions endpoint.
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Incidents included in the prompt context, at most.
const MAX_CONTEXT_INCIDENTS: usize = 10;

/// Per-incident content truncation, in characters.
const MAX_CONTENT_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "Eres un asistente técnico que analiza incidencias. \
    Proporciona un resumen claro y estructurado con los títulos y contenidos proporcionados.";

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
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
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

/// Options for [`Assistant`].
#[derive(Debug, Clone)]
pub struct AssistantOptions {
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model id, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl AssistantOptions {
    /// Options against the default OpenAI endpoint.
    pub fn new(api_key: String, model: String, max_tokens: u32, temperature: f32) -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            api_key,
            model,
            max_tokens,
            temperature,
        }
    }
}

/// Chat-completion client for incident summaries.
pub struct Assistant {
    client: Client,
    options: AssistantOptions,
}

impl Assistant {
    /// Create a new assistant with the given options.
    pub fn new(options: AssistantOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IncideskError::Assistant(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    /// Summarize the incidents matched for `keyword`.
    ///
    /// With no incidents, returns the "no se encontraron" message without
    /// calling the API.
    pub async fn summarize(&self, keyword: &str, incidents: &[CleanReport]) -> Result<String> {
        if incidents.is_empty() {
            return Ok(format!(
                "No se encontraron incidencias relacionadas con '{keyword}'."
            ));
        }

        let context = build_context(keyword, incidents);
        debug!(keyword, context_len = context.len(), "sending summary request");

        let request = ChatRequest {
            model: self.options.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user",
                    content: context,
                },
            ],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let response = self
            .client
            .post(&self.options.api_url)
            .bearer_auth(&self.options.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| IncideskError::Assistant(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IncideskError::Assistant(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| IncideskError::Assistant(format!("invalid response: {e}")))?;

        let summary = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| IncideskError::Assistant("response contained no choices".into()))?;

        info!(keyword, summary_len = summary.len(), "summary generated");
        Ok(summary)
    }
}

/// Build the Spanish-language user prompt from the matched incidents.
fn build_context(keyword: &str, incidents: &[CleanReport]) -> String {
    let mut context = format!("Consulta: '{keyword}'\n\nIncidencias encontradas:\n\n");

    for (i, incident) in incidents.iter().take(MAX_CONTEXT_INCIDENTS).enumerate() {
        let content = truncate_chars(&incident.content, MAX_CONTENT_CHARS);
        context.push_str(&format!(
            "Incidencia {}:\nTítulo: {}\nContenido Completo: {}...\n\n",
            i + 1,
            incident.title,
            content
        ));
    }

    context
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
