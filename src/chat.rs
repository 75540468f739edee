//! Chat assistant backed by the Gemini `generateContent` REST endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{PortfolioError, Result};
use crate::knowledge::KnowledgeBase;
use crate::models::ChatMessage;

const EXAMPLE_QUESTIONS: [&str; 8] = [
    "What is their background and education?",
    "Which projects best show their engineering depth?",
    "What experience do they have with cloud infrastructure?",
    "What programming languages and technologies do they know?",
    "What types of roles are they seeking?",
    "When are they available to start?",
    "What makes their background unique?",
    "Can they work with legacy systems?",
];

// ==================== Wire format ====================

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub candidates_token_count: Option<u32>,
}

// ==================== Agent ====================

/// Reply text plus the number of output tokens it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

pub struct ChatAgent {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    history_limit: usize,
    system_instruction: String,
}

impl ChatAgent {
    pub fn new(config: &Config, knowledge: &KnowledgeBase) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ai_timeout_secs))
            .build()
            .map_err(|e| PortfolioError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.gemini_api_key.trim().to_string(),
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.gemini_base_url.trim_end_matches('/'),
                config.gemini_model
            ),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            history_limit: config.history_limit,
            system_instruction: build_system_instruction(
                &config.ai_agent_name,
                &config.ai_agent_role,
                knowledge,
            ),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn example_questions(&self) -> Vec<String> {
        EXAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect()
    }

    /// Ask the model `message` in the context of the recent `history`.
    pub async fn chat(&self, message: &str, history: &[ChatMessage]) -> Result<Completion> {
        if !self.is_configured() {
            return Err(PortfolioError::AiUnavailable);
        }

        let request = self.build_request(message, history);
        debug!(contents = request.contents.len(), "Sending chat request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Gemini request failed");
            return Err(PortfolioError::AiService(format!(
                "upstream returned {status}: {}",
                crate::privacy::truncate_chars(&body, 200)
            )));
        }

        let payload: GenerateContentResponse = response.json().await?;
        parse_completion(payload)
    }

    pub fn build_request(&self, message: &str, history: &[ChatMessage]) -> GenerateContentRequest {
        let skip = history.len().saturating_sub(self.history_limit);
        let mut contents: Vec<Content> = history[skip..]
            .iter()
            .map(|msg| Content {
                role: Some(gemini_role(&msg.role).to_string()),
                parts: vec![Part {
                    text: msg.content.clone(),
                }],
            })
            .collect();

        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: message.to_string(),
            }],
        });

        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: self.system_instruction.clone(),
                }],
            },
            contents,
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

fn gemini_role(role: &str) -> &'static str {
    if role == "user" {
        "user"
    } else {
        "model"
    }
}

pub fn parse_completion(payload: GenerateContentResponse) -> Result<Completion> {
    let text: String = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(PortfolioError::AiService(
            "model returned an empty response".to_string(),
        ));
    }

    let tokens_used = payload
        .usage_metadata
        .and_then(|usage| usage.candidates_token_count)
        .unwrap_or_else(|| estimate_tokens(&text));

    Ok(Completion { text, tokens_used })
}

/// Rough output size when the API omits usage data.
fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count() as u64;
    u32::try_from(words * 13 / 10).unwrap_or(u32::MAX)
}

fn build_system_instruction(name: &str, role: &str, knowledge: &KnowledgeBase) -> String {
    format!(
        "You are {name}: {role}.\n\n\
ROLE:\n\
You are professional, helpful, and concise. Give accurate information about the \
person's background, skills, projects, and career interests.\n\n\
GUIDELINES:\n\
1. Use specific details from the knowledge base below\n\
2. If something is not in the knowledge base, say so honestly\n\
3. Highlight the experience relevant to the question asked\n\
4. Be concise but thorough\n\
5. Include project links when relevant\n\n\
KNOWLEDGE BASE:\n{}\n",
        knowledge.all_content()
    )
}
