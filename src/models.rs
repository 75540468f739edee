use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ==================== Chat ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user` or `assistant`
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000, message = "message must be 1 to 2000 characters"))]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub tokens_used: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ExampleQuestions {
    pub examples: Vec<String>,
}

// ==================== Analytics ====================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VisitorCreate {
    #[serde(default)]
    #[validate(length(max = 64))]
    pub ip_hash: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[validate(length(min = 1, max = 255, message = "page_visited must be 1 to 255 characters"))]
    pub page_visited: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorStats {
    pub total_visitors: u64,
    pub total_visits: u64,
    pub recent_visits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentVisit {
    pub page: String,
    pub date: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecentVisits {
    pub visits: Vec<RecentVisit>,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct VisitRecorded {
    pub success: bool,
    pub message: String,
}

// ==================== Resume ====================

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    #[serde(default)]
    pub token: Option<String>,
}
