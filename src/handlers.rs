use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

use crate::analytics::VisitorLog;
use crate::chat::ChatAgent;
use crate::config::Config;
use crate::error::{PortfolioError, Result};
use crate::extract::ValidatedJson;
use crate::gate::{DocumentStore, DownloadGate, DownloadRequest, GateDecision, RejectReason};
use crate::middleware::{client_address, user_agent, UNKNOWN_CLIENT};
use crate::models::{
    ChatRequest, ChatResponse, DownloadParams, ExampleQuestions, RecentParams, RecentVisits,
    VisitRecorded, VisitorCreate, VisitorStats,
};
use crate::response::{HealthResponse, ResumePreview, ServiceInfo};

const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_RECENT_LIMIT: usize = 100;

/// Shared application state
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub gate: DownloadGate,
    pub visitors: VisitorLog,
    pub agent: ChatAgent,
}

// ==================== Service ====================

pub async fn root(State(state): State<SharedState>) -> impl IntoResponse {
    Json(ServiceInfo::new(&state.config.app_name))
}

pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse::new(state.agent.is_configured()))
}

// ==================== Chat ====================

pub async fn chat(
    State(state): State<SharedState>,
    ValidatedJson(payload): ValidatedJson<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let completion = state
        .agent
        .chat(&payload.message, &payload.conversation_history)
        .await?;

    Ok(Json(ChatResponse {
        response: completion.text,
        session_id,
        timestamp: Utc::now(),
        tokens_used: Some(completion.tokens_used),
    }))
}

pub async fn chat_examples(State(state): State<SharedState>) -> impl IntoResponse {
    Json(ExampleQuestions {
        examples: state.agent.example_questions(),
    })
}

// ==================== Analytics ====================

pub async fn record_visit(
    State(state): State<SharedState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<VisitorCreate>,
) -> Result<impl IntoResponse> {
    let address = client_address(
        &headers,
        connect_info.as_ref(),
        state.config.trust_proxy_headers,
    );
    let known_address = (address != UNKNOWN_CLIENT).then_some(address.as_str());

    state.visitors.record(payload, known_address).await;

    Ok(Json(VisitRecorded {
        success: true,
        message: "Visit recorded successfully".to_string(),
    }))
}

pub async fn visitor_stats(State(state): State<SharedState>) -> Json<VisitorStats> {
    Json(state.visitors.stats().await)
}

pub async fn recent_visits(
    State(state): State<SharedState>,
    Query(params): Query<RecentParams>,
) -> Json<RecentVisits> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);

    Json(RecentVisits {
        visits: state.visitors.recent(limit).await,
    })
}

// ==================== Resume ====================

/// Serve the resume to callers that pass the download gate.
pub async fn download_resume(
    State(state): State<SharedState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(params): Query<DownloadParams>,
) -> Result<Response> {
    let client_addr = client_address(
        &headers,
        connect_info.as_ref(),
        state.config.trust_proxy_headers,
    );
    let token = params.token.unwrap_or_default();

    let request = DownloadRequest {
        token: &token,
        client_addr: &client_addr,
        user_agent: user_agent(&headers),
    };

    let descriptor = match state.gate.admit(&request, Utc::now().timestamp_millis()).await {
        GateDecision::Admitted(descriptor) => descriptor,
        GateDecision::Rejected(reason) => return Err(reason.into()),
    };

    let bytes = match state.gate.store().read(&descriptor.path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "Admitted resume could not be read");
            return Err(RejectReason::ResourceMissing.into());
        }
    };

    let disposition = HeaderValue::from_str(&descriptor.content_disposition())
        .map_err(|e| PortfolioError::Internal(format!("invalid content disposition: {e}")))?;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, descriptor.media_type)
        .header(header::CONTENT_DISPOSITION, disposition);
    for (name, value) in descriptor.cache_headers() {
        response = response.header(*name, *value);
    }

    response
        .body(Body::from(bytes))
        .map_err(|e| PortfolioError::Internal(e.to_string()))
}

/// Resume metadata without the file, for link previews and SEO.
pub async fn preview_resume(State(state): State<SharedState>) -> Json<ResumePreview> {
    let config = &state.config;
    let document = state.gate.document();

    Json(ResumePreview {
        available: state.gate.store().exists(&document.path).await,
        filename: document.filename.clone(),
        description: config.resume_description.clone(),
        updated: config.resume_updated.clone(),
        download_info: "Use the 'Download Resume' button on the homepage to get a copy".to_string(),
        download_policy: *state.gate.policy(),
    })
}
