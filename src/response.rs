use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::gate::DownloadPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub ai_service: bool,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    /// The API stays up without an AI key, but chat is unavailable.
    pub fn new(ai_service: bool) -> Self {
        Self {
            status: if ai_service {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ai_service,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

impl ServiceInfo {
    pub fn new(name: &str) -> Self {
        let endpoints = BTreeMap::from([
            ("health", "/health"),
            ("chat", "/api/chat"),
            ("examples", "/api/chat/examples"),
            ("analytics", "/api/analytics/stats"),
            ("resume", "/api/resume/preview"),
        ]);

        Self {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "operational".to_string(),
            endpoints,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResumePreview {
    pub available: bool,
    pub filename: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated: String,
    pub download_info: String,
    pub download_policy: DownloadPolicy,
}
