//! Admission control for the resume download.
//!
//! A request passes through four checks in a fixed order: token freshness,
//! per-address rate limit, user agent, and resource presence. The first
//! failing check decides the rejection reason, so a caller that fails
//! several checks always sees the earliest one.

use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::bot_filter;
use crate::privacy::{hash_address, truncate_chars};
use crate::rate_limiter::RateLimiter;
use crate::token;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Response headers that forbid any intermediary or browser caching.
pub const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("cache-control", "no-cache, no-store, must-revalidate"),
    ("pragma", "no-cache"),
    ("expires", "0"),
];

const LOGGED_ADDRESS_HASH_LEN: usize = 16;
const LOGGED_USER_AGENT_CHARS: usize = 50;

/// Why a download was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Invalid or expired token. Please refresh the page and try again.")]
    InvalidToken,
    #[error("Too many downloads from this address. Please try again later.")]
    RateLimited { retry_after: Duration },
    #[error("Automated access not allowed. Please use a web browser.")]
    AutomatedClient,
    #[error("Resume not found. Please contact me directly.")]
    ResourceMissing,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::InvalidToken => "invalid_token",
            RejectReason::RateLimited { .. } => "rate_limited",
            RejectReason::AutomatedClient => "automated_client",
            RejectReason::ResourceMissing => "resource_missing",
        }
    }
}

/// What the transport layer needs to serve an admitted download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub path: PathBuf,
    pub filename: String,
    pub media_type: &'static str,
}

impl ResourceDescriptor {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.filename)
    }

    pub fn cache_headers(&self) -> &'static [(&'static str, &'static str)] {
        &NO_CACHE_HEADERS
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admitted(ResourceDescriptor),
    Rejected(RejectReason),
}

/// Limits applied by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadPolicy {
    pub max_downloads: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    #[serde(with = "humantime_serde")]
    pub token_max_age: Duration,
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            max_downloads: 3,
            window: Duration::from_secs(3600),
            token_max_age: Duration::from_millis(3_600_000),
        }
    }
}

impl DownloadPolicy {
    fn token_max_age_ms(&self) -> i64 {
        i64::try_from(self.token_max_age.as_millis()).unwrap_or(i64::MAX)
    }
}

/// The protected file: where it lives and the name offered to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedDocument {
    pub path: PathBuf,
    pub filename: String,
}

/// Storage the gate checks before admitting and the handler reads from after.
pub trait DocumentStore: Send + Sync {
    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;

    fn read(&self, path: &Path) -> impl Future<Output = std::io::Result<Vec<u8>>> + Send;
}

/// Documents on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentStore;

impl DocumentStore for FsDocumentStore {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// One download attempt as seen by the gate.
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub token: &'a str,
    pub client_addr: &'a str,
    pub user_agent: &'a str,
}

pub struct DownloadGate<S = FsDocumentStore> {
    limiter: RateLimiter,
    policy: DownloadPolicy,
    document: ProtectedDocument,
    store: S,
}

impl<S: DocumentStore> DownloadGate<S> {
    pub fn new(policy: DownloadPolicy, document: ProtectedDocument, store: S) -> Self {
        Self {
            limiter: RateLimiter::new(),
            policy,
            document,
            store,
        }
    }

    pub fn policy(&self) -> &DownloadPolicy {
        &self.policy
    }

    pub fn document(&self) -> &ProtectedDocument {
        &self.document
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Decide whether `request` may download the document at `now_millis`.
    pub async fn admit(&self, request: &DownloadRequest<'_>, now_millis: i64) -> GateDecision {
        match self.evaluate(request, now_millis).await {
            Ok(descriptor) => {
                let address_hash = hash_address(request.client_addr);
                let user_agent = request.user_agent.to_lowercase();
                info!(
                    ip_hash = %&address_hash[..LOGGED_ADDRESS_HASH_LEN],
                    user_agent = %truncate_chars(&user_agent, LOGGED_USER_AGENT_CHARS),
                    "Resume download admitted"
                );
                GateDecision::Admitted(descriptor)
            }
            Err(reason) => {
                debug!(reason = reason.code(), "Resume download rejected");
                GateDecision::Rejected(reason)
            }
        }
    }

    async fn evaluate(
        &self,
        request: &DownloadRequest<'_>,
        now_millis: i64,
    ) -> Result<ResourceDescriptor, RejectReason> {
        self.check_token(request.token, now_millis)?;

        self.limiter
            .check_and_record(
                request.client_addr,
                self.policy.max_downloads,
                self.policy.window,
            )
            .map_err(|limited| RejectReason::RateLimited {
                retry_after: limited.retry_after,
            })?;

        if bot_filter::is_automated(request.user_agent) {
            return Err(RejectReason::AutomatedClient);
        }

        if !self.store.exists(&self.document.path).await {
            return Err(RejectReason::ResourceMissing);
        }

        Ok(ResourceDescriptor {
            path: self.document.path.clone(),
            filename: self.document.filename.clone(),
            media_type: PDF_MEDIA_TYPE,
        })
    }

    fn check_token(&self, token: &str, now_millis: i64) -> Result<(), RejectReason> {
        let issued_at = token::decode(token).map_err(|_| RejectReason::InvalidToken)?;

        match now_millis.checked_sub(issued_at) {
            Some(age) if (0..=self.policy.token_max_age_ms()).contains(&age) => Ok(()),
            _ => Err(RejectReason::InvalidToken),
        }
    }
}
