use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::analytics::VisitorLog;
use crate::chat::ChatAgent;
use crate::config::Config;
use crate::error::{PortfolioError, Result};
use crate::gate::{DownloadGate, FsDocumentStore};
use crate::handlers::{
    chat, chat_examples, download_resume, health_check, preview_resume, recent_visits,
    record_visit, root, visitor_stats, AppState, SharedState,
};
use crate::knowledge::KnowledgeBase;
use crate::middleware::logging_middleware;

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let knowledge = KnowledgeBase::load_dir(&config.knowledge_dir)?;
        let agent = ChatAgent::new(&config, &knowledge)?;
        let gate = DownloadGate::new(
            config.download_policy(),
            config.protected_document(),
            FsDocumentStore,
        );
        let visitors = VisitorLog::new(config.max_visits);

        Ok(Self {
            config,
            gate,
            visitors,
            agent,
        })
    }
}

/// Build the application router for `config`.
pub fn create_app(config: Config) -> Result<Router> {
    let state = Arc::new(AppState::new(config)?);
    router(state)
}

fn router(state: SharedState) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.cors_origins()?))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        // Chat endpoints
        .route("/api/chat", post(chat))
        .route("/api/chat/", post(chat))
        .route("/api/chat/examples", get(chat_examples))
        // Analytics endpoints
        .route("/api/analytics/visit", post(record_visit))
        .route("/api/analytics/stats", get(visitor_stats))
        .route("/api/analytics/recent", get(recent_visits))
        // Resume endpoints
        .route("/api/resume/download", get(download_resume))
        .route("/api/resume/preview", get(preview_resume))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(logging_middleware)),
        );

    Ok(app)
}

pub struct Server {
    app: Router,
    state: SharedState,
    bind_addr: SocketAddr,
}

impl Server {
    pub fn new(config: Config) -> Result<Self> {
        let bind_addr = config.bind_addr;
        let state = Arc::new(AppState::new(config)?);
        let app = router(state.clone())?;

        Ok(Self {
            app,
            state,
            bind_addr,
        })
    }

    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        info!("Portfolio API listening on {}", self.bind_addr);
        info!(
            ai_service = self.state.agent.is_configured(),
            resume = %self.state.config.resume_path.display(),
            "Service ready"
        );

        let purge = tokio::spawn(purge_expired_windows(
            self.state.clone(),
            self.state.config.cleanup_interval(),
        ));

        // Run server with graceful shutdown
        let served = axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        purge.abort();
        served.map_err(PortfolioError::from)
    }
}

/// Periodically drop rate limit windows that have run out.
async fn purge_expired_windows(state: SharedState, every: Duration) {
    let mut interval = tokio::time::interval(every);
    let window = state.gate.policy().window;

    loop {
        interval.tick().await;
        let removed = state.gate.limiter().purge_expired(window);
        if removed > 0 {
            debug!(
                removed,
                tracked = state.gate.limiter().tracked_keys(),
                "Purged expired download windows"
            );
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
