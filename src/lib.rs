pub mod analytics;
pub mod bot_filter;
pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod handlers;
pub mod knowledge;
pub mod middleware;
pub mod models;
pub mod privacy;
pub mod rate_limiter;
pub mod response;
pub mod server;
pub mod token;

pub use config::Config;
pub use error::{PortfolioError, Result};
pub use gate::{DownloadGate, GateDecision, RejectReason};
pub use server::{create_app, Server};
