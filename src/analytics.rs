//! In-memory visitor analytics.
//!
//! Visits are kept in arrival order up to a fixed capacity; once full, the
//! oldest visit is dropped for each new one.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{RecentVisit, VisitorCreate, VisitorStats};
use crate::privacy::{hash_address, truncate_chars};

const RECENT_USER_AGENT_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct Visit {
    pub id: u64,
    pub visit_date: DateTime<Utc>,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub page_visited: String,
}

#[derive(Debug, Default)]
struct VisitLogInner {
    visits: VecDeque<Visit>,
    next_id: u64,
}

#[derive(Debug, Clone)]
pub struct VisitorLog {
    inner: Arc<RwLock<VisitLogInner>>,
    capacity: usize,
}

impl VisitorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(VisitLogInner::default())),
            capacity: capacity.max(1),
        }
    }

    /// Store a page view. The transport address wins over any hash the client
    /// supplied itself.
    pub async fn record(&self, visit: VisitorCreate, client_addr: Option<&str>) -> u64 {
        self.record_at(visit, client_addr, Utc::now()).await
    }

    pub async fn record_at(
        &self,
        visit: VisitorCreate,
        client_addr: Option<&str>,
        visit_date: DateTime<Utc>,
    ) -> u64 {
        let ip_hash = client_addr.map(hash_address).or(visit.ip_hash);

        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;

        if inner.visits.len() >= self.capacity {
            inner.visits.pop_front();
        }
        inner.visits.push_back(Visit {
            id,
            visit_date,
            ip_hash,
            user_agent: visit.user_agent,
            page_visited: visit.page_visited,
        });

        id
    }

    pub async fn stats(&self) -> VisitorStats {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> VisitorStats {
        let inner = self.inner.read().await;
        let since = now - Duration::days(1);

        let unique: HashSet<&str> = inner
            .visits
            .iter()
            .filter_map(|visit| visit.ip_hash.as_deref())
            .filter(|hash| !hash.is_empty())
            .collect();

        VisitorStats {
            total_visitors: unique.len() as u64,
            total_visits: inner.visits.len() as u64,
            recent_visits: inner
                .visits
                .iter()
                .filter(|visit| visit.visit_date >= since)
                .count() as u64,
        }
    }

    /// Newest visits first, with user agents shortened.
    pub async fn recent(&self, limit: usize) -> Vec<RecentVisit> {
        let inner = self.inner.read().await;
        let mut visits: Vec<&Visit> = inner.visits.iter().collect();
        visits.sort_by(|a, b| b.visit_date.cmp(&a.visit_date).then(b.id.cmp(&a.id)));

        visits
            .into_iter()
            .take(limit)
            .map(|visit| RecentVisit {
                page: visit.page_visited.clone(),
                date: visit.visit_date.to_rfc3339(),
                user_agent: visit
                    .user_agent
                    .as_deref()
                    .map(|ua| truncate_chars(ua, RECENT_USER_AGENT_CHARS).to_string()),
            })
            .collect()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.visits.len()
    }
}
