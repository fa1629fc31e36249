use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::AnalysisResult;

/// Keeps recent analyses addressable by id so chat requests can name the
/// result they are asking about.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn save(&self, analysis: AnalysisResult);
    async fn get(&self, id: &str) -> Option<AnalysisResult>;
    /// Drop entries stored more than `max_age` ago; returns how many went.
    async fn evict_older_than(&self, max_age: Duration) -> usize;
}

struct StoredAnalysis {
    analysis: AnalysisResult,
    stored_at: Instant,
}

pub struct InMemoryAnalysisStore {
    analyses: Arc<DashMap<String, StoredAnalysis>>,
}

impl InMemoryAnalysisStore {
    pub fn new() -> Self {
        Self {
            analyses: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }
}

impl Default for InMemoryAnalysisStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn save(&self, analysis: AnalysisResult) {
        self.analyses.insert(
            analysis.analysis_id.clone(),
            StoredAnalysis {
                analysis,
                stored_at: Instant::now(),
            },
        );
    }

    async fn get(&self, id: &str) -> Option<AnalysisResult> {
        self.analyses.get(id).map(|entry| entry.analysis.clone())
    }

    async fn evict_older_than(&self, max_age: Duration) -> usize {
        let before = self.analyses.len();
        self.analyses
            .retain(|_, stored| stored.stored_at.elapsed() < max_age);
        before.saturating_sub(self.analyses.len())
    }
}
