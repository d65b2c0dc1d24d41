//! In-memory backend for tests, demos, and small corpora.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DeleteFilter, Passage, PassageStore, QueryLog};
use crate::types::RagError;

/// Vec-backed store preserving insertion order, which doubles as the stable
/// tie-break order for ranking.
///
/// Also implements [`QueryLog`], keeping recorded questions inspectable for
/// assertions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    passages: Arc<Mutex<Vec<Passage>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Questions recorded through the [`QueryLog`] implementation.
    pub async fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl PassageStore for MemoryStore {
    async fn insert(&self, passage: Passage) -> Result<(), RagError> {
        self.passages.lock().await.push(passage);
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<Passage>, RagError> {
        Ok(self.passages.lock().await.clone())
    }

    async fn delete_where(&self, filter: DeleteFilter) -> Result<usize, RagError> {
        let mut guard = self.passages.lock().await;
        let before = guard.len();
        guard.retain(|p| !filter.matches(p));
        Ok(before - guard.len())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.passages.lock().await.len())
    }
}

#[async_trait]
impl QueryLog for MemoryStore {
    async fn record(&self, question: &str) -> Result<(), RagError> {
        self.queries.lock().await.push(question.to_string());
        Ok(())
    }
}
