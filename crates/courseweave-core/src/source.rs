//! Completion record sources.
//!
//! The completion log lives outside the engine (a student database in
//! production). The engine only sees the [`CompletionSource`] trait.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use crate::loader::parse_completions_str;
use crate::model::CompletionRecord;

/// Supplies the completion log for one run.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Human-readable source name, used in errors and logs.
    fn name(&self) -> &str;

    /// Fetch every completion record.
    async fn fetch(&self) -> anyhow::Result<Vec<CompletionRecord>>;
}

/// A fixed set of completions held in memory. The default is empty.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCompletions {
    records: Vec<CompletionRecord>,
}

impl InMemoryCompletions {
    pub fn new(records: Vec<CompletionRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl CompletionSource for InMemoryCompletions {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn fetch(&self) -> anyhow::Result<Vec<CompletionRecord>> {
        Ok(self.records.clone())
    }
}

/// Completions read from a JSON array file on each fetch.
#[derive(Debug, Clone)]
pub struct JsonFileCompletions {
    path: PathBuf,
    name: String,
}

impl JsonFileCompletions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl CompletionSource for JsonFileCompletions {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<CompletionRecord>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read completions: {}", self.path.display()))?;
        parse_completions_str(&content, &self.name)
    }
}

/// Several sources fetched concurrently and concatenated in source order.
/// Any failing source fails the whole fetch.
pub struct ChainedCompletions {
    sources: Vec<Box<dyn CompletionSource>>,
}

impl ChainedCompletions {
    pub fn new(sources: Vec<Box<dyn CompletionSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl CompletionSource for ChainedCompletions {
    fn name(&self) -> &str {
        "chained"
    }

    async fn fetch(&self) -> anyhow::Result<Vec<CompletionRecord>> {
        let batches = futures::future::try_join_all(self.sources.iter().map(|source| async move {
            source
                .fetch()
                .await
                .with_context(|| format!("source '{}' failed", source.name()))
        }))
        .await?;
        Ok(batches.into_iter().flatten().collect())
    }
}
