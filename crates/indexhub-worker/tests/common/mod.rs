//! Shared fixtures for worker integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use indexhub_core::config::{AppConfig, DatabaseConfig};
use indexhub_core::result::AppResult;
use indexhub_core::traits::{ContentIndexer, ContentSource, ManualClock};
use indexhub_core::types::ContentItem;
use indexhub_database::memory::{MemoryJobStore, MemoryStateStore};
use indexhub_worker::{WorkerDeps, WorkerService};

/// Content source over a fixed list of items.
#[derive(Debug, Default)]
pub struct FakeSource {
    items: Mutex<Vec<ContentItem>>,
}

impl FakeSource {
    pub fn with_items(ids: &[i64]) -> Self {
        Self {
            items: Mutex::new(ids.iter().map(|id| ContentItem::new(*id, "post")).collect()),
        }
    }

    pub fn push(&self, id: i64) {
        self.items.lock().unwrap().push(ContentItem::new(id, "post"));
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn fetch_page(
        &self,
        item_types: &[String],
        offset: u64,
        limit: u32,
    ) -> AppResult<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item_types.is_empty() || item_types.contains(&item.item_type))
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn exists(&self, item_id: i64) -> AppResult<bool> {
        Ok(self.items.lock().unwrap().iter().any(|item| item.id == item_id))
    }
}

/// Indexer that records calls and answers with a fixed outcome.
#[derive(Debug)]
pub struct FakeIndexer {
    succeed: bool,
    calls: Mutex<HashMap<i64, u32>>,
}

impl FakeIndexer {
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls_for(&self, item_id: i64) -> u32 {
        self.calls.lock().unwrap().get(&item_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn record(&self, item_id: i64) -> bool {
        *self.calls.lock().unwrap().entry(item_id).or_default() += 1;
        self.succeed
    }
}

#[async_trait]
impl ContentIndexer for FakeIndexer {
    async fn embed(&self, item_id: i64) -> AppResult<bool> {
        Ok(self.record(item_id))
    }

    async fn reindex(&self, item_id: i64) -> AppResult<bool> {
        Ok(self.record(item_id))
    }
}

/// Configuration with deterministic backoff.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig {
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_seconds: 1,
            idle_timeout_seconds: 1,
        },
        worker: Default::default(),
        admission: Default::default(),
        indexer: Default::default(),
        logging: Default::default(),
    };
    config.worker.backoff.jitter = false;
    config.indexer.item_types = vec![];
    config
}

/// A fully wired service over in-memory stores.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub jobs: Arc<MemoryJobStore>,
    pub state: Arc<MemoryStateStore>,
    pub source: Arc<FakeSource>,
    pub indexer: Arc<FakeIndexer>,
    pub service: WorkerService,
}

impl Harness {
    pub fn new(source: FakeSource, indexer: FakeIndexer) -> Self {
        Self::with_config(test_config(), source, indexer)
    }

    pub fn with_config(config: AppConfig, source: FakeSource, indexer: FakeIndexer) -> Self {
        Self::try_with_config(config, source, indexer).expect("test config is valid")
    }

    pub fn try_with_config(
        config: AppConfig,
        source: FakeSource,
        indexer: FakeIndexer,
    ) -> AppResult<Self> {
        let clock = Arc::new(ManualClock::starting_now());
        let jobs = Arc::new(MemoryJobStore::new());
        let state = Arc::new(MemoryStateStore::new());
        let source = Arc::new(source);
        let indexer = Arc::new(indexer);

        let service = WorkerService::new(
            config,
            WorkerDeps {
                jobs: jobs.clone(),
                state: state.clone(),
                source: source.clone(),
                indexer: indexer.clone(),
                clock: clock.clone(),
            },
        )?;

        Ok(Self {
            clock,
            jobs,
            state,
            source,
            indexer,
            service,
        })
    }
}
