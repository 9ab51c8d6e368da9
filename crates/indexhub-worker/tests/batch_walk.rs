//! The self-resubmitting `reindex_all` chain and its cooldown gate.

mod common;

use serde_json::{Value, json};

use indexhub_core::types::PageRequest;
use indexhub_entity::job::{Job, JobStatus};
use indexhub_worker::JobHandler;
use indexhub_worker::jobs::{REINDEX_ALL_COOLDOWN, ReindexAllHandler};

use common::{FakeIndexer, FakeSource, Harness};

fn handler(h: &Harness) -> ReindexAllHandler {
    ReindexAllHandler::new(
        h.service.queue().clone(),
        h.source.clone(),
        h.service.cooldown().clone(),
    )
}

fn walk(offset: u64, force: bool) -> Value {
    json!({"item_types": [], "batch_size": 2, "offset": offset, "force": force})
}

async fn jobs_of_type(h: &Harness, job_type: &str) -> Vec<Job> {
    let page = h
        .service
        .queue()
        .list_jobs(None, &PageRequest::new(500, 0))
        .await
        .unwrap();
    let mut jobs: Vec<Job> = page
        .items
        .into_iter()
        .filter(|job| job.job_type == job_type)
        .collect();
    jobs.sort_by_key(|job| job.id);
    jobs
}

async fn continuation_at(h: &Harness, offset: u64) -> Job {
    jobs_of_type(h, "reindex_all")
        .await
        .into_iter()
        .find(|job| job.payload["offset"] == json!(offset))
        .unwrap_or_else(|| panic!("no continuation at offset {offset}"))
}

#[tokio::test]
async fn test_chain_walks_every_page_then_stops() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3]), FakeIndexer::succeeding());
    let handler = handler(&h);
    let queue = h.service.queue();

    let start = queue.enqueue("reindex_all", walk(0, true)).await.unwrap();
    let first = queue.get(start).await.unwrap();
    handler.execute(&first).await.unwrap();

    assert_eq!(jobs_of_type(&h, "reindex_item").await.len(), 2);
    let second = continuation_at(&h, 2).await;
    assert_eq!(second.payload["force"], json!(true));

    handler.execute(&second).await.unwrap();
    assert_eq!(jobs_of_type(&h, "reindex_item").await.len(), 3);
    let third = continuation_at(&h, 4).await;

    let result = handler.execute(&third).await.unwrap().unwrap();
    assert_eq!(result["finished"], json!(true));

    let items: Vec<i64> = jobs_of_type(&h, "reindex_item")
        .await
        .iter()
        .filter_map(|job| job.target_id)
        .collect();
    assert_eq!(items, vec![1, 2, 3]);
    assert_eq!(jobs_of_type(&h, "reindex_all").await.len(), 3);
}

#[tokio::test]
async fn test_chain_runs_to_completion_through_worker() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3]), FakeIndexer::succeeding());
    let queue = h.service.queue();
    queue.enqueue("reindex_all", walk(0, true)).await.unwrap();

    let report = h.service.runner().run_cycle(50).await.unwrap();
    assert_eq!(report.processed, 6);
    assert_eq!(report.failed, 0);

    let stats = queue.get_queue_stats().await.unwrap();
    assert_eq!(stats.completed, 6);
    assert_eq!(stats.queued, 0);
    for id in 1..=3 {
        assert_eq!(h.indexer.calls_for(id), 1);
    }
}

#[tokio::test]
async fn test_cooldown_turns_second_start_into_noop() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3]), FakeIndexer::succeeding());
    let handler = handler(&h);
    let queue = h.service.queue();

    let start = queue.enqueue("reindex_all", walk(0, false)).await.unwrap();
    let job = queue.get(start).await.unwrap();

    handler.execute(&job).await.unwrap();
    let after_first = queue.get_queue_stats().await.unwrap();
    assert_eq!(after_first.queued, 4);
    assert!(
        h.service
            .cooldown()
            .last_run(REINDEX_ALL_COOLDOWN)
            .await
            .unwrap()
            .is_some()
    );

    let result = handler.execute(&job).await.unwrap().unwrap();
    assert_eq!(result["skipped"], json!("cooldown"));
    assert_eq!(queue.get_queue_stats().await.unwrap(), after_first);
}

#[tokio::test]
async fn test_force_ignores_cooldown() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3]), FakeIndexer::succeeding());
    let handler = handler(&h);
    let queue = h.service.queue();
    h.service.cooldown().record(REINDEX_ALL_COOLDOWN).await.unwrap();

    let start = queue.enqueue("reindex_all", walk(0, true)).await.unwrap();
    handler.execute(&queue.get(start).await.unwrap()).await.unwrap();

    assert_eq!(jobs_of_type(&h, "reindex_item").await.len(), 2);
    continuation_at(&h, 2).await;
}

#[tokio::test]
async fn test_continuations_are_not_gated() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3]), FakeIndexer::succeeding());
    let handler = handler(&h);
    let queue = h.service.queue();
    h.service.cooldown().record(REINDEX_ALL_COOLDOWN).await.unwrap();

    let mid = queue.enqueue("reindex_all", walk(2, false)).await.unwrap();
    handler.execute(&queue.get(mid).await.unwrap()).await.unwrap();

    assert_eq!(jobs_of_type(&h, "reindex_item").await.len(), 1);
    continuation_at(&h, 4).await;
}

#[tokio::test]
async fn test_zero_batch_size_is_malformed() {
    let h = Harness::new(FakeSource::with_items(&[1]), FakeIndexer::succeeding());
    let queue = h.service.queue();
    let job_id = queue
        .enqueue_with(
            "reindex_all",
            json!({"batch_size": 0}),
            indexhub_worker::EnqueueOptions {
                max_attempts: Some(1),
                run_after: None,
            },
        )
        .await
        .unwrap()
        .job_id;

    h.service.runner().run_cycle(5).await.unwrap();
    assert_eq!(queue.get(job_id).await.unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn test_full_reindex_request_uses_configured_batch() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3]), FakeIndexer::succeeding());
    let job_id = h.service.enqueue_full_reindex(false).await.unwrap();

    let job = h.service.queue().get(job_id).await.unwrap();
    assert_eq!(job.payload["offset"], json!(0));
    assert_eq!(job.payload["batch_size"], json!(50));
    assert_eq!(job.payload["force"], json!(false));
}
