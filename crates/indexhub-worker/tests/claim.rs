//! Claiming: at most one winner per job, FIFO among eligible jobs.

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;

use indexhub_database::memory::MemoryJobStore;
use indexhub_entity::job::JobStatus;
use indexhub_worker::{EnqueueOptions, JobQueue};

use indexhub_core::traits::{Clock, ManualClock};

fn queue() -> (Arc<JobQueue>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let queue = Arc::new(JobQueue::new(Arc::new(MemoryJobStore::new()), clock.clone(), 5));
    (queue, clock)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_have_exactly_one_winner() {
    let (queue, _) = queue();
    let job_id = queue.enqueue("embed_content", json!({"item_id": 42})).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let queue = Arc::clone(&queue);
        tasks.push(tokio::spawn(async move {
            queue.claim_next(&format!("runner-{i}")).await.unwrap()
        }));
    }

    let mut winners = Vec::new();
    for task in tasks {
        if let Some(job) = task.await.unwrap() {
            winners.push(job);
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].id, job_id);

    let job = queue.get(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert!(job.locked);
    assert_eq!(job.runner_id, winners[0].runner_id);
}

#[tokio::test]
async fn test_claims_follow_id_order() {
    let (queue, _) = queue();
    let first = queue.enqueue("embed_content", json!({"item_id": 1})).await.unwrap();
    let second = queue.enqueue("embed_content", json!({"item_id": 2})).await.unwrap();

    assert_eq!(queue.claim_next("r").await.unwrap().unwrap().id, first);
    assert_eq!(queue.claim_next("r").await.unwrap().unwrap().id, second);
    assert!(queue.claim_next("r").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delayed_job_is_skipped_until_due() {
    let (queue, clock) = queue();
    let delayed = queue
        .enqueue_with(
            "embed_content",
            json!({"item_id": 1}),
            EnqueueOptions {
                max_attempts: None,
                run_after: Some(clock.now() + Duration::minutes(10)),
            },
        )
        .await
        .unwrap()
        .job_id;
    let ready = queue.enqueue("embed_content", json!({"item_id": 2})).await.unwrap();

    assert_eq!(queue.claim_next("r").await.unwrap().unwrap().id, ready);
    assert!(queue.claim_next("r").await.unwrap().is_none());

    clock.advance(Duration::minutes(10));
    assert_eq!(queue.claim_next("r").await.unwrap().unwrap().id, delayed);
}
