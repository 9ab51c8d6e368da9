//! Cursor-driven bulk indexing.

mod common;

use indexhub_core::error::ErrorKind;
use indexhub_worker::bulk::TickOutcome;

use common::{FakeIndexer, FakeSource, Harness};

#[tokio::test]
async fn test_walk_advances_until_empty_page() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3, 4, 5]), FakeIndexer::succeeding());
    let bulk = h.service.bulk();

    assert_eq!(bulk.tick().await.unwrap(), TickOutcome::Idle);
    bulk.start(2, None).await.unwrap();

    assert_eq!(
        bulk.tick().await.unwrap(),
        TickOutcome::Advanced { indexed: 2, failed: 0, offset: 2 }
    );
    assert_eq!(
        bulk.tick().await.unwrap(),
        TickOutcome::Advanced { indexed: 2, failed: 0, offset: 4 }
    );
    assert_eq!(
        bulk.tick().await.unwrap(),
        TickOutcome::Advanced { indexed: 1, failed: 0, offset: 5 }
    );
    assert_eq!(
        bulk.tick().await.unwrap(),
        TickOutcome::Finished { total_processed: 5 }
    );
    assert_eq!(bulk.tick().await.unwrap(), TickOutcome::Idle);

    let progress = bulk.status().await.unwrap().unwrap();
    assert!(progress.finished);
    assert!(!progress.running);
    assert!(progress.last_run.is_some());
    assert_eq!(h.indexer.total_calls(), 5);
}

#[tokio::test]
async fn test_walk_stops_at_max_total() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3, 4, 5]), FakeIndexer::succeeding());
    let bulk = h.service.bulk();
    bulk.start(2, Some(3)).await.unwrap();

    bulk.tick().await.unwrap();
    assert_eq!(
        bulk.tick().await.unwrap(),
        TickOutcome::Finished { total_processed: 3 }
    );
    assert_eq!(h.indexer.calls_for(3), 1);
    assert_eq!(h.indexer.calls_for(4), 0);
}

#[tokio::test]
async fn test_stop_and_resume_keep_offset() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3, 4]), FakeIndexer::succeeding());
    let bulk = h.service.bulk();
    bulk.start(2, None).await.unwrap();
    bulk.tick().await.unwrap();

    let stopped = bulk.stop().await.unwrap();
    assert_eq!(stopped.offset, 2);
    assert_eq!(bulk.tick().await.unwrap(), TickOutcome::Idle);

    bulk.resume().await.unwrap();
    assert_eq!(
        bulk.tick().await.unwrap(),
        TickOutcome::Advanced { indexed: 2, failed: 0, offset: 4 }
    );
    assert_eq!(h.indexer.calls_for(1), 1);
}

#[tokio::test]
async fn test_rejected_items_are_counted_not_retried() {
    let h = Harness::new(FakeSource::with_items(&[1, 2]), FakeIndexer::failing());
    let bulk = h.service.bulk();
    bulk.start(5, None).await.unwrap();

    assert_eq!(
        bulk.tick().await.unwrap(),
        TickOutcome::Advanced { indexed: 0, failed: 2, offset: 2 }
    );
}

#[tokio::test]
async fn test_items_added_ahead_of_cursor_are_picked_up() {
    let h = Harness::new(FakeSource::with_items(&[1, 2, 3]), FakeIndexer::succeeding());
    let bulk = h.service.bulk();
    bulk.start(2, None).await.unwrap();
    bulk.tick().await.unwrap();

    h.source.push(10);
    assert_eq!(
        bulk.tick().await.unwrap(),
        TickOutcome::Advanced { indexed: 2, failed: 0, offset: 4 }
    );
    assert_eq!(h.indexer.calls_for(10), 1);
}

#[tokio::test]
async fn test_control_errors() {
    let h = Harness::new(FakeSource::default(), FakeIndexer::succeeding());
    let bulk = h.service.bulk();

    assert_eq!(bulk.stop().await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(bulk.start(0, None).await.unwrap_err().kind, ErrorKind::Validation);

    bulk.start(10, None).await.unwrap();
    assert!(matches!(
        bulk.tick().await.unwrap(),
        TickOutcome::Finished { total_processed: 0 }
    ));
    assert_eq!(bulk.resume().await.unwrap_err().kind, ErrorKind::Conflict);
}
