mod common;

use channel_insights::error::RetrievalError;
use channel_insights::models::{JobStatus, Progress, RawVideoEntry, RetrievalStatus};
use channel_insights::services::analytics::analyze;
use channel_insights::services::cache::{ManualClock, SystemClock};
use common::{coordinator_with, entry, wait_for_progress, ScriptedSource};
use std::sync::Arc;

const CHANNEL: &str = "https://www.youtube.com/@example";

#[tokio::test]
async fn empty_source_completes_with_nothing_cached() {
    let source = Arc::new(ScriptedSource::new(Vec::new()));
    let coordinator = coordinator_with(source.clone(), Arc::new(SystemClock));

    let ticket = coordinator.request_retrieval(CHANNEL);
    assert_eq!(ticket.status, RetrievalStatus::Started);

    let videos = coordinator.await_result(ticket.job_id).await.unwrap();
    assert!(videos.is_empty());
    assert!(analyze(&videos).is_empty());

    let progress = coordinator.progress(ticket.job_id).unwrap();
    assert_eq!(progress, Progress::done("Completed!"));

    let (cached, _) = coordinator.cache().get(CHANNEL).expect("empty result is cached");
    assert!(cached.is_empty());
}

#[tokio::test]
async fn listing_url_points_at_videos_tab() {
    let source = Arc::new(ScriptedSource::with_ids(&["a"]));
    let coordinator = coordinator_with(source.clone(), Arc::new(SystemClock));

    let ticket = coordinator.request_retrieval(CHANNEL);
    coordinator.await_result(ticket.job_id).await.unwrap();

    assert_eq!(
        source.requested_urls(),
        vec!["https://www.youtube.com/@example/videos".to_string()]
    );
    // The cache is keyed by the URL as requested, not the normalized one.
    assert!(coordinator.cache().get(CHANNEL).is_some());
}

#[tokio::test]
async fn failure_mid_listing_leaves_cache_untouched() {
    let ids: Vec<String> = (0..10).map(|i| format!("vid{i}")).collect();
    let entries = ids.iter().map(|id| Some(entry(id))).collect();
    let source = Arc::new(
        ScriptedSource::new(entries)
            .advertising(10)
            .failing_after(3, "HTTP Error 429: Too Many Requests"),
    );
    let coordinator = coordinator_with(source, Arc::new(SystemClock));

    let ticket = coordinator.request_retrieval(CHANNEL);
    let err = coordinator.await_result(ticket.job_id).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Failed(ref m) if m.contains("429")));

    let progress = coordinator.progress(ticket.job_id).unwrap();
    assert_eq!(progress.status, JobStatus::Error);
    assert_eq!(progress.percent, 0);
    assert_eq!(progress.message, "HTTP Error 429: Too Many Requests");

    assert!(coordinator.cache().get(CHANNEL).is_none());
    assert!(coordinator.cache().is_empty());
    assert!(coordinator.latest_result().is_empty());
}

#[tokio::test]
async fn listing_failure_is_reported_as_error_progress() {
    let source = Arc::new(ScriptedSource::default().failing_listing("channel does not exist"));
    let coordinator = coordinator_with(source, Arc::new(SystemClock));

    let ticket = coordinator.request_retrieval(CHANNEL);
    assert!(coordinator.await_result(ticket.job_id).await.is_err());
    assert_eq!(
        coordinator.current_progress(),
        Progress::error("channel does not exist")
    );
}

#[tokio::test]
async fn failed_job_can_be_retried_by_a_new_request() {
    let source = Arc::new(ScriptedSource::default().failing_listing("offline"));
    let coordinator = coordinator_with(source.clone(), Arc::new(SystemClock));

    let first = coordinator.request_retrieval(CHANNEL);
    assert!(coordinator.await_result(first.job_id).await.is_err());

    let second = coordinator.request_retrieval(CHANNEL);
    assert_eq!(second.status, RetrievalStatus::Started);
    assert_ne!(second.job_id, first.job_id);
    assert!(coordinator.await_result(second.job_id).await.is_err());
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn progress_reports_items_seen_so_far() {
    let (source, gate) = ScriptedSource::with_ids(&["a", "b", "c", "d"]).pausing_after(2);
    let source = Arc::new(source);
    let coordinator = coordinator_with(source, Arc::new(SystemClock));

    let ticket = coordinator.request_retrieval(CHANNEL);
    let halfway = wait_for_progress(&coordinator, ticket.job_id, |p| p.percent == 50).await;
    assert_eq!(halfway.status, JobStatus::Working);
    assert_eq!(halfway.message, "Scraped 2/4 videos");
    assert!(coordinator.cache().get(CHANNEL).is_none());

    gate.add_permits(1);
    let videos = coordinator.await_result(ticket.job_id).await.unwrap();
    assert_eq!(videos.len(), 4);
    assert_eq!(coordinator.progress(ticket.job_id), Some(Progress::done("Completed!")));
}

#[tokio::test]
async fn skipped_entries_still_advance_the_count() {
    let entries = vec![
        Some(entry("a")),
        None,
        Some(RawVideoEntry::default()),
        Some(entry("d")),
    ];
    let (source, gate) = ScriptedSource::new(entries).pausing_after(3);
    let coordinator = coordinator_with(Arc::new(source), Arc::new(SystemClock));

    let ticket = coordinator.request_retrieval(CHANNEL);
    // Only entry "a" has been recorded so far; the skipped ones post no update.
    let progress = wait_for_progress(&coordinator, ticket.job_id, |p| p.percent == 25).await;
    assert_eq!(progress.message, "Scraped 1/4 videos");

    gate.add_permits(1);
    let videos = coordinator.await_result(ticket.job_id).await.unwrap();
    let urls: Vec<&str> = videos.iter().map(|v| v.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.youtube.com/watch?v=a",
            "https://www.youtube.com/watch?v=d"
        ]
    );
}

#[tokio::test]
async fn concurrent_requests_share_one_job() {
    let (source, gate) = ScriptedSource::with_ids(&["a", "b"]).pausing_after(1);
    let source = Arc::new(source);
    let coordinator = coordinator_with(source.clone(), Arc::new(SystemClock));

    let first = coordinator.request_retrieval(CHANNEL);
    let second = coordinator.request_retrieval(CHANNEL);
    assert_eq!(first.status, RetrievalStatus::Started);
    assert_eq!(second.status, RetrievalStatus::Started);
    assert_eq!(first.job_id, second.job_id);

    let waiter = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.await_result(second.job_id).await })
    };

    gate.add_permits(1);
    let from_first = coordinator.await_result(first.job_id).await.unwrap();
    let from_second = waiter.await.unwrap().unwrap();
    assert_eq!(from_first, from_second);
    assert_eq!(source.calls(), 1);

    let third = coordinator.request_retrieval(CHANNEL);
    assert_eq!(third.status, RetrievalStatus::Cached);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn different_channels_have_separate_progress() {
    let (source, gate) = ScriptedSource::with_ids(&["a", "b"]).pausing_after(1);
    let source = Arc::new(source);
    let coordinator = coordinator_with(source.clone(), Arc::new(SystemClock));

    let slow = coordinator.request_retrieval("https://www.youtube.com/@slow");
    let other = coordinator.request_retrieval("https://www.youtube.com/@other");
    assert_ne!(slow.job_id, other.job_id);

    wait_for_progress(&coordinator, slow.job_id, |p| p.percent == 50).await;
    wait_for_progress(&coordinator, other.job_id, |p| p.percent == 50).await;

    gate.add_permits(2);

    coordinator.await_result(slow.job_id).await.unwrap();
    coordinator.await_result(other.job_id).await.unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(coordinator.progress(slow.job_id).unwrap().status, JobStatus::Done);
    assert_eq!(coordinator.progress(other.job_id).unwrap().status, JobStatus::Done);
}

#[tokio::test]
async fn cancelled_job_stops_and_caches_nothing() {
    let (source, gate) = ScriptedSource::with_ids(&["a", "b", "c"]).pausing_after(1);
    let source = Arc::new(source);
    let coordinator = coordinator_with(source.clone(), Arc::new(SystemClock));

    let ticket = coordinator.request_retrieval(CHANNEL);
    wait_for_progress(&coordinator, ticket.job_id, |p| p.percent > 0).await;

    assert!(coordinator.cancel(ticket.job_id));
    let err = coordinator.await_result(ticket.job_id).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Cancelled));

    assert_eq!(
        coordinator.progress(ticket.job_id),
        Some(Progress::error("Retrieval cancelled"))
    );
    assert!(coordinator.cache().get(CHANNEL).is_none());
    assert!(!coordinator.cancel(ticket.job_id));

    let retry = coordinator.request_retrieval(CHANNEL);
    assert_ne!(retry.job_id, ticket.job_id);
    gate.add_permits(1);
    let videos = coordinator.await_result(retry.job_id).await.unwrap();
    assert_eq!(videos.len(), 3);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn cached_request_reports_done_and_sets_latest() {
    let source = Arc::new(ScriptedSource::with_ids(&["a", "b"]));
    let coordinator = coordinator_with(source.clone(), Arc::new(SystemClock));

    let first = coordinator.request_retrieval(CHANNEL);
    let videos = coordinator.await_result(first.job_id).await.unwrap();

    let second = coordinator.request_retrieval(CHANNEL);
    assert_eq!(second.status, RetrievalStatus::Cached);
    assert_eq!(
        coordinator.current_progress(),
        Progress::done("Loaded from cache")
    );
    assert_eq!(coordinator.latest_result(), videos);
    assert_eq!(coordinator.await_result(second.job_id).await.unwrap(), videos);
    assert!(!coordinator.cancel(second.job_id));
}

#[tokio::test]
async fn stale_cache_triggers_a_new_retrieval() {
    let clock = Arc::new(ManualClock::new(1_000));
    let source = Arc::new(ScriptedSource::with_ids(&["a"]));
    let coordinator = coordinator_with(source.clone(), clock.clone());

    let first = coordinator.request_retrieval(CHANNEL);
    coordinator.await_result(first.job_id).await.unwrap();

    clock.advance(299);
    assert_eq!(
        coordinator.request_retrieval(CHANNEL).status,
        RetrievalStatus::Cached
    );

    clock.advance(2);
    let refreshed = coordinator.request_retrieval(CHANNEL);
    assert_eq!(refreshed.status, RetrievalStatus::Started);
    coordinator.await_result(refreshed.job_id).await.unwrap();
    assert_eq!(source.calls(), 2);
}
