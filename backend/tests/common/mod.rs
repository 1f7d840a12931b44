#![allow(dead_code)]

use async_trait::async_trait;
use channel_insights::error::SourceError;
use channel_insights::models::{JobId, Progress, RawVideoEntry};
use channel_insights::services::cache::{Clock, TtlCache, DEFAULT_TTL_SECONDS};
use channel_insights::services::coordinator::JobCoordinator;
use channel_insights::services::progress::ProgressBoard;
use channel_insights::services::source::{Listing, VideoSource};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// A source that replays a fixed script of entries.
#[derive(Default)]
pub struct ScriptedSource {
    entries: Vec<Option<RawVideoEntry>>,
    advertised_total: Option<usize>,
    fail_after: Option<(usize, String)>,
    listing_error: Option<String>,
    gate: Option<(usize, Arc<Semaphore>)>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new(entries: Vec<Option<RawVideoEntry>>) -> Self {
        ScriptedSource {
            entries,
            ..Default::default()
        }
    }

    pub fn with_ids(ids: &[&str]) -> Self {
        Self::new(ids.iter().map(|id| Some(entry(id))).collect())
    }

    /// Advertise a different total than the number of scripted entries.
    pub fn advertising(mut self, total: usize) -> Self {
        self.advertised_total = Some(total);
        self
    }

    /// Raise `message` after yielding `count` entries.
    pub fn failing_after(mut self, count: usize, message: &str) -> Self {
        self.fail_after = Some((count, message.to_string()));
        self
    }

    pub fn failing_listing(mut self, message: &str) -> Self {
        self.listing_error = Some(message.to_string());
        self
    }

    /// Pause after `count` entries; each permit added to the returned gate releases one listing.
    pub fn pausing_after(mut self, count: usize) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some((count, gate.clone()));
        (self, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoSource for ScriptedSource {
    async fn list_channel(&self, listing_url: &str, limit: usize) -> Result<Listing, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(listing_url.to_string());

        if let Some(message) = &self.listing_error {
            return Err(SourceError::Other(message.clone()));
        }

        let mut items: Vec<Result<Option<RawVideoEntry>, SourceError>> = self
            .entries
            .iter()
            .take(limit)
            .cloned()
            .map(Ok)
            .collect();
        if let Some((count, message)) = &self.fail_after {
            items.truncate(*count);
            items.push(Err(SourceError::Other(message.clone())));
        }
        let total = self.advertised_total.unwrap_or(self.entries.len().min(limit));

        let entries = match &self.gate {
            Some((count, gate)) => {
                let rest = items.split_off((*count).min(items.len()));
                let gate = gate.clone();
                let pause = stream::once(async move {
                    if let Ok(permit) = gate.acquire().await {
                        permit.forget();
                    }
                })
                .filter_map(
                    |()| async { None::<Result<Option<RawVideoEntry>, SourceError>> },
                );
                stream::iter(items)
                    .chain(pause)
                    .chain(stream::iter(rest))
                    .boxed()
            }
            None => stream::iter(items).boxed(),
        };

        Ok(Listing::new(total, entries))
    }
}

pub fn entry(id: &str) -> RawVideoEntry {
    RawVideoEntry {
        id: Some(id.to_string()),
        title: Some(format!("Video {id}")),
        view_count: Some(100),
        like_count: Some(5),
        upload_date: Some("20240101".to_string()),
        duration: Some(60),
        ..Default::default()
    }
}

pub fn coordinator_with(
    source: Arc<ScriptedSource>,
    clock: Arc<dyn Clock>,
) -> Arc<JobCoordinator> {
    Arc::new(JobCoordinator::new(
        Arc::new(TtlCache::with_clock(DEFAULT_TTL_SECONDS, clock)),
        source,
        Arc::new(ProgressBoard::default()),
    ))
}

/// Poll until the job's progress satisfies `pred`, panicking after two seconds.
pub async fn wait_for_progress<F>(coordinator: &JobCoordinator, job_id: JobId, pred: F) -> Progress
where
    F: Fn(&Progress) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(progress) = coordinator.progress(job_id) {
                if pred(&progress) {
                    return progress;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("progress did not reach the expected state in time")
}
