//! Retrieval job coordination.
//!
//! A retrieval request is served from the [`TtlCache`] when possible;
//! otherwise a background task pulls the channel from the [`VideoSource`],
//! reporting per-job progress on the [`ProgressBoard`] and caching the full
//! result once the listing is exhausted.
//!
//! Requests for a channel that already has a job in flight join that job
//! instead of starting a second one. Every job can be cancelled through its
//! [`JobId`]; cancellation is observed between entries.

use crate::error::RetrievalError;
use crate::models::{JobId, Progress, RetrievalStatus, RetrievalTicket, VideoRecord};
use crate::services::cache::TtlCache;
use crate::services::progress::ProgressBoard;
use crate::services::source::{Listing, VideoSource, DEFAULT_PLAYLIST_END};
use crate::utils::{ceil_percent, normalize_channel_url};
use futures::StreamExt;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const MSG_FROM_CACHE: &str = "Loaded from cache";
const MSG_STARTING: &str = "Starting scrape...";
const MSG_COMPLETED: &str = "Completed!";
const MSG_ABANDONED: &str = "retrieval task ended without a result";

/// Final state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(Vec<VideoRecord>),
    Failed(String),
    Cancelled,
}

#[derive(Clone)]
struct JobHandle {
    channel: String,
    cancel: CancellationToken,
    outcome: watch::Receiver<Option<JobOutcome>>,
}

pub struct JobCoordinator {
    cache: Arc<TtlCache>,
    source: Arc<dyn VideoSource>,
    progress: Arc<ProgressBoard>,
    jobs: Mutex<HashMap<JobId, JobHandle>>,
    in_flight: Mutex<HashMap<String, JobId>>,
    latest: RwLock<Vec<VideoRecord>>,
    playlist_end: usize,
}

impl JobCoordinator {
    pub fn new(
        cache: Arc<TtlCache>,
        source: Arc<dyn VideoSource>,
        progress: Arc<ProgressBoard>,
    ) -> Self {
        JobCoordinator {
            cache,
            source,
            progress,
            jobs: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            latest: RwLock::new(Vec::new()),
            playlist_end: DEFAULT_PLAYLIST_END,
        }
    }

    /// Cap on entries requested from the source per job.
    pub fn with_playlist_end(mut self, playlist_end: usize) -> Self {
        self.playlist_end = playlist_end;
        self
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Start (or reuse) a retrieval for `channel`. Never waits on the source.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_retrieval(self: &Arc<Self>, channel: &str) -> RetrievalTicket {
        // Held across the cache check so a finishing job cannot slip between
        // "not cached" and "not in flight".
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((videos, age)) = self.cache.get(channel) {
            info!("Serving {} cached videos for {channel} ({age}s old)", videos.len());
            let job_id = JobId::new();
            let (_tx, outcome) = watch::channel(Some(JobOutcome::Completed(videos.clone())));
            self.track(
                job_id,
                JobHandle {
                    channel: channel.to_string(),
                    cancel: CancellationToken::new(),
                    outcome,
                },
                Progress::done(MSG_FROM_CACHE),
            );
            self.set_latest(videos);
            return RetrievalTicket {
                status: RetrievalStatus::Cached,
                job_id,
            };
        }

        if let Some(job_id) = in_flight.get(channel) {
            info!("Joining in-flight retrieval {job_id} for {channel}");
            return RetrievalTicket {
                status: RetrievalStatus::Started,
                job_id: *job_id,
            };
        }

        let job_id = JobId::new();
        let cancel = CancellationToken::new();
        let (tx, outcome) = watch::channel(None);
        self.track(
            job_id,
            JobHandle {
                channel: channel.to_string(),
                cancel: cancel.clone(),
                outcome,
            },
            Progress::working(0, MSG_STARTING),
        );
        in_flight.insert(channel.to_string(), job_id);
        drop(in_flight);

        info!("Starting retrieval {job_id} for {channel}");
        let coordinator = Arc::clone(self);
        let channel = channel.to_string();
        tokio::spawn(async move {
            coordinator.run_job(job_id, channel, cancel, tx).await;
        });

        RetrievalTicket {
            status: RetrievalStatus::Started,
            job_id,
        }
    }

    /// Request cancellation. Returns `false` for unknown or already finished jobs.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = jobs.get(&job_id) else {
            return false;
        };
        if handle.outcome.borrow().is_some() {
            return false;
        }
        info!("Cancelling retrieval {job_id} for {}", handle.channel);
        handle.cancel.cancel();
        true
    }

    pub fn progress(&self, job_id: JobId) -> Option<Progress> {
        self.progress.get(job_id)
    }

    /// Progress of the most recently requested job.
    pub fn current_progress(&self) -> Progress {
        self.progress.current()
    }

    /// Videos of the last job that finished successfully (or was served from cache).
    pub fn latest_result(&self) -> Vec<VideoRecord> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait for a job to finish and return its videos.
    pub async fn await_result(&self, job_id: JobId) -> Result<Vec<VideoRecord>, RetrievalError> {
        let mut outcome = {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            jobs.get(&job_id)
                .map(|handle| handle.outcome.clone())
                .ok_or(RetrievalError::UnknownJob(job_id))?
        };

        let finished = match outcome.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };

        match finished {
            Some(JobOutcome::Completed(videos)) => Ok(videos),
            Some(JobOutcome::Failed(message)) => Err(RetrievalError::Failed(message)),
            Some(JobOutcome::Cancelled) => Err(RetrievalError::Cancelled),
            None => Err(RetrievalError::Failed(MSG_ABANDONED.to_string())),
        }
    }

    fn track(&self, job_id: JobId, handle: JobHandle, progress: Progress) {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(job_id, handle);
        for evicted in self.progress.register(job_id, progress) {
            jobs.remove(&evicted);
        }
    }

    fn set_latest(&self, videos: Vec<VideoRecord>) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = videos;
    }

    async fn run_job(
        self: Arc<Self>,
        job_id: JobId,
        channel: String,
        cancel: CancellationToken,
        outcome_tx: watch::Sender<Option<JobOutcome>>,
    ) {
        let guard = InFlightGuard {
            coordinator: &*self,
            channel: &channel,
            job_id,
        };
        let outcome = match self.scrape(job_id, &channel, &cancel).await {
            Ok(videos) => {
                info!("Retrieval {job_id} finished with {} videos", videos.len());
                self.cache.put(&channel, videos.clone());
                self.set_latest(videos.clone());
                self.progress.update(job_id, Progress::done(MSG_COMPLETED));
                JobOutcome::Completed(videos)
            }
            Err(RetrievalError::Cancelled) => {
                warn!("Retrieval {job_id} for {channel} was cancelled");
                self.progress
                    .update(job_id, Progress::error(RetrievalError::Cancelled.to_string()));
                JobOutcome::Cancelled
            }
            Err(e) => {
                error!("Retrieval {job_id} for {channel} failed: {e}");
                let message = e.to_string();
                self.progress.update(job_id, Progress::error(message.clone()));
                JobOutcome::Failed(message)
            }
        };

        drop(guard);
        outcome_tx.send_replace(Some(outcome));
    }

    async fn scrape(
        &self,
        job_id: JobId,
        channel: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<VideoRecord>, RetrievalError> {
        let listing_url = normalize_channel_url(channel);

        let Listing { total, mut entries } = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RetrievalError::Cancelled),
            listing = self.source.list_channel(&listing_url, self.playlist_end) => listing?,
        };

        let mut videos = Vec::with_capacity(total);
        let mut index = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetrievalError::Cancelled),
                next = entries.next() => next,
            };
            let Some(entry) = next else {
                break;
            };
            index += 1;

            let Some(record) = entry?.and_then(VideoRecord::from_raw) else {
                continue;
            };
            videos.push(record);
            self.progress.update(
                job_id,
                Progress::working(
                    ceil_percent(index, total),
                    format!("Scraped {index}/{total} videos"),
                ),
            );
        }

        Ok(videos)
    }
}

/// Releases a channel's in-flight slot when its job task ends, including by panic.
struct InFlightGuard<'a> {
    coordinator: &'a JobCoordinator,
    channel: &'a str,
    job_id: JobId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .coordinator
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if in_flight.get(self.channel) == Some(&self.job_id) {
            in_flight.remove(self.channel);
        }
        drop(in_flight);
        // No-op for jobs that already reached done or error.
        self.coordinator
            .progress
            .update(self.job_id, Progress::error(MSG_ABANDONED));
    }
}
