use crate::models::{JobId, Progress};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

pub const DEFAULT_HISTORY_LIMIT: usize = 64;

#[derive(Default)]
struct Board {
    jobs: HashMap<JobId, Progress>,
    order: VecDeque<JobId>,
    latest: Option<JobId>,
}

/// Progress of every known retrieval job, keyed by job id.
///
/// The most recently registered job also backs the "current progress" view.
/// Finished jobs beyond the history limit are dropped oldest-first.
pub struct ProgressBoard {
    inner: RwLock<Board>,
    history_limit: usize,
}

impl ProgressBoard {
    pub fn new(history_limit: usize) -> Self {
        ProgressBoard {
            inner: RwLock::new(Board::default()),
            history_limit: history_limit.max(1),
        }
    }

    /// Track a new job. Returns the ids of finished jobs evicted to make room.
    pub fn register(&self, job_id: JobId, progress: Progress) -> Vec<JobId> {
        let mut board = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        board.jobs.insert(job_id, progress);
        board.order.push_back(job_id);
        board.latest = Some(job_id);

        let mut evicted = Vec::new();
        while board.jobs.len() > self.history_limit {
            let Some(pos) = board.order.iter().position(|id| {
                *id != job_id && board.jobs.get(id).is_some_and(Progress::is_finished)
            }) else {
                break;
            };
            if let Some(old) = board.order.remove(pos) {
                board.jobs.remove(&old);
                evicted.push(old);
            }
        }
        evicted
    }

    /// Record new progress for a job.
    ///
    /// While a job is working its percent never goes backwards; a finished
    /// job keeps its final state.
    pub fn update(&self, job_id: JobId, progress: Progress) {
        let mut board = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = board.jobs.get_mut(&job_id) else {
            return;
        };
        if current.is_finished() {
            return;
        }

        let mut progress = progress;
        if current.status == progress.status && progress.percent < current.percent {
            progress.percent = current.percent;
        }
        *current = progress;
    }

    pub fn get(&self, job_id: JobId) -> Option<Progress> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .get(&job_id)
            .cloned()
    }

    /// Progress of the most recently started job, or idle if there is none.
    pub fn current(&self) -> Progress {
        let board = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        board
            .latest
            .and_then(|id| board.jobs.get(&id).cloned())
            .unwrap_or_else(Progress::idle)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProgressBoard {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
