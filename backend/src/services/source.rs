//! Retrieval source adapters.
//!
//! A [`VideoSource`] turns a channel listing URL into a bounded, ordered
//! sequence of raw entries. Entries that could not be resolved come through
//! as `None`; an `Err` item aborts the listing.

use crate::error::SourceError;
use crate::models::RawVideoEntry;
use crate::utils::watch_url;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, warn};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Default number of entries requested per channel.
pub const DEFAULT_PLAYLIST_END: usize = 20;

pub type EntryStream = BoxStream<'static, Result<Option<RawVideoEntry>, SourceError>>;

/// A channel listing: how many entries to expect and the entries themselves.
pub struct Listing {
    pub total: usize,
    pub entries: EntryStream,
}

impl Listing {
    pub fn new(total: usize, entries: EntryStream) -> Self {
        Listing { total, entries }
    }

    pub fn empty() -> Self {
        Listing::new(0, stream::empty().boxed())
    }
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    /// List at most `limit` entries for the channel's videos page.
    async fn list_channel(&self, listing_url: &str, limit: usize) -> Result<Listing, SourceError>;
}

/// Pulls metadata by running `yt-dlp`.
///
/// The listing is a flat pass over the videos page; each listed id is then
/// resolved with its own extractor call so one broken video (premiere,
/// members-only, removed) only drops that entry.
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    program: Arc<str>,
}

impl YtDlpSource {
    pub fn new(program: impl Into<String>) -> Self {
        YtDlpSource {
            program: Arc::from(program.into()),
        }
    }

    async fn list_ids(&self, listing_url: &str, limit: usize) -> Result<Vec<String>, SourceError> {
        let output = Command::new(&*self.program)
            .arg("--flat-playlist")
            .arg("--ignore-errors")
            .arg("--no-warnings")
            .arg("--playlist-end")
            .arg(limit.to_string())
            .arg("--print")
            .arg("id")
            .arg(listing_url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| SourceError::Launch {
                program: self.program.to_string(),
                source,
            })?;

        let ids: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(limit)
            .map(String::from)
            .collect();

        if !output.status.success() && ids.is_empty() {
            return Err(SourceError::Extraction {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(ids)
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

async fn resolve_entry(program: Arc<str>, video_id: String) -> Result<Option<RawVideoEntry>, SourceError> {
    let output = Command::new(&*program)
        .arg("--dump-json")
        .arg("--skip-download")
        .arg("--no-warnings")
        .arg(watch_url(&video_id))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| SourceError::Launch {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        warn!(
            "Skipping video {video_id}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Ok(None);
    }

    match serde_json::from_slice::<RawVideoEntry>(&output.stdout) {
        Ok(entry) => Ok(Some(entry)),
        Err(e) => {
            warn!("Skipping video {video_id}: unreadable metadata ({e})");
            Ok(None)
        }
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    async fn list_channel(&self, listing_url: &str, limit: usize) -> Result<Listing, SourceError> {
        let ids = self.list_ids(listing_url, limit).await?;
        debug!("Listed {} videos for {listing_url}", ids.len());

        let program = self.program.clone();
        let total = ids.len();
        let entries = stream::iter(ids)
            .then(move |id| resolve_entry(program.clone(), id))
            .boxed();

        Ok(Listing::new(total, entries))
    }
}
