use crate::utils::{truncate_chars, watch_url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Longest description kept on a [`VideoRecord`], in characters.
pub const DESCRIPTION_LIMIT: usize = 200;

/// One entry as emitted by the extractor (`yt-dlp -j`).
///
/// Every field is optional; counts arrive as integers, floats, numeric
/// strings or `null` depending on the extractor version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVideoEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub duration: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub like_count: Option<u64>,
}

/// Normalized metadata for a single video.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct VideoRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub views: u64,
    /// Upload date as `YYYYMMDD`; may be empty.
    #[serde(default, deserialize_with = "text_or_empty")]
    pub published: String,
    #[serde(rename = "duration", default, deserialize_with = "lenient_count")]
    pub duration_seconds: Option<u64>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub like_count: u64,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

impl VideoRecord {
    /// Builds a record from an extractor entry. Entries without an id are dropped.
    pub fn from_raw(raw: RawVideoEntry) -> Option<Self> {
        let id = raw.id.filter(|id| !id.trim().is_empty())?;

        Some(VideoRecord {
            title: raw.title,
            url: watch_url(&id),
            views: raw.view_count.unwrap_or(0),
            published: raw.upload_date.unwrap_or_default(),
            duration_seconds: raw.duration,
            description: truncate_chars(&raw.description.unwrap_or_default(), DESCRIPTION_LIMIT),
            thumbnail: raw.thumbnail,
            like_count: raw.like_count.unwrap_or(0),
            channel: raw.uploader,
            channel_id: raw.channel_id,
        })
    }
}

/// Interprets a loosely typed JSON count. Negative and non-numeric values are treated as absent.
fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64)),
        _ => None,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn count_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_count(deserializer)?.unwrap_or(0))
}

fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Opaque handle for one retrieval job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Working,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub status: JobStatus,
    pub percent: u8,
    pub message: String,
}

impl Progress {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn working(percent: u8, message: impl Into<String>) -> Self {
        Progress {
            status: JobStatus::Working,
            percent: percent.min(100),
            message: message.into(),
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Progress {
            status: JobStatus::Done,
            percent: 100,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Progress {
            status: JobStatus::Error,
            percent: 0,
            message: message.into(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Done | JobStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStatus {
    Started,
    Cached,
}

/// Answer to a retrieval request: how it was served and the job to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalTicket {
    pub status: RetrievalStatus,
    pub job_id: JobId,
}

/// A `(token, count)` pair, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount(pub String, pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub average_views: u64,
    pub average_likes: u64,
    pub average_duration_seconds: u64,
    pub average_engagement_ratio: f64,
    pub top_keywords: Vec<KeywordCount>,
    pub average_upload_frequency_days: Option<f64>,
}

/// Analytics for a video set. An empty set serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyticsReport {
    Summary(AnalyticsSummary),
    Empty {},
}

impl Default for AnalyticsReport {
    fn default() -> Self {
        AnalyticsReport::Empty {}
    }
}

impl AnalyticsReport {
    pub fn summary(&self) -> Option<&AnalyticsSummary> {
        match self {
            AnalyticsReport::Summary(summary) => Some(summary),
            AnalyticsReport::Empty {} => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideosRequest {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnalyticsRequest {
    #[serde(default)]
    pub videos: Vec<VideoRecord>,
    #[serde(default)]
    pub channel_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub job_id: JobId,
    pub cancelled: bool,
}
