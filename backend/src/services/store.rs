//! JSON file persistence for the channel registry and saved analytics.

use crate::error::StoreError;
use crate::models::{AnalyticsReport, ChannelEntry};
use crate::utils::channel_name_from_url;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

async fn read_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    // Write next to the target and rename so readers never see a partial file.
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Ordered list of registered channels.
pub struct ChannelRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ChannelRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ChannelRegistry {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> Result<Vec<ChannelEntry>, StoreError> {
        let _guard = self.lock.lock().await;
        read_json(&self.path).await
    }

    /// Register `url` unless it is already present. Returns the updated list.
    pub async fn add(&self, url: &str) -> Result<Vec<ChannelEntry>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut channels: Vec<ChannelEntry> = read_json(&self.path).await?;

        if !channels.iter().any(|c| c.url == url) {
            let entry = ChannelEntry {
                name: channel_name_from_url(url),
                url: url.to_string(),
            };
            info!("Registering channel {} ({})", entry.name, entry.url);
            channels.push(entry);
            write_json(&self.path, &channels).await?;
        }
        Ok(channels)
    }

    /// Remove every entry with `url`. Returns the updated list.
    pub async fn remove(&self, url: &str) -> Result<Vec<ChannelEntry>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut channels: Vec<ChannelEntry> = read_json(&self.path).await?;

        channels.retain(|c| c.url != url);
        info!("Removed channel {url}");
        write_json(&self.path, &channels).await?;
        Ok(channels)
    }
}

/// Channel URL -> last computed analytics.
pub struct AnalyticsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AnalyticsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AnalyticsStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub async fn load_all(&self) -> Result<BTreeMap<String, AnalyticsReport>, StoreError> {
        let _guard = self.lock.lock().await;
        read_json(&self.path).await
    }

    pub async fn get(&self, channel_url: &str) -> Result<Option<AnalyticsReport>, StoreError> {
        Ok(self.load_all().await?.remove(channel_url))
    }

    pub async fn save(&self, channel_url: &str, report: &AnalyticsReport) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut all: BTreeMap<String, AnalyticsReport> = read_json(&self.path).await?;
        all.insert(channel_url.to_string(), report.clone());
        write_json(&self.path, &all).await?;
        info!("Saved analytics for {channel_url}");
        Ok(())
    }
}
