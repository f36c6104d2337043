//! Snapshot storage under the media root

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

/// Writes uploaded snapshots to disk
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    /// Store under `root`, served at `url_prefix`
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Media root directory
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Store a snapshot; returns its path relative to the media root
    /// (`detections/YYYY/MM/DD/<uuid>.<ext>`)
    pub async fn save(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, std::io::Error> {
        let relative = format!(
            "detections/{}/{}.{}",
            now.format("%Y/%m/%d"),
            Uuid::new_v4(),
            extension(file_name)
        );
        let path = self.root.join(&relative);

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Snapshot stored");
        Ok(relative)
    }

    /// Public URL path for a stored snapshot
    pub fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix, relative)
    }
}

fn extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".into())
}
