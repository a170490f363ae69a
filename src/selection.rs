use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::status::SelectionDocument;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Failed to write selection file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode selection: {0}")]
    Json(#[from] serde_json::Error),
}

/// MusicBrainz release candidates the service put up for a choice
/// (`musicbrainz_releases.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleasesDocument {
    pub releases: Vec<Value>,
    pub disc_id: String,
    pub track_count: u64,
}

/// TMDB movie candidates (`tmdb_results.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbResultsDocument {
    pub results: Vec<Value>,
    pub total_results: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualMetadata {
    pub artist: String,
    pub album: String,
    pub year: String,
}

/// Writes the metadata-selection response files the external service
/// consumes. These are the only files in the API directory this system
/// owns; each decision is a single-shot write, and whether the service
/// deletes the file afterwards is its business.
#[derive(Debug, Clone)]
pub struct SelectionWriter {
    api_dir: PathBuf,
}

impl SelectionWriter {
    pub fn new(api_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_dir: api_dir.into(),
        }
    }

    /// Read the MusicBrainz release candidates, if the service published any.
    pub fn musicbrainz_releases(&self) -> Option<ReleasesDocument> {
        read_json(&self.api_dir.join("musicbrainz_releases.json"))
    }

    /// Read the TMDB search results, if the service published any.
    pub fn tmdb_results(&self) -> Option<TmdbResultsDocument> {
        read_json(&self.api_dir.join("tmdb_results.json"))
    }

    /// Confirm a MusicBrainz release choice.
    pub fn select_release(&self, index: i64) -> Result<(), SelectionError> {
        let selection = SelectionDocument {
            status: "confirmed".to_string(),
            selected_index: index,
            confidence: "user_confirmed".to_string(),
            message: "Selected by user".to_string(),
            timestamp: Local::now().to_rfc3339(),
        };
        info!("Writing MusicBrainz selection: index {}", index);
        self.write_json("musicbrainz_selection.json", &selection)
    }

    /// Record manually-entered album metadata when no candidate fits.
    pub fn manual_metadata(&self, metadata: &ManualMetadata) -> Result<(), SelectionError> {
        let document = serde_json::json!({
            "status": "manual",
            "artist": metadata.artist,
            "album": metadata.album,
            "year": metadata.year,
            "timestamp": Local::now().to_rfc3339(),
        });
        info!("Writing manual metadata for {}", metadata.album);
        self.write_json("musicbrainz_manual.json", &document)
    }

    /// Confirm a TMDB movie choice.
    pub fn select_movie(&self, index: i64) -> Result<(), SelectionError> {
        let selection = serde_json::json!({
            "status": "confirmed",
            "selected_index": index,
            "timestamp": Local::now().to_rfc3339(),
        });
        info!("Writing TMDB selection: index {}", index);
        self.write_json("tmdb_selection.json", &selection)
    }

    fn write_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<(), SelectionError> {
        let contents = serde_json::to_string_pretty(value)?;
        std::fs::write(self.api_dir.join(filename), contents)?;
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}
