use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Coarse lifecycle state of the current or most recent copy operation,
/// as reported by the disk2iso background service in `status.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    Idle,
    Waiting,
    Copying,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl Default for LifecycleStatus {
    fn default() -> Self {
        LifecycleStatus::Idle
    }
}

/// Medium type reported in `attributes.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscType {
    #[serde(rename = "audio-cd")]
    AudioCd,
    #[serde(rename = "dvd-video")]
    DvdVideo,
    #[serde(rename = "bd-video")]
    BdVideo,
    #[serde(rename = "data")]
    Data,
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl Default for DiscType {
    fn default() -> Self {
        DiscType::Unknown
    }
}

/// `status.json`: overwritten by the service whenever its lifecycle state
/// changes. An absent file is a valid state and reads as idle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusDocument {
    pub status: LifecycleStatus,
    pub timestamp: String,
}

/// `attributes.json`: describes the currently-inserted medium. Rewritten
/// each time a new disc is detected, stale between discs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributesDocument {
    pub disc_label: String,
    pub disc_type: DiscType,
    pub disc_size_mb: u64,
    pub filename: String,
    pub method: String,
    pub container_type: String,
    pub error_message: Option<String>,
    /// Only present for audio CDs, where progress is counted in tracks.
    pub total_tracks: Option<u64>,
}

/// `progress.json`: rewritten frequently while a copy is active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressDocument {
    pub percent: u64,
    pub copied_mb: u64,
    pub total_mb: u64,
    pub eta: String,
    pub timestamp: String,
}

/// Selection side-channel document (`musicbrainz_selection.json` and
/// friends). Written by us on a user decision, but also written by the
/// service to signal that it is blocked waiting for one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionDocument {
    pub status: String,
    pub selected_index: i64,
    pub confidence: String,
    pub message: String,
    pub timestamp: String,
}

/// Sentinel the service writes into the selection document while blocked
/// on a user choice.
pub const WAITING_USER_INPUT: &str = "waiting_user_input";

/// The "total" column of a copy operation, tagged with its unit. Audio CDs
/// count tracks, everything else counts megabytes; the substitution lives
/// here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalValue {
    Megabytes(u64),
    Tracks(u64),
}

impl TotalValue {
    pub fn for_disc(attributes: &AttributesDocument, progress: &ProgressDocument) -> Self {
        if attributes.disc_type == DiscType::AudioCd {
            match attributes.total_tracks {
                Some(tracks) => TotalValue::Tracks(tracks),
                None => TotalValue::Megabytes(progress.total_mb),
            }
        } else {
            TotalValue::Megabytes(progress.total_mb)
        }
    }

    pub fn amount(&self) -> u64 {
        match *self {
            TotalValue::Megabytes(mb) => mb,
            TotalValue::Tracks(tracks) => tracks,
        }
    }
}

/// One merged, display-ready snapshot of the three status documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveStatus {
    pub status: LifecycleStatus,
    pub timestamp: String,
    pub disc_label: String,
    pub disc_type: DiscType,
    pub disc_size_mb: u64,
    pub progress_percent: u64,
    pub progress_mb: u64,
    pub total_mb: u64,
    pub eta: String,
    pub filename: String,
    pub method: String,
    pub error_message: Option<String>,
}

/// Fixed English labels for the derived status text.
pub mod labels {
    pub const SERVICE_STOPPED: &str = "Service stopped";
    pub const WAITING_SELECTION: &str = "Waiting for user selection...";
    pub const NO_DRIVE: &str = "No drive detected";
    pub const WAITING_MEDIA: &str = "Waiting for media...";
    pub const ANALYZING: &str = "Analyzing media...";
    pub const COPYING: &str = "Copying...";
    pub const COMPLETED: &str = "Completed";
    pub const ERROR: &str = "Error occurred";
    pub const UNKNOWN: &str = "Unknown";
}

/// Reads the JSON documents the disk2iso service drops into its API
/// directory and merges them into one consistent view.
///
/// The backing files are shared with an independently-scheduled writer and
/// carry no locking, so every read is a best-effort snapshot: a file that
/// is missing, mid-write, or otherwise unparsable degrades to the default
/// document for its type. Nothing in here returns an error.
#[derive(Debug, Clone)]
pub struct StatusAggregator {
    api_dir: PathBuf,
}

impl StatusAggregator {
    pub fn new(api_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_dir: api_dir.into(),
        }
    }

    pub fn api_dir(&self) -> &Path {
        &self.api_dir
    }

    /// Read one API document, substituting the default on any failure.
    fn read_document<T>(&self, filename: &str) -> T
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let path = self.api_dir.join(filename);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("{} not readable ({}), using defaults", filename, e);
                return T::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("{} contains invalid JSON ({}), using defaults", filename, e);
                T::default()
            }
        }
    }

    /// Read one optional API document, `None` on any failure. Used for the
    /// side-channel files whose absence is the common case.
    fn read_optional<T>(&self, filename: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let contents = std::fs::read_to_string(self.api_dir.join(filename)).ok()?;
        match serde_json::from_str(&contents) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("{} contains invalid JSON ({}), ignoring", filename, e);
                None
            }
        }
    }

    /// Merge the three status documents into one flat record.
    ///
    /// Each document is read independently; a failure in one never affects
    /// the other two. Always returns a structurally complete record, even
    /// on a fresh install with no backing files at all.
    pub fn live_status(&self) -> LiveStatus {
        let status: StatusDocument = self.read_document("status.json");
        let attributes: AttributesDocument = self.read_document("attributes.json");
        let progress: ProgressDocument = self.read_document("progress.json");

        let total = TotalValue::for_disc(&attributes, &progress);

        LiveStatus {
            status: status.status,
            timestamp: status.timestamp,
            disc_label: attributes.disc_label,
            disc_type: attributes.disc_type,
            disc_size_mb: attributes.disc_size_mb,
            progress_percent: progress.percent,
            progress_mb: progress.copied_mb,
            total_mb: total.amount(),
            eta: progress.eta,
            filename: attributes.filename,
            method: attributes.method,
            error_message: attributes.error_message,
        }
    }

    /// True while the service is blocked waiting for a metadata choice.
    ///
    /// The external service may or may not delete its selection file after
    /// consuming a response, so stale leftovers are expected; only the
    /// exact sentinel counts.
    pub fn selection_pending(&self) -> bool {
        self.read_optional::<SelectionDocument>("musicbrainz_selection.json")
            .map(|sel| sel.status == WAITING_USER_INPUT)
            .unwrap_or(false)
    }

    /// Current selection side-channel state, if any file is present.
    pub fn selection_state(&self) -> Option<SelectionDocument> {
        self.read_optional("musicbrainz_selection.json")
    }

    /// Activity history relayed from `history.json` (missing → empty).
    pub fn history(&self) -> Vec<serde_json::Value> {
        self.read_optional("history.json").unwrap_or_default()
    }

    /// Derive the human-readable status label.
    ///
    /// Precedence is fixed: a stopped service overrides everything, a
    /// pending metadata selection overrides the raw lifecycle status, and
    /// only then does the lifecycle status pick the label. Within idle,
    /// an unknown copy method means no drive was ever detected, which is
    /// distinct from a disc having been ejected since the last copy.
    pub fn status_text(&self, live: &LiveStatus, service_running: bool) -> &'static str {
        if !service_running {
            return labels::SERVICE_STOPPED;
        }

        if self.selection_pending() {
            return labels::WAITING_SELECTION;
        }

        match live.status {
            LifecycleStatus::Idle => {
                if live.method.is_empty() || live.method == "unknown" {
                    labels::NO_DRIVE
                } else {
                    labels::WAITING_MEDIA
                }
            }
            LifecycleStatus::Waiting => labels::ANALYZING,
            LifecycleStatus::Copying => labels::COPYING,
            LifecycleStatus::Completed => labels::COMPLETED,
            LifecycleStatus::Error => labels::ERROR,
            LifecycleStatus::Unknown => labels::UNKNOWN,
        }
    }
}
