use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Free/total space on the filesystem holding the output directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskSpace {
    pub free_gb: f64,
    pub total_gb: f64,
    pub used_percent: f64,
    pub free_percent: f64,
}

/// One archived ISO image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsoFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified: String,
}

/// Archived ISOs grouped by medium type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub audio: Vec<IsoFile>,
    pub dvd: Vec<IsoFile>,
    pub bluray: Vec<IsoFile>,
    pub data: Vec<IsoFile>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ArchiveCounts {
    pub audio: usize,
    pub dvd: usize,
    pub bluray: usize,
    pub data: usize,
}

impl ArchiveIndex {
    pub fn counts(&self) -> ArchiveCounts {
        ArchiveCounts {
            audio: self.audio.len(),
            dvd: self.dvd.len(),
            bluray: self.bluray.len(),
            data: self.data.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.audio.len() + self.dvd.len() + self.bluray.len() + self.data.len()
    }
}

/// Query free disk space for a path via `df -Pk` (POSIX output format).
///
/// Failures degrade to zeroed numbers; the dashboard renders them as
/// "unknown" rather than erroring out.
pub fn disk_space(path: &Path) -> DiskSpace {
    match query_disk_space(path) {
        Ok(space) => space,
        Err(e) => {
            warn!("Failed to query disk space for {}: {}", path.display(), e);
            DiskSpace::default()
        }
    }
}

fn query_disk_space(path: &Path) -> Result<DiskSpace> {
    let output = Command::new("df")
        .arg("-Pk")
        .arg(path)
        .output()
        .context("Failed to execute df")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "df failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    // Second line, columns: filesystem, 1K-blocks, used, available, ...
    let line = stdout
        .lines()
        .nth(1)
        .context("Unexpected df output: missing data line")?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(anyhow::anyhow!("Unexpected df output: {}", line));
    }

    let total_kb: f64 = fields[1].parse().context("Bad total column in df output")?;
    let avail_kb: f64 = fields[3].parse().context("Bad avail column in df output")?;

    let total_gb = total_kb / (1024.0 * 1024.0);
    let free_gb = avail_kb / (1024.0 * 1024.0);
    let used_percent = if total_gb > 0.0 {
        (total_gb - free_gb) / total_gb * 100.0
    } else {
        0.0
    };
    let free_percent = if total_gb > 0.0 {
        free_gb / total_gb * 100.0
    } else {
        0.0
    };

    Ok(DiskSpace {
        free_gb: (free_gb * 100.0).round() / 100.0,
        total_gb: (total_gb * 100.0).round() / 100.0,
        used_percent: (used_percent * 10.0).round() / 10.0,
        free_percent: (free_percent * 10.0).round() / 10.0,
    })
}

/// Count ISO files under the output directory, recursively.
pub fn count_iso_files(path: &Path) -> usize {
    if !path.exists() {
        return 0;
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_iso(e.path()))
        .count()
}

fn is_iso(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("iso"))
        .unwrap_or(false)
}

/// Scan the output directory and group ISO images by medium type.
///
/// Classification checks the directory structure first (the service sorts
/// rips into audio/, dvd/, bluray/, data/ subfolders) and falls back to
/// filename markers for images produced before that layout existed.
pub fn scan_archive(path: &Path) -> ArchiveIndex {
    let mut index = ArchiveIndex::default();

    if !path.exists() {
        debug!("Output directory {} does not exist yet", path.display());
        return index;
    }

    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !is_iso(entry.path()) {
            continue;
        }

        let info = match file_info(entry.path()) {
            Ok(info) => info,
            Err(e) => {
                warn!("Failed to stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        match classify(entry.path(), path) {
            IsoKind::Audio => index.audio.push(info),
            IsoKind::Dvd => index.dvd.push(info),
            IsoKind::Bluray => index.bluray.push(info),
            IsoKind::Data => index.data.push(info),
        }
    }

    // Newest first within each group
    for group in [
        &mut index.audio,
        &mut index.dvd,
        &mut index.bluray,
        &mut index.data,
    ] {
        group.sort_by(|a, b| b.modified.cmp(&a.modified));
    }

    index
}

enum IsoKind {
    Audio,
    Dvd,
    Bluray,
    Data,
}

fn classify(path: &Path, root: &Path) -> IsoKind {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect();

    let in_dir = |name: &str| components.iter().any(|c| c == name);
    if in_dir("audio") {
        return IsoKind::Audio;
    }
    if in_dir("dvd") {
        return IsoKind::Dvd;
    }
    if in_dir("bluray") || in_dir("blu-ray") || in_dir("bd") {
        return IsoKind::Bluray;
    }
    if in_dir("data") {
        return IsoKind::Data;
    }

    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if filename.contains("_audio-cd_") || filename.contains("_audiocd_") {
        IsoKind::Audio
    } else if filename.contains("_bluray_")
        || filename.contains("_bd_")
        || filename.contains("_blu-ray_")
    {
        IsoKind::Bluray
    } else if filename.contains("_dvd_") || filename.contains("_dvd-video_") {
        IsoKind::Dvd
    } else {
        IsoKind::Data
    }
}

fn file_info(path: &Path) -> Result<IsoFile> {
    let metadata = std::fs::metadata(path)?;
    let modified: DateTime<Local> = metadata.modified()?.into();

    Ok(IsoFile {
        name: path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default(),
        path: path.to_string_lossy().to_string(),
        size: metadata.len(),
        modified: modified.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}
