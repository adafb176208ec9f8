//! Temporary workspace for one conversion run.
//!
//! Layout:
//!
//! ```text
//! temp/
//!     ├── segment_001.ts ... segment_NNN.ts   (written by the download)
//!     ├── filelist.txt                        (concat manifest)
//!     └── audio.aac                           (written by the audio transcode)
//! ```
//!
//! Cleanup deletes exactly these files by enumerating the directory and
//! matching the names this module produces. Anything else in the directory
//! is left alone.

mod guard;
mod manifest;

pub use guard::WorkspaceGuard;
pub use manifest::{render_manifest, scan_segments, SegmentGap, SegmentScan};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ManifestPathStyle;

/// Output pattern handed to the tool for segment files.
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";
/// Concat manifest file name.
pub const MANIFEST_FILE: &str = "filelist.txt";
/// Transcoded audio file name.
pub const AUDIO_FILE: &str = "audio.aac";

const SEGMENT_PREFIX: &str = "segment_";
const SEGMENT_SUFFIX: &str = ".ts";

/// File name for segment `index` (`segment_001.ts`).
pub fn segment_file_name(index: u32) -> String {
    format!("{}{:03}{}", SEGMENT_PREFIX, index, SEGMENT_SUFFIX)
}

/// Index of a segment file name, `None` for anything else.
///
/// Accepts three or more digits, matching what `%03d` produces.
pub fn parse_segment_index(file_name: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?;
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A removal that failed during cleanup.
#[derive(Error, Debug)]
#[error("Failed to remove {}: {source}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// What a cleanup pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub removed_dir: bool,
}

/// The run's working directory and the files it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if needed.
    ///
    /// Idempotent. Returns whether the directory was created by this call.
    pub fn prepare(&self) -> io::Result<bool> {
        if self.dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir)?;
        Ok(true)
    }

    pub fn segment_path(&self, index: u32) -> PathBuf {
        self.dir.join(segment_file_name(index))
    }

    /// Output pattern passed to the tool (`<dir>/segment_%03d.ts`).
    pub fn segment_pattern(&self) -> PathBuf {
        self.dir.join(SEGMENT_PATTERN)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(AUDIO_FILE)
    }

    /// Scan for contiguous segments starting at 1.
    pub fn scan_segments(&self, max: u32) -> SegmentScan {
        scan_segments(&self.dir, max)
    }

    /// Write the concat manifest for `segments`, replacing any previous one.
    pub fn write_manifest(&self, segments: &[PathBuf], style: ManifestPathStyle) -> io::Result<()> {
        let content = render_manifest(segments, style)?;
        fs::write(self.manifest_path(), content)
    }

    /// Every file in the workspace that a run creates, sorted.
    pub fn artifacts(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_artifact = name == MANIFEST_FILE
                || name == AUDIO_FILE
                || parse_segment_index(&name).is_some();
            if is_artifact && entry.file_type()?.is_file() {
                artifacts.push(entry.path());
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    /// Remove artifacts left by an earlier run.
    pub fn remove_stale(&self) -> Result<Vec<PathBuf>, CleanupError> {
        self.remove_artifacts()
    }

    /// Remove this run's artifacts.
    ///
    /// With `remove_dir` the directory itself is removed too when it is
    /// empty afterwards; a directory still holding other files is kept.
    pub fn cleanup(&self, remove_dir: bool) -> Result<CleanupReport, CleanupError> {
        let removed = self.remove_artifacts()?;

        let mut removed_dir = false;
        if remove_dir && self.is_empty_dir() {
            match fs::remove_dir(&self.dir) {
                Ok(()) => removed_dir = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(CleanupError {
                        path: self.dir.clone(),
                        source,
                    })
                }
            }
        }

        Ok(CleanupReport {
            removed,
            removed_dir,
        })
    }

    fn remove_artifacts(&self) -> Result<Vec<PathBuf>, CleanupError> {
        let artifacts = self.artifacts().map_err(|source| CleanupError {
            path: self.dir.clone(),
            source,
        })?;

        let mut removed = Vec::with_capacity(artifacts.len());
        for path in artifacts {
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(CleanupError { path, source }),
            }
        }
        Ok(removed)
    }

    fn is_empty_dir(&self) -> bool {
        fs::read_dir(&self.dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
    }
}
