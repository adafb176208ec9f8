//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

/// Highest segment index the fixed `%03d` naming can express.
pub const SEGMENT_INDEX_CAP: u32 = 999;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// External media tool settings.
    #[serde(default)]
    pub tool: ToolSettings,

    /// Workspace and log locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// Segment scan and manifest generation.
    #[serde(default)]
    pub segments: SegmentSettings,

    /// Audio transcode parameters.
    #[serde(default)]
    pub audio: AudioSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Workspace cleanup behaviour.
    #[serde(default)]
    pub cleanup: CleanupSettings,
}

impl Settings {
    /// Check values that serde cannot constrain.
    pub fn validate(&self) -> Result<(), String> {
        let max = self.segments.max_segments;
        if max == 0 || max > SEGMENT_INDEX_CAP {
            return Err(format!(
                "segments.max_segments must be between 1 and {}, got {}",
                SEGMENT_INDEX_CAP, max
            ));
        }
        if self.audio.codec.trim().is_empty() {
            return Err("audio.codec must not be empty".to_string());
        }
        if self.audio.bitrate.trim().is_empty() {
            return Err("audio.bitrate must not be empty".to_string());
        }
        if self.paths.work_dir.trim().is_empty() {
            return Err("paths.work_dir must not be empty".to_string());
        }
        Ok(())
    }
}

/// External media tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Path to the ffmpeg executable. Empty = discover (env var, then PATH).
    #[serde(default)]
    pub ffmpeg_path: String,

    /// Kill an invocation after this many seconds (0 = wait forever).
    #[serde(default)]
    pub timeout_secs: u64,

    /// Pass `-y` so existing output files are overwritten without prompting.
    #[serde(default = "default_true")]
    pub overwrite: bool,

    /// Value for ffmpeg's `-loglevel`.
    #[serde(default = "default_tool_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_tool_log_level() -> String {
    "error".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: String::new(),
            timeout_secs: 0,
            overwrite: true,
            log_level: default_tool_log_level(),
        }
    }
}

/// Path configuration for the workspace and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Temporary workspace for segments, audio and the manifest.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_work_dir() -> String {
    "temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// What to do when the segment sequence has a hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// Stop the run with a manifest-gap error.
    #[default]
    Fail,
    /// Warn and concatenate only the segments before the hole.
    Truncate,
}

/// How segment paths are written into the concat manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestPathStyle {
    /// Canonical absolute paths.
    #[default]
    Absolute,
    /// Segment path joined onto the workspace path as configured
    /// (`temp/segment_001.ts` for the default workspace).
    Joined,
}

/// Segment scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSettings {
    /// Highest segment index scanned.
    #[serde(default = "default_max_segments")]
    pub max_segments: u32,

    /// Behaviour on a missing segment index.
    #[serde(default)]
    pub gap_policy: GapPolicy,

    /// Path style for manifest entries.
    #[serde(default)]
    pub manifest_paths: ManifestPathStyle,
}

fn default_max_segments() -> u32 {
    SEGMENT_INDEX_CAP
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            max_segments: default_max_segments(),
            gap_policy: GapPolicy::default(),
            manifest_paths: ManifestPathStyle::default(),
        }
    }
}

/// Audio transcode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Encoder passed to `-c:a`.
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Bitrate passed to `-b:a`.
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
}

fn default_codec() -> String {
    "aac".to_string()
}

fn default_bitrate() -> String {
    "128k".to_string()
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            bitrate: default_bitrate(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Compact mode: raw tool output only goes to the tail buffer.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines shown when a step fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Log each tool command one argument per line.
    #[serde(default)]
    pub show_command_pretty: bool,
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            show_command_pretty: false,
        }
    }
}

/// Cleanup configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupSettings {
    /// Leave partial workspace files behind when a run fails.
    #[serde(default)]
    pub keep_on_failure: bool,
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Tool,
    Paths,
    Segments,
    Audio,
    Logging,
    Cleanup,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Tool,
        ConfigSection::Paths,
        ConfigSection::Segments,
        ConfigSection::Audio,
        ConfigSection::Logging,
        ConfigSection::Cleanup,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Tool => "tool",
            ConfigSection::Paths => "paths",
            ConfigSection::Segments => "segments",
            ConfigSection::Audio => "audio",
            ConfigSection::Logging => "logging",
            ConfigSection::Cleanup => "cleanup",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Tool => "External media tool (ffmpeg)",
            ConfigSection::Paths => "Workspace and log directories",
            ConfigSection::Segments => "Segment scan and concat manifest",
            ConfigSection::Audio => "Audio transcode",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Cleanup => "Workspace cleanup",
        }
    }
}
