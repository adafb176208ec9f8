//! Settings and the TOML file they live in.
//!
//! [`Settings`] is split into tables (`[tool]`, `[paths]`, `[segments]`,
//! `[audio]`, `[logging]`, `[cleanup]`); every key has a default, so a
//! partial file is valid. [`ConfigManager`] validates on load and can
//! rewrite a single table without disturbing the rest of the file.
//!
//! ```no_run
//! use hlsmux_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/hlsmux.toml");
//! config.load_or_create().unwrap();
//!
//! config.settings_mut().tool.ffmpeg_path = "/usr/local/bin/ffmpeg".to_string();
//! config.update_section(ConfigSection::Tool).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AudioSettings, CleanupSettings, ConfigSection, GapPolicy, LoggingSettings, ManifestPathStyle,
    PathSettings, SegmentSettings, Settings, ToolSettings, SEGMENT_INDEX_CAP,
};
