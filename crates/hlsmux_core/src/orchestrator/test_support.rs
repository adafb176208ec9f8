//! Shared fixtures for orchestrator tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::config::Settings;
use crate::logging::{LogConfig, RunLogger};
use crate::source::SourceUrl;
use crate::tool::{ToolInvocation, ToolOutput, ToolResult, ToolRunner};
use crate::workspace::{Workspace, MANIFEST_FILE};

use super::types::Context;

pub const TEST_SOURCE: &str = "https://cdn.example.com/live/index.m3u8?token=secret123";

/// Settings with workspace and logs under `root`.
pub fn test_settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.tool.ffmpeg_path = "mock-ffmpeg".to_string();
    settings.paths.work_dir = root.join("temp").to_string_lossy().into_owned();
    settings.paths.logs_folder = root.join("logs").to_string_lossy().into_owned();
    settings
}

/// A context over a fresh temp directory. The workspace is not created.
pub fn test_context() -> (TempDir, Context) {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(dir.path());
    let logger = RunLogger::new("test", dir.path().join("logs"), LogConfig::default(), None).unwrap();

    let ctx = Context::new(
        SourceUrl::parse(TEST_SOURCE).unwrap(),
        dir.path().join("out").join("video.mp4"),
        settings.clone(),
        "test",
        Workspace::new(&settings.paths.work_dir),
        Arc::new(MockRunner::new(1)),
        "mock-ffmpeg".into(),
        Arc::new(logger),
    );
    (dir, ctx)
}

/// Fakes the tool's filesystem effects.
///
/// `download` writes the configured segments next to the pattern in its
/// last argument; `audio` and `mux` write their last argument.
pub struct MockRunner {
    segments: Vec<u32>,
    failing: Option<String>,
    calls: Mutex<Vec<ToolInvocation>>,
    manifest_at_mux: Mutex<Option<String>>,
}

impl MockRunner {
    /// Download produces segments 1..=count.
    pub fn new(count: u32) -> Self {
        Self::with_segments(1..=count)
    }

    pub fn with_segments(indices: impl IntoIterator<Item = u32>) -> Self {
        Self {
            segments: indices.into_iter().collect(),
            failing: None,
            calls: Mutex::new(Vec::new()),
            manifest_at_mux: Mutex::new(None),
        }
    }

    /// Invocations with this label exit 1 without writing anything.
    pub fn failing(mut self, label: &str) -> Self {
        self.failing = Some(label.to_string());
        self
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.label.clone()).collect()
    }

    pub fn call(&self, label: &str) -> Option<ToolInvocation> {
        self.calls.lock().iter().find(|c| c.label == label).cloned()
    }

    /// Manifest text as it was when mux ran.
    pub fn manifest_at_mux(&self) -> Option<String> {
        self.manifest_at_mux.lock().clone()
    }
}

impl ToolRunner for MockRunner {
    fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
        self.calls.lock().push(invocation.clone());

        if self.failing.as_deref() == Some(invocation.label.as_str()) {
            return Ok(ToolOutput {
                exit_code: 1,
                stdout: Vec::new(),
                stderr: vec!["Server returned 404 Not Found".to_string()],
            });
        }

        let target = invocation.args.last().cloned().unwrap_or_default();
        match invocation.label.as_str() {
            "download" => {
                for i in &self.segments {
                    let path = target.replace("%03d", &format!("{:03}", i));
                    fs::write(path, b"ts").unwrap();
                }
            }
            "mux" => {
                if let Some(manifest) = invocation.args.iter().find(|a| a.ends_with(MANIFEST_FILE)) {
                    *self.manifest_at_mux.lock() = fs::read_to_string(manifest).ok();
                }
                fs::write(&target, b"mp4").unwrap();
            }
            _ => fs::write(&target, b"aac").unwrap(),
        }

        Ok(ToolOutput::with_exit_code(0))
    }
}
