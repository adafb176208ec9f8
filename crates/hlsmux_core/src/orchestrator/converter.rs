//! Entry point that wires settings, tool, logger and workspace into a run.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;

use crate::config::Settings;
use crate::logging::{LogConfig, LogLevel, RunLoggerBuilder};
use crate::source::SourceUrl;
use crate::tool::{resolve_tool, FfmpegRunner, ToolRunner};
use crate::workspace::{Workspace, WorkspaceGuard};

use super::create_standard_pipeline;
use super::errors::{PipelineError, PipelineResult};
use super::types::{Context, ConvertReport, RunState};

type SharedLogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;
type SharedProgressCallback = Arc<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Converts HLS playlists to MP4 files.
///
/// Owns the settings and the tool runner; every call to
/// [`Converter::convert`] is an independent run with its own log file and
/// workspace guard.
pub struct Converter {
    settings: Settings,
    runner: Option<Arc<dyn ToolRunner>>,
    log_level: LogLevel,
    log_callback: Option<SharedLogCallback>,
    progress_callback: Option<SharedProgressCallback>,
}

impl Converter {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            runner: None,
            log_level: LogLevel::Info,
            log_callback: None,
            progress_callback: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Use `runner` instead of spawning the resolved tool.
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Minimum level written to the run log.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Receive every run log line.
    pub fn with_log_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        self.log_callback = Some(Arc::new(callback));
        self
    }

    /// Receive step progress as (step, percent, message).
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, u32, &str) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Convert the playlist at `source_url` into `output_path`.
    ///
    /// Runs Prepare, Download, Manifest, Audio, Mux and Cleanup in order and
    /// stops at the first failure. Temporary files are removed on every exit
    /// path unless `cleanup.keep_on_failure` is set and the run failed.
    pub fn convert(
        &self,
        source_url: &str,
        output_path: impl AsRef<Path>,
    ) -> PipelineResult<ConvertReport> {
        let output_path = output_path.as_ref();
        let job_name = run_name(output_path);

        self.settings
            .validate()
            .map_err(|msg| PipelineError::validation_failed(&job_name, msg))?;

        let source = SourceUrl::parse(source_url)
            .map_err(|e| PipelineError::validation_failed(&job_name, e.to_string()))?;

        if output_path.as_os_str().is_empty() {
            return Err(PipelineError::validation_failed(
                &job_name,
                "Output path is empty",
            ));
        }
        if output_path.is_dir() {
            return Err(PipelineError::validation_failed(
                &job_name,
                format!("Output path is a directory: {}", output_path.display()),
            ));
        }

        let tool_settings = &self.settings.tool;
        let program = resolve_tool(Some(Path::new(&tool_settings.ffmpeg_path)))
            .map_err(|e| PipelineError::tool_not_found(&job_name, e))?;

        let runner: Arc<dyn ToolRunner> = match &self.runner {
            Some(runner) => Arc::clone(runner),
            None => Arc::new(FfmpegRunner::new().with_timeout_secs(tool_settings.timeout_secs)),
        };

        let mut builder = RunLoggerBuilder::new(&job_name, &self.settings.paths.logs_folder)
            .config(LogConfig::from_settings(&self.settings.logging))
            .level(self.log_level);
        if let Some(callback) = &self.log_callback {
            let callback = Arc::clone(callback);
            builder = builder.callback(Box::new(move |level: LogLevel, msg: &str| {
                callback(level, msg)
            }));
        }
        let logger = Arc::new(builder.build().map_err(|e| {
            PipelineError::setup_failed(&job_name, format!("Failed to create run log: {}", e))
        })?);

        logger.section(&format!("hlsmux {}", crate::version()));
        logger.info(&format!("Source: {}", source));
        logger.info(&format!("Output: {}", output_path.display()));
        logger.info(&format!("Media tool: {}", program.display()));
        if !source.looks_like_playlist() {
            logger.warn("Source URL does not end in .m3u8; continuing anyway");
        }

        let workspace = Workspace::new(&self.settings.paths.work_dir);
        let created_by_run = !workspace.dir().exists();
        let mut guard = WorkspaceGuard::new(workspace.clone(), created_by_run);

        let mut ctx = Context::new(
            source,
            output_path.to_path_buf(),
            self.settings.clone(),
            &job_name,
            workspace,
            runner,
            program,
            Arc::clone(&logger),
        );
        if let Some(callback) = &self.progress_callback {
            let callback = Arc::clone(callback);
            ctx = ctx.with_progress_callback(Box::new(move |step: &str, percent: u32, msg: &str| {
                callback(step, percent, msg)
            }));
        }

        let mut state = RunState::new(&job_name);
        let result = create_standard_pipeline().run(&ctx, &mut state);

        match result {
            Ok(pipeline) => {
                guard.disarm();
                logger.success(&format!("Wrote {}", output_path.display()));
                logger.flush();

                Ok(ConvertReport {
                    run_name: job_name,
                    output_path: output_path.to_path_buf(),
                    log_path: logger.log_path().to_path_buf(),
                    pipeline,
                    state,
                })
            }
            Err(err) => {
                if self.settings.cleanup.keep_on_failure {
                    guard.disarm();
                    logger.warn(&format!(
                        "Keeping temporary files in {} for inspection",
                        ctx.workspace.dir().display()
                    ));
                } else {
                    logger.debug("Removing temporary files after failure");
                }
                logger.info(&format!("Log saved to {}", logger.log_path().display()));
                logger.flush();
                Err(err)
            }
        }
    }
}

/// Convert with default settings.
pub fn convert(source_url: &str, output_path: impl AsRef<Path>) -> PipelineResult<ConvertReport> {
    Converter::new(Settings::default()).convert(source_url, output_path)
}

/// `<output stem>-<timestamp to the millisecond>`, also the run log's file stem.
fn run_name(output_path: &Path) -> String {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string());
    format!("{}-{}", stem, Local::now().format("%Y%m%d-%H%M%S%.3f"))
}
