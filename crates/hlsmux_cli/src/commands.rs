use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use hlsmux_core::config::{ConfigError, ConfigManager, ConfigSection, GapPolicy, Settings};
use hlsmux_core::logging::LogLevel;
use hlsmux_core::orchestrator::{FailureKind, PipelineError};
use hlsmux_core::tool::{probe_version, resolve_tool, FfmpegRunner, ToolError};
use hlsmux_core::Converter;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::cli::{Commands, ConfigAction};

/// Process exit codes.
pub mod exit {
    pub const OK: u8 = 0;
    pub const OTHER: u8 = 1;
    pub const INPUT: u8 = 2;
    pub const DOWNLOAD: u8 = 3;
    pub const MANIFEST: u8 = 4;
    pub const AUDIO: u8 = 5;
    pub const MUX: u8 = 6;
    pub const CLEANUP: u8 = 7;
    pub const TOOL: u8 = 8;
}

/// Seconds allowed for `ffmpeg -version`.
const PROBE_TIMEOUT_SECS: u64 = 15;

/// Open the config file for `command`.
///
/// `config init` creates the file. Everything else reads it when present
/// and falls back to defaults otherwise; a file that exists but does not
/// parse or validate is an error.
pub fn open_config(path: &Path, command: &Commands) -> Result<ConfigManager> {
    let mut manager = ConfigManager::new(path);

    if matches!(
        command,
        Commands::Config {
            action: ConfigAction::Init
        }
    ) {
        manager
            .load_or_create()
            .with_context(|| format!("Failed to initialise {}", path.display()))?;
    } else if path.exists() {
        manager
            .load()
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }

    Ok(manager)
}

/// Run one command against loaded configuration.
pub fn execute(command: Commands, mut config: ConfigManager, level: LogLevel) -> Result<()> {
    match command {
        Commands::Convert {
            url,
            output,
            work_dir,
            ffmpeg,
            keep_on_failure,
            allow_gaps,
            timeout,
            json,
        } => {
            let mut settings = config.settings().clone();
            apply_overrides(
                &mut settings,
                Overrides {
                    work_dir,
                    ffmpeg,
                    keep_on_failure,
                    allow_gaps,
                    timeout,
                },
            );
            convert(settings, &url, &output, level, json)
        }
        Commands::Check { ffmpeg } => check(config.settings(), ffmpeg.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", config.path().display());
                print!("{}", config.render()?);
                Ok(())
            }
            ConfigAction::SetTool { path } => {
                config.settings_mut().tool.ffmpeg_path = path.to_string_lossy().into_owned();
                config.update_section(ConfigSection::Tool)?;
                info!(
                    "Saved tool.ffmpeg_path = {} to {}",
                    path.display(),
                    config.path().display()
                );
                Ok(())
            }
            ConfigAction::Init => {
                config.ensure_dirs_exist()?;
                info!("Configuration ready at {}", config.path().display());
                Ok(())
            }
        },
    }
}

/// Command-line values that replace file settings for one run.
#[derive(Debug, Default)]
pub struct Overrides {
    pub work_dir: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub keep_on_failure: bool,
    pub allow_gaps: bool,
    pub timeout: Option<u64>,
}

pub fn apply_overrides(settings: &mut Settings, overrides: Overrides) {
    if let Some(dir) = overrides.work_dir {
        settings.paths.work_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(ffmpeg) = overrides.ffmpeg {
        settings.tool.ffmpeg_path = ffmpeg.to_string_lossy().into_owned();
    }
    if overrides.keep_on_failure {
        settings.cleanup.keep_on_failure = true;
    }
    if overrides.allow_gaps {
        settings.segments.gap_policy = GapPolicy::Truncate;
    }
    if let Some(secs) = overrides.timeout {
        settings.tool.timeout_secs = secs;
    }
}

fn convert(settings: Settings, url: &str, output: &Path, level: LogLevel, as_json: bool) -> Result<()> {
    let converter = Converter::new(settings)
        .with_log_level(level)
        .with_log_callback(forward_to_tracing)
        .with_progress_callback(|step, percent, message| {
            debug!(step, percent, "{}", message);
        });

    match converter.convert(url, output) {
        Ok(report) => {
            if as_json {
                println!("{}", report.to_json()?);
            } else {
                println!(
                    "{} ({} segments)",
                    report.output_path.display(),
                    report.segment_count()
                );
            }
            Ok(())
        }
        Err(err) => {
            if as_json {
                let body = json!({
                    "error": err.to_string(),
                    "kind": err.kind(),
                    "step": err.step_name(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Err(err.into())
        }
    }
}

fn check(settings: &Settings, ffmpeg: Option<&Path>) -> Result<()> {
    let configured = ffmpeg.unwrap_or_else(|| Path::new(&settings.tool.ffmpeg_path));
    let program = resolve_tool(Some(configured))?;
    let runner = FfmpegRunner::new().with_timeout_secs(PROBE_TIMEOUT_SECS);
    let banner = probe_version(&runner, &program)?;

    println!("{}", program.display());
    println!("{}", banner);
    Ok(())
}

/// Route run log lines into `tracing`.
fn forward_to_tracing(level: LogLevel, message: &str) {
    match level {
        LogLevel::Trace | LogLevel::Debug => debug!("{}", message),
        LogLevel::Info => info!("{}", message),
        LogLevel::Warn => warn!("{}", message),
        LogLevel::Error => error!("{}", message),
    }
}

/// Exit code for an error returned from [`execute`].
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(pipeline) = err.downcast_ref::<PipelineError>() {
        return match pipeline.kind() {
            FailureKind::InvalidInput => exit::INPUT,
            FailureKind::Download => exit::DOWNLOAD,
            FailureKind::Manifest => exit::MANIFEST,
            FailureKind::Audio => exit::AUDIO,
            FailureKind::Mux => exit::MUX,
            FailureKind::Cleanup => exit::CLEANUP,
            FailureKind::Tool => exit::TOOL,
            FailureKind::Setup | FailureKind::Io | FailureKind::Other => exit::OTHER,
        };
    }
    if err.downcast_ref::<ToolError>().is_some() {
        return exit::TOOL;
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return exit::INPUT;
    }
    exit::OTHER
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsmux_core::orchestrator::StepError;

    #[test]
    fn overrides_replace_file_values() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            Overrides {
                work_dir: Some(PathBuf::from("scratch")),
                ffmpeg: Some(PathBuf::from("/opt/ffmpeg")),
                keep_on_failure: true,
                allow_gaps: true,
                timeout: Some(120),
            },
        );

        assert_eq!(settings.paths.work_dir, "scratch");
        assert_eq!(settings.tool.ffmpeg_path, "/opt/ffmpeg");
        assert!(settings.cleanup.keep_on_failure);
        assert_eq!(settings.segments.gap_policy, GapPolicy::Truncate);
        assert_eq!(settings.tool.timeout_secs, 120);
    }

    #[test]
    fn no_overrides_keep_defaults() {
        let mut settings = Settings::default();
        apply_overrides(&mut settings, Overrides::default());
        assert_eq!(settings.paths.work_dir, "temp");
        assert_eq!(settings.segments.gap_policy, GapPolicy::Fail);
    }

    #[test]
    fn exit_codes_follow_failure_kind() {
        let cases = [
            (StepError::download_failed(1, "x"), exit::DOWNLOAD),
            (
                StepError::ManifestGap {
                    missing: 2,
                    next_present: 3,
                },
                exit::MANIFEST,
            ),
            (StepError::audio_failed(1, "x"), exit::AUDIO),
            (StepError::mux_failed(1, "x"), exit::MUX),
            (StepError::other("x"), exit::OTHER),
        ];
        for (step_err, code) in cases {
            let err = anyhow::Error::from(PipelineError::step_failed("run", "Step", step_err));
            assert_eq!(exit_code(&err), code);
        }

        let invalid = anyhow::Error::from(PipelineError::validation_failed("run", "bad url"));
        assert_eq!(exit_code(&invalid), exit::INPUT);

        let config = anyhow::Error::from(ConfigError::Invalid("x".into())).context("loading");
        assert_eq!(exit_code(&config), exit::INPUT);

        let tool = anyhow::Error::from(ToolError::NotFound("ffmpeg".into()));
        assert_eq!(exit_code(&tool), exit::TOOL);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), exit::OTHER);
        assert_eq!(exit::OK, 0);
    }
}
