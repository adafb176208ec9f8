use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/hlsmux.toml";

#[derive(Parser, Debug)]
#[command(
    name = "hlsmux",
    about = "Download an HLS (M3U8) playlist and mux it into a single MP4 with ffmpeg",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a playlist into an MP4 file
    Convert {
        /// Playlist URL (http or https)
        url: String,

        /// Output MP4 path
        output: PathBuf,

        /// Temporary workspace directory
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Path to the ffmpeg executable
        #[arg(long)]
        ffmpeg: Option<PathBuf>,

        /// Leave temporary files in place when the run fails
        #[arg(long)]
        keep_on_failure: bool,

        /// Mux the segments before a numbering gap instead of failing
        #[arg(long)]
        allow_gaps: bool,

        /// Kill an ffmpeg invocation after this many seconds (0 = never)
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Locate ffmpeg and print its version
    Check {
        /// Path to the ffmpeg executable
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
    },

    /// Inspect or change the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Store the ffmpeg path in the [tool] section
    SetTool {
        /// Path to the ffmpeg executable
        path: PathBuf,
    },
    /// Write the configuration file with defaults if missing
    Init,
}

impl Args {
    /// Verbosity selected on the command line.
    pub fn log_level(&self) -> hlsmux_core::logging::LogLevel {
        use hlsmux_core::logging::LogLevel;

        if self.quiet {
            LogLevel::Error
        } else if self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use hlsmux_core::logging::LogLevel;

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_convert() {
        let args = Args::parse_from([
            "hlsmux",
            "-v",
            "convert",
            "https://e.com/a.m3u8",
            "out.mp4",
            "--allow-gaps",
            "--timeout",
            "600",
        ]);

        assert_eq!(args.log_level(), LogLevel::Debug);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match args.command {
            Commands::Convert {
                url,
                output,
                allow_gaps,
                timeout,
                keep_on_failure,
                ..
            } => {
                assert_eq!(url, "https://e.com/a.m3u8");
                assert_eq!(output, PathBuf::from("out.mp4"));
                assert!(allow_gaps);
                assert!(!keep_on_failure);
                assert_eq!(timeout, Some(600));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_config_set_tool() {
        let args = Args::parse_from([
            "hlsmux",
            "config",
            "set-tool",
            "/opt/ffmpeg/bin/ffmpeg",
            "-c",
            "custom.toml",
        ]);
        assert_eq!(args.config, PathBuf::from("custom.toml"));
        assert!(matches!(
            args.command,
            Commands::Config {
                action: ConfigAction::SetTool { .. }
            }
        ));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["hlsmux", "-q", "-v", "check"]).is_err());
    }
}
