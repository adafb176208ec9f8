//! hlsmux core - HLS playlist to MP4 orchestration.
//!
//! This crate contains all conversion logic with zero CLI dependencies.
//! The real media work (demuxing, transcoding, muxing) is done by an
//! external ffmpeg-compatible binary; this crate drives it through a
//! fixed sequence of steps and manages the temporary workspace.

pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod source;
pub mod tool;
pub mod workspace;

pub use orchestrator::{convert, ConvertReport, Converter};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
