//! Pipeline orchestrator for playlist-to-MP4 runs.
//!
//! A run is a fixed sequence of steps, each validating its inputs,
//! invoking the media tool (or the filesystem), and recording what it
//! produced in [`RunState`].
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Prepare   (create workspace, clear leftovers)
//!     ├── Step: Download  (segments via stream copy)
//!     ├── Step: Manifest  (filelist.txt for the concat demuxer)
//!     ├── Step: Audio     (separate AAC transcode)
//!     ├── Step: Mux       (segments + audio -> MP4)
//!     └── Step: Cleanup   (remove temporary files)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use hlsmux_core::config::Settings;
//! use hlsmux_core::Converter;
//!
//! let report = Converter::new(Settings::default())
//!     .convert("https://example.com/live/index.m3u8", "video.mp4")
//!     .unwrap();
//! println!("Muxed {} segments", report.segment_count());
//! ```

mod converter;
mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use converter::{convert, Converter};
pub use errors::{FailureKind, PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{AudioStep, CleanupStep, DownloadStep, ManifestStep, MuxStep, PrepareStep};
pub use types::{
    AudioOutput, CleanupOutput, Context, ConvertReport, DownloadOutput, ManifestOutput, MuxOutput,
    PrepareOutput, ProgressCallback, RunState, StepOutcome,
};

/// Create the standard pipeline with all steps in the correct order.
///
/// 1. Prepare - create the workspace, remove leftovers
/// 2. Download - fetch segments with stream copy
/// 3. Manifest - list contiguous segments
/// 4. Audio - transcode audio to AAC
/// 5. Mux - concatenate segments and add audio
/// 6. Cleanup - delete temporary files
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(PrepareStep::new())
        .with_step(DownloadStep::new())
        .with_step(ManifestStep::new())
        .with_step(AudioStep::new())
        .with_step(MuxStep::new())
        .with_step(CleanupStep::new())
}
