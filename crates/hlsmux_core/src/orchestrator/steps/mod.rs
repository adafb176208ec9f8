//! Pipeline step implementations.
//!
//! Each step handles one phase of the playlist-to-MP4 conversion.

mod audio;
mod cleanup;
mod download;
mod manifest;
mod mux;
mod prepare;

pub use audio::AudioStep;
pub use cleanup::CleanupStep;
pub use download::DownloadStep;
pub use manifest::ManifestStep;
pub use mux::MuxStep;
pub use prepare::PrepareStep;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::types::Context;

/// Fail unless the workspace directory exists.
fn require_workspace(ctx: &Context) -> StepResult<()> {
    if !ctx.workspace.dir().is_dir() {
        return Err(StepError::invalid_input(format!(
            "Workspace directory does not exist: {}",
            ctx.workspace.dir().display()
        )));
    }
    Ok(())
}
