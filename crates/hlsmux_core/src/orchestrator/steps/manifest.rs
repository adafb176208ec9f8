//! Manifest step - lists downloaded segments for the concat demuxer.

use crate::config::GapPolicy;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, ManifestOutput, RunState, StepOutcome};

use super::require_workspace;

/// Scans `segment_001.ts` upward and writes `filelist.txt`.
pub struct ManifestStep;

impl ManifestStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ManifestStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ManifestStep {
    fn name(&self) -> &str {
        "Manifest"
    }

    fn description(&self) -> &str {
        "Generate manifest"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        require_workspace(ctx)
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let segments = &ctx.settings.segments;
        let scan = ctx.workspace.scan_segments(segments.max_segments);

        if let Some(gap) = scan.gap {
            match segments.gap_policy {
                GapPolicy::Fail => {
                    return Err(StepError::ManifestGap {
                        missing: gap.missing,
                        next_present: gap.next_present,
                    });
                }
                GapPolicy::Truncate => {
                    ctx.logger.warn(&format!(
                        "Segment {:03} is missing; segments from {:03} on are left out",
                        gap.missing, gap.next_present
                    ));
                }
            }
        }

        if scan.is_empty() {
            return Err(StepError::ManifestEmpty {
                dir: ctx.workspace.dir().to_path_buf(),
            });
        }

        if scan.limit_reached {
            if stream_continues_past(ctx, segments.max_segments) {
                ctx.logger.warn(&format!(
                    "Stream longer than anticipated: only the first {} segments are muxed",
                    segments.max_segments
                ));
            } else {
                ctx.logger.debug(&format!(
                    "Segment scan stopped at the limit of {}",
                    segments.max_segments
                ));
            }
        }

        let manifest_path = ctx.workspace.manifest_path();
        ctx.workspace
            .write_manifest(&scan.segments, segments.manifest_paths)
            .map_err(|e| StepError::io_error("writing concat manifest", e))?;

        ctx.logger.info(&format!(
            "Wrote {} with {} segment(s)",
            manifest_path.display(),
            scan.len()
        ));

        state.manifest = Some(ManifestOutput {
            path: manifest_path,
            segments: scan.segments,
            limit_reached: scan.limit_reached,
            gap: scan.gap,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let manifest = state
            .manifest
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Manifest output not recorded"))?;

        if !manifest.path.is_file() {
            return Err(StepError::invalid_output(format!(
                "Manifest was not written: {}",
                manifest.path.display()
            )));
        }
        if manifest.entries() == 0 {
            return Err(StepError::invalid_output("Manifest has no entries"));
        }
        Ok(())
    }
}

/// Whether a segment exists right after `limit`.
fn stream_continues_past(ctx: &Context, limit: u32) -> bool {
    limit
        .checked_add(1)
        .is_some_and(|next| ctx.workspace.segment_path(next).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManifestPathStyle;
    use crate::orchestrator::test_support::test_context;
    use std::fs;

    fn touch(ctx: &Context, indices: impl IntoIterator<Item = u32>) {
        ctx.workspace.prepare().unwrap();
        for i in indices {
            fs::write(ctx.workspace.segment_path(i), b"ts").unwrap();
        }
    }

    #[test]
    fn gap_fails_by_default() {
        let (_dir, ctx) = test_context();
        touch(&ctx, [1, 2, 3, 5]);

        let mut state = RunState::new("test");
        let err = ManifestStep::new().execute(&ctx, &mut state).unwrap_err();

        assert!(matches!(
            err,
            StepError::ManifestGap {
                missing: 4,
                next_present: 5
            }
        ));
        assert!(!ctx.workspace.manifest_path().exists());
    }

    #[test]
    fn gap_truncates_when_allowed() {
        let (_dir, mut ctx) = test_context();
        ctx.settings.segments.gap_policy = GapPolicy::Truncate;
        ctx.settings.segments.manifest_paths = ManifestPathStyle::Joined;
        touch(&ctx, [1, 2, 3, 5]);

        let mut state = RunState::new("test");
        ManifestStep::new().execute(&ctx, &mut state).unwrap();

        let manifest = state.manifest.as_ref().unwrap();
        assert_eq!(manifest.entries(), 3);
        assert_eq!(manifest.gap.map(|g| g.missing), Some(4));

        let text = fs::read_to_string(&manifest.path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(!text.contains("segment_005.ts"));
        assert!(ManifestStep::new().validate_output(&ctx, &state).is_ok());
    }

    #[test]
    fn no_segments_is_an_error() {
        let (_dir, ctx) = test_context();
        ctx.workspace.prepare().unwrap();

        let mut state = RunState::new("test");
        let err = ManifestStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(err, StepError::ManifestEmpty { .. }));
    }

    #[test]
    fn unvalidated_limit_does_not_overflow() {
        let (_dir, mut ctx) = test_context();
        ctx.settings.segments.max_segments = u32::MAX;
        touch(&ctx, 1..=2);

        assert!(!stream_continues_past(&ctx, u32::MAX));
        assert!(stream_continues_past(&ctx, 1));

        let mut state = RunState::new("test");
        ManifestStep::new().execute(&ctx, &mut state).unwrap();
        assert_eq!(state.manifest.as_ref().unwrap().entries(), 2);
    }

    #[test]
    fn limit_reached_is_recorded() {
        let (_dir, mut ctx) = test_context();
        ctx.settings.segments.max_segments = 3;
        touch(&ctx, 1..=5);

        let mut state = RunState::new("test");
        ManifestStep::new().execute(&ctx, &mut state).unwrap();

        let manifest = state.manifest.as_ref().unwrap();
        assert_eq!(manifest.entries(), 3);
        assert!(manifest.limit_reached);

        ctx.logger.flush();
        let log = fs::read_to_string(ctx.logger.log_path()).unwrap();
        assert!(log.contains("Stream longer than anticipated"));
    }

    #[test]
    fn absolute_entries_by_default() {
        let (_dir, ctx) = test_context();
        touch(&ctx, 1..=2);

        let mut state = RunState::new("test");
        ManifestStep::new().execute(&ctx, &mut state).unwrap();

        let text = fs::read_to_string(ctx.workspace.manifest_path()).unwrap();
        for line in text.lines() {
            let path = line
                .strip_prefix("file '")
                .and_then(|l| l.strip_suffix('\''))
                .unwrap();
            assert!(std::path::Path::new(path).is_absolute());
        }
    }
}
