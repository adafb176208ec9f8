//! Segment scanning and concat manifest rendering.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{parse_segment_index, segment_file_name};
use crate::config::ManifestPathStyle;

/// A hole in the segment numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentGap {
    /// First index that does not exist.
    pub missing: u32,
    /// Lowest index above `missing` that does exist.
    pub next_present: u32,
}

/// Result of scanning a workspace for numbered segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentScan {
    /// Contiguous segments from index 1, in order.
    pub segments: Vec<PathBuf>,
    /// Set when higher-numbered segments exist beyond the first hole.
    pub gap: Option<SegmentGap>,
    /// The scan stopped at the upper bound rather than at a missing file.
    pub limit_reached: bool,
}

impl SegmentScan {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Scan `dir` for `segment_001.ts`, `segment_002.ts`, ... up to `max`.
///
/// Stops at the first missing index. Any segment above the hole is
/// reported through [`SegmentScan::gap`] but not included.
pub fn scan_segments(dir: &Path, max: u32) -> SegmentScan {
    let mut scan = SegmentScan::default();

    let mut first_missing = None;
    for index in 1..=max {
        let path = dir.join(segment_file_name(index));
        if !path.is_file() {
            first_missing = Some(index);
            break;
        }
        scan.segments.push(path);
    }

    let Some(missing) = first_missing else {
        scan.limit_reached = true;
        return scan;
    };

    scan.gap = lowest_index_above(dir, missing).map(|next_present| SegmentGap {
        missing,
        next_present,
    });
    scan
}

fn lowest_index_above(dir: &Path, missing: u32) -> Option<u32> {
    let entries = fs::read_dir(dir).ok()?;
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| parse_segment_index(&entry.file_name().to_string_lossy()))
        .filter(|index| *index > missing)
        .min()
}

/// Render concat demuxer directives, one `file '<path>'` line per segment.
pub fn render_manifest(segments: &[PathBuf], style: ManifestPathStyle) -> io::Result<String> {
    let mut manifest = String::new();
    for segment in segments {
        let path = match style {
            ManifestPathStyle::Joined => segment.clone(),
            ManifestPathStyle::Absolute => fs::canonicalize(segment)?,
        };
        manifest.push_str("file '");
        manifest.push_str(&escape_quoted(&path.to_string_lossy()));
        manifest.push_str("'\n");
    }
    Ok(manifest)
}

/// Escape a path for a single-quoted concat directive.
///
/// The concat demuxer has no escape inside quotes, so a quote closes the
/// string, is escaped, and reopens it.
fn escape_quoted(path: &str) -> String {
    path.replace('\'', r"'\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch_segments(dir: &Path, indices: impl IntoIterator<Item = u32>) {
        for i in indices {
            fs::write(dir.join(segment_file_name(i)), b"ts").unwrap();
        }
    }

    #[test]
    fn contiguous_segments_are_listed_in_order() {
        for n in [1u32, 2, 17, 120] {
            let dir = tempdir().unwrap();
            touch_segments(dir.path(), 1..=n);

            let scan = scan_segments(dir.path(), 999);
            assert_eq!(scan.len(), n as usize);
            assert!(scan.gap.is_none());
            assert!(!scan.limit_reached);

            let manifest = render_manifest(&scan.segments, ManifestPathStyle::Joined).unwrap();
            let lines: Vec<&str> = manifest.lines().collect();
            assert_eq!(lines.len(), n as usize);
            for (i, line) in lines.iter().enumerate() {
                let expected = dir.path().join(format!("segment_{:03}.ts", i + 1));
                assert_eq!(*line, format!("file '{}'", expected.display()));
            }
        }
    }

    #[test]
    fn full_range_of_999_segments() {
        let dir = tempdir().unwrap();
        touch_segments(dir.path(), 1..=999);

        let scan = scan_segments(dir.path(), 999);
        assert_eq!(scan.len(), 999);
        assert!(scan.limit_reached);
        assert!(scan.segments[998].ends_with("segment_999.ts"));
    }

    #[test]
    fn gap_truncates_and_is_reported() {
        let dir = tempdir().unwrap();
        touch_segments(dir.path(), [1, 2, 3, 5]);

        let scan = scan_segments(dir.path(), 999);
        assert_eq!(scan.len(), 3);
        assert_eq!(
            scan.gap,
            Some(SegmentGap {
                missing: 4,
                next_present: 5
            })
        );

        let manifest = render_manifest(&scan.segments, ManifestPathStyle::Joined).unwrap();
        assert!(manifest.contains("segment_003.ts"));
        assert!(!manifest.contains("segment_005.ts"));
        assert_eq!(manifest.lines().count(), 3);
    }

    #[test]
    fn missing_first_segment_with_later_ones() {
        let dir = tempdir().unwrap();
        touch_segments(dir.path(), [2, 3]);

        let scan = scan_segments(dir.path(), 999);
        assert!(scan.is_empty());
        assert_eq!(
            scan.gap,
            Some(SegmentGap {
                missing: 1,
                next_present: 2
            })
        );
    }

    #[test]
    fn empty_workspace() {
        let dir = tempdir().unwrap();
        let scan = scan_segments(dir.path(), 999);
        assert!(scan.is_empty());
        assert!(scan.gap.is_none());
        assert!(!scan.limit_reached);
    }

    #[test]
    fn limit_reached_with_lower_bound() {
        let dir = tempdir().unwrap();
        touch_segments(dir.path(), 1..=5);

        let scan = scan_segments(dir.path(), 3);
        assert_eq!(scan.len(), 3);
        assert!(scan.limit_reached);
        assert!(scan.gap.is_none());
    }

    #[test]
    fn unrelated_files_do_not_count_as_gap() {
        let dir = tempdir().unwrap();
        touch_segments(dir.path(), [1, 2]);
        fs::write(dir.path().join("segment_x.ts"), b"").unwrap();
        fs::write(dir.path().join("audio.aac"), b"").unwrap();

        let scan = scan_segments(dir.path(), 999);
        assert_eq!(scan.len(), 2);
        assert!(scan.gap.is_none());
    }

    #[test]
    fn joined_literal_text() {
        let segments = vec![
            Path::new("temp").join("segment_001.ts"),
            Path::new("temp").join("segment_002.ts"),
        ];
        let manifest = render_manifest(&segments, ManifestPathStyle::Joined).unwrap();
        #[cfg(unix)]
        assert_eq!(
            manifest,
            "file 'temp/segment_001.ts'\nfile 'temp/segment_002.ts'\n"
        );
        assert_eq!(manifest.lines().count(), 2);
    }

    #[test]
    fn absolute_style_canonicalizes() {
        let dir = tempdir().unwrap();
        touch_segments(dir.path(), [1]);
        let scan = scan_segments(dir.path(), 999);

        let manifest = render_manifest(&scan.segments, ManifestPathStyle::Absolute).unwrap();
        let canonical = fs::canonicalize(dir.path().join("segment_001.ts")).unwrap();
        assert_eq!(manifest, format!("file '{}'\n", canonical.display()));
    }

    #[test]
    fn absolute_style_fails_for_missing_file() {
        let segments = vec![PathBuf::from("/nonexistent/hlsmux/segment_001.ts")];
        assert!(render_manifest(&segments, ManifestPathStyle::Absolute).is_err());
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(escape_quoted("it's/segment_001.ts"), r"it'\''s/segment_001.ts");
        let manifest = render_manifest(
            &[PathBuf::from("it's").join("segment_001.ts")],
            ManifestPathStyle::Joined,
        )
        .unwrap();
        assert!(manifest.starts_with(r"file 'it'\''s"));
    }
}
