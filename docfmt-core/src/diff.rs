//! Line-granular diff between two snapshots of the same document.

use async_trait::async_trait;
use similar::{Algorithm, DiffTag, TextDiff};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::contract::{DiffService, ServiceError};
use crate::document::Document;
use crate::text::{TextChange, TextSpan};

/// [`DiffService`] producing one [`TextChange`] per run of changed lines.
///
/// Changes come out sorted and non-overlapping, expressed against `old`.
#[derive(Debug, Clone, Copy)]
pub struct LineDiffService {
    algorithm: Algorithm,
}

impl Default for LineDiffService {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Myers,
        }
    }
}

impl LineDiffService {
    pub fn line_changes(&self, old: &str, new: &str) -> Vec<TextChange> {
        if old == new {
            return Vec::new();
        }
        let diff = TextDiff::configure()
            .algorithm(self.algorithm)
            .diff_lines(old, new);
        let old_lines = diff.old_slices();
        let new_lines = diff.new_slices();

        let mut old_offsets = Vec::with_capacity(old_lines.len() + 1);
        let mut offset = 0;
        old_offsets.push(0);
        for line in old_lines {
            offset += line.len();
            old_offsets.push(offset);
        }

        let mut changes = Vec::new();
        // (old line range, new line range) of the run being coalesced
        let mut pending: Option<(usize, usize, usize, usize)> = None;
        let flush = |pending: &mut Option<(usize, usize, usize, usize)>,
                         changes: &mut Vec<TextChange>| {
            if let Some((old_start, old_end, new_start, new_end)) = pending.take() {
                changes.push(TextChange::new(
                    TextSpan::new(old_offsets[old_start], old_offsets[old_end]),
                    new_lines[new_start..new_end].concat(),
                ));
            }
        };

        for op in diff.ops() {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            if tag == DiffTag::Equal {
                flush(&mut pending, &mut changes);
                continue;
            }
            pending = Some(match pending {
                Some((old_start, _, new_start, _)) => {
                    (old_start, old_range.end, new_start, new_range.end)
                }
                None => (old_range.start, old_range.end, new_range.start, new_range.end),
            });
        }
        flush(&mut pending, &mut changes);
        changes
    }
}

#[async_trait]
impl DiffService for LineDiffService {
    async fn diff(
        &self,
        old: &Document,
        new: &Document,
        token: CancellationToken,
    ) -> Result<Vec<TextChange>, ServiceError> {
        if token.is_cancelled() {
            return Err("diff cancelled".into());
        }
        let changes = self.line_changes(old.text(), new.text());
        debug!(document = %old.id, changes = changes.len(), "[CHANGES] Line diff computed");
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::apply_changes;

    #[test]
    fn identical_texts_produce_no_changes() {
        assert!(LineDiffService::default()
            .line_changes("a\nb\n", "a\nb\n")
            .is_empty());
    }

    #[test]
    fn separate_line_edits_stay_separate() {
        let old = "use b;\nuse a;\n\nfn main() {\n  run();\n}\n";
        let new = "use b;\nuse c;\n\nfn main() {\n    run();\n}\n";
        let changes = LineDiffService::default().line_changes(old, new);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].span, TextSpan::new(7, 14));
        assert_eq!(changes[0].new_text, "use c;\n");
        assert_eq!(changes[1].new_text, "    run();\n");
        assert_eq!(apply_changes(old, &changes).unwrap(), new);
    }

    #[test]
    fn insertions_deletions_and_missing_final_newline_round_trip() {
        let old = "one\ntwo\nthree";
        let new = "zero\none\nthree\nfour\n";
        let changes = LineDiffService::default().line_changes(old, new);
        assert!(changes.windows(2).all(|w| w[0].span.end <= w[1].span.start));
        assert_eq!(apply_changes(old, &changes).unwrap(), new);
    }
}
