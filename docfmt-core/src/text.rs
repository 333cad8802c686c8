//! Text spans and change sets exchanged between change computation and the
//! transaction coordinator.
//!
//! A change set is valid when its spans are sorted by start, do not overlap, stay
//! inside the snapshot and fall on UTF-8 character boundaries.

use std::fmt;

/// Half-open byte range `[start, end)` over a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when `other` lies entirely inside this span.
    pub fn contains_span(&self, other: &TextSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

/// Replacement of `span` in the original snapshot with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub span: TextSpan,
    pub new_text: String,
}

impl TextChange {
    pub fn new(span: TextSpan, new_text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: new_text.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(TextSpan::new(offset, offset), text)
    }

    pub fn delete(span: TextSpan) -> Self {
        Self::new(span, String::new())
    }

    /// Byte length change this edit causes.
    pub fn delta(&self) -> isize {
        self.new_text.len() as isize - self.span.len() as isize
    }
}

/// Why a change set cannot be applied to a given text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeSetError {
    #[error("change {index} has an inverted span {span}")]
    Inverted { index: usize, span: TextSpan },
    #[error("change {index} ({span}) overlaps or precedes the previous change")]
    Unordered { index: usize, span: TextSpan },
    #[error("change {index} ({span}) exceeds text length {len}")]
    OutOfBounds {
        index: usize,
        span: TextSpan,
        len: usize,
    },
    #[error("change {index} ({span}) splits a character")]
    NotCharBoundary { index: usize, span: TextSpan },
}

/// Checks that `changes` form a valid change set over `text`.
pub fn validate_changes(text: &str, changes: &[TextChange]) -> Result<(), ChangeSetError> {
    let mut previous_end = 0usize;
    for (index, change) in changes.iter().enumerate() {
        let span = change.span;
        if span.start > span.end {
            return Err(ChangeSetError::Inverted { index, span });
        }
        if span.end > text.len() {
            return Err(ChangeSetError::OutOfBounds {
                index,
                span,
                len: text.len(),
            });
        }
        if index > 0 && span.start < previous_end {
            return Err(ChangeSetError::Unordered { index, span });
        }
        if !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end) {
            return Err(ChangeSetError::NotCharBoundary { index, span });
        }
        previous_end = span.end;
    }
    Ok(())
}

/// Applies a whole change set, or nothing if it is invalid.
pub fn apply_changes(text: &str, changes: &[TextChange]) -> Result<String, ChangeSetError> {
    validate_changes(text, changes)?;
    let growth: isize = changes.iter().map(TextChange::delta).sum();
    let mut out = String::with_capacity((text.len() as isize + growth).max(0) as usize);
    let mut cursor = 0;
    for change in changes {
        out.push_str(&text[cursor..change.span.start]);
        out.push_str(&change.new_text);
        cursor = change.span.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Maps an offset in the original text to the edited text.
///
/// Offsets inside a replaced span land at the end of its replacement.
pub fn map_offset(offset: usize, changes: &[TextChange]) -> usize {
    let mut shift: isize = 0;
    for change in changes {
        let span = change.span;
        if offset < span.start || (offset == span.start && !span.is_empty()) {
            break;
        }
        if offset < span.end {
            return (span.start as isize + shift) as usize + change.new_text.len();
        }
        shift += change.delta();
    }
    (offset as isize + shift).max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_changes_replaces_all_spans() {
        let text = "let  x =1;\nlet y=2;\n";
        let changes = vec![
            TextChange::new(TextSpan::new(3, 5), " "),
            TextChange::new(TextSpan::new(8, 8), " "),
            TextChange::new(TextSpan::new(16, 17), " = "),
        ];
        assert_eq!(
            apply_changes(text, &changes).unwrap(),
            "let x = 1;\nlet y = 2;\n"
        );
    }

    #[test]
    fn overlapping_changes_are_rejected_whole() {
        let changes = vec![
            TextChange::new(TextSpan::new(0, 4), "a"),
            TextChange::new(TextSpan::new(2, 6), "b"),
        ];
        assert_eq!(
            apply_changes("abcdefgh", &changes),
            Err(ChangeSetError::Unordered {
                index: 1,
                span: TextSpan::new(2, 6)
            })
        );
    }

    #[test]
    fn out_of_bounds_and_char_boundaries_are_rejected() {
        assert!(matches!(
            validate_changes("abc", &[TextChange::delete(TextSpan::new(1, 9))]),
            Err(ChangeSetError::OutOfBounds { len: 3, .. })
        ));
        assert!(matches!(
            validate_changes("é", &[TextChange::delete(TextSpan::new(0, 1))]),
            Err(ChangeSetError::NotCharBoundary { .. })
        ));
    }

    #[test]
    fn map_offset_follows_edits() {
        let changes = vec![
            TextChange::insert(2, "xx"),
            TextChange::new(TextSpan::new(5, 8), "y"),
        ];
        assert_eq!(map_offset(0, &changes), 0);
        assert_eq!(map_offset(2, &changes), 4);
        assert_eq!(map_offset(4, &changes), 6);
        assert_eq!(map_offset(6, &changes), 8);
        assert_eq!(map_offset(10, &changes), 10);
    }

    #[test]
    fn empty_change_set_is_identity() {
        assert_eq!(apply_changes("same", &[]).unwrap(), "same");
        assert_eq!(map_offset(3, &[]), 3);
    }
}
