//! A source document and byte offset ↔ (line, column) conversion.

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::LocatedPosition;

/// Extensions of documents that can reference settings.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx"];

/// Whether a path looks like a JavaScript/TypeScript source file.
pub fn is_source_file(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|ext| return SOURCE_EXTENSIONS.contains(&ext));
}

/// An open document: its path, text, and line index.
#[derive(Debug)]
pub struct Document {
    /// Whether the path marks client-side code.
    pub client_scoped: bool,
    /// Line start offsets of `text`.
    pub index: LineIndex,
    /// Path as given on the command line.
    pub path: PathBuf,
    /// Full text.
    pub text: String,
}

impl Document {
    /// Build a document from text already in memory.
    pub fn new(path: PathBuf, text: String, client_scoped: bool) -> Self {
        let index = LineIndex::new(&text);
        return Self { client_scoped, index, path, text };
    }

    /// Read a document from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file cannot be read.
    pub fn read(path: &Path, client_scoped: bool) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|_err| return Error::FileNotFound { path: path.to_path_buf() })?;
        return Ok(Self::new(path.to_path_buf(), text, client_scoped));
    }

    /// Zero-based position of a byte offset.
    pub fn position(&self, offset: usize) -> LocatedPosition {
        return self.index.position(&self.text, offset);
    }

    /// Byte offset of a zero-based position, if it lies inside the document.
    pub fn offset(&self, position: LocatedPosition) -> Option<usize> {
        return self.index.offset(&self.text, position);
    }

    /// Parse a one-based `LINE:COL` argument into a byte offset.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPosition` if the argument is malformed or out of range.
    pub fn offset_of_argument(&self, argument: &str) -> Result<usize, Error> {
        let invalid = || {
            return Error::InvalidPosition {
                file: self.path.clone(),
                position: argument.to_string(),
            };
        };
        let (line, column) = argument.split_once(':').ok_or_else(invalid)?;
        let line: usize = line.trim().parse().map_err(|_err| return invalid())?;
        let column: usize = column.trim().parse().map_err(|_err| return invalid())?;
        let position = LocatedPosition {
            column: column.checked_sub(1).ok_or_else(invalid)?,
            line: line.checked_sub(1).ok_or_else(invalid)?,
        };
        return self.offset(position).ok_or_else(invalid);
    }

    /// Text covered by a byte span, empty if the span is not on char boundaries.
    pub fn slice(&self, span: Range<usize>) -> &str {
        return self.text.get(span).unwrap_or("");
    }
}

/// Byte offsets of line starts. Columns are counted in characters.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Offset of the first byte of each line.
    starts: Vec<usize>,
}

impl LineIndex {
    /// Index every `\n` in `text`.
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| return i.saturating_add(1)));
        return Self { starts };
    }

    /// Zero-based position of `offset` in `text`. Offsets past the end clamp to the end.
    pub fn position(&self, text: &str, offset: usize) -> LocatedPosition {
        let offset = offset.min(text.len());
        let line = self.starts.partition_point(|&start| return start <= offset).saturating_sub(1);
        let line_start = self.starts.get(line).copied().unwrap_or(0);
        let column = text.get(line_start..offset).map_or(0, |s| return s.chars().count());
        return LocatedPosition { column, line };
    }

    /// Byte offset of a zero-based position. The column may point one past the
    /// last character of the line (the end-of-line cursor position).
    pub fn offset(&self, text: &str, position: LocatedPosition) -> Option<usize> {
        let line_start = *self.starts.get(position.line)?;
        let line_end = self
            .starts
            .get(position.line.saturating_add(1))
            .map_or(text.len(), |next| return next.saturating_sub(1));
        let line_text = text.get(line_start..line_end)?;
        let line_text = line_text.strip_suffix('\r').unwrap_or(line_text);

        let mut chars = line_text.char_indices().map(|(i, _)| return i).chain(std::iter::once(line_text.len()));
        let column = chars.nth(position.column)?;
        return Some(line_start.saturating_add(column));
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    const TEXT: &str = "ab\nçd\r\n\nlast";

    #[test]
    fn positions_of_offsets() {
        let index = LineIndex::new(TEXT);
        assert_eq!(index.position(TEXT, 0), LocatedPosition { column: 0, line: 0 });
        assert_eq!(index.position(TEXT, 2), LocatedPosition { column: 2, line: 0 });
        assert_eq!(index.position(TEXT, 3), LocatedPosition { column: 0, line: 1 });
        // `ç` is two bytes but one column.
        assert_eq!(index.position(TEXT, 5), LocatedPosition { column: 1, line: 1 });
        assert_eq!(index.position(TEXT, TEXT.len()), LocatedPosition { column: 4, line: 3 });
    }

    #[test]
    fn offsets_of_positions() {
        let index = LineIndex::new(TEXT);
        assert_eq!(index.offset(TEXT, LocatedPosition { column: 1, line: 1 }), Some(5));
        // End of line before `\r\n`.
        assert_eq!(index.offset(TEXT, LocatedPosition { column: 2, line: 1 }), Some(6));
        assert_eq!(index.offset(TEXT, LocatedPosition { column: 3, line: 1 }), None);
        assert_eq!(index.offset(TEXT, LocatedPosition { column: 0, line: 2 }), Some(8));
        assert_eq!(index.offset(TEXT, LocatedPosition { column: 0, line: 9 }), None);
    }

    #[test]
    fn one_based_arguments() {
        let doc = Document::new(PathBuf::from("a.js"), TEXT.to_string(), false);
        assert_eq!(doc.offset_of_argument("2:2").unwrap(), 5);
        assert!(matches!(doc.offset_of_argument("0:1"), Err(Error::InvalidPosition { .. })));
        assert!(matches!(doc.offset_of_argument("2"), Err(Error::InvalidPosition { .. })));
        assert!(matches!(doc.offset_of_argument("x:1"), Err(Error::InvalidPosition { .. })));
    }

    #[test]
    fn source_file_extensions() {
        assert!(is_source_file(Path::new("imports/ui/app.jsx")));
        assert!(is_source_file(Path::new("server/main.ts")));
        assert!(!is_source_file(Path::new("settings.json")));
        assert!(!is_source_file(Path::new("README")));
    }
}
