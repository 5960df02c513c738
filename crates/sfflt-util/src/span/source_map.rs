//! Registry of source files, used to turn a [`super::Span`] into the
//! `{file}:{line} Error at '{lexeme}': {message}` diagnostic line the
//! driver prints.

use std::sync::Arc;

use super::{FileId, Span};

#[derive(Clone)]
pub struct SourceFile {
    id: FileId,
    name: String,
    content: Arc<str>,
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    pub fn new(id: usize, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let line_starts = Self::compute_line_starts(&content);
        Self {
            id: FileId(id),
            name: name.into(),
            content,
            line_starts,
        }
    }

    fn compute_line_starts(content: &str) -> Arc<[usize]> {
        let mut line_starts = vec![0];
        for (i, ch) in content.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.into()
    }

    #[inline]
    pub fn id(&self) -> FileId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    #[inline]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Converts a byte offset into 1-based (line, column).
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => (line + 1, 1),
            Err(insert_point) => {
                let line = insert_point - 1;
                let line_start = self.line_starts.get(line).copied().unwrap_or(0);
                (line + 1, offset - line_start + 1)
            }
        }
    }

    /// Returns the 1-based source line, with its trailing newline trimmed.
    pub fn line_at(&self, line: usize) -> Option<&str> {
        let start = self.line_start(line.checked_sub(1)?)?;
        let end = self.line_start(line).unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("line_count", &self.line_count())
            .finish()
    }
}

#[derive(Default)]
pub struct SourceMap {
    files: Vec<Arc<SourceFile>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let id = self.files.len();
        let file = SourceFile::new(id, name, content);
        let file_id = file.id();
        self.files.push(Arc::new(file));
        file_id
    }

    #[inline]
    pub fn get(&self, id: FileId) -> Option<Arc<SourceFile>> {
        self.files.get(id.0).cloned()
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Renders the `{file}:{line}` prefix used by every diagnostic line.
    pub fn location_prefix(&self, span: Span) -> String {
        match self.get(span.file_id) {
            Some(file) => format!("{}:{}", file.name(), span.line),
            None => format!("<unknown>:{}", span.line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_count_counts_newlines() {
        let file = SourceFile::new(0, "a.sf", "line1\nline2\nline3");
        assert_eq!(file.line_count(), 3);
    }

    #[test]
    fn offset_to_line_col_is_one_based() {
        let file = SourceFile::new(0, "a.sf", "var x = 1\nvar y = 2");
        assert_eq!(file.offset_to_line_col(0), (1, 1));
        let (line, _) = file.offset_to_line_col(12);
        assert_eq!(line, 2);
    }

    #[test]
    fn line_at_trims_newline() {
        let file = SourceFile::new(0, "a.sf", "var x = 1\nvar y = 2");
        assert_eq!(file.line_at(1), Some("var x = 1"));
        assert_eq!(file.line_at(2), Some("var y = 2"));
        assert_eq!(file.line_at(3), None);
    }

    #[test]
    fn source_map_location_prefix() {
        let mut map = SourceMap::new();
        let file_id = map.add_file("a.sf", "var x = 1");
        let span = Span::with_file(0, 1, file_id, 1, 1);
        assert_eq!(map.location_prefix(span), "a.sf:1");
    }

    #[test]
    fn source_map_unknown_file() {
        let map = SourceMap::new();
        let span = Span::new(0, 1, 7, 1);
        assert_eq!(map.location_prefix(span), "<unknown>:7");
    }
}
