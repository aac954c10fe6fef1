use msav_ast::ast::Span;

/// One source file held in memory, with a precomputed line index.
///
/// The engine never re-reads the file: mutant rendering and log positions
/// both work off this copy, so the output is consistent even if the file
/// changes on disk mid-run.
#[derive(Debug, Clone)]
pub struct Source {
    filename: String,
    contents: String,
    line_starts: Vec<usize>,
}

impl Source {
    pub fn new(filename: impl Into<String>, contents: impl Into<String>) -> Self {
        let contents = contents.into();
        let mut line_starts = vec![0];
        for (i, b) in contents.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            filename: filename.into(),
            contents,
            line_starts,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let col = offset - self.line_starts[line - 1] + 1;
        (line, col)
    }

    /// The text under `span`, clamped to the file.
    pub fn slice(&self, span: Span) -> &str {
        let start = span.start.min(self.contents.len());
        let end = span.end.clamp(start, self.contents.len());
        &self.contents[start..end]
    }
}
