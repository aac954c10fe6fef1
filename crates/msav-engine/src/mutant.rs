use msav_ast::ast::{Expr, Span};

use crate::source::Source;

/// One guarded mutant of a source file.
///
/// The replacement is a conditional expression over the original: it
/// evaluates the infected value exactly when `condition` holds and the
/// original value otherwise, so running the mutant under a test that reaches
/// this abstract state observes the infection.
#[derive(Debug, Clone)]
pub struct Mutant {
    /// Mutant id, unique within one file run, starting at 1.
    pub mid: u32,
    pub filename: String,
    /// Byte range of the original expression in the source text.
    pub span: Span,
    pub original: Expr,
    pub replacement: Expr,
    /// The abstract-state condition guarding the infection.
    pub condition: Expr,
}

impl Mutant {
    /// The whole file with the original expression replaced by the guarded
    /// conditional. The span is clamped to the file, so a stale model cannot
    /// panic the renderer.
    pub fn as_file_string(&self, source: &Source) -> String {
        let contents = source.contents();
        let start = self.span.start.min(contents.len());
        let end = self.span.end.clamp(start, contents.len());
        let replacement = self.replacement.to_string();
        let mut out = String::with_capacity(contents.len() + replacement.len());
        out.push_str(&contents[..start]);
        out.push_str(&replacement);
        out.push_str(&contents[end..]);
        out
    }

    /// One line for the mutation log:
    /// `mid:MSAV:::file:line,col:original |==> replacement`.
    pub fn log_line(&self, source: &Source) -> String {
        let (line, col) = source.line_col(self.span.start);
        format!(
            "{}:MSAV:::{}:{},{}:{} |==> {}",
            self.mid, self.filename, line, col, self.original, self.replacement
        )
    }
}
