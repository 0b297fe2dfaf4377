use std::path::PathBuf;

use colored::Colorize;

use self::lexer::Span;

pub mod ast;
pub mod intern;
pub mod lexer;
pub mod parser;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn new_in_memory(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            origin: SourceFileOrigin::Memory,
        }
    }

    pub fn value_of_span(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// 1-based line number of a byte position
    pub fn row_for_position(&self, position: usize) -> usize {
        self.contents[..position].matches('\n').count() + 1
    }

    /// 1-based column of a byte position
    pub fn column_for_position(&self, position: usize) -> usize {
        let line_start = self.contents[..position]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        position - line_start + 1
    }

    pub fn format_span_position(&self, span: Span) -> String {
        format!(
            "{}:{}:{}",
            self.origin,
            self.row_for_position(span.start),
            self.column_for_position(span.start)
        )
    }

    /// Prints the source line containing the start of the span with the
    /// spanned region underlined
    pub fn highlight_span(&self, span: Span) {
        let line_start = self.contents[..span.start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let line_end = self.contents[span.start..]
            .find('\n')
            .map(|i| span.start + i)
            .unwrap_or(self.contents.len());

        let line = &self.contents[line_start..line_end];
        let row = self.row_for_position(span.start);
        let gutter = format!("{row} | ");

        eprintln!("{}{}", gutter.white(), line);

        let underline_start = span.start - line_start;
        let underline_len = span.end.min(line_end).saturating_sub(span.start).max(1);

        eprintln!(
            "{}{}",
            " ".repeat(gutter.len() + underline_start),
            "^".repeat(underline_len).red()
        );
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}
