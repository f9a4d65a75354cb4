//! PHP parser seam
//!
//! One trait, one production implementation wrapping `mago-syntax`. The
//! analyzer is generic over `Parser` so tests can substitute failures.

use bumpalo::Bump;
use mago_database::file::FileId;
use mago_span::HasSpan;
use mago_syntax::ast::Program;
use thiserror::Error;

/// Source is not syntactically valid PHP. Fatal for the file, not the run.
#[derive(Debug, Clone, Error)]
#[error("Parse error in {file}:{line}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub message: String,
}

/// Converts PHP source text into a syntax tree.
pub trait Parser {
    fn parse<'a>(
        &self,
        arena: &'a Bump,
        path: &str,
        source: &str,
    ) -> Result<&'a Program<'a>, ParseError>;
}

/// Production parser backed by `mago-syntax`.
#[derive(Debug, Default)]
pub struct MagoParser;

impl MagoParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for MagoParser {
    fn parse<'a>(
        &self,
        arena: &'a Bump,
        path: &str,
        source: &str,
    ) -> Result<&'a Program<'a>, ParseError> {
        let file_id = FileId::new(path);
        let (program, parse_error) = mago_syntax::parser::parse_file_content(arena, file_id, source);

        if let Some(error) = parse_error {
            let offset = error.span().start.offset as usize;
            return Err(ParseError {
                file: path.to_string(),
                line: line_at_offset(source, offset),
                message: error.to_string(),
            });
        }

        Ok(program)
    }
}

/// 1-based line number of a byte offset.
pub fn line_at_offset(source: &str, offset: usize) -> usize {
    let mut line = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
        }
    }
    line
}

/// Text covered by a span.
pub fn span_text<'s>(source: &'s str, span: &mago_span::Span) -> &'s str {
    &source[span.start.offset as usize..span.end.offset as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_php() {
        let arena = Bump::new();
        let parser = MagoParser::new();
        let program = parser.parse(&arena, "test.php", "<?php class Foo {}\n");
        assert!(program.is_ok());
    }

    #[test]
    fn test_parse_error_carries_line() {
        let arena = Bump::new();
        let parser = MagoParser::new();
        let result = parser.parse(&arena, "broken.php", "<?php\n\nclass {{{\n");
        let err = result.err().expect("expected parse error");
        assert_eq!(err.file, "broken.php");
        assert!(err.line >= 1);
    }

    #[test]
    fn test_line_at_offset() {
        let source = "line1\nline2\nline3";
        assert_eq!(line_at_offset(source, 0), 1);
        assert_eq!(line_at_offset(source, 6), 2);
        assert_eq!(line_at_offset(source, 13), 3);
    }
}
