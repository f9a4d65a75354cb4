//! phpack-core: Core abstractions for the phpack PHP bundler
//!
//! This crate provides:
//! - `ast`: the persisted statement-level AST model shared by the analyzer
//!   and the code generator
//! - `Edit` / `apply_edits()`: offset-based source modification
//! - `Parser` / `MagoParser`: the PHP parser seam
//! - `Visitor`: trait for traversing PHP syntax trees with conditional
//!   context tracking
//! - `LogSink` / `Logger`: the diagnostics sink injected into every component

pub mod ast;
pub mod edit;
pub mod logger;
pub mod parser;
pub mod paths;
pub mod visitor;

pub use ast::{IncludeKind, IncludeRef, NameRef, NodeKind, NodeSpan, StatementNode, DYNAMIC_INCLUDE};
pub use edit::{apply_edits, Edit, EditError};
pub use logger::{ConsoleSink, FileSink, LogLevel, LogSink, Logger, MemorySink, NullSink};
pub use parser::{line_at_offset, span_text, MagoParser, ParseError, Parser};
pub use visitor::{visit, Visitor, WalkContext};
