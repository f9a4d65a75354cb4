//! phpack-store: persistent catalog of files, symbols, dependencies, and ASTs
//!
//! The catalog is a single SQLite database. Every operation runs in its own
//! transaction; the database survives process restart and can be reopened by
//! inspection tools.

pub mod model;
mod store;

pub use model::{
    AnalysisStatus, AstNodeRecord, AutoloadKind, AutoloadRuleRecord, DependencyKind,
    DependencyRecord, FileKind, FileRecord, FileUpsert, NewDependency, SymbolKind, SymbolRecord,
};
pub use store::{content_hash, Store, StoreError};
