//! phpack-analyze: dependency analysis for the phpack PHP bundler
//!
//! This crate turns PHP source files into catalog entries and drives the
//! analysis to a fixed point:
//!
//! - `FileCollector` walks one parsed file and gathers symbols,
//!   dependencies, and the lowered statement nodes
//! - `FileAnalyzer` orchestrates per-file analysis against the store
//! - `AutoloadResolver` maps fully-qualified names to candidate files via
//!   PSR-4 / PSR-0 / classmap / files rules plus heuristics
//! - `DependencyResolver` iterates unanalyzed files and unresolved
//!   dependencies until nothing more can be bound
//! - `load_order` produces the declaration order for the bundle

pub mod autoload;
pub mod builtins;
pub mod collector;
pub mod file_analyzer;
pub mod load_order;
pub mod resolver;

pub use autoload::AutoloadResolver;
pub use collector::{resolve_name, CollectedFile, FileCollector};
pub use file_analyzer::{AnalysisOutcome, FileAnalyzer};
pub use load_order::LoadOrderer;
pub use resolver::{DependencyResolver, ResolveError, ResolutionSummary};
