//! Include/Dependency Resolver.
//!
//! Resolves the target of every `include`/`require` directive against an
//! index of the source tree, falling back to candidate generation and
//! priority scoring when the target cannot be folded or does not exist, and
//! expands the resulting graph per file with cycle detection.

pub mod graph;
pub mod index;
pub mod resolve;

pub use graph::{DependencyGraph, DirectInclude};
pub use index::FileIndex;
pub use resolve::{IncludeResolver, Resolution, ScoredCandidate};
