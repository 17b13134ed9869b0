//! nightjar_core: Core utilities for the nightjar JavaScript front end.
//!
//! Provides arena allocation, atom interning, source positions, and the
//! ordered map used by the binding tables.

pub mod arena;
pub mod collections;
pub mod intern;
pub mod text;

// Re-export commonly used types
pub use arena::ParseArena;
pub use intern::{Atom, AtomInterner, CommonAtoms};
pub use text::{SourcePos, SourceSpan};
