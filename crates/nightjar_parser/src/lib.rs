//! nightjar_parser: the recursive-descent JavaScript parser.
//!
//! Parsing and name resolution happen in one pass; a syntax-only pre-pass
//! skips over inner function bodies until a construct forces a full parse.

pub mod builder;
pub mod context;
pub mod parser;
pub mod precedence;

pub use builder::{BailoutCause, FullBuilder, NodeBuilder, ParseAbort, ReparseReason, SyntaxBuilder};
pub use context::{FunctionFlags, FunctionSummary};
pub use parser::{
    parse_program, ParseFailure, ParseOptions, ParseStats, ParsedProgram, Parser,
};
