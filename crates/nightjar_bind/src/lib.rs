//! nightjar_bind: binding definitions and scope contexts.
//!
//! One `DefStore` per parse holds every `Definition` and every name use,
//! addressed by index. A `ScopeStack` per function tracks the nested scope
//! contexts of the function currently being parsed; names that do not
//! resolve within a function become placeholders in that function's
//! lexical-dependency set, reconciled by the parser when the function's
//! parse completes.

pub mod def;
pub mod scope;

pub use def::{DefFlags, DefId, DefKind, DefStore, Definition, LexicalSlot, StoreMark, UseId};
pub use scope::{Redeclaration, ScopeKind, ScopeStack};
