//! Per-function parse contexts and function summaries.
//!
//! A `ParseContext` is pushed when a function's parameter list begins and
//! popped when the function has been fully processed. Its scope stack and
//! lexical-dependency set drive name resolution; its flags accumulate the
//! deoptimization facts that must survive the parse (dynamic scope use,
//! debugger statements, arguments object requirements).

use nightjar_ast::node::{FuncId, GeneratorKind};
use nightjar_bind::def::{DefId, StoreMark};
use nightjar_bind::scope::ScopeStack;
use nightjar_core::collections::OrderedMap;
use nightjar_core::intern::Atom;
use nightjar_core::text::SourceSpan;

bitflags::bitflags! {
    /// Deoptimization and bookkeeping flags for one function (or the
    /// program).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FunctionFlags: u16 {
        /// Contains a direct call to `eval`.
        const USES_EVAL                     = 1 << 0;
        /// Names may be introduced or observed at runtime (`eval`, `with`).
        const BINDINGS_ACCESSED_DYNAMICALLY = 1 << 1;
        /// The scope can grow after parsing (function statements in blocks,
        /// direct eval).
        const HAS_EXTENSIBLE_SCOPE          = 1 << 2;
        /// Contains a `debugger` statement.
        const HAS_DEBUGGER_STATEMENT        = 1 << 3;
        /// The body mentions `arguments`.
        const USES_ARGUMENTS                = 1 << 4;
        /// An arguments object must be created eagerly.
        const NEEDS_ARGS_OBJ                = 1 << 5;
    }
}

impl FunctionFlags {
    /// The flags that propagate unconditionally to the enclosing function:
    /// their effect is not name-specific, so resolution success is
    /// irrelevant.
    pub fn propagated() -> FunctionFlags {
        FunctionFlags::USES_EVAL
            | FunctionFlags::BINDINGS_ACCESSED_DYNAMICALLY
            | FunctionFlags::HAS_DEBUGGER_STATEMENT
    }
}

/// The externally visible binding effects of one parsed function, produced
/// whether the body was materialized or lazily skipped.
#[derive(Debug, Clone)]
pub struct FunctionSummary {
    pub name: Option<Atom>,
    pub span: SourceSpan,
    pub generator_kind: GeneratorKind,
    pub strict: bool,
    pub flags: FunctionFlags,
    pub arg_count: u16,
    pub var_count: u16,
    /// Free variables that escaped this function, in promotion order.
    pub free_names: Vec<Atom>,
    /// Whether the body was skipped by the syntax pre-pass.
    pub lazy: bool,
    pub nested_functions: u32,
}

impl FunctionSummary {
    pub fn placeholder(span: SourceSpan) -> Self {
        Self {
            name: None,
            span,
            generator_kind: GeneratorKind::NotGenerator,
            strict: false,
            flags: FunctionFlags::empty(),
            arg_count: 0,
            var_count: 0,
            free_names: Vec::new(),
            lazy: false,
            nested_functions: 0,
        }
    }
}

/// A label visible to `break`/`continue` at the current point.
#[derive(Debug, Clone, Copy)]
pub struct LabelEntry {
    pub name: Atom,
    /// Whether the label is attached (possibly through further labels) to an
    /// iteration statement, making it a valid `continue` target.
    pub targets_loop: bool,
}

/// Parse-time state for one function (or the program).
#[derive(Debug)]
pub struct ParseContext {
    pub func_id: FuncId,
    pub scopes: ScopeStack,
    /// Names used free in this function, keyed to their placeholder
    /// definitions; reconciled against the enclosing context when this
    /// function's parse completes.
    pub lexdeps: OrderedMap<Atom, DefId>,
    pub flags: FunctionFlags,
    pub generator_kind: GeneratorKind,
    pub strict: bool,
    pub explicit_use_strict: bool,
    /// False for the program context.
    pub is_function: bool,
    /// Function expression (the name, if any, is a named-lambda binding).
    pub is_expression: bool,
    pub fun_name: Option<Atom>,
    pub has_rest: bool,
    /// Set while parsing declaration destructuring patterns so names are
    /// left unbound for the pattern binder instead of being noted as uses.
    pub in_decl_destructuring: bool,
    /// Set while parsing a for-head initializer to suppress `in` as a
    /// relational operator.
    pub parsing_for_init: bool,
    /// Set while parsing the body of a `with` statement.
    pub parsing_with: bool,
    pub labels: Vec<LabelEntry>,
    pub loop_depth: u32,
    pub switch_depth: u32,
    /// First bare `yield` seen, for legacy generator classification.
    pub yield_span: Option<SourceSpan>,
    /// First `return <value>` seen; conflicts with legacy `yield`.
    pub value_return_span: Option<SourceSpan>,
    pub nested_functions: u32,
    /// First duplicated formal, tolerated until destructuring, defaults, or
    /// rest make duplicates illegal.
    pub first_dup_arg: Option<(Atom, SourceSpan)>,
    /// Whether a destructuring/default/rest parameter has been seen.
    pub has_nonsimple_params: bool,
    pub arg_count: u16,
}

impl ParseContext {
    pub fn new(func_id: FuncId, body_block_id: u32, strict: bool, is_function: bool) -> Self {
        Self {
            func_id,
            scopes: ScopeStack::new(body_block_id),
            lexdeps: OrderedMap::new(),
            flags: FunctionFlags::empty(),
            generator_kind: GeneratorKind::NotGenerator,
            strict,
            explicit_use_strict: false,
            is_function,
            is_expression: false,
            fun_name: None,
            has_rest: false,
            in_decl_destructuring: false,
            parsing_for_init: false,
            parsing_with: false,
            labels: Vec::new(),
            loop_depth: 0,
            switch_depth: 0,
            yield_span: None,
            value_return_span: None,
            nested_functions: 0,
            first_dup_arg: None,
            has_nonsimple_params: false,
            arg_count: 0,
        }
    }

    /// The block id uses are currently being noted in.
    pub fn current_block_id(&self) -> u32 {
        self.scopes.innermost().block_id
    }

    /// Drop lexical dependencies created during an abandoned speculative
    /// parse.
    pub fn rollback_lexdeps(&mut self, mark: &StoreMark) {
        let stale: Vec<Atom> = self
            .lexdeps
            .iter()
            .filter(|(_, def)| mark.covers_def(**def))
            .map(|(atom, _)| *atom)
            .collect();
        for atom in stale {
            self.lexdeps.remove(&atom);
        }
    }
}
