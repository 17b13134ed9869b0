//! Scope contexts and the per-function scope stack.
//!
//! Each function (and the program itself) parses with its own `ScopeStack`.
//! The bottom scope is the function body, where `var` and argument bindings
//! live; block and catch scopes nest above it; a `with` scope is dynamic and
//! terminates static lookup. Names that fail to resolve in the stack are the
//! caller's problem (they become placeholders in the function's
//! lexical-dependency set).

use crate::def::{DefId, DefKind, DefStore};
use nightjar_core::collections::OrderedMap;
use nightjar_core::intern::Atom;
use nightjar_core::text::SourceSpan;

/// Kind of a scope context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Function body (or program top level): target of `var` hoisting.
    Body,
    /// Block statement, switch body, or loop body scope.
    Block,
    /// Catch clause scope.
    Catch,
    /// `with` scope: dynamic, terminates static lookup.
    With,
}

impl ScopeKind {
    pub fn is_dynamic(self) -> bool {
        matches!(self, ScopeKind::With)
    }
}

/// A single scope context: the binding table for one syntactic scope.
#[derive(Debug)]
pub struct ScopeContext {
    pub kind: ScopeKind,
    pub block_id: u32,
    /// First-declared-wins name table, in declaration order.
    names: OrderedMap<Atom, DefId>,
}

impl ScopeContext {
    fn new(kind: ScopeKind, block_id: u32) -> Self {
        Self {
            kind,
            block_id,
            names: OrderedMap::new(),
        }
    }

    pub fn get(&self, name: Atom) -> Option<DefId> {
        self.names.get(&name).copied()
    }

    /// Iterate bindings in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (Atom, DefId)> + '_ {
        self.names.iter().map(|(a, d)| (*a, *d))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Outcome of a successful `define`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defined {
    /// A fresh definition was created.
    New(DefId),
    /// `var` over an existing `var`: merged silently.
    MergedVar(DefId),
    /// `var` over an argument of the same name: merged; the caller reports
    /// a warning, not an error.
    VarHidesArg(DefId),
    /// Duplicate formal parameter. A fresh definition shadows the old one;
    /// whether this is legal is the caller's policy decision.
    DuplicateArg { new: DefId, prev: DefId },
}

impl Defined {
    pub fn def(self) -> DefId {
        match self {
            Defined::New(d) | Defined::MergedVar(d) | Defined::VarHidesArg(d) => d,
            Defined::DuplicateArg { new, .. } => new,
        }
    }
}

/// An incompatible prior declaration.
#[derive(Debug, Clone, Copy)]
pub struct Redeclaration {
    pub name: Atom,
    pub prev_kind: DefKind,
    pub prev_span: SourceSpan,
}

/// The active-scope stack of the function currently being parsed.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<ScopeContext>,
}

impl ScopeStack {
    /// Create the stack with its body scope.
    pub fn new(body_block_id: u32) -> Self {
        Self {
            scopes: vec![ScopeContext::new(ScopeKind::Body, body_block_id)],
        }
    }

    pub fn push(&mut self, kind: ScopeKind, block_id: u32) {
        debug_assert!(kind != ScopeKind::Body);
        self.scopes.push(ScopeContext::new(kind, block_id));
    }

    /// Pop the innermost scope, returning it for slot assignment and
    /// diagnostics. The body scope is never popped.
    pub fn pop(&mut self) -> ScopeContext {
        debug_assert!(self.scopes.len() > 1);
        self.scopes.pop().expect("scope stack underflow")
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn innermost(&self) -> &ScopeContext {
        self.scopes.last().expect("scope stack is never empty")
    }

    pub fn body(&self) -> &ScopeContext {
        &self.scopes[0]
    }

    /// Whether any scope on the stack is dynamic.
    pub fn in_dynamic_scope(&self) -> bool {
        self.scopes.iter().any(|s| s.kind.is_dynamic())
    }

    /// Install an externally created definition directly in the body scope.
    /// Used for the implicit `arguments` binding, which materializes only
    /// once the function's free uses are known.
    pub fn adopt_body_binding(&mut self, name: Atom, def: DefId) {
        self.scopes[0].names.insert(name, def);
    }

    /// Innermost-scope lookup. The walk stops at (and including) a dynamic
    /// scope: bindings further out may be shadowed at runtime, so static
    /// resolution cannot see past it.
    pub fn lookup_first(&self, name: Atom) -> Option<DefId> {
        for scope in self.scopes.iter().rev() {
            if let Some(def) = scope.get(name) {
                return Some(def);
            }
            if scope.kind.is_dynamic() {
                return None;
            }
        }
        None
    }

    /// Define `name` in the appropriate scope for `kind`, applying the
    /// redeclaration rules:
    ///
    /// - lexical (`let`/`const`/catch) over anything in the same scope is an
    ///   error, and so is anything over an existing lexical in that scope;
    /// - `var` over `var` merges; `var` over an argument merges with a
    ///   warning; `var` over a lexical binding anywhere up to the body scope
    ///   is an error;
    /// - a duplicate argument shadows the previous one and is reported back
    ///   for the caller's policy to judge.
    pub fn define(
        &mut self,
        store: &mut DefStore,
        name: Atom,
        span: SourceSpan,
        kind: DefKind,
    ) -> Result<Defined, Redeclaration> {
        match kind {
            DefKind::Arg => self.define_arg(store, name, span),
            DefKind::Var => self.define_var(store, name, span),
            DefKind::Let | DefKind::Const | DefKind::CatchParam => {
                self.define_lexical(store, name, span, kind)
            }
            DefKind::Placeholder | DefKind::NamedLambda => {
                unreachable!("{:?} definitions are not scope entries", kind)
            }
        }
    }

    fn define_arg(
        &mut self,
        store: &mut DefStore,
        name: Atom,
        span: SourceSpan,
    ) -> Result<Defined, Redeclaration> {
        let prev = self.scopes[0].get(name);
        let def = store.add_def(name, span, DefKind::Arg);
        self.scopes[0].names.insert(name, def);
        match prev {
            Some(prev) => Ok(Defined::DuplicateArg { new: def, prev }),
            None => Ok(Defined::New(def)),
        }
    }

    fn define_var(
        &mut self,
        store: &mut DefStore,
        name: Atom,
        span: SourceSpan,
    ) -> Result<Defined, Redeclaration> {
        // A var declaration is visible at body level, so any lexical binding
        // of the name between here and the body scope conflicts.
        for scope in self.scopes.iter().rev() {
            if let Some(def) = scope.get(name) {
                let prev = store.def(def);
                match prev.kind {
                    DefKind::Let | DefKind::Const | DefKind::CatchParam => {
                        return Err(Redeclaration {
                            name,
                            prev_kind: prev.kind,
                            prev_span: prev.span,
                        });
                    }
                    DefKind::Var => return Ok(Defined::MergedVar(def)),
                    DefKind::Arg => return Ok(Defined::VarHidesArg(def)),
                    DefKind::Placeholder | DefKind::NamedLambda => {}
                }
            }
        }
        let def = store.add_def(name, span, DefKind::Var);
        self.scopes[0].names.insert(name, def);
        Ok(Defined::New(def))
    }

    fn define_lexical(
        &mut self,
        store: &mut DefStore,
        name: Atom,
        span: SourceSpan,
        kind: DefKind,
    ) -> Result<Defined, Redeclaration> {
        let innermost = self.scopes.last_mut().expect("scope stack is never empty");
        if let Some(def) = innermost.names.get(&name).copied() {
            let prev = store.def(def);
            return Err(Redeclaration {
                name,
                prev_kind: prev.kind,
                prev_span: prev.span,
            });
        }
        let def = store.add_def(name, span, kind);
        innermost.names.insert(name, def);
        Ok(Defined::New(def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightjar_core::intern::AtomInterner;

    fn span(n: u32) -> SourceSpan {
        SourceSpan::new(n, n + 1)
    }

    fn setup() -> (AtomInterner, DefStore, ScopeStack) {
        (AtomInterner::new(), DefStore::new(), ScopeStack::new(0))
    }

    #[test]
    fn var_over_var_merges() {
        let (interner, mut store, mut scopes) = setup();
        let x = interner.intern("x");
        let first = scopes.define(&mut store, x, span(0), DefKind::Var).unwrap();
        let second = scopes.define(&mut store, x, span(9), DefKind::Var).unwrap();
        assert!(matches!(second, Defined::MergedVar(d) if d == first.def()));
    }

    #[test]
    fn const_then_var_errors() {
        let (interner, mut store, mut scopes) = setup();
        let x = interner.intern("x");
        scopes.define(&mut store, x, span(0), DefKind::Const).unwrap();
        let err = scopes.define(&mut store, x, span(9), DefKind::Var).unwrap_err();
        assert_eq!(err.prev_kind, DefKind::Const);
    }

    #[test]
    fn lexical_over_lexical_same_block_errors() {
        let (interner, mut store, mut scopes) = setup();
        let x = interner.intern("x");
        scopes.push(ScopeKind::Block, 1);
        scopes.define(&mut store, x, span(0), DefKind::Let).unwrap();
        assert!(scopes.define(&mut store, x, span(5), DefKind::Let).is_err());
    }

    #[test]
    fn let_shadows_outer_var() {
        let (interner, mut store, mut scopes) = setup();
        let x = interner.intern("x");
        let var = scopes.define(&mut store, x, span(0), DefKind::Var).unwrap().def();
        scopes.push(ScopeKind::Block, 1);
        let shadow = scopes.define(&mut store, x, span(5), DefKind::Let).unwrap().def();
        assert_ne!(var, shadow);
        assert_eq!(scopes.lookup_first(x), Some(shadow));
        scopes.pop();
        assert_eq!(scopes.lookup_first(x), Some(var));
    }

    #[test]
    fn var_hides_arg_merges() {
        let (interner, mut store, mut scopes) = setup();
        let a = interner.intern("a");
        let arg = scopes.define(&mut store, a, span(0), DefKind::Arg).unwrap().def();
        let outcome = scopes.define(&mut store, a, span(9), DefKind::Var).unwrap();
        assert!(matches!(outcome, Defined::VarHidesArg(d) if d == arg));
    }

    #[test]
    fn dynamic_scope_stops_lookup() {
        let (interner, mut store, mut scopes) = setup();
        let x = interner.intern("x");
        scopes.define(&mut store, x, span(0), DefKind::Var).unwrap();
        scopes.push(ScopeKind::With, 1);
        assert_eq!(scopes.lookup_first(x), None);
        assert!(scopes.in_dynamic_scope());
        scopes.pop();
        assert!(scopes.lookup_first(x).is_some());
    }
}
