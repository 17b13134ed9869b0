//! The recursive-descent parser engine.
//!
//! One pass over the token stream builds the AST (through the node builder)
//! and resolves names at the same time. The engine is generic over the
//! builder, so the same grammar code drives both the full parse and the
//! syntax pre-pass; when the pre-pass aborts, the affected function is
//! re-parsed with the full builder from a saved token position.

use crate::builder::{
    AssignTarget, BailoutCause, ForInitArg, ForTargetArg, FullBuilder, FunctionBodyArg,
    FunctionDesc, NodeBuilder, ParseAbort, ParseOutcome, ReparseReason, SyntaxBuilder,
};
use crate::context::{FunctionFlags, FunctionSummary, LabelEntry, ParseContext};
use crate::precedence::{binary_op_for_token, precedence, PRECEDENCE_CLASSES};
use nightjar_ast::kind::{AssignOp, UnaryOp};
use nightjar_ast::node::{
    DeclKind, ForInKind, FuncId, GeneratorKind, NameBinding, Program, PropertyKey, PropertyKind,
};
use nightjar_bind::def::{DefFlags, DefId, DefKind, DefStore, LexicalSlot};
use nightjar_bind::scope::{Defined, ScopeKind};
use nightjar_core::arena::ParseArena;
use nightjar_core::intern::{Atom, AtomInterner, CommonAtoms};
use nightjar_core::text::{SourcePos, SourceSpan};
use nightjar_diagnostics::{messages, Diagnostic, DiagnosticCollection, DiagnosticMessage, Severity};
use nightjar_lexer::{LookaheadMode, TokenKind, TokenStream};
use rustc_hash::FxHashMap;

use LookaheadMode::{Operand, Operator};

/// Recursion bound for statement/expression nesting; exceeded depth fails
/// with a dedicated diagnostic rather than overflowing the native stack.
const MAX_RECURSION_DEPTH: u32 = 256;

/// Limit on block scopes per compilation unit.
const MAX_BLOCK_SCOPES: u32 = 1 << 20;

/// Limit on definitions per compilation unit.
const MAX_BINDINGS: usize = 1 << 20;

/// Parse configuration.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Whether inner function bodies may be skipped by the syntax pre-pass,
    /// recording only their binding effects.
    pub lazy_functions: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            lazy_functions: true,
        }
    }
}

/// Counters describing what the two-tier strategy did during a parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseStats {
    /// Syntax pre-passes abandoned in favor of a full parse.
    pub syntax_bailouts: u32,
    /// Function re-parses forced by a late "use strict" directive.
    pub directive_reparses: u32,
}

/// The result of a successful parse: the AST, per-function binding
/// summaries, the definition store, and any non-fatal diagnostics.
#[derive(Debug)]
pub struct ParsedProgram<'a> {
    pub program: &'a Program<'a>,
    pub functions: Vec<FunctionSummary>,
    pub defs: DefStore,
    pub diagnostics: DiagnosticCollection,
    pub stats: ParseStats,
}

impl<'a> ParsedProgram<'a> {
    pub fn summary(&self, id: FuncId) -> &FunctionSummary {
        &self.functions[id.index()]
    }

    /// The program-level summary.
    pub fn program_summary(&self) -> &FunctionSummary {
        &self.functions[self.program.func_id.index()]
    }

    /// Find the summary for a function with the given name.
    pub fn summary_named(&self, interner: &AtomInterner, name: &str) -> Option<&FunctionSummary> {
        let atom = interner.get(name)?;
        self.functions.iter().find(|f| f.name == Some(atom))
    }
}

/// A parse that reported at least one error.
#[derive(Debug, thiserror::Error)]
#[error("parse failed with {} error(s)", .diagnostics.error_count())]
pub struct ParseFailure {
    pub diagnostics: DiagnosticCollection,
}

// ============================================================================
// Shared parser state
// ============================================================================

/// State shared between the full parse and any syntax pre-passes running
/// over the same token stream: one per compilation unit, owned by no one
/// else, so independent parses can run concurrently.
pub struct ParserCore {
    pub(crate) ts: TokenStream,
    pub(crate) interner: AtomInterner,
    pub(crate) names: CommonAtoms,
    pub(crate) diags: DiagnosticCollection,
    pub(crate) defs: DefStore,
    pub(crate) pcs: Vec<ParseContext>,
    pub(crate) summaries: Vec<FunctionSummary>,
    pub(crate) block_id_gen: u32,
    pub(crate) recursion_depth: u32,
    pub(crate) stats: ParseStats,
    pub(crate) options: ParseOptions,
    source_len: u32,
}

impl ParserCore {
    fn new(interner: &AtomInterner, source: &str, options: ParseOptions) -> Self {
        Self {
            ts: TokenStream::new(source, interner.clone()),
            interner: interner.clone(),
            names: CommonAtoms::new(interner),
            diags: DiagnosticCollection::new(),
            defs: DefStore::new(),
            pcs: Vec::new(),
            summaries: Vec::new(),
            block_id_gen: 0,
            recursion_depth: 0,
            stats: ParseStats::default(),
            options,
            source_len: source.len() as u32,
        }
    }

    #[inline]
    pub(crate) fn pc(&mut self) -> &mut ParseContext {
        self.pcs.last_mut().expect("no active parse context")
    }

    #[inline]
    pub(crate) fn pc_ref(&self) -> &ParseContext {
        self.pcs.last().expect("no active parse context")
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Report a fatal error; the returned value is propagated as `Err`.
    pub(crate) fn error(
        &mut self,
        span: SourceSpan,
        msg: &DiagnosticMessage,
        args: &[&str],
    ) -> ParseAbort {
        self.diags.add(Diagnostic::at(span, msg, args));
        ParseAbort::Error
    }

    pub(crate) fn warning(&mut self, span: SourceSpan, msg: &DiagnosticMessage, args: &[&str]) {
        self.diags.add(Diagnostic::at(span, msg, args));
    }

    /// Report a strict-mode-conditional message: an error in strict code, an
    /// extra warning otherwise.
    pub(crate) fn report_strict(
        &mut self,
        span: SourceSpan,
        msg: &DiagnosticMessage,
        args: &[&str],
    ) -> ParseOutcome<()> {
        if self.pc_ref().strict {
            Err(self.error(span, msg, args))
        } else {
            self.diags
                .add(Diagnostic::at(span, msg, args).with_severity(Severity::ExtraWarning));
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Scopes and bindings
    // ------------------------------------------------------------------

    pub(crate) fn new_block_id(&mut self, span: SourceSpan) -> ParseOutcome<u32> {
        if self.block_id_gen >= MAX_BLOCK_SCOPES {
            return Err(self.error(span, &messages::TOO_MANY_BLOCKS, &[]));
        }
        self.block_id_gen += 1;
        Ok(self.block_id_gen)
    }

    /// Reject binding names that strict mode reserves.
    pub(crate) fn check_strict_binding(
        &mut self,
        atom: Atom,
        span: SourceSpan,
    ) -> ParseOutcome<()> {
        if atom == self.names.eval || atom == self.names.arguments {
            let text = self.interner.resolve(atom).to_string();
            self.report_strict(span, &messages::STRICT_BAD_BINDING, &[&text])?;
        }
        Ok(())
    }

    /// Define a name in the current context, capturing any pending
    /// placeholder for it and applying the redeclaration policy. The caller
    /// handles `Defined::DuplicateArg` (argument policy is grammar-context
    /// dependent); everything else is resolved here.
    pub(crate) fn define_name(
        &mut self,
        atom: Atom,
        span: SourceSpan,
        kind: DefKind,
    ) -> ParseOutcome<Defined> {
        if self.defs.def_count() >= MAX_BINDINGS {
            return Err(self.error(span, &messages::TOO_MANY_BINDINGS, &[]));
        }
        let pc = self.pcs.last_mut().expect("no active parse context");
        let outcome = match pc.scopes.define(&mut self.defs, atom, span, kind) {
            Ok(outcome) => outcome,
            Err(redecl) => {
                let name = self.interner.resolve(atom).to_string();
                let prev = redecl.prev_kind.as_str();
                return Err(self.error(span, &messages::REDECLARED_VAR, &[prev, &name]));
            }
        };
        match outcome {
            Defined::New(def) => {
                // A forward reference may already have a placeholder; its
                // uses move onto the real definition. Block-scoped
                // declarations only capture uses noted at or inside their
                // own block.
                if let Some(placeholder) = pc.lexdeps.get(&atom).copied() {
                    let emptied = if kind.is_lexical() {
                        let min_block = pc.scopes.innermost().block_id;
                        self.defs.capture_uses_from(placeholder, def, min_block)
                    } else {
                        self.defs.retarget_and_splice_uses(placeholder, def);
                        true
                    };
                    if emptied {
                        pc.lexdeps.remove(&atom);
                    }
                }
            }
            Defined::MergedVar(_) | Defined::VarHidesArg(_) | Defined::DuplicateArg { .. } => {}
        }
        Ok(outcome)
    }

    /// Bind one declarator or destructured name, resolving the var/arg
    /// merge policy: `var` over `var` is silent, `var` over an argument is
    /// a warning.
    pub(crate) fn bind_declarator_name(
        &mut self,
        kind: DefKind,
        atom: Atom,
        span: SourceSpan,
    ) -> ParseOutcome<DefId> {
        self.check_strict_binding(atom, span)?;
        let outcome = self.define_name(atom, span, kind)?;
        if let Defined::VarHidesArg(def) = outcome {
            let name = self.interner.resolve(atom).to_string();
            self.warning(span, &messages::VAR_HIDES_ARG, &[&name]);
            return Ok(def);
        }
        Ok(outcome.def())
    }

    /// Record a use of `atom`. Returns `None` inside declaration
    /// destructuring patterns, where names are bindings rather than uses.
    pub(crate) fn note_name_use(
        &mut self,
        atom: Atom,
        span: SourceSpan,
    ) -> ParseOutcome<Option<nightjar_bind::def::UseId>> {
        if self.pc_ref().in_decl_destructuring {
            return Ok(None);
        }
        if atom == self.names.arguments {
            self.pc().flags |= FunctionFlags::USES_ARGUMENTS;
        }
        if self.defs.def_count() >= MAX_BINDINGS {
            return Err(self.error(span, &messages::TOO_MANY_BINDINGS, &[]));
        }
        let pc = self.pcs.last_mut().expect("no active parse context");
        let def = match pc.scopes.lookup_first(atom) {
            Some(def) => def,
            None => match pc.lexdeps.get(&atom).copied() {
                Some(def) => def,
                None => {
                    let def = self.defs.add_def(atom, span, DefKind::Placeholder);
                    pc.lexdeps.insert(atom, def);
                    def
                }
            },
        };
        let block_id = pc.scopes.innermost().block_id;
        Ok(Some(self.defs.note_use(def, span, block_id)))
    }

    // ------------------------------------------------------------------
    // Function boxes
    // ------------------------------------------------------------------

    pub(crate) fn enter_program(&mut self) -> FuncId {
        let span = SourceSpan::new(0, self.source_len);
        let func_id = FuncId(self.summaries.len() as u32);
        self.summaries.push(FunctionSummary::placeholder(span));
        // Body scope of the program is block id 0.
        self.pcs.push(ParseContext::new(func_id, 0, false, false));
        func_id
    }

    pub(crate) fn enter_function(
        &mut self,
        span: SourceSpan,
        strict: bool,
        is_expression: bool,
        fun_name: Option<Atom>,
        generator: GeneratorKind,
    ) -> ParseOutcome<FuncId> {
        let body_block_id = self.new_block_id(span)?;
        let func_id = FuncId(self.summaries.len() as u32);
        self.summaries.push(FunctionSummary::placeholder(span));
        let mut pc = ParseContext::new(func_id, body_block_id, strict, true);
        pc.is_expression = is_expression;
        pc.fun_name = fun_name;
        pc.generator_kind = generator;
        self.pcs.push(pc);
        Ok(func_id)
    }

    /// The odd semantics of `arguments`: a free use of the name inside a
    /// function, or any dynamic name access, forces an implicit
    /// function-scoped binding; rest parameters are incompatible with it.
    pub(crate) fn check_function_arguments(&mut self, body_end: SourceSpan) -> ParseOutcome<()> {
        let arguments = self.names.arguments;
        debug_assert!(self.pc_ref().is_function);

        let placeholder = self.pc().lexdeps.remove(&arguments);
        if let Some(placeholder) = placeholder {
            let def = self.defs.add_def(arguments, body_end, DefKind::Var);
            self.defs.retarget_and_splice_uses(placeholder, def);
            self.defs.def_mut(def).flags |= DefFlags::IMPLICIT_ARGUMENTS;
            let pc = self.pcs.last_mut().expect("no active parse context");
            pc.scopes.adopt_body_binding(arguments, def);
            pc.flags |= FunctionFlags::USES_ARGUMENTS;
        }

        let (has_binding, has_local) = {
            let pc = self.pc_ref();
            match pc.scopes.body().get(arguments) {
                Some(def) => (true, self.defs.def(def).kind != DefKind::Arg),
                None => (false, false),
            }
        };
        let has_rest = self.pc_ref().has_rest;
        let uses_arguments = self.pc_ref().flags.contains(FunctionFlags::USES_ARGUMENTS);
        let dynamic = self
            .pc_ref()
            .flags
            .contains(FunctionFlags::BINDINGS_ACCESSED_DYNAMICALLY);
        let debugger = self
            .pc_ref()
            .flags
            .contains(FunctionFlags::HAS_DEBUGGER_STATEMENT);

        if has_rest && has_local && uses_arguments {
            return Err(self.error(body_end, &messages::ARGUMENTS_AND_REST, &[]));
        }

        // Dynamic name lookup can observe `arguments` even without an
        // explicit mention.
        let mut bound = has_binding;
        if !has_binding && dynamic && !has_rest {
            let def = self.defs.add_def(arguments, body_end, DefKind::Var);
            self.defs.def_mut(def).flags |= DefFlags::IMPLICIT_ARGUMENTS;
            self.pc().scopes.adopt_body_binding(arguments, def);
            bound = true;
        }

        if bound && (dynamic || debugger) {
            self.pc().flags |= FunctionFlags::NEEDS_ARGS_OBJ;
        }
        Ok(())
    }

    /// Finalize the current function: resolve its lexical dependencies
    /// against the enclosing context (transplanting uses or promoting
    /// placeholders one level out), propagate deoptimization flags, assign
    /// body slots, and record the summary.
    pub(crate) fn leave_function(&mut self, lazy: bool) -> FuncId {
        let inner = self.pcs.pop().expect("no function context to leave");
        debug_assert!(inner.is_function);
        let mut free_names = Vec::new();
        {
            let outer = self.pcs.last_mut().expect("function context has no parent");
            for (atom, def) in inner.lexdeps.iter() {
                let (atom, def) = (*atom, *def);
                debug_assert!(self.defs.def(def).is_placeholder());

                // The self-name of a named function expression resolves to
                // the function itself, not to an enclosing binding.
                if Some(atom) == inner.fun_name && inner.is_expression {
                    let d = self.defs.def_mut(def);
                    d.kind = DefKind::NamedLambda;
                    d.flags.remove(DefFlags::PLACEHOLDER);
                    continue;
                }

                free_names.push(atom);
                let outer_def = match outer.scopes.lookup_first(atom) {
                    Some(found) => found,
                    None => match outer.lexdeps.get(&atom).copied() {
                        Some(found) => found,
                        None => {
                            // Promote the dependency one level out under a
                            // fresh placeholder; reusing the inner one would
                            // entangle later block-scoped capture in the
                            // outer function.
                            let fresh =
                                self.defs
                                    .add_def(atom, self.defs.def(def).span, DefKind::Placeholder);
                            outer.lexdeps.insert(atom, fresh);
                            fresh
                        }
                    },
                };
                self.defs.retarget_and_splice_uses(def, outer_def);
                self.defs.def_mut(outer_def).flags |= DefFlags::CLOSED;
            }

            outer.flags |= inner.flags & FunctionFlags::propagated();
            outer.nested_functions += 1;
        }

        let (arg_count, var_count) = self.assign_body_slots(&inner);
        let summary = &mut self.summaries[inner.func_id.index()];
        summary.name = inner.fun_name;
        summary.generator_kind = inner.generator_kind;
        summary.strict = inner.strict;
        summary.flags = inner.flags;
        summary.arg_count = arg_count;
        summary.var_count = var_count;
        summary.free_names = free_names;
        summary.lazy = lazy;
        summary.nested_functions = inner.nested_functions;
        inner.func_id
    }

    /// Finalize the program context: remaining dependencies are genuine
    /// global free variables.
    pub(crate) fn finish_program(&mut self) -> FuncId {
        let pc = self.pcs.pop().expect("no program context");
        debug_assert!(!pc.is_function);
        let free_names: Vec<Atom> = pc.lexdeps.iter().map(|(a, _)| *a).collect();
        let (arg_count, var_count) = self.assign_body_slots(&pc);
        let summary = &mut self.summaries[pc.func_id.index()];
        summary.name = None;
        summary.strict = pc.strict;
        summary.flags = pc.flags;
        summary.arg_count = arg_count;
        summary.var_count = var_count;
        summary.free_names = free_names;
        summary.nested_functions = pc.nested_functions;
        pc.func_id
    }

    /// Assign lexical addresses to body-level bindings now that the scope's
    /// shape is known.
    fn assign_body_slots(&mut self, pc: &ParseContext) -> (u16, u16) {
        let mut arg_count = 0u16;
        let mut var_count = 0u16;
        for (slot, (_, def)) in pc.scopes.body().bindings().enumerate() {
            let d = self.defs.def_mut(def);
            d.slot = Some(LexicalSlot {
                level: 0,
                slot: slot as u16,
            });
            match d.kind {
                DefKind::Arg => arg_count += 1,
                _ => var_count += 1,
            }
        }
        (arg_count, var_count)
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Parses one compilation unit into an arena-allocated AST plus binding
/// summaries.
pub struct Parser<'a> {
    arena: &'a ParseArena,
    core: ParserCore,
}

impl<'a> Parser<'a> {
    pub fn new(arena: &'a ParseArena, interner: &AtomInterner, source: &str) -> Self {
        Self::with_options(arena, interner, source, ParseOptions::default())
    }

    pub fn with_options(
        arena: &'a ParseArena,
        interner: &AtomInterner,
        source: &str,
        options: ParseOptions,
    ) -> Self {
        Self {
            arena,
            core: ParserCore::new(interner, source, options),
        }
    }

    pub fn parse_program(mut self) -> Result<ParsedProgram<'a>, ParseFailure> {
        let source_len = self.core.source_len;
        let func_id = self.core.enter_program();
        let lazy = self.core.options.lazy_functions;
        let result = {
            let mut engine = Engine {
                core: &mut self.core,
                builder: FullBuilder::new(self.arena, lazy),
            };
            engine.program()
        };

        let mut diags = self.core.ts.take_diagnostics();
        diags.extend(std::mem::take(&mut self.core.diags));
        diags.sort();

        match result {
            Ok(statements) => {
                self.core.finish_program();
                if diags.has_errors() {
                    return Err(ParseFailure { diagnostics: diags });
                }
                let strict = self.core.summaries[func_id.index()].strict;
                let statements = self.arena.alloc_vec(statements);
                let program = self.arena.alloc(Program {
                    span: SourceSpan::new(0, source_len),
                    statements,
                    strict,
                    func_id,
                });
                Ok(ParsedProgram {
                    program,
                    functions: self.core.summaries,
                    defs: self.core.defs,
                    diagnostics: diags,
                    stats: self.core.stats,
                })
            }
            Err(_) => Err(ParseFailure { diagnostics: diags }),
        }
    }
}

/// Convenience wrapper: parse `source` with default options.
pub fn parse_program<'a>(
    arena: &'a ParseArena,
    interner: &AtomInterner,
    source: &str,
) -> Result<ParsedProgram<'a>, ParseFailure> {
    Parser::new(arena, interner, source).parse_program()
}

// ============================================================================
// The engine
// ============================================================================

/// The grammar implementation, generic over the node builder. The engine
/// itself never asks which mode it is in; mode-dependent behavior lives
/// behind the builder's methods.
struct Engine<'c, B: NodeBuilder> {
    core: &'c mut ParserCore,
    builder: B,
}

impl<'c, B: NodeBuilder> Engine<'c, B> {
    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    #[inline]
    fn peek(&mut self, mode: LookaheadMode) -> TokenKind {
        self.core.ts.peek(mode)
    }

    #[inline]
    fn get(&mut self, mode: LookaheadMode) -> TokenKind {
        self.core.ts.get(mode)
    }

    #[inline]
    fn match_t(&mut self, kind: TokenKind, mode: LookaheadMode) -> bool {
        self.core.ts.match_token(kind, mode)
    }

    /// Consume `kind` or report "'x' expected".
    fn expect(&mut self, kind: TokenKind, mode: LookaheadMode) -> ParseOutcome<SourceSpan> {
        if self.core.ts.match_token(kind, mode) {
            Ok(self.core.ts.current_span())
        } else {
            let span = self.core.ts.peek_span(mode);
            Err(self
                .core
                .error(span, &messages::EXPECTED_TOKEN, &[kind.display_text()]))
        }
    }

    fn end_span(&self, begin: SourcePos) -> SourceSpan {
        SourceSpan::new(begin, self.core.ts.current_span().end)
    }

    /// Semicolon or an automatic-semicolon-insertion point: line break,
    /// closing brace, or end of input.
    fn match_semicolon(&mut self) -> ParseOutcome<()> {
        match self.peek(Operator) {
            TokenKind::Semi => {
                self.get(Operator);
                Ok(())
            }
            TokenKind::RightBrace | TokenKind::Eof => Ok(()),
            TokenKind::Error => Err(ParseAbort::Error),
            _ => {
                if self.core.ts.peek_on_new_line(Operator) {
                    Ok(())
                } else {
                    let span = self.core.ts.peek_span(Operator);
                    Err(self.core.error(span, &messages::SEMI_BEFORE_STATEMENT, &[]))
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Program and statement lists
    // ------------------------------------------------------------------

    fn program(&mut self) -> ParseOutcome<Vec<B::Stmt>> {
        let stmts = self.statements()?;
        if self.peek(Operand) != TokenKind::Eof {
            let span = self.core.ts.peek_span(Operand);
            return Err(self.core.error(span, &messages::UNEXPECTED_TOKEN, &[]));
        }
        Ok(stmts)
    }

    /// Parse statements until `}` or end of input. At body level, the
    /// leading run of statements is scanned for directives.
    fn statements(&mut self) -> ParseOutcome<Vec<B::Stmt>> {
        let mut list = Vec::new();
        let mut can_have_directives = self.core.pc_ref().scopes.depth() == 1;
        loop {
            match self.peek(Operand) {
                TokenKind::Eof | TokenKind::RightBrace => break,
                TokenKind::Error => return Err(ParseAbort::Error),
                _ => {}
            }
            let mut stmt = self.statement()?;
            if can_have_directives {
                can_have_directives = self.maybe_parse_directive(&mut stmt)?;
            }
            list.push(stmt);
        }
        Ok(list)
    }

    /// Directive-prologue handling. The prologue extends through every bare
    /// string-literal statement; only escape-free literals are recognized
    /// as directives (detected by comparing the token span against the
    /// decoded length, which catches escapes without rescanning).
    fn maybe_parse_directive(&mut self, stmt: &mut B::Stmt) -> ParseOutcome<bool> {
        let Some((value, span)) = self.builder.stmt_as_string_directive(stmt) else {
            return Ok(false);
        };
        self.builder.mark_in_prologue(stmt);

        let decoded_len = self.core.interner.resolve(value).len() as u32;
        let escape_free = span.len() == decoded_len + 2;
        if !escape_free {
            return Ok(true);
        }

        if value == self.core.names.use_strict {
            self.core.pc().explicit_use_strict = true;
            if !self.core.pc_ref().strict {
                if self.core.pc_ref().is_function {
                    // The function was entered under pre-strict assumptions
                    // (parameter checks, duplicate formals); rewind and
                    // re-parse it strict.
                    self.core.stats.directive_reparses += 1;
                    return Err(ParseAbort::Reparse(ReparseReason::BecameStrict));
                }
                self.core.pc().strict = true;
            }
        } else if value == self.core.names.use_asm {
            if self.core.pc_ref().is_function {
                self.builder.abort_if_syntax(BailoutCause::UseAsm)?;
            }
            self.core.warning(span, &messages::USE_ASM_DIRECTIVE_FAIL, &[]);
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> ParseOutcome<B::Stmt> {
        self.core.recursion_depth += 1;
        let result = if self.core.recursion_depth > MAX_RECURSION_DEPTH {
            let span = self.core.ts.peek_span(Operand);
            Err(self.core.error(span, &messages::TOO_DEEPLY_NESTED, &[]))
        } else {
            self.statement_inner()
        };
        self.core.recursion_depth -= 1;
        result
    }

    fn statement_inner(&mut self) -> ParseOutcome<B::Stmt> {
        match self.peek(Operand) {
            TokenKind::LeftBrace => self.block_statement(),
            TokenKind::Var => {
                self.get(Operand);
                self.var_statement(DeclKind::Var)
            }
            TokenKind::Let => {
                self.builder
                    .abort_if_syntax(BailoutCause::LexicalDeclaration)?;
                self.get(Operand);
                self.var_statement(DeclKind::Let)
            }
            TokenKind::Const => {
                self.builder
                    .abort_if_syntax(BailoutCause::LexicalDeclaration)?;
                self.get(Operand);
                self.var_statement(DeclKind::Const)
            }
            TokenKind::Semi => {
                self.get(Operand);
                let span = self.core.ts.current_span();
                Ok(self.builder.new_empty(span))
            }
            TokenKind::If => self.if_statement(),
            TokenKind::Do => self.do_while_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Switch => self.switch_statement(),
            TokenKind::Continue => self.continue_statement(),
            TokenKind::Break => self.break_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::With => self.with_statement(),
            TokenKind::Throw => self.throw_statement(),
            TokenKind::Try => self.try_statement(),
            TokenKind::Debugger => self.debugger_statement(),
            TokenKind::Function => self.function_statement(),
            TokenKind::Name => {
                self.get(Operand);
                let atom = self.core.ts.current_atom();
                let name_span = self.core.ts.current_span();
                if self.peek(Operator) == TokenKind::Colon {
                    self.get(Operator);
                    return self.labeled_statement(atom, name_span);
                }
                self.core.ts.unget();
                self.expression_statement()
            }
            TokenKind::Error => Err(ParseAbort::Error),
            TokenKind::Eof => {
                let span = self.core.ts.peek_span(Operand);
                Err(self.core.error(span, &messages::STATEMENT_EXPECTED, &[]))
            }
            _ => self.expression_statement(),
        }
    }

    fn block_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::LeftBrace, Operand)?.begin;
        let block_id = self.core.new_block_id(self.core.ts.current_span())?;
        self.core.pc().scopes.push(ScopeKind::Block, block_id);
        let result = self.statements();
        let result = result.and_then(|stmts| {
            self.expect(TokenKind::RightBrace, Operand)?;
            Ok(stmts)
        });
        self.leave_block();
        let stmts = result?;
        let span = self.end_span(begin);
        let block = self.builder.new_block(stmts, block_id, span);
        Ok(self.builder.block_stmt(block))
    }

    /// Pop the innermost scope, assigning lexical addresses to its
    /// bindings.
    fn leave_block(&mut self) {
        let depth = self.core.pc_ref().scopes.depth() as u16;
        let scope = self.core.pc().scopes.pop();
        let bindings: Vec<DefId> = scope.bindings().map(|(_, d)| d).collect();
        for (slot, def) in bindings.into_iter().enumerate() {
            self.core.defs.def_mut(def).slot = Some(LexicalSlot {
                level: depth - 1,
                slot: slot as u16,
            });
        }
    }

    fn var_statement(&mut self, kind: DeclKind) -> ParseOutcome<B::Stmt> {
        let begin = self.core.ts.current_span().begin;
        let decl = self.var_declarations(kind, false)?;
        self.match_semicolon()?;
        let span = self.end_span(begin);
        let var_decl = self.builder.new_var_decl(kind, decl.declarators, span);
        Ok(self.builder.var_decl_stmt(var_decl))
    }

    fn if_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::If, Operand)?.begin;
        let condition = self.condition()?;
        let consequent = self.statement()?;
        let alternate = if self.match_t(TokenKind::Else, Operand) {
            Some(self.statement()?)
        } else {
            None
        };
        let span = self.end_span(begin);
        Ok(self.builder.new_if(span, condition, consequent, alternate))
    }

    fn condition(&mut self) -> ParseOutcome<B::Expr> {
        self.expect(TokenKind::LeftParen, Operand)?;
        let saved = self.core.pc_ref().parsing_for_init;
        self.core.pc().parsing_for_init = false;
        let expr = self.comma_expression();
        self.core.pc().parsing_for_init = saved;
        let expr = expr?;
        if !self.match_t(TokenKind::RightParen, Operator) {
            let span = self.core.ts.peek_span(Operator);
            return Err(self.core.error(span, &messages::PAREN_AFTER_COND, &[]));
        }
        Ok(expr)
    }

    fn loop_body(&mut self) -> ParseOutcome<B::Stmt> {
        self.core.pc().loop_depth += 1;
        let result = self.statement();
        self.core.pc().loop_depth -= 1;
        result
    }

    fn do_while_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Do, Operand)?.begin;
        let body = self.loop_body()?;
        self.expect(TokenKind::While, Operand)?;
        let condition = self.condition()?;
        // The semicolon after do-while has always been optional.
        self.match_t(TokenKind::Semi, Operator);
        let span = self.end_span(begin);
        Ok(self.builder.new_do_while(span, body, condition))
    }

    fn while_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::While, Operand)?.begin;
        let condition = self.condition()?;
        let body = self.loop_body()?;
        let span = self.end_span(begin);
        Ok(self.builder.new_while(span, condition, body))
    }

    fn switch_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Switch, Operand)?.begin;
        self.expect(TokenKind::LeftParen, Operand)?;
        let discriminant = self.comma_expression()?;
        self.expect(TokenKind::RightParen, Operator)?;
        self.expect(TokenKind::LeftBrace, Operand)?;

        let block_id = self.core.new_block_id(self.core.ts.current_span())?;
        self.core.pc().scopes.push(ScopeKind::Block, block_id);
        self.core.pc().switch_depth += 1;
        let result = self.switch_cases();
        self.core.pc().switch_depth -= 1;
        self.leave_block();
        let cases = result?;

        self.expect(TokenKind::RightBrace, Operand)?;
        let span = self.end_span(begin);
        Ok(self
            .builder
            .new_switch(span, discriminant, cases, block_id))
    }

    fn switch_cases(&mut self) -> ParseOutcome<Vec<B::Case>> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        loop {
            let is_default;
            let case_begin = match self.peek(Operand) {
                TokenKind::Case => {
                    self.get(Operand);
                    is_default = false;
                    self.core.ts.current_span().begin
                }
                TokenKind::Default => {
                    self.get(Operand);
                    let span = self.core.ts.current_span();
                    if seen_default {
                        return Err(self.core.error(span, &messages::TOO_MANY_DEFAULTS, &[]));
                    }
                    seen_default = true;
                    is_default = true;
                    span.begin
                }
                TokenKind::RightBrace | TokenKind::Eof => break,
                _ => {
                    let span = self.core.ts.peek_span(Operand);
                    return Err(self.core.error(span, &messages::STATEMENT_EXPECTED, &[]));
                }
            };
            let test = if is_default {
                None
            } else {
                Some(self.comma_expression()?)
            };
            self.expect(TokenKind::Colon, Operator)?;
            let mut body = Vec::new();
            loop {
                match self.peek(Operand) {
                    TokenKind::Case | TokenKind::Default | TokenKind::RightBrace
                    | TokenKind::Eof => break,
                    TokenKind::Error => return Err(ParseAbort::Error),
                    _ => body.push(self.statement()?),
                }
            }
            let span = self.end_span(case_begin);
            cases.push(self.builder.new_case(span, test, body));
        }
        Ok(cases)
    }

    fn continue_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Continue, Operand)?.begin;
        let label = self.match_label()?;
        let span = self.end_span(begin);
        match label {
            Some(atom) => {
                let entry = self
                    .core
                    .pc_ref()
                    .labels
                    .iter()
                    .find(|l| l.name == atom)
                    .copied();
                match entry {
                    None => return Err(self.core.error(span, &messages::LABEL_NOT_FOUND, &[])),
                    Some(entry) if !entry.targets_loop => {
                        return Err(self.core.error(span, &messages::BAD_CONTINUE, &[]))
                    }
                    Some(_) => {}
                }
            }
            None => {
                if self.core.pc_ref().loop_depth == 0 {
                    return Err(self.core.error(span, &messages::BAD_CONTINUE, &[]));
                }
            }
        }
        self.match_semicolon()?;
        let span = self.end_span(begin);
        Ok(self.builder.new_continue(span, label))
    }

    fn break_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Break, Operand)?.begin;
        let label = self.match_label()?;
        let span = self.end_span(begin);
        match label {
            Some(atom) => {
                if !self.core.pc_ref().labels.iter().any(|l| l.name == atom) {
                    return Err(self.core.error(span, &messages::LABEL_NOT_FOUND, &[]));
                }
            }
            None => {
                let pc = self.core.pc_ref();
                if pc.loop_depth == 0 && pc.switch_depth == 0 {
                    return Err(self.core.error(span, &messages::BAD_BREAK, &[]));
                }
            }
        }
        self.match_semicolon()?;
        let span = self.end_span(begin);
        Ok(self.builder.new_break(span, label))
    }

    /// A label operand on the same line, if present. `break`/`continue` are
    /// restricted productions: a line break forces the no-label form.
    fn match_label(&mut self) -> ParseOutcome<Option<Atom>> {
        if self.peek(Operator) == TokenKind::Name && !self.core.ts.peek_on_new_line(Operator) {
            self.get(Operator);
            Ok(Some(self.core.ts.current_atom()))
        } else {
            Ok(None)
        }
    }

    fn return_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Return, Operand)?.begin;
        let keyword_span = self.core.ts.current_span();
        if !self.core.pc_ref().is_function {
            return Err(self
                .core
                .error(keyword_span, &messages::RETURN_OUTSIDE_FUNCTION, &[]));
        }
        // Restricted production: a line break after `return` ends it.
        let next = self.peek(Operator);
        let ends_statement = matches!(
            next,
            TokenKind::Semi | TokenKind::RightBrace | TokenKind::Eof
        ) || self.core.ts.peek_on_new_line(Operator);
        let argument = if ends_statement {
            None
        } else {
            Some(self.comma_expression()?)
        };
        if argument.is_some() {
            if self.core.pc_ref().generator_kind != GeneratorKind::NotGenerator {
                let name = self.fun_name_for_report();
                return Err(self
                    .core
                    .error(keyword_span, &messages::RETURN_VALUE_IN_GENERATOR, &[&name]));
            }
            if self.core.pc_ref().value_return_span.is_none() {
                self.core.pc().value_return_span = Some(keyword_span);
            }
        }
        self.match_semicolon()?;
        let span = self.end_span(begin);
        Ok(self.builder.new_return(span, argument))
    }

    fn fun_name_for_report(&self) -> String {
        match self.core.pc_ref().fun_name {
            Some(atom) => self.core.interner.resolve(atom).to_string(),
            None => "anonymous".to_string(),
        }
    }

    fn with_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::With, Operand)?.begin;
        let keyword_span = self.core.ts.current_span();
        if self.core.pc_ref().strict {
            return Err(self.core.error(keyword_span, &messages::STRICT_WITH, &[]));
        }
        self.builder.abort_if_syntax(BailoutCause::With)?;
        self.expect(TokenKind::LeftParen, Operand)?;
        let object = self.comma_expression()?;
        self.expect(TokenKind::RightParen, Operator)?;

        self.core.pc().flags |=
            FunctionFlags::BINDINGS_ACCESSED_DYNAMICALLY | FunctionFlags::HAS_EXTENSIBLE_SCOPE;
        let block_id = self.core.new_block_id(keyword_span)?;
        self.core.pc().scopes.push(ScopeKind::With, block_id);
        let saved = self.core.pc_ref().parsing_with;
        self.core.pc().parsing_with = true;
        let body = self.statement();
        self.core.pc().parsing_with = saved;
        self.leave_block();
        let body = body?;

        let span = self.end_span(begin);
        Ok(self.builder.new_with(span, object, body))
    }

    fn labeled_statement(&mut self, atom: Atom, name_span: SourceSpan) -> ParseOutcome<B::Stmt> {
        if self.core.pc_ref().labels.iter().any(|l| l.name == atom) {
            let text = self.core.interner.resolve(atom).to_string();
            return Err(self
                .core
                .error(name_span, &messages::DUPLICATE_LABEL, &[&text]));
        }
        let targets_loop = self.label_targets_loop();
        self.core.pc().labels.push(LabelEntry {
            name: atom,
            targets_loop,
        });
        let body = self.statement();
        self.core.pc().labels.pop();
        let body = body?;
        let span = self.end_span(name_span.begin);
        Ok(self.builder.new_labeled(span, atom, body))
    }

    /// Whether the statement following a label (through any chain of
    /// further labels) is an iteration statement, making the label a valid
    /// `continue` target.
    fn label_targets_loop(&mut self) -> bool {
        let mark = self.core.ts.mark();
        let result = loop {
            match self.peek(Operand) {
                TokenKind::For | TokenKind::While | TokenKind::Do => break true,
                TokenKind::Name => {
                    self.get(Operand);
                    if !self.match_t(TokenKind::Colon, Operator) {
                        break false;
                    }
                }
                _ => break false,
            }
        };
        self.core.ts.seek(mark);
        result
    }

    fn throw_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Throw, Operand)?.begin;
        // Restricted production: no line break between `throw` and its
        // operand, and the operand is required.
        let next_span = self.core.ts.peek_span(Operand);
        if self.core.ts.peek_on_new_line(Operand)
            || matches!(
                self.peek(Operand),
                TokenKind::Semi | TokenKind::RightBrace | TokenKind::Eof
            )
        {
            return Err(self
                .core
                .error(next_span, &messages::EXPRESSION_EXPECTED, &[]));
        }
        let argument = self.comma_expression()?;
        self.match_semicolon()?;
        let span = self.end_span(begin);
        Ok(self.builder.new_throw(span, argument))
    }

    fn try_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Try, Operand)?.begin;
        let block = self.scoped_block()?;

        let mut catches = Vec::new();
        let mut saw_unconditional = false;
        while self.peek(Operand) == TokenKind::Catch {
            self.get(Operand);
            let catch_begin = self.core.ts.current_span();
            if saw_unconditional {
                return Err(self
                    .core
                    .error(catch_begin, &messages::CATCH_AFTER_GENERAL, &[]));
            }
            self.expect(TokenKind::LeftParen, Operand)?;

            let block_id = self.core.new_block_id(catch_begin)?;
            self.core.pc().scopes.push(ScopeKind::Catch, block_id);
            let result = self.catch_tail(catch_begin);
            self.leave_block();
            let (catch, unconditional) = result?;
            saw_unconditional |= unconditional;
            catches.push(catch);
        }

        let finally = if self.match_t(TokenKind::Finally, Operand) {
            Some(self.scoped_block()?)
        } else {
            None
        };

        if catches.is_empty() && finally.is_none() {
            let span = self.core.ts.peek_span(Operand);
            return Err(self
                .core
                .error(span, &messages::CATCH_OR_FINALLY_EXPECTED, &[]));
        }
        let span = self.end_span(begin);
        Ok(self.builder.new_try(span, block, catches, finally))
    }

    /// Parse `<param> [if <guard>] ) { body }` inside an already-pushed
    /// catch scope. Returns the clause and whether it was unconditional.
    fn catch_tail(&mut self, catch_begin: SourceSpan) -> ParseOutcome<(B::Catch, bool)> {
        let param = match self.peek(Operand) {
            TokenKind::LeftBracket | TokenKind::LeftBrace => {
                self.builder.abort_if_syntax(BailoutCause::Destructuring)?;
                let pattern = self.decl_destructuring_pattern()?;
                self.builder
                    .check_destructuring(self.core, &pattern, Some(DefKind::CatchParam))?;
                pattern
            }
            TokenKind::Name => {
                self.get(Operand);
                let atom = self.core.ts.current_atom();
                let span = self.core.ts.current_span();
                self.core.bind_declarator_name(DefKind::CatchParam, atom, span)?;
                self.builder.new_name(atom, span, None)
            }
            _ => {
                let span = self.core.ts.peek_span(Operand);
                return Err(self
                    .core
                    .error(span, &messages::CATCH_IDENTIFIER_EXPECTED, &[]));
            }
        };

        // Conditional catch: `catch (e if expr)`.
        let guard = if self.match_t(TokenKind::If, Operator) {
            Some(self.comma_expression()?)
        } else {
            None
        };
        let unconditional = guard.is_none();
        self.expect(TokenKind::RightParen, Operator)?;
        let body = self.scoped_block()?;
        let span = SourceSpan::new(catch_begin.begin, self.core.ts.current_span().end);
        Ok((self.builder.new_catch(span, param, guard, body), unconditional))
    }

    /// `{ statements }` in its own block scope, returned as a block.
    fn scoped_block(&mut self) -> ParseOutcome<B::Block> {
        let begin = self.expect(TokenKind::LeftBrace, Operand)?.begin;
        let block_id = self.core.new_block_id(self.core.ts.current_span())?;
        self.core.pc().scopes.push(ScopeKind::Block, block_id);
        let result = self.statements();
        let result = result.and_then(|stmts| {
            self.expect(TokenKind::RightBrace, Operand)?;
            Ok(stmts)
        });
        self.leave_block();
        let stmts = result?;
        let span = self.end_span(begin);
        Ok(self.builder.new_block(stmts, block_id, span))
    }

    fn debugger_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Debugger, Operand)?.begin;
        self.core.pc().flags |= FunctionFlags::HAS_DEBUGGER_STATEMENT;
        self.match_semicolon()?;
        let span = self.end_span(begin);
        Ok(self.builder.new_debugger(span))
    }

    fn expression_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.core.ts.peek_span(Operand).begin;
        let expr = self.comma_expression()?;
        self.match_semicolon()?;
        let span = self.end_span(begin);
        Ok(self.builder.new_expr_statement(expr, span))
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Parse a declaration list for `var`/`let`/`const`, binding each name
    /// (or destructuring pattern) as it is seen.
    fn var_declarations(
        &mut self,
        kind: DeclKind,
        in_for_head: bool,
    ) -> ParseOutcome<DeclListInfo<B>> {
        let def_kind = match kind {
            DeclKind::Var => DefKind::Var,
            DeclKind::Let => DefKind::Let,
            DeclKind::Const => DefKind::Const,
        };
        let mut info = DeclListInfo {
            declarators: Vec::new(),
            count: 0,
            first_has_init: false,
        };
        loop {
            let begin = self.core.ts.peek_span(Operand).begin;
            match self.peek(Operand) {
                TokenKind::LeftBracket | TokenKind::LeftBrace => {
                    self.builder.abort_if_syntax(BailoutCause::Destructuring)?;
                    let pattern = self.decl_destructuring_pattern()?;
                    self.builder
                        .check_destructuring(self.core, &pattern, Some(def_kind))?;
                    // In a for-in/for-of head the pattern takes no
                    // initializer; everywhere else one is required.
                    let init = if in_for_head && self.peek_for_in_of().is_some() {
                        None
                    } else {
                        self.expect(TokenKind::Assign, Operator)?;
                        Some(self.assign_expr()?)
                    };
                    if info.count == 0 {
                        info.first_has_init = init.is_some();
                    }
                    let span = self.end_span(begin);
                    info.declarators
                        .push(self.builder.new_declarator(span, pattern, init));
                }
                TokenKind::Name => {
                    self.get(Operand);
                    let atom = self.core.ts.current_atom();
                    let name_span = self.core.ts.current_span();
                    let def = self.core.bind_declarator_name(def_kind, atom, name_span)?;
                    let target = self.builder.new_name(atom, name_span, None);
                    let init = if self.match_t(TokenKind::Assign, Operator) {
                        let value = self.assign_expr()?;
                        self.core.defs.def_mut(def).flags |= DefFlags::ASSIGNED;
                        Some(value)
                    } else {
                        if kind == DeclKind::Const && !in_for_head {
                            return Err(self.core.error(
                                name_span,
                                &messages::CONST_WITHOUT_INITIALIZER,
                                &[],
                            ));
                        }
                        None
                    };
                    if info.count == 0 {
                        info.first_has_init = init.is_some();
                    }
                    let span = self.end_span(begin);
                    info.declarators
                        .push(self.builder.new_declarator(span, target, init));
                }
                _ => {
                    let span = self.core.ts.peek_span(Operand);
                    return Err(self.core.error(span, &messages::IDENTIFIER_EXPECTED, &[]));
                }
            }
            info.count += 1;
            if !self.match_t(TokenKind::Comma, Operator) {
                break;
            }
        }
        Ok(info)
    }

    /// Parse an array/object literal as a declaration pattern: names inside
    /// are left unbound so the pattern binder can claim them.
    fn decl_destructuring_pattern(&mut self) -> ParseOutcome<B::Expr> {
        debug_assert!(matches!(
            self.peek(Operand),
            TokenKind::LeftBracket | TokenKind::LeftBrace
        ));
        let saved = self.core.pc_ref().in_decl_destructuring;
        self.core.pc().in_decl_destructuring = true;
        let result = self.primary_expr();
        self.core.pc().in_decl_destructuring = saved;
        result
    }

    /// Non-consuming look for `in`/`of` after a for-head target.
    fn peek_for_in_of(&mut self) -> Option<ForInKind> {
        match self.peek(Operator) {
            TokenKind::In => Some(ForInKind::In),
            TokenKind::Name => {
                self.get(Operator);
                let is_of = self.core.ts.current_atom() == self.core.names.of;
                self.core.ts.unget();
                if is_of {
                    Some(ForInKind::Of)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // for statements
    // ------------------------------------------------------------------

    fn for_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::For, Operand)?.begin;
        self.expect(TokenKind::LeftParen, Operand)?;
        let mut lexical_scope_pushed = false;
        let result = self.for_statement_tail(begin, &mut lexical_scope_pushed);
        if lexical_scope_pushed {
            self.leave_block();
        }
        result
    }

    /// Classify and parse the head, then the body. The initializer is
    /// parsed with `in` suppressed as a relational operator, then the next
    /// token decides between the three for-statement forms.
    fn for_statement_tail(
        &mut self,
        begin: SourcePos,
        lexical_scope_pushed: &mut bool,
    ) -> ParseOutcome<B::Stmt> {
        let saved_pfi = self.core.pc_ref().parsing_for_init;
        self.core.pc().parsing_for_init = true;
        let head = self.for_head(lexical_scope_pushed);
        self.core.pc().parsing_for_init = saved_pfi;
        let head = head?;

        if let Some(kind) = self.peek_for_in_of() {
            // Consume `in` or the contextual `of`.
            self.get(Operator);
            let head_span = self.core.ts.current_span();

            let target = match head {
                ForHead::None => {
                    return Err(self.core.error(head_span, &messages::BAD_FOR_HEAD, &[]))
                }
                ForHead::Decl(decl_kind, span, info) => {
                    if info.count != 1 {
                        return Err(self.core.error(
                            head_span,
                            &messages::SINGLE_DECL_IN_FOR_IN,
                            &[],
                        ));
                    }
                    // `for (var x = init in o)` survives as a legacy form;
                    // lexical declarations and for-of never take one.
                    if info.first_has_init
                        && (kind == ForInKind::Of || decl_kind.is_lexical())
                    {
                        return Err(self.core.error(head_span, &messages::BAD_FOR_HEAD, &[]));
                    }
                    let decl = self
                        .builder
                        .new_var_decl(decl_kind, info.declarators, span);
                    ForTargetArg::Decl(decl)
                }
                ForHead::Expr(expr) => {
                    self.check_for_in_target(&expr, head_span)?;
                    ForTargetArg::Pattern(expr)
                }
            };

            let object = match kind {
                ForInKind::In => self.comma_expression()?,
                ForInKind::Of => self.assign_expr()?,
            };
            self.expect(TokenKind::RightParen, Operator)?;
            let body = self.loop_body()?;
            let span = self.end_span(begin);
            return Ok(self.builder.new_for_in(span, kind, target, object, body));
        }

        let init = match head {
            ForHead::None => None,
            ForHead::Decl(decl_kind, span, info) => {
                let decl = self
                    .builder
                    .new_var_decl(decl_kind, info.declarators, span);
                Some(ForInitArg::Decl(decl))
            }
            ForHead::Expr(expr) => Some(ForInitArg::Expr(expr)),
        };
        self.expect(TokenKind::Semi, Operator)?;
        let test = if self.peek(Operand) == TokenKind::Semi {
            None
        } else {
            Some(self.comma_expression()?)
        };
        self.expect(TokenKind::Semi, Operator)?;
        let update = if self.peek(Operand) == TokenKind::RightParen {
            None
        } else {
            Some(self.comma_expression()?)
        };
        self.expect(TokenKind::RightParen, Operator)?;
        let body = self.loop_body()?;
        let span = self.end_span(begin);
        Ok(self.builder.new_for(span, init, test, update, body))
    }

    /// Parse the for-head initializer (with `in` suppressed by the caller).
    fn for_head(&mut self, lexical_scope_pushed: &mut bool) -> ParseOutcome<ForHead<B>> {
        match self.peek(Operand) {
            TokenKind::Semi => Ok(ForHead::None),
            TokenKind::Var => {
                self.get(Operand);
                let head_begin = self.core.ts.current_span().begin;
                let info = self.var_declarations(DeclKind::Var, true)?;
                let span = self.end_span(head_begin);
                Ok(ForHead::Decl(DeclKind::Var, span, info))
            }
            kind @ (TokenKind::Let | TokenKind::Const) => {
                self.builder
                    .abort_if_syntax(BailoutCause::LexicalDeclaration)?;
                self.get(Operand);
                let head_begin = self.core.ts.current_span().begin;
                let decl_kind = if kind == TokenKind::Let {
                    DeclKind::Let
                } else {
                    DeclKind::Const
                };
                // Lexical heads get a scope that encloses head and body.
                let block_id = self.core.new_block_id(self.core.ts.current_span())?;
                self.core.pc().scopes.push(ScopeKind::Block, block_id);
                *lexical_scope_pushed = true;
                let info = self.var_declarations(decl_kind, true)?;
                let span = self.end_span(head_begin);
                Ok(ForHead::Decl(decl_kind, span, info))
            }
            _ => Ok(ForHead::Expr(self.comma_expression()?)),
        }
    }

    /// Validate the left-hand side of `for (lhs in/of o)` when it is an
    /// expression rather than a declaration.
    fn check_for_in_target(&mut self, expr: &B::Expr, span: SourceSpan) -> ParseOutcome<()> {
        match self.builder.assignment_target(expr) {
            AssignTarget::Name { atom, use_link } => {
                self.check_strict_assignment(atom, span)?;
                if let Some(use_id) = use_link {
                    self.core.defs.mark_use_assigned(use_id);
                }
                Ok(())
            }
            AssignTarget::PropertyAccess => Ok(()),
            AssignTarget::Pattern => {
                self.builder.abort_if_syntax(BailoutCause::Destructuring)?;
                self.builder.check_destructuring(self.core, expr, None)?;
                Ok(())
            }
            AssignTarget::Unknown => {
                self.builder.abort_if_syntax(BailoutCause::Destructuring)?;
                Err(self.core.error(span, &messages::BAD_FOR_HEAD, &[]))
            }
            AssignTarget::Invalid => Err(self.core.error(span, &messages::BAD_FOR_HEAD, &[])),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Expression (comma operator level).
    fn comma_expression(&mut self) -> ParseOutcome<B::Expr> {
        let begin = self.core.ts.peek_span(Operand).begin;
        let first = self.assign_expr()?;
        if self.peek(Operator) != TokenKind::Comma {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.match_t(TokenKind::Comma, Operator) {
            exprs.push(self.assign_expr()?);
        }
        let span = self.end_span(begin);
        Ok(self.builder.new_comma(exprs, span))
    }

    fn assign_expr(&mut self) -> ParseOutcome<B::Expr> {
        self.core.recursion_depth += 1;
        let result = if self.core.recursion_depth > MAX_RECURSION_DEPTH {
            let span = self.core.ts.peek_span(Operand);
            Err(self.core.error(span, &messages::TOO_DEEPLY_NESTED, &[]))
        } else {
            self.assign_expr_inner()
        };
        self.core.recursion_depth -= 1;
        result
    }

    fn assign_expr_inner(&mut self) -> ParseOutcome<B::Expr> {
        if self.peek(Operand) == TokenKind::Yield {
            return self.yield_expression();
        }

        // The left-hand side is parsed as an ordinary expression first. If
        // `=>` follows, the whole construct was really a parameter list:
        // rewind to the saved position, discard any speculative definitions,
        // and reparse as an arrow function.
        let mark = self.core.ts.mark();
        let dmark = self.core.defs.mark();
        let lhs = self.cond_expr()?;

        let next = self.peek(Operator);
        if next == TokenKind::Arrow {
            self.builder.abort_if_syntax(BailoutCause::ArrowFunction)?;
            if self.core.ts.peek_on_new_line(Operator) {
                let span = self.core.ts.peek_span(Operator);
                return Err(self
                    .core
                    .error(span, &messages::LINE_BREAK_BEFORE_ARROW, &[]));
            }
            self.core.ts.seek(mark);
            self.core.defs.rollback(dmark);
            self.core.pc().rollback_lexdeps(&dmark);
            let begin = self.core.ts.peek_span(Operand).begin;
            let func = self.function_def(FunSynKind::Arrow, begin)?;
            return Ok(self.builder.function_expr(func));
        }

        if next.is_assign_op() {
            self.get(Operator);
            let op_span = self.core.ts.current_span();
            let op = assign_op_for_token(next);
            let flavor = if op == AssignOp::Assign {
                AssignFlavor::Plain
            } else {
                AssignFlavor::Compound
            };
            self.check_and_mark_assignment_lhs(&lhs, flavor, op_span)?;
            let rhs = self.assign_expr()?;
            return Ok(self.builder.new_assign(op, lhs, rhs));
        }

        Ok(lhs)
    }

    fn yield_expression(&mut self) -> ParseOutcome<B::Expr> {
        self.get(Operand);
        let keyword_span = self.core.ts.current_span();
        if !self.core.pc_ref().is_function {
            return Err(self
                .core
                .error(keyword_span, &messages::YIELD_OUTSIDE_FUNCTION, &[]));
        }
        if self.core.pc_ref().generator_kind == GeneratorKind::NotGenerator {
            // A bare yield retroactively makes the function a legacy
            // generator, unless a value-returning return was already seen.
            if self.core.pc_ref().value_return_span.is_some() {
                let name = self.fun_name_for_report();
                return Err(self
                    .core
                    .error(keyword_span, &messages::YIELD_AFTER_VALUE_RETURN, &[&name]));
            }
            self.core.pc().generator_kind = GeneratorKind::Legacy;
        }
        if self.core.pc_ref().yield_span.is_none() {
            self.core.pc().yield_span = Some(keyword_span);
        }

        let next = self.peek(Operand);
        let ends_operand = matches!(
            next,
            TokenKind::Semi
                | TokenKind::RightBrace
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::Eof
        ) || self.core.ts.peek_on_new_line(Operand);
        let argument = if ends_operand {
            None
        } else {
            Some(self.assign_expr()?)
        };
        let span = self.end_span(keyword_span.begin);
        Ok(self.builder.new_yield(argument, span))
    }

    fn cond_expr(&mut self) -> ParseOutcome<B::Expr> {
        let condition = self.or_expr()?;
        if !self.match_t(TokenKind::Hook, Operator) {
            return Ok(condition);
        }
        // `in` is unambiguous in the middle clause even inside a for-head.
        let saved = self.core.pc_ref().parsing_for_init;
        self.core.pc().parsing_for_init = false;
        let consequent = self.assign_expr();
        self.core.pc().parsing_for_init = saved;
        let consequent = consequent?;
        if !self.match_t(TokenKind::Colon, Operator) {
            let span = self.core.ts.peek_span(Operator);
            return Err(self.core.error(span, &messages::COLON_IN_CONDITIONAL, &[]));
        }
        let alternate = self.assign_expr()?;
        Ok(self
            .builder
            .new_conditional(condition, consequent, alternate))
    }

    /// Shift-reduce loop for the left-associative binary operators. One
    /// stack of (operand, operator) pairs; reduce while the top of the
    /// stack binds at least as tightly as the incoming operator. The `>=`
    /// is what makes every class left-associative.
    fn or_expr(&mut self) -> ParseOutcome<B::Expr> {
        let mut stack: Vec<(B::Expr, nightjar_ast::kind::BinaryOp)> =
            Vec::with_capacity(PRECEDENCE_CLASSES);
        loop {
            let mut pn = self.unary_expr()?;
            let in_allowed = !self.core.pc_ref().parsing_for_init;
            let incoming = binary_op_for_token(self.peek(Operator), in_allowed);
            let incoming_prec = incoming.map(precedence).unwrap_or(0);
            while let Some(&(_, top)) = stack.last() {
                if precedence(top) >= incoming_prec {
                    let (left, op) = stack.pop().expect("stack is non-empty");
                    pn = self.builder.new_binary(op, left, pn);
                } else {
                    break;
                }
            }
            match incoming {
                None => {
                    debug_assert!(stack.is_empty());
                    return Ok(pn);
                }
                Some(op) => {
                    self.get(Operator);
                    stack.push((pn, op));
                    debug_assert!(stack.len() <= PRECEDENCE_CLASSES);
                }
            }
        }
    }

    fn unary_expr(&mut self) -> ParseOutcome<B::Expr> {
        self.core.recursion_depth += 1;
        let result = if self.core.recursion_depth > MAX_RECURSION_DEPTH {
            let span = self.core.ts.peek_span(Operand);
            Err(self.core.error(span, &messages::TOO_DEEPLY_NESTED, &[]))
        } else {
            self.unary_expr_inner()
        };
        self.core.recursion_depth -= 1;
        result
    }

    fn unary_expr_inner(&mut self) -> ParseOutcome<B::Expr> {
        let kind = self.peek(Operand);
        match kind {
            TokenKind::TypeOf
            | TokenKind::Void
            | TokenKind::Not
            | TokenKind::BitNot
            | TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Delete => {
                self.get(Operand);
                let keyword_span = self.core.ts.current_span();
                let op = match kind {
                    TokenKind::TypeOf => UnaryOp::TypeOf,
                    TokenKind::Void => UnaryOp::Void,
                    TokenKind::Not => UnaryOp::Not,
                    TokenKind::BitNot => UnaryOp::BitNot,
                    TokenKind::Add => UnaryOp::Pos,
                    TokenKind::Sub => UnaryOp::Neg,
                    _ => UnaryOp::Delete,
                };
                let operand = self.unary_expr()?;
                if op == UnaryOp::Delete && self.builder.expr_name(&operand).is_some() {
                    self.core
                        .report_strict(keyword_span, &messages::STRICT_DELETE_NAME, &[])?;
                }
                let span = self.end_span(keyword_span.begin);
                Ok(self.builder.new_unary(op, span, operand))
            }
            TokenKind::Inc | TokenKind::Dec => {
                self.get(Operand);
                let keyword_span = self.core.ts.current_span();
                let increment = kind == TokenKind::Inc;
                let operand = self.member_expr(true)?;
                self.check_and_mark_assignment_lhs(
                    &operand,
                    AssignFlavor::IncDec { increment },
                    keyword_span,
                )?;
                let span = self.end_span(keyword_span.begin);
                Ok(self.builder.new_update(increment, true, span, operand))
            }
            _ => {
                let begin = self.core.ts.peek_span(Operand).begin;
                let expr = self.member_expr(true)?;
                // Postfix ++/-- is a restricted production: a line break
                // before it ends the expression instead.
                let next = self.peek(Operator);
                if matches!(next, TokenKind::Inc | TokenKind::Dec)
                    && !self.core.ts.peek_on_new_line(Operator)
                {
                    self.get(Operator);
                    let op_span = self.core.ts.current_span();
                    let increment = next == TokenKind::Inc;
                    self.check_and_mark_assignment_lhs(
                        &expr,
                        AssignFlavor::IncDec { increment },
                        op_span,
                    )?;
                    let span = self.end_span(begin);
                    Ok(self.builder.new_update(increment, false, span, expr))
                } else {
                    Ok(expr)
                }
            }
        }
    }

    /// Member-and-call tower: primary expression followed by any number of
    /// `.name`, `[expr]`, and (when allowed) call suffixes; `new` binds its
    /// callee without call suffixes.
    fn member_expr(&mut self, allow_call: bool) -> ParseOutcome<B::Expr> {
        let begin = self.core.ts.peek_span(Operand).begin;
        let mut expr = if self.match_t(TokenKind::New, Operand) {
            let callee = self.member_expr(false)?;
            let args = if self.peek(Operator) == TokenKind::LeftParen {
                self.get(Operator);
                self.argument_list()?
            } else {
                Vec::new()
            };
            let span = self.end_span(begin);
            self.builder.new_new(callee, args, span)
        } else {
            self.primary_expr()?
        };

        loop {
            match self.peek(Operator) {
                TokenKind::Dot => {
                    self.get(Operator);
                    let property = self.property_name_after_dot()?;
                    let span = self.end_span(begin);
                    expr = self.builder.new_member(expr, property, span);
                }
                TokenKind::LeftBracket => {
                    self.get(Operator);
                    let saved = self.core.pc_ref().parsing_for_init;
                    self.core.pc().parsing_for_init = false;
                    let index = self.comma_expression();
                    self.core.pc().parsing_for_init = saved;
                    let index = index?;
                    self.expect(TokenKind::RightBracket, Operator)?;
                    let span = self.end_span(begin);
                    expr = self.builder.new_index(expr, index, span);
                }
                TokenKind::LeftParen if allow_call => {
                    self.get(Operator);
                    // A direct call to eval can observe and introduce
                    // bindings in this function at runtime.
                    if self.builder.expr_name(&expr) == Some(self.core.names.eval) {
                        self.core.pc().flags |= FunctionFlags::USES_EVAL
                            | FunctionFlags::BINDINGS_ACCESSED_DYNAMICALLY
                            | FunctionFlags::HAS_EXTENSIBLE_SCOPE;
                    }
                    let args = self.argument_list()?;
                    let span = self.end_span(begin);
                    expr = self.builder.new_call(expr, args, span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn property_name_after_dot(&mut self) -> ParseOutcome<NameBinding> {
        let kind = self.get(Operator);
        let span = self.core.ts.current_span();
        if kind == TokenKind::Name {
            return Ok(NameBinding {
                span,
                name: self.core.ts.current_atom(),
            });
        }
        // Keywords are valid property names after a dot.
        if kind.is_keyword() {
            let atom = self.core.interner.intern(kind.display_text());
            return Ok(NameBinding { span, name: atom });
        }
        Err(self.core.error(span, &messages::NAME_AFTER_DOT, &[]))
    }

    /// Call arguments; the opening parenthesis is already consumed.
    fn argument_list(&mut self) -> ParseOutcome<Vec<B::Expr>> {
        let saved = self.core.pc_ref().parsing_for_init;
        self.core.pc().parsing_for_init = false;
        let result = (|| {
            let mut args = Vec::new();
            if self.match_t(TokenKind::RightParen, Operand) {
                return Ok(args);
            }
            loop {
                args.push(self.assign_expr()?);
                if !self.match_t(TokenKind::Comma, Operator) {
                    break;
                }
            }
            self.expect(TokenKind::RightParen, Operator)?;
            Ok(args)
        })();
        self.core.pc().parsing_for_init = saved;
        result
    }

    fn primary_expr(&mut self) -> ParseOutcome<B::Expr> {
        let kind = self.get(Operand);
        let span = self.core.ts.current_span();
        match kind {
            TokenKind::Function => {
                let func = self.function_def(FunSynKind::Expression, span.begin)?;
                Ok(self.builder.function_expr(func))
            }
            TokenKind::LeftBracket => self.array_literal(span.begin),
            TokenKind::LeftBrace => self.object_literal(span.begin),
            TokenKind::LeftParen => self.paren_expression(span.begin),
            TokenKind::Name => {
                let atom = self.core.ts.current_atom();
                let use_link = self.core.note_name_use(atom, span)?;
                Ok(self.builder.new_name(atom, span, use_link))
            }
            TokenKind::String => Ok(self
                .builder
                .new_string(self.core.ts.current_atom(), span)),
            TokenKind::Number => {
                let value = self.core.ts.current().number();
                Ok(self.builder.new_number(value, span))
            }
            TokenKind::RegExp => match self.core.ts.current().value.clone() {
                nightjar_lexer::TokenValue::RegExp { pattern, flags } => {
                    Ok(self.builder.new_regexp(pattern, flags, span))
                }
                _ => unreachable!("regexp token without regexp value"),
            },
            TokenKind::True => Ok(self.builder.new_bool(true, span)),
            TokenKind::False => Ok(self.builder.new_bool(false, span)),
            TokenKind::Null => Ok(self.builder.new_null(span)),
            TokenKind::This => Ok(self.builder.new_this(span)),
            TokenKind::RightParen => {
                // Not expression syntax, but valid as the parameter list of
                // `() => body`. Put the `)` back and return a placeholder;
                // when the caller reaches the `=>` it rewinds and reparses
                // the whole construct as an arrow function.
                if self.peek(Operator) == TokenKind::Arrow {
                    self.core.ts.unget();
                    return Ok(self.builder.new_null(span));
                }
                Err(self.core.error(span, &messages::EXPRESSION_EXPECTED, &[]))
            }
            TokenKind::TripleDot => {
                // Likewise `( ...rest ) => body`.
                if self.match_t(TokenKind::Name, Operand)
                    && self.match_t(TokenKind::RightParen, Operator)
                    && self.peek(Operator) == TokenKind::Arrow
                {
                    self.core.ts.unget();
                    return Ok(self.builder.new_null(span));
                }
                Err(self.core.error(span, &messages::EXPRESSION_EXPECTED, &[]))
            }
            TokenKind::Error => Err(ParseAbort::Error),
            TokenKind::Eof => Err(self.core.error(span, &messages::UNEXPECTED_END, &[])),
            _ => Err(self.core.error(span, &messages::EXPRESSION_EXPECTED, &[])),
        }
    }

    fn paren_expression(&mut self, begin: SourcePos) -> ParseOutcome<B::Expr> {
        let saved = self.core.pc_ref().parsing_for_init;
        self.core.pc().parsing_for_init = false;
        let expr = self.comma_expression();
        self.core.pc().parsing_for_init = saved;
        let expr = expr?;
        self.expect(TokenKind::RightParen, Operator)?;
        let span = self.end_span(begin);
        Ok(self.builder.new_paren(expr, span))
    }

    fn array_literal(&mut self, begin: SourcePos) -> ParseOutcome<B::Expr> {
        let saved = self.core.pc_ref().parsing_for_init;
        self.core.pc().parsing_for_init = false;
        let result = (|| {
            let mut elements = Vec::new();
            loop {
                match self.peek(Operand) {
                    TokenKind::RightBracket | TokenKind::Eof => break,
                    TokenKind::Comma => {
                        // Elision.
                        self.get(Operand);
                        elements.push(None);
                    }
                    _ => {
                        elements.push(Some(self.assign_expr()?));
                        if !self.match_t(TokenKind::Comma, Operator) {
                            break;
                        }
                    }
                }
            }
            if !self.match_t(TokenKind::RightBracket, Operator) {
                let span = self.core.ts.peek_span(Operator);
                return Err(self
                    .core
                    .error(span, &messages::BRACKET_AFTER_ELEMENT, &[]));
            }
            Ok(elements)
        })();
        self.core.pc().parsing_for_init = saved;
        let elements = result?;
        let span = self.end_span(begin);
        Ok(self.builder.new_array(elements, span))
    }

    fn object_literal(&mut self, begin: SourcePos) -> ParseOutcome<B::Expr> {
        const PROP_DATA: u8 = 1;
        const PROP_GETTER: u8 = 2;
        const PROP_SETTER: u8 = 4;

        let saved = self.core.pc_ref().parsing_for_init;
        self.core.pc().parsing_for_init = false;
        let result = (|| {
            let mut properties = Vec::new();
            let mut seen: FxHashMap<Atom, u8> = FxHashMap::default();
            if self.match_t(TokenKind::RightBrace, Operand) {
                return Ok(properties);
            }
            loop {
                let (prop, key_atom, bits) = self.object_property()?;
                let prev = *seen.get(&key_atom).unwrap_or(&0);
                if prev != 0 {
                    let text = self.core.interner.resolve(key_atom).to_string();
                    let span = self.core.ts.current_span();
                    let prev_is_data = prev == PROP_DATA;
                    let is_data = bits == PROP_DATA;
                    if is_data && prev_is_data {
                        // Duplicate data properties are only a strict-mode
                        // error.
                        self.core.report_strict(
                            span,
                            &messages::STRICT_DUPLICATE_PROPERTY,
                            &[&text],
                        )?;
                    } else if is_data != prev_is_data {
                        return Err(self
                            .core
                            .error(span, &messages::ACCESSOR_AFTER_DATA, &[&text]));
                    } else if prev & bits != 0 {
                        return Err(self
                            .core
                            .error(span, &messages::DUPLICATE_ACCESSOR, &[&text]));
                    }
                }
                seen.insert(key_atom, prev | bits);
                properties.push(prop);
                if !self.match_t(TokenKind::Comma, Operator) {
                    break;
                }
                // Trailing comma.
                if self.peek(Operand) == TokenKind::RightBrace {
                    break;
                }
            }
            if !self.match_t(TokenKind::RightBrace, Operand) {
                let span = self.core.ts.peek_span(Operand);
                return Err(self
                    .core
                    .error(span, &messages::BRACE_AFTER_PROPERTIES, &[]));
            }
            Ok(properties)
        })();
        self.core.pc().parsing_for_init = saved;
        let properties = result?;
        let span = self.end_span(begin);
        Ok(self.builder.new_object(properties, span))
    }

    /// One property in an object literal: data property, shorthand, or
    /// get/set accessor. Returns the property, its canonical key atom, and
    /// a bit describing its flavor for duplicate checking.
    fn object_property(&mut self) -> ParseOutcome<(B::Prop, Atom, u8)> {
        const PROP_DATA: u8 = 1;
        const PROP_GETTER: u8 = 2;
        const PROP_SETTER: u8 = 4;

        let prop_begin = self.core.ts.peek_span(Operand).begin;
        let first = self.get(Operand);
        let first_span = self.core.ts.current_span();

        if first == TokenKind::Name {
            let atom = self.core.ts.current_atom();
            let next = self.peek(Operand);
            let next_is_key = matches!(
                next,
                TokenKind::Name | TokenKind::String | TokenKind::Number
            ) || next.is_keyword();
            if (atom == self.core.names.get || atom == self.core.names.set) && next_is_key {
                let is_getter = atom == self.core.names.get;
                let (key, key_atom) = self.property_key()?;
                let func_begin = self.core.ts.peek_span(Operand).begin;
                let accessor_kind = if is_getter {
                    FunSynKind::Getter
                } else {
                    FunSynKind::Setter
                };
                let func = self.function_def(accessor_kind, func_begin)?;
                let value = self.builder.function_expr(func);
                let span = self.end_span(prop_begin);
                let (kind, bits) = if is_getter {
                    (PropertyKind::Getter, PROP_GETTER)
                } else {
                    (PropertyKind::Setter, PROP_SETTER)
                };
                return Ok((
                    self.builder.new_property(span, kind, key, value),
                    key_atom,
                    bits,
                ));
            }

            if self.match_t(TokenKind::Colon, Operator) {
                let value = self.assign_expr()?;
                let span = self.end_span(prop_begin);
                let key = PropertyKey::Ident(NameBinding {
                    span: first_span,
                    name: atom,
                });
                return Ok((
                    self.builder
                        .new_property(span, PropertyKind::Init, key, value),
                    atom,
                    PROP_DATA,
                ));
            }

            // Destructuring shorthand: `{x}` binds the property name to the
            // name `x`.
            if matches!(
                self.peek(Operator),
                TokenKind::Comma | TokenKind::RightBrace
            ) {
                self.builder.abort_if_syntax(BailoutCause::Destructuring)?;
                let use_link = self.core.note_name_use(atom, first_span)?;
                let value = self.builder.new_name(atom, first_span, use_link);
                let span = self.end_span(prop_begin);
                let key = PropertyKey::Ident(NameBinding {
                    span: first_span,
                    name: atom,
                });
                return Ok((
                    self.builder
                        .new_property(span, PropertyKind::Shorthand, key, value),
                    atom,
                    PROP_DATA,
                ));
            }

            let span = self.core.ts.peek_span(Operator);
            return Err(self
                .core
                .error(span, &messages::COLON_AFTER_PROPERTY_ID, &[]));
        }

        self.core.ts.unget();
        let (key, key_atom) = self.property_key()?;
        if !self.match_t(TokenKind::Colon, Operator) {
            let span = self.core.ts.peek_span(Operator);
            return Err(self
                .core
                .error(span, &messages::COLON_AFTER_PROPERTY_ID, &[]));
        }
        let value = self.assign_expr()?;
        let span = self.end_span(prop_begin);
        Ok((
            self.builder
                .new_property(span, PropertyKind::Init, key, value),
            key_atom,
            PROP_DATA,
        ))
    }

    /// A property key: identifier (including keywords), string, or number.
    /// Returns the canonical atom used for duplicate detection.
    fn property_key(&mut self) -> ParseOutcome<(PropertyKey, Atom)> {
        let kind = self.get(Operand);
        let span = self.core.ts.current_span();
        match kind {
            TokenKind::Name => {
                let atom = self.core.ts.current_atom();
                Ok((PropertyKey::Ident(NameBinding { span, name: atom }), atom))
            }
            TokenKind::String => {
                let atom = self.core.ts.current_atom();
                Ok((
                    PropertyKey::String(nightjar_ast::node::StringLit { span, value: atom }),
                    atom,
                ))
            }
            TokenKind::Number => {
                let value = self.core.ts.current().number();
                let atom = self.core.interner.intern(&value.to_string());
                Ok((
                    PropertyKey::Number(nightjar_ast::node::NumberLit { span, value }),
                    atom,
                ))
            }
            k if k.is_keyword() => {
                let atom = self.core.interner.intern(k.display_text());
                Ok((PropertyKey::Ident(NameBinding { span, name: atom }), atom))
            }
            _ => Err(self.core.error(span, &messages::PROPERTY_ID_EXPECTED, &[])),
        }
    }

    // ------------------------------------------------------------------
    // Assignment target validation
    // ------------------------------------------------------------------

    fn check_strict_assignment(&mut self, atom: Atom, span: SourceSpan) -> ParseOutcome<()> {
        if atom == self.core.names.eval || atom == self.core.names.arguments {
            let text = self.core.interner.resolve(atom).to_string();
            self.core
                .report_strict(span, &messages::STRICT_ASSIGN, &[&text])?;
        }
        Ok(())
    }

    /// Validate (and mark) the left-hand side of an assignment, compound
    /// assignment, or increment/decrement.
    fn check_and_mark_assignment_lhs(
        &mut self,
        lhs: &B::Expr,
        flavor: AssignFlavor,
        op_span: SourceSpan,
    ) -> ParseOutcome<()> {
        match self.builder.assignment_target(lhs) {
            AssignTarget::Name { atom, use_link } => {
                self.check_strict_assignment(atom, op_span)?;
                if let Some(use_id) = use_link {
                    self.core.defs.mark_use_assigned(use_id);
                }
                Ok(())
            }
            AssignTarget::PropertyAccess => Ok(()),
            AssignTarget::Pattern => {
                if flavor == AssignFlavor::Plain {
                    self.builder.abort_if_syntax(BailoutCause::Destructuring)?;
                    self.builder.check_destructuring(self.core, lhs, None)?;
                    Ok(())
                } else {
                    Err(self.bad_lhs_error(flavor, op_span))
                }
            }
            AssignTarget::Unknown => {
                // The pre-pass cannot classify this node; the full parse
                // will judge it.
                self.builder.abort_if_syntax(BailoutCause::Destructuring)?;
                Err(self.bad_lhs_error(flavor, op_span))
            }
            AssignTarget::Invalid => Err(self.bad_lhs_error(flavor, op_span)),
        }
    }

    fn bad_lhs_error(&mut self, flavor: AssignFlavor, span: SourceSpan) -> ParseAbort {
        match flavor {
            AssignFlavor::IncDec { increment } => {
                let what = if increment { "increment" } else { "decrement" };
                self.core
                    .error(span, &messages::BAD_INCREMENT_OPERAND, &[what])
            }
            _ => self.core.error(span, &messages::BAD_ASSIGN_TARGET, &[]),
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn function_statement(&mut self) -> ParseOutcome<B::Stmt> {
        let begin = self.expect(TokenKind::Function, Operand)?.begin;
        let func = self.function_def(FunSynKind::Statement, begin)?;
        Ok(self.builder.function_stmt(func))
    }

    /// Parse a function. The name (for statements) binds in the enclosing
    /// context; the parameter list and body are parsed under a retry loop
    /// that handles both directive-driven strictness reparses and
    /// syntax-pre-pass bailouts. Each retry strictly increases commitment
    /// (loose to strict, syntax to full), so the loop is bounded.
    fn function_def(&mut self, kind: FunSynKind, begin: SourcePos) -> ParseOutcome<B::Function> {
        let generator = if matches!(kind, FunSynKind::Statement | FunSynKind::Expression)
            && self.match_t(TokenKind::Mul, Operand)
        {
            GeneratorKind::Star
        } else {
            GeneratorKind::NotGenerator
        };

        let name = match kind {
            FunSynKind::Statement => {
                if self.peek(Operand) != TokenKind::Name {
                    let span = self.core.ts.peek_span(Operand);
                    return Err(self
                        .core
                        .error(span, &messages::FUNCTION_NAME_EXPECTED, &[]));
                }
                self.get(Operand);
                let atom = self.core.ts.current_atom();
                let span = self.core.ts.current_span();
                self.core.check_strict_binding(atom, span)?;
                // Function statements bind like var and hoist; inside a
                // block the binding can be observed dynamically, which
                // makes the enclosing scope extensible.
                let outcome = self.core.define_name(atom, span, DefKind::Var)?;
                if self.core.pc_ref().scopes.depth() > 1 {
                    self.core.pc().flags |= FunctionFlags::HAS_EXTENSIBLE_SCOPE;
                    let def = outcome.def();
                    self.core.defs.def_mut(def).flags |= DefFlags::CLOSED;
                }
                Some(NameBinding { span, name: atom })
            }
            FunSynKind::Expression => {
                if self.peek(Operand) == TokenKind::Name {
                    self.get(Operand);
                    let atom = self.core.ts.current_atom();
                    let span = self.core.ts.current_span();
                    self.core.check_strict_binding(atom, span)?;
                    Some(NameBinding { span, name: atom })
                } else {
                    None
                }
            }
            _ => None,
        };

        let mark = self.core.ts.mark();
        let dmark = self.core.defs.mark();
        let smark = self.core.summaries.len();
        let mut strict = self.core.pc_ref().strict;
        let mut try_syntax = self.builder.syntax_parse_enabled()
            && matches!(kind, FunSynKind::Statement | FunSynKind::Expression);

        loop {
            let pc_depth = self.core.pcs.len();
            if try_syntax {
                let attempt = {
                    let mut pre_pass = Engine {
                        core: &mut *self.core,
                        builder: SyntaxBuilder::new(),
                    };
                    pre_pass.function_args_and_body(kind, name, generator, strict, begin)
                };
                match attempt {
                    Ok(parts) => {
                        // The pre-pass succeeded: record the summaries (this
                        // function and everything nested in it) but
                        // materialize no body.
                        for summary in &mut self.core.summaries[parts.func_id.index()..] {
                            summary.lazy = true;
                        }
                        let desc = FunctionDesc {
                            span: self.end_span(begin),
                            name,
                            generator_kind: parts.generator,
                            is_arrow: false,
                            is_statement: kind == FunSynKind::Statement,
                            strict: parts.strict,
                            func_id: parts.func_id,
                        };
                        return Ok(self.builder.new_function(
                            desc,
                            Vec::new(),
                            FunctionBodyArg::Lazy(parts.body_span),
                        ));
                    }
                    Err(ParseAbort::Error) => {
                        self.core.pcs.truncate(pc_depth);
                        return Err(ParseAbort::Error);
                    }
                    Err(ParseAbort::Reparse(reason)) => {
                        // Bailout: commit this function to a full parse
                        // from the saved position.
                        self.core.pcs.truncate(pc_depth);
                        self.core.summaries.truncate(smark);
                        self.core.stats.syntax_bailouts += 1;
                        self.core.ts.seek(mark);
                        self.core.defs.rollback(dmark);
                        self.core.pc().rollback_lexdeps(&dmark);
                        if reason == ReparseReason::BecameStrict {
                            strict = true;
                        }
                        try_syntax = false;
                        self.builder.disable_syntax_parse();
                        continue;
                    }
                }
            }

            let attempt = self.function_args_and_body(kind, name, generator, strict, begin);
            match attempt {
                Ok(parts) => {
                    let desc = FunctionDesc {
                        span: self.end_span(begin),
                        name,
                        generator_kind: parts.generator,
                        is_arrow: kind == FunSynKind::Arrow,
                        is_statement: kind == FunSynKind::Statement,
                        strict: parts.strict,
                        func_id: parts.func_id,
                    };
                    return Ok(self.builder.new_function(desc, parts.params, parts.body));
                }
                Err(ParseAbort::Reparse(ReparseReason::BecameStrict)) if !strict => {
                    self.core.pcs.truncate(pc_depth);
                    self.core.summaries.truncate(smark);
                    self.core.ts.seek(mark);
                    self.core.defs.rollback(dmark);
                    self.core.pc().rollback_lexdeps(&dmark);
                    strict = true;
                    continue;
                }
                Err(abort) => {
                    self.core.pcs.truncate(pc_depth);
                    return Err(abort);
                }
            }
        }
    }

    /// Parameter list and body, in a fresh function context. The caller
    /// owns retries; on error the caller also unwinds the context stack.
    fn function_args_and_body(
        &mut self,
        kind: FunSynKind,
        name: Option<NameBinding>,
        generator: GeneratorKind,
        strict: bool,
        begin: SourcePos,
    ) -> ParseOutcome<FunParts<B>> {
        let is_expression = matches!(
            kind,
            FunSynKind::Expression | FunSynKind::Getter | FunSynKind::Setter
        );
        let func_id = self.core.enter_function(
            SourceSpan::empty(begin),
            strict,
            is_expression,
            name.map(|n| n.name),
            generator,
        )?;

        let mut params: Vec<B::Param> = Vec::new();
        match kind {
            FunSynKind::Arrow => {
                if self.match_t(TokenKind::LeftParen, Operand) {
                    self.function_arguments(&mut params)?;
                } else {
                    // Single-name arrow: `x => body`.
                    if self.peek(Operand) != TokenKind::Name {
                        let span = self.core.ts.peek_span(Operand);
                        return Err(self.core.error(span, &messages::IDENTIFIER_EXPECTED, &[]));
                    }
                    self.get(Operand);
                    let atom = self.core.ts.current_atom();
                    let span = self.core.ts.current_span();
                    self.core.check_strict_binding(atom, span)?;
                    self.core.define_name(atom, span, DefKind::Arg)?;
                    self.core.pc().arg_count = 1;
                    let binding = NameBinding { span, name: atom };
                    params.push(self.builder.param_name(binding, None));
                }
            }
            _ => {
                self.expect(TokenKind::LeftParen, Operand)?;
                self.function_arguments(&mut params)?;
            }
        }

        let arg_count = self.core.pc_ref().arg_count;
        if kind == FunSynKind::Getter && arg_count != 0 {
            let span = self.core.ts.current_span();
            return Err(self.core.error(span, &messages::GETTER_NO_PARAMS, &[]));
        }
        if kind == FunSynKind::Setter && arg_count != 1 {
            let span = self.core.ts.current_span();
            return Err(self.core.error(span, &messages::SETTER_ONE_PARAM, &[]));
        }

        if kind == FunSynKind::Arrow {
            self.expect(TokenKind::Arrow, Operator)?;
        }

        let (stmts, body_span) = if kind == FunSynKind::Arrow
            && self.peek(Operand) != TokenKind::LeftBrace
        {
            // Concise arrow body: a single expression, implicitly returned.
            let body_begin = self.core.ts.peek_span(Operand).begin;
            let expr = self.assign_expr()?;
            let span = self.end_span(body_begin);
            let ret = self.builder.new_return(span, Some(expr));
            (vec![ret], span)
        } else {
            let body_begin = self.expect(TokenKind::LeftBrace, Operand)?.begin;
            let stmts = self.statements()?;
            self.expect(TokenKind::RightBrace, Operand)?;
            (stmts, self.end_span(body_begin))
        };

        self.core.check_function_arguments(body_span)?;
        let strict_final = self.core.pc_ref().strict;
        let generator_final = self.core.pc_ref().generator_kind;
        self.core.leave_function(false);
        self.core.summaries[func_id.index()].span = self.end_span(begin);

        Ok(FunParts {
            params,
            body: FunctionBodyArg::Parsed(stmts),
            func_id,
            strict: strict_final,
            generator: generator_final,
            body_span,
        })
    }

    /// Formal parameter list; the opening parenthesis is already consumed.
    /// Duplicate simple parameters are tolerated in loose code until
    /// destructuring, defaults, or rest opt the list into stricter rules.
    fn function_arguments(&mut self, params: &mut Vec<B::Param>) -> ParseOutcome<()> {
        if self.match_t(TokenKind::RightParen, Operand) {
            return Ok(());
        }
        loop {
            match self.peek(Operand) {
                TokenKind::TripleDot => {
                    self.get(Operand);
                    self.core.pc().has_nonsimple_params = true;
                    self.check_pending_dup_formal()?;
                    if self.peek(Operand) != TokenKind::Name {
                        let span = self.core.ts.peek_span(Operand);
                        return Err(self.core.error(span, &messages::IDENTIFIER_EXPECTED, &[]));
                    }
                    self.get(Operand);
                    let atom = self.core.ts.current_atom();
                    let span = self.core.ts.current_span();
                    self.core.check_strict_binding(atom, span)?;
                    self.define_formal(atom, span)?;
                    self.core.pc().has_rest = true;
                    let binding = NameBinding { span, name: atom };
                    params.push(self.builder.param_rest(binding));
                    if self.peek(Operator) != TokenKind::RightParen {
                        return Err(self
                            .core
                            .error(span, &messages::REST_PARAMETER_LAST, &[]));
                    }
                }
                TokenKind::LeftBracket | TokenKind::LeftBrace => {
                    self.builder.abort_if_syntax(BailoutCause::Destructuring)?;
                    self.core.pc().has_nonsimple_params = true;
                    self.check_pending_dup_formal()?;
                    let pattern = self.decl_destructuring_pattern()?;
                    self.builder
                        .check_destructuring(self.core, &pattern, Some(DefKind::Arg))?;
                    params.push(self.builder.param_pattern(pattern));
                }
                TokenKind::Name => {
                    self.get(Operand);
                    let atom = self.core.ts.current_atom();
                    let span = self.core.ts.current_span();
                    self.core.check_strict_binding(atom, span)?;
                    self.define_formal(atom, span)?;
                    let default = if self.match_t(TokenKind::Assign, Operator) {
                        self.core.pc().has_nonsimple_params = true;
                        self.check_pending_dup_formal()?;
                        Some(self.assign_expr()?)
                    } else {
                        None
                    };
                    let binding = NameBinding { span, name: atom };
                    params.push(self.builder.param_name(binding, default));
                }
                _ => {
                    let span = self.core.ts.peek_span(Operand);
                    return Err(self.core.error(span, &messages::IDENTIFIER_EXPECTED, &[]));
                }
            }
            self.core.pc().arg_count += 1;
            if !self.match_t(TokenKind::Comma, Operator) {
                break;
            }
        }
        self.expect(TokenKind::RightParen, Operator)?;
        Ok(())
    }

    fn define_formal(&mut self, atom: Atom, span: SourceSpan) -> ParseOutcome<()> {
        let outcome = self.core.define_name(atom, span, DefKind::Arg)?;
        if let Defined::DuplicateArg { .. } = outcome {
            let text = self.core.interner.resolve(atom).to_string();
            if self.core.pc_ref().strict || self.core.pc_ref().has_nonsimple_params {
                return Err(self.core.error(span, &messages::BAD_DUP_FORMAL, &[&text]));
            }
            if self.core.pc_ref().first_dup_arg.is_none() {
                self.core.pc().first_dup_arg = Some((atom, span));
            }
            self.core.warning(span, &messages::DUPLICATE_FORMAL, &[&text]);
        }
        Ok(())
    }

    /// A tolerated duplicate formal becomes an error retroactively once the
    /// parameter list turns out to use destructuring, defaults, or rest.
    fn check_pending_dup_formal(&mut self) -> ParseOutcome<()> {
        if let Some((atom, span)) = self.core.pc_ref().first_dup_arg {
            let text = self.core.interner.resolve(atom).to_string();
            return Err(self.core.error(span, &messages::BAD_DUP_FORMAL, &[&text]));
        }
        Ok(())
    }
}

// ============================================================================
// Engine-local types
// ============================================================================

/// How a function appears in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunSynKind {
    Statement,
    Expression,
    Arrow,
    Getter,
    Setter,
}

/// The grammar context an assignment target appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignFlavor {
    Plain,
    Compound,
    IncDec { increment: bool },
}

/// A parsed declaration list plus the facts the for-head classifier needs.
struct DeclListInfo<B: NodeBuilder> {
    declarators: Vec<B::Declarator>,
    count: usize,
    first_has_init: bool,
}

/// Classified for-loop head.
enum ForHead<B: NodeBuilder> {
    None,
    Decl(DeclKind, SourceSpan, DeclListInfo<B>),
    Expr(B::Expr),
}

/// Everything a function parse attempt produces.
struct FunParts<B: NodeBuilder> {
    params: Vec<B::Param>,
    body: FunctionBodyArg<B>,
    func_id: FuncId,
    strict: bool,
    generator: GeneratorKind,
    body_span: SourceSpan,
}

fn assign_op_for_token(kind: TokenKind) -> AssignOp {
    match kind {
        TokenKind::Assign => AssignOp::Assign,
        TokenKind::AddAssign => AssignOp::AddAssign,
        TokenKind::SubAssign => AssignOp::SubAssign,
        TokenKind::MulAssign => AssignOp::MulAssign,
        TokenKind::DivAssign => AssignOp::DivAssign,
        TokenKind::ModAssign => AssignOp::ModAssign,
        TokenKind::LshAssign => AssignOp::LshAssign,
        TokenKind::RshAssign => AssignOp::RshAssign,
        TokenKind::UrshAssign => AssignOp::UrshAssign,
        TokenKind::BitOrAssign => AssignOp::BitOrAssign,
        TokenKind::BitXorAssign => AssignOp::BitXorAssign,
        TokenKind::BitAndAssign => AssignOp::BitAndAssign,
        _ => unreachable!("not an assignment token: {:?}", kind),
    }
}
