//! The dual-mode node builder.
//!
//! The parser engine is generic over `NodeBuilder` and never branches on
//! which mode it is running in. `FullBuilder` materializes arena AST nodes;
//! `SyntaxBuilder` returns just enough classification for the engine to keep
//! choosing grammar productions, and aborts the pre-pass when it reaches a
//! construct it cannot approximate.

use nightjar_ast::kind::{AssignOp, BinaryOp, UnaryOp};
use nightjar_ast::node::*;
use nightjar_bind::def::UseId;
use nightjar_core::arena::ParseArena;
use nightjar_core::intern::Atom;
use nightjar_core::text::SourceSpan;

// ============================================================================
// Control flow signals
// ============================================================================

/// Why a syntax pre-pass gave up on a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BailoutCause {
    Destructuring,
    With,
    LexicalDeclaration,
    ArrowFunction,
    UseAsm,
}

/// Why a parse attempt must be retried with different settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparseReason {
    /// The syntax pre-pass hit a construct it cannot validate; retry the
    /// function with the full builder.
    SyntaxBailout(BailoutCause),
    /// A "use strict" directive arrived after the function was entered
    /// under pre-strict assumptions; retry strict.
    BecameStrict,
}

/// Non-local exits of grammar productions. `Error` means a diagnostic has
/// already been reported; `Reparse` is an internal signal converted into a
/// retry at function boundaries and never surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAbort {
    Error,
    Reparse(ReparseReason),
}

pub type ParseOutcome<T> = Result<T, ParseAbort>;

// ============================================================================
// Engine-facing argument types
// ============================================================================

/// Classification of an expression in assignment-target position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignTarget {
    Name {
        atom: Atom,
        use_link: Option<UseId>,
    },
    PropertyAccess,
    /// An array or object literal: a destructuring pattern.
    Pattern,
    Invalid,
    /// The builder cannot classify this node (syntax mode); the engine must
    /// abort the pre-pass before judging it.
    Unknown,
}

/// Static description of a function being built.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDesc {
    pub span: SourceSpan,
    pub name: Option<NameBinding>,
    pub generator_kind: GeneratorKind,
    pub is_arrow: bool,
    pub is_statement: bool,
    pub strict: bool,
    pub func_id: FuncId,
}

pub enum ForInitArg<B: NodeBuilder> {
    Decl(B::VarDecl),
    Expr(B::Expr),
}

pub enum ForTargetArg<B: NodeBuilder> {
    Decl(B::VarDecl),
    Pattern(B::Expr),
}

pub enum FunctionBodyArg<B: NodeBuilder> {
    Parsed(Vec<B::Stmt>),
    Lazy(SourceSpan),
}

// ============================================================================
// The builder trait
// ============================================================================

pub trait NodeBuilder: Sized {
    type Expr: Copy + std::fmt::Debug;
    type Stmt: std::fmt::Debug;
    type Block: Copy + std::fmt::Debug;
    type VarDecl: std::fmt::Debug;
    type Declarator: std::fmt::Debug;
    type Case: std::fmt::Debug;
    type Catch: std::fmt::Debug;
    type Prop: std::fmt::Debug;
    type Param: std::fmt::Debug;
    type Function: std::fmt::Debug;

    /// Abort a syntax pre-pass; a no-op for the full builder (which also
    /// stops lazily skipping inner functions from here on, since the caller
    /// has announced a construct the pre-pass cannot handle).
    fn abort_if_syntax(&mut self, cause: BailoutCause) -> ParseOutcome<()>;

    /// Re-validate an array/object literal as a destructuring pattern.
    /// With `binding` set, every leaf must be a simple name and is bound
    /// with that kind; without it, leaves must be valid assignment targets
    /// and are marked assigned. Returns the number of names bound. Only the
    /// full builder can see the tree, so the syntax builder aborts instead.
    fn check_destructuring(
        &mut self,
        core: &mut crate::parser::ParserCore,
        pattern: &Self::Expr,
        binding: Option<nightjar_bind::def::DefKind>,
    ) -> ParseOutcome<u32>;

    /// Whether inner functions may be handed to the syntax pre-pass.
    fn syntax_parse_enabled(&self) -> bool;

    /// Permanently disable the syntax pre-pass for this parse.
    fn disable_syntax_parse(&mut self);

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn new_name(&mut self, atom: Atom, span: SourceSpan, use_link: Option<UseId>) -> Self::Expr;
    fn new_string(&mut self, value: Atom, span: SourceSpan) -> Self::Expr;
    fn new_number(&mut self, value: f64, span: SourceSpan) -> Self::Expr;
    fn new_regexp(&mut self, pattern: Atom, flags: Atom, span: SourceSpan) -> Self::Expr;
    fn new_bool(&mut self, value: bool, span: SourceSpan) -> Self::Expr;
    fn new_null(&mut self, span: SourceSpan) -> Self::Expr;
    fn new_this(&mut self, span: SourceSpan) -> Self::Expr;
    fn new_unary(&mut self, op: UnaryOp, span: SourceSpan, operand: Self::Expr) -> Self::Expr;
    fn new_update(
        &mut self,
        increment: bool,
        prefix: bool,
        span: SourceSpan,
        operand: Self::Expr,
    ) -> Self::Expr;
    fn new_binary(&mut self, op: BinaryOp, left: Self::Expr, right: Self::Expr) -> Self::Expr;
    fn new_conditional(
        &mut self,
        condition: Self::Expr,
        consequent: Self::Expr,
        alternate: Self::Expr,
    ) -> Self::Expr;
    fn new_assign(&mut self, op: AssignOp, target: Self::Expr, value: Self::Expr) -> Self::Expr;
    fn new_comma(&mut self, exprs: Vec<Self::Expr>, span: SourceSpan) -> Self::Expr;
    fn new_array(&mut self, elements: Vec<Option<Self::Expr>>, span: SourceSpan) -> Self::Expr;
    fn new_property(
        &mut self,
        span: SourceSpan,
        kind: PropertyKind,
        key: PropertyKey,
        value: Self::Expr,
    ) -> Self::Prop;
    fn new_object(&mut self, properties: Vec<Self::Prop>, span: SourceSpan) -> Self::Expr;
    fn new_call(&mut self, callee: Self::Expr, args: Vec<Self::Expr>, span: SourceSpan)
        -> Self::Expr;
    fn new_new(&mut self, callee: Self::Expr, args: Vec<Self::Expr>, span: SourceSpan)
        -> Self::Expr;
    fn new_member(&mut self, object: Self::Expr, property: NameBinding, span: SourceSpan)
        -> Self::Expr;
    fn new_index(&mut self, object: Self::Expr, index: Self::Expr, span: SourceSpan) -> Self::Expr;
    fn new_paren(&mut self, expr: Self::Expr, span: SourceSpan) -> Self::Expr;
    fn new_yield(&mut self, argument: Option<Self::Expr>, span: SourceSpan) -> Self::Expr;

    // ------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------

    /// The atom of a (possibly parenthesized) name expression.
    fn expr_name(&self, expr: &Self::Expr) -> Option<Atom>;

    fn assignment_target(&self, expr: &Self::Expr) -> AssignTarget;

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn new_expr_statement(&mut self, expr: Self::Expr, span: SourceSpan) -> Self::Stmt;

    /// If the statement is a bare (unparenthesized) string-literal
    /// expression statement, its decoded value and span.
    fn stmt_as_string_directive(&self, stmt: &Self::Stmt) -> Option<(Atom, SourceSpan)>;

    /// Mark a statement as part of the directive prologue.
    fn mark_in_prologue(&mut self, stmt: &mut Self::Stmt);

    fn new_empty(&mut self, span: SourceSpan) -> Self::Stmt;
    fn new_block(&mut self, stmts: Vec<Self::Stmt>, block_id: u32, span: SourceSpan) -> Self::Block;
    fn block_stmt(&mut self, block: Self::Block) -> Self::Stmt;
    fn new_var_decl(
        &mut self,
        kind: DeclKind,
        declarators: Vec<Self::Declarator>,
        span: SourceSpan,
    ) -> Self::VarDecl;
    fn var_decl_stmt(&mut self, decl: Self::VarDecl) -> Self::Stmt;
    fn new_declarator(
        &mut self,
        span: SourceSpan,
        target: Self::Expr,
        init: Option<Self::Expr>,
    ) -> Self::Declarator;
    fn new_if(
        &mut self,
        span: SourceSpan,
        condition: Self::Expr,
        consequent: Self::Stmt,
        alternate: Option<Self::Stmt>,
    ) -> Self::Stmt;
    fn new_while(&mut self, span: SourceSpan, condition: Self::Expr, body: Self::Stmt)
        -> Self::Stmt;
    fn new_do_while(&mut self, span: SourceSpan, body: Self::Stmt, condition: Self::Expr)
        -> Self::Stmt;
    fn new_for(
        &mut self,
        span: SourceSpan,
        init: Option<ForInitArg<Self>>,
        test: Option<Self::Expr>,
        update: Option<Self::Expr>,
        body: Self::Stmt,
    ) -> Self::Stmt;
    fn new_for_in(
        &mut self,
        span: SourceSpan,
        kind: ForInKind,
        target: ForTargetArg<Self>,
        object: Self::Expr,
        body: Self::Stmt,
    ) -> Self::Stmt;
    fn new_case(
        &mut self,
        span: SourceSpan,
        test: Option<Self::Expr>,
        body: Vec<Self::Stmt>,
    ) -> Self::Case;
    fn new_switch(
        &mut self,
        span: SourceSpan,
        discriminant: Self::Expr,
        cases: Vec<Self::Case>,
        block_id: u32,
    ) -> Self::Stmt;
    fn new_continue(&mut self, span: SourceSpan, label: Option<Atom>) -> Self::Stmt;
    fn new_break(&mut self, span: SourceSpan, label: Option<Atom>) -> Self::Stmt;
    fn new_return(&mut self, span: SourceSpan, argument: Option<Self::Expr>) -> Self::Stmt;
    fn new_with(&mut self, span: SourceSpan, object: Self::Expr, body: Self::Stmt) -> Self::Stmt;
    fn new_labeled(&mut self, span: SourceSpan, label: Atom, body: Self::Stmt) -> Self::Stmt;
    fn new_throw(&mut self, span: SourceSpan, argument: Self::Expr) -> Self::Stmt;
    fn new_catch(
        &mut self,
        span: SourceSpan,
        param: Self::Expr,
        guard: Option<Self::Expr>,
        body: Self::Block,
    ) -> Self::Catch;
    fn new_try(
        &mut self,
        span: SourceSpan,
        block: Self::Block,
        catches: Vec<Self::Catch>,
        finally: Option<Self::Block>,
    ) -> Self::Stmt;
    fn new_debugger(&mut self, span: SourceSpan) -> Self::Stmt;

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn param_name(&mut self, binding: NameBinding, default: Option<Self::Expr>) -> Self::Param;
    fn param_pattern(&mut self, pattern: Self::Expr) -> Self::Param;
    fn param_rest(&mut self, binding: NameBinding) -> Self::Param;
    fn new_function(
        &mut self,
        desc: FunctionDesc,
        params: Vec<Self::Param>,
        body: FunctionBodyArg<Self>,
    ) -> Self::Function;
    fn function_stmt(&mut self, f: Self::Function) -> Self::Stmt;
    fn function_expr(&mut self, f: Self::Function) -> Self::Expr;
}

// ============================================================================
// Full builder
// ============================================================================

/// Materializes the real AST in the parse arena.
pub struct FullBuilder<'a> {
    arena: &'a ParseArena,
    syntax_enabled: bool,
}

impl<'a> FullBuilder<'a> {
    pub fn new(arena: &'a ParseArena, lazy_inner_functions: bool) -> Self {
        Self {
            arena,
            syntax_enabled: lazy_inner_functions,
        }
    }

    #[inline]
    fn alloc(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(expr)
    }
}

impl<'a> NodeBuilder for FullBuilder<'a> {
    type Expr = &'a Expr<'a>;
    type Stmt = Stmt<'a>;
    type Block = &'a BlockStmt<'a>;
    type VarDecl = VarDeclStmt<'a>;
    type Declarator = Declarator<'a>;
    type Case = SwitchCase<'a>;
    type Catch = CatchClause<'a>;
    type Prop = Property<'a>;
    type Param = Param<'a>;
    type Function = FunctionNode<'a>;

    fn abort_if_syntax(&mut self, _cause: BailoutCause) -> ParseOutcome<()> {
        // Constructs that defeat the pre-pass also defeat lazy inner
        // functions under them.
        self.syntax_enabled = false;
        Ok(())
    }

    fn check_destructuring(
        &mut self,
        core: &mut crate::parser::ParserCore,
        pattern: &Self::Expr,
        binding: Option<nightjar_bind::def::DefKind>,
    ) -> ParseOutcome<u32> {
        let mut count = 0u32;
        check_destructuring_tree(core, *pattern, binding, &mut count)?;
        if binding.is_some() && count == 0 {
            core.warning(
                pattern.span(),
                &nightjar_diagnostics::messages::NO_BINDINGS_IN_PATTERN,
                &[],
            );
        }
        Ok(count)
    }

    fn syntax_parse_enabled(&self) -> bool {
        self.syntax_enabled
    }

    fn disable_syntax_parse(&mut self) {
        self.syntax_enabled = false;
    }

    fn new_name(&mut self, atom: Atom, span: SourceSpan, use_link: Option<UseId>) -> Self::Expr {
        self.alloc(Expr::Name(NameExpr {
            span,
            name: atom,
            use_link,
        }))
    }

    fn new_string(&mut self, value: Atom, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::String(StringLit { span, value }))
    }

    fn new_number(&mut self, value: f64, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::Number(NumberLit { span, value }))
    }

    fn new_regexp(&mut self, pattern: Atom, flags: Atom, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::RegExp(RegExpLit {
            span,
            pattern,
            flags,
        }))
    }

    fn new_bool(&mut self, value: bool, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::Bool(BoolLit { span, value }))
    }

    fn new_null(&mut self, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::Null(NullLit { span }))
    }

    fn new_this(&mut self, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::This(ThisExpr { span }))
    }

    fn new_unary(&mut self, op: UnaryOp, span: SourceSpan, operand: Self::Expr) -> Self::Expr {
        self.alloc(Expr::Unary(UnaryExpr { span, op, operand }))
    }

    fn new_update(
        &mut self,
        increment: bool,
        prefix: bool,
        span: SourceSpan,
        operand: Self::Expr,
    ) -> Self::Expr {
        self.alloc(Expr::Update(UpdateExpr {
            span,
            increment,
            prefix,
            operand,
        }))
    }

    fn new_binary(&mut self, op: BinaryOp, left: Self::Expr, right: Self::Expr) -> Self::Expr {
        let span = left.span().to(right.span());
        self.alloc(Expr::Binary(BinaryExpr {
            span,
            op,
            left,
            right,
        }))
    }

    fn new_conditional(
        &mut self,
        condition: Self::Expr,
        consequent: Self::Expr,
        alternate: Self::Expr,
    ) -> Self::Expr {
        let span = condition.span().to(alternate.span());
        self.alloc(Expr::Conditional(CondExpr {
            span,
            condition,
            consequent,
            alternate,
        }))
    }

    fn new_assign(&mut self, op: AssignOp, target: Self::Expr, value: Self::Expr) -> Self::Expr {
        let span = target.span().to(value.span());
        self.alloc(Expr::Assign(AssignExpr {
            span,
            op,
            target,
            value,
        }))
    }

    fn new_comma(&mut self, exprs: Vec<Self::Expr>, span: SourceSpan) -> Self::Expr {
        let exprs = self.arena.alloc_vec(exprs);
        self.alloc(Expr::Comma(CommaExpr { span, exprs }))
    }

    fn new_array(&mut self, elements: Vec<Option<Self::Expr>>, span: SourceSpan) -> Self::Expr {
        let elements = self.arena.alloc_vec(elements);
        self.alloc(Expr::Array(ArrayLit { span, elements }))
    }

    fn new_property(
        &mut self,
        span: SourceSpan,
        kind: PropertyKind,
        key: PropertyKey,
        value: Self::Expr,
    ) -> Self::Prop {
        Property {
            span,
            kind,
            key,
            value,
        }
    }

    fn new_object(&mut self, properties: Vec<Self::Prop>, span: SourceSpan) -> Self::Expr {
        let properties = self.arena.alloc_vec(properties);
        self.alloc(Expr::Object(ObjectLit { span, properties }))
    }

    fn new_call(
        &mut self,
        callee: Self::Expr,
        args: Vec<Self::Expr>,
        span: SourceSpan,
    ) -> Self::Expr {
        let arguments = self.arena.alloc_vec(args);
        self.alloc(Expr::Call(CallExpr {
            span,
            callee,
            arguments,
        }))
    }

    fn new_new(
        &mut self,
        callee: Self::Expr,
        args: Vec<Self::Expr>,
        span: SourceSpan,
    ) -> Self::Expr {
        let arguments = self.arena.alloc_vec(args);
        self.alloc(Expr::New(NewExpr {
            span,
            callee,
            arguments,
        }))
    }

    fn new_member(
        &mut self,
        object: Self::Expr,
        property: NameBinding,
        span: SourceSpan,
    ) -> Self::Expr {
        self.alloc(Expr::Member(MemberExpr {
            span,
            object,
            property,
        }))
    }

    fn new_index(&mut self, object: Self::Expr, index: Self::Expr, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::Index(IndexExpr {
            span,
            object,
            index,
        }))
    }

    fn new_paren(&mut self, expr: Self::Expr, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::Paren(ParenExpr { span, expr }))
    }

    fn new_yield(&mut self, argument: Option<Self::Expr>, span: SourceSpan) -> Self::Expr {
        self.alloc(Expr::Yield(YieldExpr { span, argument }))
    }

    fn expr_name(&self, expr: &Self::Expr) -> Option<Atom> {
        match expr.unparenthesized() {
            Expr::Name(name) => Some(name.name),
            _ => None,
        }
    }

    fn assignment_target(&self, expr: &Self::Expr) -> AssignTarget {
        match expr.unparenthesized() {
            Expr::Name(name) => AssignTarget::Name {
                atom: name.name,
                use_link: name.use_link,
            },
            Expr::Member(_) | Expr::Index(_) => AssignTarget::PropertyAccess,
            Expr::Array(_) | Expr::Object(_) => AssignTarget::Pattern,
            _ => AssignTarget::Invalid,
        }
    }

    fn new_expr_statement(&mut self, expr: Self::Expr, span: SourceSpan) -> Self::Stmt {
        Stmt::Expression(ExprStmt {
            span,
            expr,
            in_prologue: false,
        })
    }

    fn stmt_as_string_directive(&self, stmt: &Self::Stmt) -> Option<(Atom, SourceSpan)> {
        match stmt {
            Stmt::Expression(es) => match es.expr {
                Expr::String(s) => Some((s.value, s.span)),
                _ => None,
            },
            _ => None,
        }
    }

    fn mark_in_prologue(&mut self, stmt: &mut Self::Stmt) {
        if let Stmt::Expression(es) = stmt {
            es.in_prologue = true;
        }
    }

    fn new_empty(&mut self, span: SourceSpan) -> Self::Stmt {
        Stmt::Empty(EmptyStmt { span })
    }

    fn new_block(
        &mut self,
        stmts: Vec<Self::Stmt>,
        block_id: u32,
        span: SourceSpan,
    ) -> Self::Block {
        let statements = self.arena.alloc_vec(stmts);
        self.arena.alloc(BlockStmt {
            span,
            statements,
            block_id,
        })
    }

    fn block_stmt(&mut self, block: Self::Block) -> Self::Stmt {
        Stmt::Block(BlockStmt {
            span: block.span,
            statements: block.statements,
            block_id: block.block_id,
        })
    }

    fn new_var_decl(
        &mut self,
        kind: DeclKind,
        declarators: Vec<Self::Declarator>,
        span: SourceSpan,
    ) -> Self::VarDecl {
        VarDeclStmt {
            span,
            kind,
            declarators: self.arena.alloc_vec(declarators),
        }
    }

    fn var_decl_stmt(&mut self, decl: Self::VarDecl) -> Self::Stmt {
        Stmt::VarDecl(decl)
    }

    fn new_declarator(
        &mut self,
        span: SourceSpan,
        target: Self::Expr,
        init: Option<Self::Expr>,
    ) -> Self::Declarator {
        Declarator { span, target, init }
    }

    fn new_if(
        &mut self,
        span: SourceSpan,
        condition: Self::Expr,
        consequent: Self::Stmt,
        alternate: Option<Self::Stmt>,
    ) -> Self::Stmt {
        Stmt::If(IfStmt {
            span,
            condition,
            consequent: self.arena.alloc(consequent),
            alternate: alternate.map(|s| &*self.arena.alloc(s)),
        })
    }

    fn new_while(
        &mut self,
        span: SourceSpan,
        condition: Self::Expr,
        body: Self::Stmt,
    ) -> Self::Stmt {
        Stmt::While(WhileStmt {
            span,
            condition,
            body: self.arena.alloc(body),
        })
    }

    fn new_do_while(
        &mut self,
        span: SourceSpan,
        body: Self::Stmt,
        condition: Self::Expr,
    ) -> Self::Stmt {
        Stmt::DoWhile(DoWhileStmt {
            span,
            body: self.arena.alloc(body),
            condition,
        })
    }

    fn new_for(
        &mut self,
        span: SourceSpan,
        init: Option<ForInitArg<Self>>,
        test: Option<Self::Expr>,
        update: Option<Self::Expr>,
        body: Self::Stmt,
    ) -> Self::Stmt {
        let init = init.map(|i| match i {
            ForInitArg::Decl(d) => ForInit::VarDecl(d),
            ForInitArg::Expr(e) => ForInit::Expr(e),
        });
        Stmt::For(ForStmt {
            span,
            init,
            test,
            update,
            body: self.arena.alloc(body),
        })
    }

    fn new_for_in(
        &mut self,
        span: SourceSpan,
        kind: ForInKind,
        target: ForTargetArg<Self>,
        object: Self::Expr,
        body: Self::Stmt,
    ) -> Self::Stmt {
        let target = match target {
            ForTargetArg::Decl(d) => ForInTarget::Decl(d),
            ForTargetArg::Pattern(p) => ForInTarget::Pattern(p),
        };
        Stmt::ForIn(ForInStmt {
            span,
            kind,
            target,
            object,
            body: self.arena.alloc(body),
        })
    }

    fn new_case(
        &mut self,
        span: SourceSpan,
        test: Option<Self::Expr>,
        body: Vec<Self::Stmt>,
    ) -> Self::Case {
        SwitchCase {
            span,
            test,
            body: self.arena.alloc_vec(body),
        }
    }

    fn new_switch(
        &mut self,
        span: SourceSpan,
        discriminant: Self::Expr,
        cases: Vec<Self::Case>,
        block_id: u32,
    ) -> Self::Stmt {
        Stmt::Switch(SwitchStmt {
            span,
            discriminant,
            cases: self.arena.alloc_vec(cases),
            block_id,
        })
    }

    fn new_continue(&mut self, span: SourceSpan, label: Option<Atom>) -> Self::Stmt {
        Stmt::Continue(ContinueStmt { span, label })
    }

    fn new_break(&mut self, span: SourceSpan, label: Option<Atom>) -> Self::Stmt {
        Stmt::Break(BreakStmt { span, label })
    }

    fn new_return(&mut self, span: SourceSpan, argument: Option<Self::Expr>) -> Self::Stmt {
        Stmt::Return(ReturnStmt { span, argument })
    }

    fn new_with(&mut self, span: SourceSpan, object: Self::Expr, body: Self::Stmt) -> Self::Stmt {
        Stmt::With(WithStmt {
            span,
            object,
            body: self.arena.alloc(body),
        })
    }

    fn new_labeled(&mut self, span: SourceSpan, label: Atom, body: Self::Stmt) -> Self::Stmt {
        Stmt::Labeled(LabeledStmt {
            span,
            label,
            body: self.arena.alloc(body),
        })
    }

    fn new_throw(&mut self, span: SourceSpan, argument: Self::Expr) -> Self::Stmt {
        Stmt::Throw(ThrowStmt { span, argument })
    }

    fn new_catch(
        &mut self,
        span: SourceSpan,
        param: Self::Expr,
        guard: Option<Self::Expr>,
        body: Self::Block,
    ) -> Self::Catch {
        CatchClause {
            span,
            param,
            guard,
            body,
        }
    }

    fn new_try(
        &mut self,
        span: SourceSpan,
        block: Self::Block,
        catches: Vec<Self::Catch>,
        finally: Option<Self::Block>,
    ) -> Self::Stmt {
        Stmt::Try(TryStmt {
            span,
            block,
            catches: self.arena.alloc_vec(catches),
            finally,
        })
    }

    fn new_debugger(&mut self, span: SourceSpan) -> Self::Stmt {
        Stmt::Debugger(DebuggerStmt { span })
    }

    fn param_name(&mut self, binding: NameBinding, default: Option<Self::Expr>) -> Self::Param {
        Param::Name { binding, default }
    }

    fn param_pattern(&mut self, pattern: Self::Expr) -> Self::Param {
        Param::Pattern(pattern)
    }

    fn param_rest(&mut self, binding: NameBinding) -> Self::Param {
        Param::Rest(binding)
    }

    fn new_function(
        &mut self,
        desc: FunctionDesc,
        params: Vec<Self::Param>,
        body: FunctionBodyArg<Self>,
    ) -> Self::Function {
        let body = match body {
            FunctionBodyArg::Parsed(stmts) => FunctionBody::Parsed(self.arena.alloc_vec(stmts)),
            FunctionBodyArg::Lazy(span) => FunctionBody::Lazy(span),
        };
        FunctionNode {
            span: desc.span,
            name: desc.name,
            params: self.arena.alloc_vec(params),
            body,
            generator_kind: desc.generator_kind,
            is_arrow: desc.is_arrow,
            is_statement: desc.is_statement,
            strict: desc.strict,
            func_id: desc.func_id,
        }
    }

    fn function_stmt(&mut self, f: Self::Function) -> Self::Stmt {
        Stmt::Function(f)
    }

    fn function_expr(&mut self, f: Self::Function) -> Self::Expr {
        self.alloc(Expr::Function(f))
    }
}

/// Recursive pattern validation over the real tree. Array elements and
/// object property values recurse; name leaves either bind (declaration
/// contexts) or must be assignable (assignment contexts); property accesses
/// are assignable but never bindable; anything else is rejected.
fn check_destructuring_tree<'a>(
    core: &mut crate::parser::ParserCore,
    pattern: &'a Expr<'a>,
    binding: Option<nightjar_bind::def::DefKind>,
    count: &mut u32,
) -> ParseOutcome<()> {
    use nightjar_diagnostics::messages;

    match pattern.unparenthesized() {
        Expr::Array(array) => {
            for element in array.elements.iter().copied().flatten() {
                check_destructuring_leaf(core, element, binding, count)?;
            }
            Ok(())
        }
        Expr::Object(object) => {
            for property in object.properties {
                if matches!(property.kind, PropertyKind::Getter | PropertyKind::Setter) {
                    return Err(core.error(
                        property.span,
                        &messages::BAD_DESTRUCTURING_TARGET,
                        &[],
                    ));
                }
                check_destructuring_leaf(core, property.value, binding, count)?;
            }
            Ok(())
        }
        other => Err(core.error(other.span(), &messages::BAD_DESTRUCTURING_TARGET, &[])),
    }
}

fn check_destructuring_leaf<'a>(
    core: &mut crate::parser::ParserCore,
    leaf: &'a Expr<'a>,
    binding: Option<nightjar_bind::def::DefKind>,
    count: &mut u32,
) -> ParseOutcome<()> {
    use nightjar_diagnostics::messages;

    match leaf.unparenthesized() {
        Expr::Array(_) | Expr::Object(_) => check_destructuring_tree(core, leaf, binding, count),
        Expr::Name(name) => match binding {
            Some(kind) => {
                core.bind_declarator_name(kind, name.name, name.span)?;
                *count += 1;
                Ok(())
            }
            None => {
                if name.name == core.names.eval || name.name == core.names.arguments {
                    let text = core.interner.resolve(name.name).to_string();
                    core.report_strict(name.span, &messages::STRICT_ASSIGN, &[&text])?;
                }
                if let Some(use_id) = name.use_link {
                    core.defs.mark_use_assigned(use_id);
                }
                Ok(())
            }
        },
        Expr::Member(_) | Expr::Index(_) => {
            if binding.is_some() {
                Err(core.error(leaf.span(), &messages::BAD_DESTRUCTURING_TARGET, &[]))
            } else {
                Ok(())
            }
        }
        other => Err(core.error(other.span(), &messages::BAD_DESTRUCTURING_TARGET, &[])),
    }
}

// ============================================================================
// Syntax builder
// ============================================================================

/// Classification sentinel standing in for an expression node.
#[derive(Debug, Clone, Copy)]
pub enum SynExpr {
    Name {
        atom: Atom,
        use_link: Option<UseId>,
        paren: bool,
    },
    String {
        value: Atom,
        span: SourceSpan,
        paren: bool,
    },
    PropertyAccess,
    Call,
    Other,
}

/// Classification sentinel standing in for a statement.
#[derive(Debug, Clone, Copy)]
pub enum SynStmt {
    StringExpr { value: Atom, span: SourceSpan },
    Other,
}

/// Validates the grammar without building nodes; bails out on constructs it
/// cannot approximate.
#[derive(Debug, Default)]
pub struct SyntaxBuilder;

impl SyntaxBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl NodeBuilder for SyntaxBuilder {
    type Expr = SynExpr;
    type Stmt = SynStmt;
    type Block = ();
    type VarDecl = ();
    type Declarator = ();
    type Case = ();
    type Catch = ();
    type Prop = ();
    type Param = ();
    type Function = ();

    fn abort_if_syntax(&mut self, cause: BailoutCause) -> ParseOutcome<()> {
        Err(ParseAbort::Reparse(ReparseReason::SyntaxBailout(cause)))
    }

    fn check_destructuring(
        &mut self,
        _core: &mut crate::parser::ParserCore,
        _pattern: &Self::Expr,
        _binding: Option<nightjar_bind::def::DefKind>,
    ) -> ParseOutcome<u32> {
        // The pre-pass cannot validate patterns without a tree.
        self.abort_if_syntax(BailoutCause::Destructuring)?;
        Ok(0)
    }

    fn syntax_parse_enabled(&self) -> bool {
        false
    }

    fn disable_syntax_parse(&mut self) {}

    fn new_name(&mut self, atom: Atom, _span: SourceSpan, use_link: Option<UseId>) -> Self::Expr {
        SynExpr::Name {
            atom,
            use_link,
            paren: false,
        }
    }

    fn new_string(&mut self, value: Atom, span: SourceSpan) -> Self::Expr {
        SynExpr::String {
            value,
            span,
            paren: false,
        }
    }

    fn new_number(&mut self, _value: f64, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn new_regexp(&mut self, _pattern: Atom, _flags: Atom, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn new_bool(&mut self, _value: bool, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn new_null(&mut self, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn new_this(&mut self, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn new_unary(&mut self, _op: UnaryOp, _span: SourceSpan, _operand: Self::Expr) -> Self::Expr {
        SynExpr::Other
    }

    fn new_update(
        &mut self,
        _increment: bool,
        _prefix: bool,
        _span: SourceSpan,
        _operand: Self::Expr,
    ) -> Self::Expr {
        SynExpr::Other
    }

    fn new_binary(&mut self, _op: BinaryOp, _left: Self::Expr, _right: Self::Expr) -> Self::Expr {
        SynExpr::Other
    }

    fn new_conditional(
        &mut self,
        _condition: Self::Expr,
        _consequent: Self::Expr,
        _alternate: Self::Expr,
    ) -> Self::Expr {
        SynExpr::Other
    }

    fn new_assign(&mut self, _op: AssignOp, _target: Self::Expr, _value: Self::Expr) -> Self::Expr {
        SynExpr::Other
    }

    fn new_comma(&mut self, _exprs: Vec<Self::Expr>, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn new_array(&mut self, _elements: Vec<Option<Self::Expr>>, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn new_property(
        &mut self,
        _span: SourceSpan,
        _kind: PropertyKind,
        _key: PropertyKey,
        _value: Self::Expr,
    ) -> Self::Prop {
    }

    fn new_object(&mut self, _properties: Vec<Self::Prop>, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn new_call(
        &mut self,
        _callee: Self::Expr,
        _args: Vec<Self::Expr>,
        _span: SourceSpan,
    ) -> Self::Expr {
        SynExpr::Call
    }

    fn new_new(
        &mut self,
        _callee: Self::Expr,
        _args: Vec<Self::Expr>,
        _span: SourceSpan,
    ) -> Self::Expr {
        SynExpr::Other
    }

    fn new_member(
        &mut self,
        _object: Self::Expr,
        _property: NameBinding,
        _span: SourceSpan,
    ) -> Self::Expr {
        SynExpr::PropertyAccess
    }

    fn new_index(
        &mut self,
        _object: Self::Expr,
        _index: Self::Expr,
        _span: SourceSpan,
    ) -> Self::Expr {
        SynExpr::PropertyAccess
    }

    fn new_paren(&mut self, expr: Self::Expr, _span: SourceSpan) -> Self::Expr {
        match expr {
            SynExpr::Name {
                atom, use_link, ..
            } => SynExpr::Name {
                atom,
                use_link,
                paren: true,
            },
            SynExpr::String { value, span, .. } => SynExpr::String {
                value,
                span,
                paren: true,
            },
            other => other,
        }
    }

    fn new_yield(&mut self, _argument: Option<Self::Expr>, _span: SourceSpan) -> Self::Expr {
        SynExpr::Other
    }

    fn expr_name(&self, expr: &Self::Expr) -> Option<Atom> {
        match expr {
            SynExpr::Name { atom, .. } => Some(*atom),
            _ => None,
        }
    }

    fn assignment_target(&self, expr: &Self::Expr) -> AssignTarget {
        match expr {
            SynExpr::Name { atom, use_link, .. } => AssignTarget::Name {
                atom: *atom,
                use_link: *use_link,
            },
            SynExpr::PropertyAccess => AssignTarget::PropertyAccess,
            _ => AssignTarget::Unknown,
        }
    }

    fn new_expr_statement(&mut self, expr: Self::Expr, _span: SourceSpan) -> Self::Stmt {
        match expr {
            SynExpr::String {
                value,
                span,
                paren: false,
            } => SynStmt::StringExpr { value, span },
            _ => SynStmt::Other,
        }
    }

    fn stmt_as_string_directive(&self, stmt: &Self::Stmt) -> Option<(Atom, SourceSpan)> {
        match stmt {
            SynStmt::StringExpr { value, span } => Some((*value, *span)),
            SynStmt::Other => None,
        }
    }

    fn mark_in_prologue(&mut self, _stmt: &mut Self::Stmt) {}

    fn new_empty(&mut self, _span: SourceSpan) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_block(
        &mut self,
        _stmts: Vec<Self::Stmt>,
        _block_id: u32,
        _span: SourceSpan,
    ) -> Self::Block {
    }

    fn block_stmt(&mut self, _block: Self::Block) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_var_decl(
        &mut self,
        _kind: DeclKind,
        _declarators: Vec<Self::Declarator>,
        _span: SourceSpan,
    ) -> Self::VarDecl {
    }

    fn var_decl_stmt(&mut self, _decl: Self::VarDecl) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_declarator(
        &mut self,
        _span: SourceSpan,
        _target: Self::Expr,
        _init: Option<Self::Expr>,
    ) -> Self::Declarator {
    }

    fn new_if(
        &mut self,
        _span: SourceSpan,
        _condition: Self::Expr,
        _consequent: Self::Stmt,
        _alternate: Option<Self::Stmt>,
    ) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_while(
        &mut self,
        _span: SourceSpan,
        _condition: Self::Expr,
        _body: Self::Stmt,
    ) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_do_while(
        &mut self,
        _span: SourceSpan,
        _body: Self::Stmt,
        _condition: Self::Expr,
    ) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_for(
        &mut self,
        _span: SourceSpan,
        _init: Option<ForInitArg<Self>>,
        _test: Option<Self::Expr>,
        _update: Option<Self::Expr>,
        _body: Self::Stmt,
    ) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_for_in(
        &mut self,
        _span: SourceSpan,
        _kind: ForInKind,
        _target: ForTargetArg<Self>,
        _object: Self::Expr,
        _body: Self::Stmt,
    ) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_case(
        &mut self,
        _span: SourceSpan,
        _test: Option<Self::Expr>,
        _body: Vec<Self::Stmt>,
    ) -> Self::Case {
    }

    fn new_switch(
        &mut self,
        _span: SourceSpan,
        _discriminant: Self::Expr,
        _cases: Vec<Self::Case>,
        _block_id: u32,
    ) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_continue(&mut self, _span: SourceSpan, _label: Option<Atom>) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_break(&mut self, _span: SourceSpan, _label: Option<Atom>) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_return(&mut self, _span: SourceSpan, _argument: Option<Self::Expr>) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_with(&mut self, _span: SourceSpan, _object: Self::Expr, _body: Self::Stmt) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_labeled(&mut self, _span: SourceSpan, _label: Atom, _body: Self::Stmt) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_throw(&mut self, _span: SourceSpan, _argument: Self::Expr) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_catch(
        &mut self,
        _span: SourceSpan,
        _param: Self::Expr,
        _guard: Option<Self::Expr>,
        _body: Self::Block,
    ) -> Self::Catch {
    }

    fn new_try(
        &mut self,
        _span: SourceSpan,
        _block: Self::Block,
        _catches: Vec<Self::Catch>,
        _finally: Option<Self::Block>,
    ) -> Self::Stmt {
        SynStmt::Other
    }

    fn new_debugger(&mut self, _span: SourceSpan) -> Self::Stmt {
        SynStmt::Other
    }

    fn param_name(&mut self, _binding: NameBinding, _default: Option<Self::Expr>) -> Self::Param {}

    fn param_pattern(&mut self, _pattern: Self::Expr) -> Self::Param {}

    fn param_rest(&mut self, _binding: NameBinding) -> Self::Param {}

    fn new_function(
        &mut self,
        _desc: FunctionDesc,
        _params: Vec<Self::Param>,
        _body: FunctionBodyArg<Self>,
    ) -> Self::Function {
    }

    fn function_stmt(&mut self, _f: Self::Function) -> Self::Stmt {
        SynStmt::Other
    }

    fn function_expr(&mut self, _f: Self::Function) -> Self::Expr {
        SynExpr::Other
    }
}
