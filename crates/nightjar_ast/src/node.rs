//! AST node definitions.
//!
//! Statements and expressions are tagged enums over per-kind structs; child
//! nodes are arena references. Destructuring patterns are not a separate
//! node family: they are array/object literals (and names) parsed as
//! ordinary primary expressions and re-validated in place where the grammar
//! requires a pattern, so the pattern positions below are typed as `Expr`.

use nightjar_bind::def::UseId;
use nightjar_core::intern::Atom;
use nightjar_core::text::SourceSpan;

/// A list of nodes allocated in the arena.
pub type NodeList<'a, T> = &'a [T];

/// Index of a function's box/summary in the parse result.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FuncId(pub u32);

impl FuncId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Generator classification of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    /// Not a generator.
    NotGenerator,
    /// Reclassified by a bare `yield` in its body.
    Legacy,
    /// Declared with `function*`.
    Star,
}

/// `var` / `let` / `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }

    pub fn is_lexical(self) -> bool {
        !matches!(self, DeclKind::Var)
    }
}

// ============================================================================
// Program
// ============================================================================

#[derive(Debug)]
pub struct Program<'a> {
    pub span: SourceSpan,
    pub statements: NodeList<'a, Stmt<'a>>,
    /// Whether the program-level directive prologue contained "use strict".
    pub strict: bool,
    /// The box/summary id of the top-level script.
    pub func_id: FuncId,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug)]
pub enum Stmt<'a> {
    Block(BlockStmt<'a>),
    VarDecl(VarDeclStmt<'a>),
    Empty(EmptyStmt),
    Expression(ExprStmt<'a>),
    If(IfStmt<'a>),
    DoWhile(DoWhileStmt<'a>),
    While(WhileStmt<'a>),
    For(ForStmt<'a>),
    ForIn(ForInStmt<'a>),
    Switch(SwitchStmt<'a>),
    Continue(ContinueStmt),
    Break(BreakStmt),
    Return(ReturnStmt<'a>),
    With(WithStmt<'a>),
    Labeled(LabeledStmt<'a>),
    Throw(ThrowStmt<'a>),
    Try(TryStmt<'a>),
    Debugger(DebuggerStmt),
    Function(FunctionNode<'a>),
}

impl<'a> Stmt<'a> {
    pub fn span(&self) -> SourceSpan {
        match self {
            Stmt::Block(s) => s.span,
            Stmt::VarDecl(s) => s.span,
            Stmt::Empty(s) => s.span,
            Stmt::Expression(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::DoWhile(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::ForIn(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::Continue(s) => s.span,
            Stmt::Break(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::With(s) => s.span,
            Stmt::Labeled(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::Try(s) => s.span,
            Stmt::Debugger(s) => s.span,
            Stmt::Function(s) => s.span,
        }
    }
}

#[derive(Debug)]
pub struct BlockStmt<'a> {
    pub span: SourceSpan,
    pub statements: NodeList<'a, Stmt<'a>>,
    /// Block id of the scope this block introduced.
    pub block_id: u32,
}

#[derive(Debug)]
pub struct VarDeclStmt<'a> {
    pub span: SourceSpan,
    pub kind: DeclKind,
    pub declarators: NodeList<'a, Declarator<'a>>,
}

/// One `name = init` (or `pattern = init`) in a declaration list.
#[derive(Debug)]
pub struct Declarator<'a> {
    pub span: SourceSpan,
    /// A name or a destructuring pattern (array/object literal).
    pub target: &'a Expr<'a>,
    pub init: Option<&'a Expr<'a>>,
}

#[derive(Debug)]
pub struct EmptyStmt {
    pub span: SourceSpan,
}

#[derive(Debug)]
pub struct ExprStmt<'a> {
    pub span: SourceSpan,
    pub expr: &'a Expr<'a>,
    /// Set on statements in the directive prologue so downstream stages do
    /// not flag them as useless expressions.
    pub in_prologue: bool,
}

#[derive(Debug)]
pub struct IfStmt<'a> {
    pub span: SourceSpan,
    pub condition: &'a Expr<'a>,
    pub consequent: &'a Stmt<'a>,
    pub alternate: Option<&'a Stmt<'a>>,
}

#[derive(Debug)]
pub struct DoWhileStmt<'a> {
    pub span: SourceSpan,
    pub body: &'a Stmt<'a>,
    pub condition: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct WhileStmt<'a> {
    pub span: SourceSpan,
    pub condition: &'a Expr<'a>,
    pub body: &'a Stmt<'a>,
}

#[derive(Debug)]
pub enum ForInit<'a> {
    VarDecl(VarDeclStmt<'a>),
    Expr(&'a Expr<'a>),
}

#[derive(Debug)]
pub struct ForStmt<'a> {
    pub span: SourceSpan,
    pub init: Option<ForInit<'a>>,
    pub test: Option<&'a Expr<'a>>,
    pub update: Option<&'a Expr<'a>>,
    pub body: &'a Stmt<'a>,
}

/// `for (x in y)` vs `for (x of y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForInKind {
    In,
    Of,
}

/// Head of a for-in/for-of loop: either a fresh declaration or an existing
/// assignment target / pattern.
#[derive(Debug)]
pub enum ForInTarget<'a> {
    Decl(VarDeclStmt<'a>),
    Pattern(&'a Expr<'a>),
}

#[derive(Debug)]
pub struct ForInStmt<'a> {
    pub span: SourceSpan,
    pub kind: ForInKind,
    pub target: ForInTarget<'a>,
    pub object: &'a Expr<'a>,
    pub body: &'a Stmt<'a>,
}

#[derive(Debug)]
pub struct SwitchStmt<'a> {
    pub span: SourceSpan,
    pub discriminant: &'a Expr<'a>,
    pub cases: NodeList<'a, SwitchCase<'a>>,
    /// Block id of the lexical scope covering the case bodies.
    pub block_id: u32,
}

#[derive(Debug)]
pub struct SwitchCase<'a> {
    pub span: SourceSpan,
    /// None for `default:`.
    pub test: Option<&'a Expr<'a>>,
    pub body: NodeList<'a, Stmt<'a>>,
}

#[derive(Debug)]
pub struct ContinueStmt {
    pub span: SourceSpan,
    pub label: Option<Atom>,
}

#[derive(Debug)]
pub struct BreakStmt {
    pub span: SourceSpan,
    pub label: Option<Atom>,
}

#[derive(Debug)]
pub struct ReturnStmt<'a> {
    pub span: SourceSpan,
    pub argument: Option<&'a Expr<'a>>,
}

#[derive(Debug)]
pub struct WithStmt<'a> {
    pub span: SourceSpan,
    pub object: &'a Expr<'a>,
    pub body: &'a Stmt<'a>,
}

#[derive(Debug)]
pub struct LabeledStmt<'a> {
    pub span: SourceSpan,
    pub label: Atom,
    pub body: &'a Stmt<'a>,
}

#[derive(Debug)]
pub struct ThrowStmt<'a> {
    pub span: SourceSpan,
    pub argument: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct TryStmt<'a> {
    pub span: SourceSpan,
    pub block: &'a BlockStmt<'a>,
    /// Zero or more guarded catches followed by at most one unconditional
    /// catch (which must be last).
    pub catches: NodeList<'a, CatchClause<'a>>,
    pub finally: Option<&'a BlockStmt<'a>>,
}

#[derive(Debug)]
pub struct CatchClause<'a> {
    pub span: SourceSpan,
    /// A name or destructuring pattern bound in the catch scope.
    pub param: &'a Expr<'a>,
    /// Conditional catch guard: `catch (e if guard)`.
    pub guard: Option<&'a Expr<'a>>,
    pub body: &'a BlockStmt<'a>,
}

#[derive(Debug)]
pub struct DebuggerStmt {
    pub span: SourceSpan,
}

// ============================================================================
// Functions
// ============================================================================

/// How a function's body was processed.
#[derive(Debug)]
pub enum FunctionBody<'a> {
    /// Fully parsed statement list.
    Parsed(NodeList<'a, Stmt<'a>>),
    /// Skipped by the syntax pre-pass; only the body's span was recorded.
    /// Binding effects live in the function's summary.
    Lazy(SourceSpan),
}

/// A formal parameter: a simple name (with optional default), a
/// destructuring pattern, or a rest parameter.
#[derive(Debug)]
pub enum Param<'a> {
    Name {
        binding: NameBinding,
        default: Option<&'a Expr<'a>>,
    },
    Pattern(&'a Expr<'a>),
    Rest(NameBinding),
}

impl<'a> Param<'a> {
    pub fn span(&self) -> SourceSpan {
        match self {
            Param::Name { binding, .. } => binding.span,
            Param::Rest(b) => b.span,
            Param::Pattern(p) => p.span(),
        }
    }
}

/// A name introduced by a declaration (function name, simple parameter,
/// catch parameter).
#[derive(Debug, Clone, Copy)]
pub struct NameBinding {
    pub span: SourceSpan,
    pub name: Atom,
}

#[derive(Debug)]
pub struct FunctionNode<'a> {
    pub span: SourceSpan,
    /// Absent for function expressions and arrows without a name.
    pub name: Option<NameBinding>,
    pub params: NodeList<'a, Param<'a>>,
    pub body: FunctionBody<'a>,
    pub generator_kind: GeneratorKind,
    pub is_arrow: bool,
    /// Statement-position function vs. expression.
    pub is_statement: bool,
    pub strict: bool,
    /// Index of this function's binding summary in the parse result.
    pub func_id: FuncId,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug)]
pub enum Expr<'a> {
    Name(NameExpr),
    String(StringLit),
    Number(NumberLit),
    RegExp(RegExpLit),
    Bool(BoolLit),
    Null(NullLit),
    This(ThisExpr),
    Array(ArrayLit<'a>),
    Object(ObjectLit<'a>),
    Function(FunctionNode<'a>),
    Unary(UnaryExpr<'a>),
    Update(UpdateExpr<'a>),
    Binary(BinaryExpr<'a>),
    Conditional(CondExpr<'a>),
    Assign(AssignExpr<'a>),
    Comma(CommaExpr<'a>),
    New(NewExpr<'a>),
    Call(CallExpr<'a>),
    Member(MemberExpr<'a>),
    Index(IndexExpr<'a>),
    Paren(ParenExpr<'a>),
    Yield(YieldExpr<'a>),
}

impl<'a> Expr<'a> {
    pub fn span(&self) -> SourceSpan {
        match self {
            Expr::Name(e) => e.span,
            Expr::String(e) => e.span,
            Expr::Number(e) => e.span,
            Expr::RegExp(e) => e.span,
            Expr::Bool(e) => e.span,
            Expr::Null(e) => e.span,
            Expr::This(e) => e.span,
            Expr::Array(e) => e.span,
            Expr::Object(e) => e.span,
            Expr::Function(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Update(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Conditional(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Comma(e) => e.span,
            Expr::New(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Paren(e) => e.span,
            Expr::Yield(e) => e.span,
        }
    }

    /// Strip parenthesization.
    pub fn unparenthesized(&self) -> &Expr<'a> {
        let mut expr = self;
        while let Expr::Paren(p) = expr {
            expr = p.expr;
        }
        expr
    }

    pub fn is_name(&self) -> bool {
        matches!(self, Expr::Name(_))
    }
}

/// A name in expression position. `use_link` connects the use to its
/// definition (or placeholder) in the parse's definition store; it is absent
/// for names inside declaration destructuring patterns, which are bindings
/// rather than uses.
#[derive(Debug)]
pub struct NameExpr {
    pub span: SourceSpan,
    pub name: Atom,
    pub use_link: Option<UseId>,
}

#[derive(Debug)]
pub struct StringLit {
    pub span: SourceSpan,
    /// Decoded value (escapes resolved), interned.
    pub value: Atom,
}

#[derive(Debug)]
pub struct NumberLit {
    pub span: SourceSpan,
    pub value: f64,
}

#[derive(Debug)]
pub struct RegExpLit {
    pub span: SourceSpan,
    /// Pattern text, excluding delimiters and flags.
    pub pattern: Atom,
    /// Flag characters as written.
    pub flags: Atom,
}

#[derive(Debug)]
pub struct BoolLit {
    pub span: SourceSpan,
    pub value: bool,
}

#[derive(Debug)]
pub struct NullLit {
    pub span: SourceSpan,
}

#[derive(Debug)]
pub struct ThisExpr {
    pub span: SourceSpan,
}

/// Array literal; `None` elements are elisions.
#[derive(Debug)]
pub struct ArrayLit<'a> {
    pub span: SourceSpan,
    pub elements: NodeList<'a, Option<&'a Expr<'a>>>,
}

/// How a property was written in an object literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// `key: value`
    Init,
    /// `{x}` destructuring shorthand.
    Shorthand,
    Getter,
    Setter,
}

#[derive(Debug)]
pub enum PropertyKey {
    Ident(NameBinding),
    String(StringLit),
    Number(NumberLit),
}

impl PropertyKey {
    pub fn span(&self) -> SourceSpan {
        match self {
            PropertyKey::Ident(b) => b.span,
            PropertyKey::String(s) => s.span,
            PropertyKey::Number(n) => n.span,
        }
    }
}

#[derive(Debug)]
pub struct Property<'a> {
    pub span: SourceSpan,
    pub kind: PropertyKind,
    pub key: PropertyKey,
    /// For getters/setters this is the accessor function.
    pub value: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct ObjectLit<'a> {
    pub span: SourceSpan,
    pub properties: NodeList<'a, Property<'a>>,
}

#[derive(Debug)]
pub struct UnaryExpr<'a> {
    pub span: SourceSpan,
    pub op: crate::kind::UnaryOp,
    pub operand: &'a Expr<'a>,
}

/// Prefix or postfix `++`/`--`.
#[derive(Debug)]
pub struct UpdateExpr<'a> {
    pub span: SourceSpan,
    pub increment: bool,
    pub prefix: bool,
    pub operand: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct BinaryExpr<'a> {
    pub span: SourceSpan,
    pub op: crate::kind::BinaryOp,
    pub left: &'a Expr<'a>,
    pub right: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct CondExpr<'a> {
    pub span: SourceSpan,
    pub condition: &'a Expr<'a>,
    pub consequent: &'a Expr<'a>,
    pub alternate: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct AssignExpr<'a> {
    pub span: SourceSpan,
    pub op: crate::kind::AssignOp,
    pub target: &'a Expr<'a>,
    pub value: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct CommaExpr<'a> {
    pub span: SourceSpan,
    pub exprs: NodeList<'a, &'a Expr<'a>>,
}

#[derive(Debug)]
pub struct NewExpr<'a> {
    pub span: SourceSpan,
    pub callee: &'a Expr<'a>,
    pub arguments: NodeList<'a, &'a Expr<'a>>,
}

#[derive(Debug)]
pub struct CallExpr<'a> {
    pub span: SourceSpan,
    pub callee: &'a Expr<'a>,
    pub arguments: NodeList<'a, &'a Expr<'a>>,
}

/// `object.property`
#[derive(Debug)]
pub struct MemberExpr<'a> {
    pub span: SourceSpan,
    pub object: &'a Expr<'a>,
    pub property: NameBinding,
}

/// `object[index]`
#[derive(Debug)]
pub struct IndexExpr<'a> {
    pub span: SourceSpan,
    pub object: &'a Expr<'a>,
    pub index: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct ParenExpr<'a> {
    pub span: SourceSpan,
    pub expr: &'a Expr<'a>,
}

#[derive(Debug)]
pub struct YieldExpr<'a> {
    pub span: SourceSpan,
    pub argument: Option<&'a Expr<'a>>,
}
