//! Tests for the two-tier strategy: lazy inner functions, bailout-and-retry,
//! and the property that a bailed-out parse produces the same tree as a
//! direct full parse.

use nightjar_ast::node::*;
use nightjar_core::arena::ParseArena;
use nightjar_core::intern::AtomInterner;
use nightjar_parser::parser::{ParseOptions, Parser};
use nightjar_parser::ParsedProgram;
use std::fmt::Write;

fn parse<'a>(
    arena: &'a ParseArena,
    interner: &AtomInterner,
    source: &str,
    lazy: bool,
) -> ParsedProgram<'a> {
    Parser::with_options(
        arena,
        interner,
        source,
        ParseOptions {
            lazy_functions: lazy,
        },
    )
    .parse_program()
    .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", source, e))
}

// ============================================================================
// Structural renderer
// ============================================================================
//
// Renders the tree with spans and names but without definition-store ids,
// which differ between parses that allocate different numbers of
// placeholders. Two parses of the same source agree exactly on this output.

struct Render<'i> {
    interner: &'i AtomInterner,
    out: String,
}

impl<'i> Render<'i> {
    fn new(interner: &'i AtomInterner) -> Self {
        Self {
            interner,
            out: String::new(),
        }
    }

    fn atom(&mut self, atom: nightjar_core::intern::Atom) {
        let text = self.interner.resolve(atom);
        write!(self.out, "{:?}", text).unwrap();
    }

    fn program(mut self, program: &Program<'_>) -> String {
        write!(self.out, "(program strict={} ", program.strict).unwrap();
        for stmt in program.statements {
            self.stmt(stmt);
        }
        self.out.push(')');
        self.out
    }

    fn stmt(&mut self, stmt: &Stmt<'_>) {
        let span = stmt.span();
        write!(self.out, "(stmt {:?} ", span).unwrap();
        match stmt {
            Stmt::Block(b) => {
                self.out.push_str("block ");
                for s in b.statements {
                    self.stmt(s);
                }
            }
            Stmt::VarDecl(d) => self.var_decl(d),
            Stmt::Empty(_) => self.out.push_str("empty"),
            Stmt::Expression(es) => {
                write!(self.out, "expr prologue={} ", es.in_prologue).unwrap();
                self.expr(es.expr);
            }
            Stmt::If(s) => {
                self.out.push_str("if ");
                self.expr(s.condition);
                self.stmt(s.consequent);
                if let Some(alt) = s.alternate {
                    self.stmt(alt);
                }
            }
            Stmt::DoWhile(s) => {
                self.out.push_str("do-while ");
                self.stmt(s.body);
                self.expr(s.condition);
            }
            Stmt::While(s) => {
                self.out.push_str("while ");
                self.expr(s.condition);
                self.stmt(s.body);
            }
            Stmt::For(s) => {
                self.out.push_str("for ");
                match &s.init {
                    Some(ForInit::VarDecl(d)) => self.var_decl(d),
                    Some(ForInit::Expr(e)) => self.expr(e),
                    None => self.out.push_str("noinit "),
                }
                if let Some(test) = s.test {
                    self.expr(test);
                }
                if let Some(update) = s.update {
                    self.expr(update);
                }
                self.stmt(s.body);
            }
            Stmt::ForIn(s) => {
                write!(self.out, "for-{:?} ", s.kind).unwrap();
                match &s.target {
                    ForInTarget::Decl(d) => self.var_decl(d),
                    ForInTarget::Pattern(p) => self.expr(p),
                }
                self.expr(s.object);
                self.stmt(s.body);
            }
            Stmt::Switch(s) => {
                self.out.push_str("switch ");
                self.expr(s.discriminant);
                for case in s.cases {
                    self.out.push_str("(case ");
                    if let Some(test) = case.test {
                        self.expr(test);
                    } else {
                        self.out.push_str("default ");
                    }
                    for st in case.body {
                        self.stmt(st);
                    }
                    self.out.push(')');
                }
            }
            Stmt::Continue(s) => {
                self.out.push_str("continue ");
                if let Some(label) = s.label {
                    self.atom(label);
                }
            }
            Stmt::Break(s) => {
                self.out.push_str("break ");
                if let Some(label) = s.label {
                    self.atom(label);
                }
            }
            Stmt::Return(s) => {
                self.out.push_str("return ");
                if let Some(arg) = s.argument {
                    self.expr(arg);
                }
            }
            Stmt::With(s) => {
                self.out.push_str("with ");
                self.expr(s.object);
                self.stmt(s.body);
            }
            Stmt::Labeled(s) => {
                self.out.push_str("label ");
                self.atom(s.label);
                self.stmt(s.body);
            }
            Stmt::Throw(s) => {
                self.out.push_str("throw ");
                self.expr(s.argument);
            }
            Stmt::Try(s) => {
                self.out.push_str("try ");
                self.block(s.block);
                for catch in s.catches {
                    self.out.push_str("(catch ");
                    self.expr(catch.param);
                    if let Some(guard) = catch.guard {
                        self.out.push_str("if ");
                        self.expr(guard);
                    }
                    self.block(catch.body);
                    self.out.push(')');
                }
                if let Some(finally) = s.finally {
                    self.out.push_str("finally ");
                    self.block(finally);
                }
            }
            Stmt::Debugger(_) => self.out.push_str("debugger"),
            Stmt::Function(f) => self.function(f),
        }
        self.out.push(')');
    }

    fn block(&mut self, block: &BlockStmt<'_>) {
        write!(self.out, "(blk {:?} ", block.span).unwrap();
        for s in block.statements {
            self.stmt(s);
        }
        self.out.push(')');
    }

    fn var_decl(&mut self, decl: &VarDeclStmt<'_>) {
        write!(self.out, "({} ", decl.kind.as_str()).unwrap();
        for d in decl.declarators {
            self.expr(d.target);
            if let Some(init) = d.init {
                self.out.push('=');
                self.expr(init);
            }
        }
        self.out.push(')');
    }

    fn function(&mut self, f: &FunctionNode<'_>) {
        write!(
            self.out,
            "(function {:?} arrow={} stmt={} gen={:?} strict={} ",
            f.span, f.is_arrow, f.is_statement, f.generator_kind, f.strict
        )
        .unwrap();
        if let Some(name) = f.name {
            self.atom(name.name);
        }
        for param in f.params {
            match param {
                Param::Name { binding, default } => {
                    self.atom(binding.name);
                    if let Some(d) = default {
                        self.out.push('=');
                        self.expr(d);
                    }
                }
                Param::Pattern(p) => self.expr(p),
                Param::Rest(b) => {
                    self.out.push_str("...");
                    self.atom(b.name);
                }
            }
        }
        match &f.body {
            FunctionBody::Parsed(stmts) => {
                for s in *stmts {
                    self.stmt(s);
                }
            }
            FunctionBody::Lazy(span) => {
                write!(self.out, "lazy {:?}", span).unwrap();
            }
        }
        self.out.push(')');
    }

    fn expr(&mut self, expr: &Expr<'_>) {
        let span = expr.span();
        write!(self.out, "({:?} ", span).unwrap();
        match expr {
            Expr::Name(n) => {
                self.out.push_str("name ");
                self.atom(n.name);
            }
            Expr::String(s) => {
                self.out.push_str("str ");
                self.atom(s.value);
            }
            Expr::Number(n) => {
                write!(self.out, "num {}", n.value).unwrap();
            }
            Expr::RegExp(r) => {
                self.out.push_str("regexp ");
                self.atom(r.pattern);
                self.atom(r.flags);
            }
            Expr::Bool(b) => {
                write!(self.out, "bool {}", b.value).unwrap();
            }
            Expr::Null(_) => self.out.push_str("null"),
            Expr::This(_) => self.out.push_str("this"),
            Expr::Array(a) => {
                self.out.push_str("array ");
                for element in a.elements.iter().copied() {
                    match element {
                        Some(e) => self.expr(e),
                        None => self.out.push_str("hole "),
                    }
                }
            }
            Expr::Object(o) => {
                self.out.push_str("object ");
                for prop in o.properties {
                    write!(self.out, "({:?} ", prop.kind).unwrap();
                    match &prop.key {
                        PropertyKey::Ident(b) => self.atom(b.name),
                        PropertyKey::String(s) => self.atom(s.value),
                        PropertyKey::Number(n) => write!(self.out, "{}", n.value).unwrap(),
                    }
                    self.expr(prop.value);
                    self.out.push(')');
                }
            }
            Expr::Function(f) => self.function(f),
            Expr::Unary(u) => {
                write!(self.out, "unary {:?} ", u.op).unwrap();
                self.expr(u.operand);
            }
            Expr::Update(u) => {
                write!(self.out, "update inc={} prefix={} ", u.increment, u.prefix).unwrap();
                self.expr(u.operand);
            }
            Expr::Binary(b) => {
                write!(self.out, "binary {:?} ", b.op).unwrap();
                self.expr(b.left);
                self.expr(b.right);
            }
            Expr::Conditional(c) => {
                self.out.push_str("cond ");
                self.expr(c.condition);
                self.expr(c.consequent);
                self.expr(c.alternate);
            }
            Expr::Assign(a) => {
                write!(self.out, "assign {:?} ", a.op).unwrap();
                self.expr(a.target);
                self.expr(a.value);
            }
            Expr::Comma(c) => {
                self.out.push_str("comma ");
                for e in c.exprs.iter().copied() {
                    self.expr(e);
                }
            }
            Expr::New(n) => {
                self.out.push_str("new ");
                self.expr(n.callee);
                for arg in n.arguments.iter().copied() {
                    self.expr(arg);
                }
            }
            Expr::Call(c) => {
                self.out.push_str("call ");
                self.expr(c.callee);
                for arg in c.arguments.iter().copied() {
                    self.expr(arg);
                }
            }
            Expr::Member(m) => {
                self.out.push_str("member ");
                self.expr(m.object);
                self.atom(m.property.name);
            }
            Expr::Index(i) => {
                self.out.push_str("index ");
                self.expr(i.object);
                self.expr(i.index);
            }
            Expr::Paren(p) => {
                self.out.push_str("paren ");
                self.expr(p.expr);
            }
            Expr::Yield(y) => {
                self.out.push_str("yield ");
                if let Some(arg) = y.argument {
                    self.expr(arg);
                }
            }
        }
        self.out.push(')');
    }
}

fn render(parsed: &ParsedProgram<'_>, interner: &AtomInterner) -> String {
    Render::new(interner).program(parsed.program)
}

// ============================================================================
// Lazy function parsing
// ============================================================================

#[test]
fn plain_inner_functions_are_skipped() {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = parse(
        &arena,
        &interner,
        "function f(a) { var v = a + 1; return v; }",
        true,
    );
    let f = parsed.summary_named(&interner, "f").unwrap();
    assert!(f.lazy);
    assert_eq!(f.arg_count, 1);
    assert_eq!(f.var_count, 1);
    match &parsed.program.statements[0] {
        Stmt::Function(func) => assert!(matches!(func.body, FunctionBody::Lazy(_))),
        other => panic!("expected a function statement, got {:?}", other),
    }
    assert_eq!(parsed.stats.syntax_bailouts, 0);
}

#[test]
fn lazy_parse_still_computes_binding_effects() {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = parse(
        &arena,
        &interner,
        "var shared = 1; function f() { return shared + missing; }",
        true,
    );
    let f = parsed.summary_named(&interner, "f").unwrap();
    assert!(f.lazy);
    let names: Vec<&str> = f
        .free_names
        .iter()
        .map(|a| interner.resolve(*a))
        .collect();
    assert_eq!(names, ["shared", "missing"]);
}

#[test]
fn functions_nested_in_a_lazy_function_are_lazy() {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = parse(
        &arena,
        &interner,
        "function outer() { function inner() { return 1; } }",
        true,
    );
    assert!(parsed.summary_named(&interner, "outer").unwrap().lazy);
    assert!(parsed.summary_named(&interner, "inner").unwrap().lazy);
    assert_eq!(
        parsed.summary_named(&interner, "outer").unwrap().nested_functions,
        1
    );
}

// ============================================================================
// Bailouts
// ============================================================================

#[test]
fn with_statement_bails_out_of_the_pre_pass() {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = parse(
        &arena,
        &interner,
        "function f() { with (o) { g(); } }",
        true,
    );
    assert!(parsed.stats.syntax_bailouts > 0);
    let f = parsed.summary_named(&interner, "f").unwrap();
    assert!(!f.lazy, "a bailed-out function is fully parsed");
    match &parsed.program.statements[0] {
        Stmt::Function(func) => assert!(matches!(func.body, FunctionBody::Parsed(_))),
        other => panic!("expected a function statement, got {:?}", other),
    }
}

#[test]
fn destructuring_bails_out_of_the_pre_pass() {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = parse(
        &arena,
        &interner,
        "function f() { var [a, b] = pair; return a + b; }",
        true,
    );
    assert!(parsed.stats.syntax_bailouts > 0);
    assert!(!parsed.summary_named(&interner, "f").unwrap().lazy);
}

#[test]
fn lexical_declaration_bails_out_of_the_pre_pass() {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = parse(&arena, &interner, "function f() { let x = 1; return x; }", true);
    assert!(parsed.stats.syntax_bailouts > 0);
}

#[test]
fn use_asm_bails_out_and_warns() {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = parse(&arena, &interner, "function f() { 'use asm'; return 0; }", true);
    assert!(parsed.stats.syntax_bailouts > 0);
    assert!(parsed.diagnostics.diagnostics().iter().any(|d| d.code == 501));
}

// ============================================================================
// Round-trip property
// ============================================================================

/// For sources that force a bailout, the reparse-after-bailout tree must be
/// identical to the tree a direct full parse produces.
#[test]
fn bailed_out_parse_equals_direct_full_parse() {
    let sources = [
        "function f() { with (o) { g(); } return 1 + 2 * 3; }",
        "function f() { var {a, b} = o; return a - b - 1; }",
        "function f() { let x = 1; { let x = 2; g(x); } return x; }",
        "var f = function () { 'use asm'; return 0; };",
    ];
    for source in sources {
        let interner = AtomInterner::new();

        let arena_lazy = ParseArena::new();
        let lazy = parse(&arena_lazy, &interner, source, true);
        assert!(
            lazy.stats.syntax_bailouts > 0,
            "source must trigger a bailout: {}",
            source
        );

        let arena_full = ParseArena::new();
        let full = parse(&arena_full, &interner, source, false);
        assert_eq!(full.stats.syntax_bailouts, 0);

        assert_eq!(
            render(&lazy, &interner),
            render(&full, &interner),
            "trees differ for {:?}",
            source
        );
    }
}

#[test]
fn directive_reparse_equals_direct_strict_parse() {
    let source = "function f(a) { 'use strict'; return a; }";
    let interner = AtomInterner::new();

    let arena_a = ParseArena::new();
    let reparsed = parse(&arena_a, &interner, source, false);
    assert!(reparsed.stats.directive_reparses >= 1);
    assert!(reparsed.summary_named(&interner, "f").unwrap().strict);

    let arena_b = ParseArena::new();
    let again = parse(&arena_b, &interner, source, false);
    assert_eq!(render(&reparsed, &interner), render(&again, &interner));
}

#[test]
fn bailout_makes_forward_progress() {
    // Several bailing functions in one program: each bails exactly once and
    // the parse terminates.
    let source = "function a() { with (x) {} } function b() { with (y) {} }";
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = parse(&arena, &interner, source, true);
    assert_eq!(parsed.program.statements.len(), 2);
    assert!(parsed.stats.syntax_bailouts >= 1);
    assert!(parsed.stats.syntax_bailouts <= 2);
}
