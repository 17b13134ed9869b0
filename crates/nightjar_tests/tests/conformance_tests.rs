//! JavaScript conformance test framework for nightjar.
//!
//! Runs a battery of source snippets through the parser and reports pass
//! rates by category. Every case here is expected to parse (or, for the
//! negative category, to be rejected).

use nightjar_core::arena::ParseArena;
use nightjar_core::intern::AtomInterner;
use nightjar_parser::parser::Parser;

/// Result of one conformance case.
#[derive(Debug, Clone)]
struct TestResult {
    name: String,
    category: String,
    expect_error: bool,
    parse_ok: bool,
    first_error: Option<String>,
}

impl TestResult {
    fn passed(&self) -> bool {
        self.parse_ok != self.expect_error
    }
}

fn run_case(name: &str, category: &str, source: &str, expect_error: bool) -> TestResult {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let outcome = Parser::new(&arena, &interner, source).parse_program();
    match outcome {
        Ok(_) => TestResult {
            name: name.to_string(),
            category: category.to_string(),
            expect_error,
            parse_ok: true,
            first_error: None,
        },
        Err(failure) => TestResult {
            name: name.to_string(),
            category: category.to_string(),
            expect_error,
            parse_ok: false,
            first_error: failure
                .diagnostics
                .diagnostics()
                .iter()
                .find(|d| d.is_error())
                .map(|d| d.to_string()),
        },
    }
}

struct ConformanceSuite {
    results: Vec<TestResult>,
}

impl ConformanceSuite {
    fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    fn accept(&mut self, name: &str, category: &str, source: &str) {
        self.results.push(run_case(name, category, source, false));
    }

    fn reject(&mut self, name: &str, source: &str) {
        self.results.push(run_case(name, "negative", source, true));
    }

    fn finish(self) {
        let total = self.results.len();
        let passed = self.results.iter().filter(|r| r.passed()).count();
        println!("\n=== nightjar conformance summary ===");
        println!("total: {}  passed: {}  failed: {}", total, passed, total - passed);

        let mut categories: std::collections::BTreeMap<&str, (usize, usize)> =
            std::collections::BTreeMap::new();
        for result in &self.results {
            let entry = categories.entry(result.category.as_str()).or_insert((0, 0));
            if result.passed() {
                entry.0 += 1;
            }
            entry.1 += 1;
        }
        for (category, (ok, all)) in &categories {
            println!("  {}: {}/{}", category, ok, all);
        }

        let failures: Vec<&TestResult> = self.results.iter().filter(|r| !r.passed()).collect();
        for failure in &failures {
            println!(
                "  FAILED [{}] {}: {}",
                failure.category,
                failure.name,
                failure
                    .first_error
                    .as_deref()
                    .unwrap_or("expected an error, parsed cleanly")
            );
        }
        assert!(failures.is_empty(), "{} conformance failures", failures.len());
    }
}

#[test]
fn javascript_conformance() {
    let mut suite = ConformanceSuite::new();

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------
    suite.accept("var_single", "statements", "var x = 42;");
    suite.accept("var_list", "statements", "var a = 1, b, c = 'three';");
    suite.accept("let_const", "statements", "let a = 1; const b = 2;");
    suite.accept("nested_blocks", "statements", "{ { { var deep = 1; } } }");
    suite.accept("if_else_chain", "statements", "if (a) b(); else if (c) d(); else e();");
    suite.accept("while_loop", "statements", "while (i < 10) i++;");
    suite.accept("do_while", "statements", "do { step(); } while (more());");
    suite.accept("classic_for", "statements", "for (var i = 0, n = len; i < n; i += 2) visit(i);");
    suite.accept("for_in", "statements", "for (var key in object) use(key);");
    suite.accept("for_of", "statements", "for (var value of values) use(value);");
    suite.accept("for_no_decl", "statements", "for (i = 0; i < n; ++i) f(i);");
    suite.accept(
        "switch_cases",
        "statements",
        "switch (mode) { case 'a': one(); break; case 'b': two(); break; default: other(); }",
    );
    suite.accept("labeled_break", "statements", "outer: for (;;) { for (;;) break outer; }");
    suite.accept(
        "labeled_continue",
        "statements",
        "rows: for (var r = 0; r < 8; r++) { for (var c = 0; c < 8; c++) { if (skip(r, c)) continue rows; } }",
    );
    suite.accept("throw_expr", "statements", "throw new Error('boom');");
    suite.accept(
        "try_catch_finally",
        "statements",
        "try { risky(); } catch (e) { report(e); } finally { cleanup(); }",
    );
    suite.accept(
        "catch_guards",
        "statements",
        "try { risky(); } catch (e if e.fatal) { abort(e); } catch (e) { retry(e); }",
    );
    suite.accept("with_loose", "statements", "with (Math) { result = cos(PI); }");
    suite.accept("debugger_stmt", "statements", "debugger;");
    suite.accept("empty_statements", "statements", ";;;");

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------
    suite.accept("arith_precedence", "expressions", "x = 1 + 2 * 3 - 4 / 5 % 6;");
    suite.accept("bitwise_ladder", "expressions", "x = a | b ^ c & d << 2 >> 1 >>> 3;");
    suite.accept("logic_mix", "expressions", "ok = a && b || !c && ~d;");
    suite.accept("comparisons", "expressions", "t = a < b && c >= d && e === f && g !== h;");
    suite.accept("instanceof_in", "expressions", "t = x instanceof F && 'y' in o;");
    suite.accept("conditional", "expressions", "v = a ? b : c ? d : e;");
    suite.accept("comma_expr", "expressions", "x = (a(), b(), c());");
    suite.accept("assignment_ops", "expressions", "a += 1; b -= 2; c *= 3; d /= 4; e %= 5; f <<= 1; g >>= 2; h >>>= 3; i |= 4; j ^= 5; k &= 6;");
    suite.accept("update_ops", "expressions", "++a; --b; c++; d--;");
    suite.accept("unary_ops", "expressions", "x = typeof a; y = void 0; z = -b + +c; w = !d;");
    suite.accept("delete_property", "expressions", "delete o.prop; delete o['key'];");
    suite.accept("member_towers", "expressions", "x = a.b.c[d].e(f)(g).h;");
    suite.accept("new_expressions", "expressions", "x = new Date; y = new Map(pairs); z = new a.b.C(1)(2);");
    suite.accept("regex_literal", "expressions", "var re = /a[b/c]*d\\//gim;");
    suite.accept("regex_after_operator", "expressions", "x = y / 2 / z; r = cond ? /re/ : /other/;");
    suite.accept("string_escapes", "expressions", "var s = 'a\\n\\t\\x41\\u0042\\'b';");
    suite.accept("number_forms", "expressions", "var n = 0x1F + 010 + 1.5e3 + .25;");
    suite.accept("this_expr", "expressions", "function f() { return this; }");

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------
    suite.accept("function_decl", "functions", "function add(a, b) { return a + b; }");
    suite.accept("function_expr", "functions", "var f = function (x) { return x * x; };");
    suite.accept("named_function_expr", "functions", "var fact = function f(n) { return n < 2 ? 1 : n * f(n - 1); };");
    suite.accept("arrow_paren", "functions", "var add = (a, b) => a + b;");
    suite.accept("arrow_single", "functions", "var twice = x => x * 2;");
    suite.accept("arrow_block_body", "functions", "var go = () => { var t = 0; return t; };");
    suite.accept("arrow_rest", "functions", "var gather = (...items) => items;");
    suite.accept("default_params", "functions", "function pad(s, width = 8) { return s + width; }");
    suite.accept("rest_params", "functions", "function log(level, ...rest) { return rest.length; }");
    suite.accept("destructured_params", "functions", "function dist({x, y}) { return x * x + y * y; }");
    suite.accept("iife", "functions", "(function () { setup(); })();");
    suite.accept("nested_closures", "functions", "function counter() { var n = 0; return function () { return ++n; }; }");
    suite.accept("star_generator", "functions", "function* nat() { var i = 0; while (true) yield i++; }");
    suite.accept("legacy_generator", "functions", "function older() { yield 1; yield 2; }");
    suite.accept("immediate_arrow", "functions", "var v = ((x) => x + 1)(41);");

    // ------------------------------------------------------------------
    // Literals and destructuring
    // ------------------------------------------------------------------
    suite.accept("object_literal", "literals", "var o = { a: 1, 'b': 2, 3: 'c', d: e };");
    suite.accept("object_accessors", "literals", "var o = { get size() { return n; }, set size(v) { n = v; } };");
    suite.accept("object_shorthand_pattern", "literals", "var {a, b} = o;");
    suite.accept("array_literal", "literals", "var a = [1, 'two', [3], , 5, ];");
    suite.accept("array_pattern", "literals", "var [head, [left, right]] = tree;");
    suite.accept("pattern_assignment", "literals", "({x: point.x, y: point.y} = incoming);");
    suite.accept("for_in_pattern", "literals", "for (var [k, v] in entries) use(k, v);");
    suite.accept("keyword_props", "literals", "var o = { var: 1, if: 2, function: 3 }; x = o.if;");

    // ------------------------------------------------------------------
    // Directives and strict mode
    // ------------------------------------------------------------------
    suite.accept("program_strict", "directives", "'use strict'; var x = 1;");
    suite.accept("function_strict", "directives", "function f() { 'use strict'; return 1; }");
    suite.accept("late_directive", "directives", "function f() { 'lead'; 'use strict'; return 1; }");
    suite.accept("use_asm_warns", "directives", "function kernel() { 'use asm'; return 0; }");

    // ------------------------------------------------------------------
    // Automatic semicolon insertion
    // ------------------------------------------------------------------
    suite.accept("asi_lines", "asi", "a = 1\nb = 2\nc = 3");
    suite.accept("asi_before_brace", "asi", "function f() { return 1 }");
    suite.accept("asi_return", "asi", "function f() { return\n1; }");

    // ------------------------------------------------------------------
    // Negative cases: the grammar must reject these
    // ------------------------------------------------------------------
    suite.reject("const_then_var", "const x = 1; var x;");
    suite.reject("let_twice", "{ let x; let x; }");
    suite.reject("bad_destructuring_decl", "var {a: c.d} = x;");
    suite.reject("call_in_pattern", "var [f()] = x;");
    suite.reject("strict_with", "'use strict'; with (o) {}");
    suite.reject("strict_dup_params", "'use strict'; function f(a, a) {}");
    suite.reject("dup_params_with_default", "function f(a, a, b = 1) {}");
    suite.reject("strict_eval_binding", "'use strict'; var eval = 1;");
    suite.reject("return_then_yield", "function g() { return 1; yield 2; }");
    suite.reject("yield_at_top_level", "yield 1;");
    suite.reject("return_at_top_level", "return 1;");
    suite.reject("catch_after_general", "try { f(); } catch (e) {} catch (x) {}");
    suite.reject("try_without_handler", "try { f(); }");
    suite.reject("continue_outside_loop", "continue;");
    suite.reject("break_unknown_label", "for (;;) break nowhere;");
    suite.reject("double_default", "switch (x) { default: a(); default: b(); }");
    suite.reject("unterminated_string", "var s = 'abc");
    suite.reject("unterminated_regex", "var r = /abc");
    suite.reject("missing_paren", "if (a { b(); }");
    suite.reject("const_without_init", "const x;");
    suite.reject("rest_not_last", "function f(...rest, tail) {}");
    suite.reject("compound_pattern_assign", "[a] += b;");

    suite.finish();
}
