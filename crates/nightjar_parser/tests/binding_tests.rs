//! Binding and scope-analysis tests: free variables, placeholder capture,
//! flag propagation, and the use/definition links.

use nightjar_bind::def::{DefFlags, DefKind};
use nightjar_core::arena::ParseArena;
use nightjar_core::intern::AtomInterner;
use nightjar_parser::parser::Parser;
use nightjar_parser::{FunctionFlags, ParsedProgram};

fn with_parsed<R>(source: &str, f: impl FnOnce(&ParsedProgram<'_>, &AtomInterner) -> R) -> R {
    let arena = ParseArena::new();
    let interner = AtomInterner::new();
    let parsed = Parser::new(&arena, &interner, source)
        .parse_program()
        .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", source, e));
    f(&parsed, &interner)
}

fn free_names(parsed: &ParsedProgram<'_>, interner: &AtomInterner, func: &str) -> Vec<String> {
    parsed
        .summary_named(interner, func)
        .unwrap_or_else(|| panic!("no function named {}", func))
        .free_names
        .iter()
        .map(|a| interner.resolve(*a).to_string())
        .collect()
}

// ============================================================================
// Free variables and lexical dependencies
// ============================================================================

#[test]
fn inner_function_free_variable_resolves_to_outer_local() {
    with_parsed(
        "function outer() { var v = 1; function inner() { return v; } }",
        |parsed, interner| {
            assert_eq!(free_names(parsed, interner, "inner"), ["v"]);
            // `v` resolved inside outer, so it does not escape outer.
            assert!(free_names(parsed, interner, "outer").is_empty());

            // The outer definition of v is marked closed-over.
            let v = interner.get("v").expect("v interned");
            let closed = parsed
                .defs
                .iter_defs()
                .any(|(_, d)| d.name == v && d.kind == DefKind::Var && d.is_closed());
            assert!(closed, "v should be marked closed over");
        },
    );
}

#[test]
fn unresolved_dependency_propagates_to_the_top() {
    with_parsed(
        "function outer() { function inner() { return missing; } }",
        |parsed, interner| {
            assert_eq!(free_names(parsed, interner, "inner"), ["missing"]);
            assert_eq!(free_names(parsed, interner, "outer"), ["missing"]);
            let program_free: Vec<String> = parsed
                .program_summary()
                .free_names
                .iter()
                .map(|a| interner.resolve(*a).to_string())
                .collect();
            assert_eq!(program_free, ["missing"]);
        },
    );
}

#[test]
fn forward_reference_is_captured_by_var() {
    with_parsed("x = 1; var x;", |parsed, interner| {
        assert!(parsed.program_summary().free_names.is_empty());
        let x = interner.get("x").expect("x interned");
        let (_, def) = parsed
            .defs
            .iter_defs()
            .find(|(_, d)| d.name == x && d.kind == DefKind::Var)
            .expect("var definition of x");
        assert!(def.is_assigned(), "the captured use assigned to x");
        assert!(!def.is_placeholder());
    });
}

#[test]
fn function_statement_name_is_hoisted() {
    with_parsed("f(); function f() {}", |parsed, _| {
        assert!(parsed.program_summary().free_names.is_empty());
    });
}

#[test]
fn let_captures_only_uses_from_its_own_block() {
    // The use in the inner block belongs to the later `let`; the use before
    // the block does not, and stays a genuine free variable.
    with_parsed("foo; { foo2(); let foo2; }", |parsed, interner| {
        let program_free: Vec<String> = parsed
            .program_summary()
            .free_names
            .iter()
            .map(|a| interner.resolve(*a).to_string())
            .collect();
        assert_eq!(program_free, ["foo"]);

        let foo2 = interner.get("foo2").expect("foo2 interned");
        let (let_def, _) = parsed
            .defs
            .iter_defs()
            .find(|(_, d)| d.name == foo2 && d.kind == DefKind::Let)
            .expect("let definition of foo2");
        assert_eq!(parsed.defs.use_count_of(let_def), 1);
    });
}

#[test]
fn named_lambda_self_reference_is_not_free() {
    with_parsed("var f = function g() { return g; };", |parsed, interner| {
        assert!(parsed.program_summary().free_names.is_empty());
        let g = interner.get("g").expect("g interned");
        let named_lambda = parsed
            .defs
            .iter_defs()
            .any(|(_, d)| d.name == g && d.kind == DefKind::NamedLambda);
        assert!(named_lambda, "g should resolve as a named-lambda binding");
    });
}

// ============================================================================
// Dynamic scope flags
// ============================================================================

#[test]
fn with_statement_marks_three_levels_of_nesting() {
    with_parsed(
        "function a() { function b() { function c() { with (o) { x; } } } }",
        |parsed, interner| {
            for name in ["a", "b", "c"] {
                let summary = parsed.summary_named(interner, name).unwrap();
                assert!(
                    summary
                        .flags
                        .contains(FunctionFlags::BINDINGS_ACCESSED_DYNAMICALLY),
                    "{} must be marked dynamic",
                    name
                );
            }
            // The program context is marked too.
            assert!(parsed
                .program_summary()
                .flags
                .contains(FunctionFlags::BINDINGS_ACCESSED_DYNAMICALLY));
        },
    );
}

#[test]
fn direct_eval_marks_three_levels_of_nesting() {
    with_parsed(
        "function a() { function b() { function c() { eval('1'); } } }",
        |parsed, interner| {
            for name in ["a", "b", "c"] {
                let summary = parsed.summary_named(interner, name).unwrap();
                assert!(summary.flags.contains(FunctionFlags::USES_EVAL));
                assert!(summary
                    .flags
                    .contains(FunctionFlags::BINDINGS_ACCESSED_DYNAMICALLY));
            }
        },
    );
}

#[test]
fn extensible_scope_does_not_propagate() {
    // Only c's own scope is extensible; the dynamic flag still propagates.
    with_parsed(
        "function a() { function c() { eval('1'); } }",
        |parsed, interner| {
            let c = parsed.summary_named(interner, "c").unwrap();
            assert!(c.flags.contains(FunctionFlags::HAS_EXTENSIBLE_SCOPE));
            let a = parsed.summary_named(interner, "a").unwrap();
            assert!(!a.flags.contains(FunctionFlags::HAS_EXTENSIBLE_SCOPE));
            assert!(a.flags.contains(FunctionFlags::BINDINGS_ACCESSED_DYNAMICALLY));
        },
    );
}

#[test]
fn debugger_statement_propagates() {
    with_parsed(
        "function a() { function b() { debugger; } }",
        |parsed, interner| {
            for name in ["a", "b"] {
                let summary = parsed.summary_named(interner, name).unwrap();
                assert!(summary.flags.contains(FunctionFlags::HAS_DEBUGGER_STATEMENT));
            }
        },
    );
}

#[test]
fn with_scope_hides_outer_statics() {
    // Inside `with`, even a name bound by an enclosing var cannot resolve
    // statically; it must remain a free (dynamic) reference.
    with_parsed("function f() { var v; with (o) { v; } }", |parsed, interner| {
        let f = parsed.summary_named(interner, "f").unwrap();
        let names: Vec<String> = f
            .free_names
            .iter()
            .map(|a| interner.resolve(*a).to_string())
            .collect();
        assert!(names.contains(&"v".to_string()));
    });
}

// ============================================================================
// Arguments handling
// ============================================================================

#[test]
fn free_use_of_arguments_creates_implicit_binding() {
    with_parsed("function f() { return arguments[0]; }", |parsed, interner| {
        let f = parsed.summary_named(interner, "f").unwrap();
        assert!(f.flags.contains(FunctionFlags::USES_ARGUMENTS));
        // It never escapes as a free variable.
        assert!(f.free_names.is_empty());

        let arguments = interner.get("arguments").expect("arguments interned");
        let implicit = parsed.defs.iter_defs().any(|(_, d)| {
            d.name == arguments && d.flags.contains(DefFlags::IMPLICIT_ARGUMENTS)
        });
        assert!(implicit, "an implicit arguments binding must exist");
    });
}

#[test]
fn dynamic_scope_forces_eager_arguments_object() {
    with_parsed("function f() { eval(s); return arguments; }", |parsed, interner| {
        let f = parsed.summary_named(interner, "f").unwrap();
        assert!(f.flags.contains(FunctionFlags::NEEDS_ARGS_OBJ));
    });
}

#[test]
fn debugger_forces_eager_arguments_object() {
    with_parsed(
        "function f() { debugger; return arguments; }",
        |parsed, interner| {
            let f = parsed.summary_named(interner, "f").unwrap();
            assert!(f.flags.contains(FunctionFlags::NEEDS_ARGS_OBJ));
        },
    );
}

// ============================================================================
// var/arg interactions
// ============================================================================

#[test]
fn var_hiding_an_argument_warns_and_merges() {
    with_parsed("function f(a) { var a = 1; return a; }", |parsed, interner| {
        // Warning, not an error.
        assert!(parsed.diagnostics.diagnostics().iter().any(|d| d.code == 302));
        let a = interner.get("a").expect("a interned");
        // Only the argument definition exists; the var merged onto it.
        let arg_defs = parsed
            .defs
            .iter_defs()
            .filter(|(_, d)| d.name == a && d.kind == DefKind::Arg)
            .count();
        let var_defs = parsed
            .defs
            .iter_defs()
            .filter(|(_, d)| d.name == a && d.kind == DefKind::Var)
            .count();
        assert_eq!(arg_defs, 1);
        assert_eq!(var_defs, 0);
    });
}

#[test]
fn assignment_marks_the_definition() {
    with_parsed("var x = 0; x = 1;", |parsed, interner| {
        let x = interner.get("x").expect("x interned");
        let (_, def) = parsed
            .defs
            .iter_defs()
            .find(|(_, d)| d.name == x)
            .expect("definition of x");
        assert!(def.is_assigned());
    });
}

#[test]
fn body_slots_are_assigned_in_declaration_order() {
    with_parsed("function f(a, b) { var c; }", |parsed, interner| {
        let summary = parsed.summary_named(interner, "f").unwrap();
        assert_eq!(summary.arg_count, 2);
        assert_eq!(summary.var_count, 1);
        let c = interner.get("c").expect("c interned");
        let (_, def) = parsed
            .defs
            .iter_defs()
            .find(|(_, d)| d.name == c)
            .expect("definition of c");
        let slot = def.slot.expect("slot assigned at function exit");
        assert_eq!(slot.slot, 2);
    });
}

#[test]
fn catch_parameter_binds_in_its_own_scope() {
    with_parsed(
        "try { f(); } catch (e) { g(e); } h(typeof e);",
        |parsed, interner| {
            // The use of e after the catch does not see the catch binding.
            let program_free: Vec<String> = parsed
                .program_summary()
                .free_names
                .iter()
                .map(|a| interner.resolve(*a).to_string())
                .collect();
            assert!(program_free.contains(&"e".to_string()));

            let e = interner.get("e").expect("e interned");
            let catch_def = parsed
                .defs
                .iter_defs()
                .find(|(_, d)| d.name == e && d.kind == DefKind::CatchParam)
                .expect("catch parameter definition");
            // Only the use inside the catch body links to it.
            assert_eq!(parsed.defs.use_count_of(catch_def.0), 1);
        },
    );
}
