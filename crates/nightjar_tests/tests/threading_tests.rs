//! Independent compilation units parse concurrently: each parser owns all
//! of its mutable state, and the only shared collaborator is the
//! thread-safe atom interner.

use nightjar_core::arena::ParseArena;
use nightjar_core::intern::AtomInterner;
use nightjar_parser::parser::Parser;
use std::thread;

#[test]
fn parallel_parses_share_one_interner() {
    let interner = AtomInterner::new();
    let sources: Vec<String> = (0..8)
        .map(|i| {
            format!(
                "function job{i}(input) {{\n  var out = [];\n  for (var k = 0; k < input; k++) {{\n    out[k] = k * {i};\n  }}\n  return out;\n}}\nvar result{i} = job{i}({i} + 10);\n"
            )
        })
        .collect();

    let handles: Vec<_> = sources
        .into_iter()
        .map(|source| {
            let interner = interner.clone();
            thread::spawn(move || {
                let arena = ParseArena::new();
                let parsed = Parser::new(&arena, &interner, &source)
                    .parse_program()
                    .expect("parse failed");
                assert_eq!(parsed.program.statements.len(), 2);
                // One program summary plus one function.
                assert_eq!(parsed.functions.len(), 2);
                parsed.functions[1].name.expect("function has a name")
            })
        })
        .collect();

    let mut names = Vec::new();
    for handle in handles {
        names.push(handle.join().expect("worker panicked"));
    }
    // Atoms from different threads resolve through the shared interner.
    for (i, atom) in names.iter().enumerate() {
        assert_eq!(interner.resolve(*atom), format!("job{i}"));
    }
}

#[test]
fn identical_names_intern_to_the_same_atom_across_threads() {
    let interner = AtomInterner::new();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let interner = interner.clone();
            thread::spawn(move || {
                let arena = ParseArena::new();
                let parsed = Parser::new(&arena, &interner, "var sharedName = 1;")
                    .parse_program()
                    .expect("parse failed");
                let _ = parsed;
                interner.intern("sharedName")
            })
        })
        .collect();
    let atoms: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .collect();
    assert!(atoms.windows(2).all(|w| w[0] == w[1]));
}
