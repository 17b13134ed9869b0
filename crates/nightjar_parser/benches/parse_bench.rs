//! Parse throughput benchmarks: lazy vs. eager function-body parsing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nightjar_core::arena::ParseArena;
use nightjar_core::intern::AtomInterner;
use nightjar_parser::parser::{ParseOptions, Parser};

fn fixture(functions: usize) -> String {
    let mut source = String::from("var total = 0;\n");
    for i in 0..functions {
        source.push_str(&format!(
            "function work{i}(a, b) {{\n  var acc = a;\n  for (var j = 0; j < b; j++) {{\n    acc = acc + j * 2 - (a ? 1 : 0);\n  }}\n  return acc;\n}}\ntotal = total + work{i}({i}, 100);\n",
        ));
    }
    source
}

fn bench_parse(c: &mut Criterion) {
    let source = fixture(50);
    let interner = AtomInterner::new();

    c.bench_function("parse_lazy", |b| {
        b.iter(|| {
            let arena = ParseArena::new();
            let parsed = Parser::with_options(
                &arena,
                &interner,
                black_box(&source),
                ParseOptions {
                    lazy_functions: true,
                },
            )
            .parse_program()
            .expect("parse failed");
            black_box(parsed.functions.len())
        })
    });

    c.bench_function("parse_eager", |b| {
        b.iter(|| {
            let arena = ParseArena::new();
            let parsed = Parser::with_options(
                &arena,
                &interner,
                black_box(&source),
                ParseOptions {
                    lazy_functions: false,
                },
            )
            .parse_program()
            .expect("parse failed");
            black_box(parsed.functions.len())
        })
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
