mod bench_util;

use compiler::{codegen::to_string, CompileOption, Compiler, ParseOption};
use idom::idom;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};

fn full_compile(compiler: &Compiler, source: &str) -> String {
    let ast = compiler
        .compile("bench", source, &CompileOption::default())
        .unwrap();
    to_string(&ast, source).unwrap().code
}

fn bench_compile(c: &mut Criterion) {
    let compiler = Compiler::new(vec![idom()]).unwrap();
    for (name, content) in bench_util::get_fixtures() {
        c.bench_with_input(BenchmarkId::new("compile", &name), &content, |b, s| {
            b.iter(|| full_compile(&compiler, s));
        });
        c.bench_with_input(BenchmarkId::new("parse", &name), &content, |b, s| {
            b.iter(|| compiler.parse(s, &ParseOption::default()).unwrap());
        });
    }
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
