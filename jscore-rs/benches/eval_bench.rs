use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jscore::lexer::tokenize;
use jscore::parser::compile;
use jscore::{Engine, Env, EvalOptions, Language, Value};

const EXPR: &str = "a * (b + 3) - c / 2 > 10 && name.length > 0 ? 'big' : 'small'";

const PROGRAM: &str = "\
function fib(n) { if (n < 2) { return n }; return fib(n - 1) + fib(n - 2) };\n\
xs = [];\n\
for (i = 0; i < 50; i++) { xs.push(i * i) };\n\
fib(12) + xs.filter(x => x % 2 == 0).reduce((s, x) => s + x, 0)";

fn scope() -> Env {
    let env = Env::new();
    env.set_local("a", Value::Int(7));
    env.set_local("b", Value::Int(4));
    env.set_local("c", Value::Number(9.5));
    env.set_local("name", Value::from("jscore"));
    env
}

fn bench_front_end(c: &mut Criterion) {
    let lang = Language::common();
    let mut g = c.benchmark_group("front_end");

    g.bench_function("tokenize_expr", |b| {
        b.iter(|| tokenize(black_box(EXPR.as_bytes()), "bench", &lang))
    });
    g.bench_function("compile_expr", |b| {
        b.iter(|| compile(black_box(EXPR), "bench", &lang))
    });
    g.bench_function("compile_program", |b| {
        b.iter(|| compile(black_box(PROGRAM), "bench", &lang))
    });

    g.finish();
}

fn bench_eval(c: &mut Criterion) {
    let engine = Engine::new();
    let env = scope();
    let mut g = c.benchmark_group("eval");

    g.bench_function("expr_uncached", |b| {
        b.iter(|| engine.eval_with(black_box(EXPR), &env, "bench", EvalOptions::empty()))
    });
    g.bench_function("expr_cached", |b| {
        b.iter(|| engine.eval_with(black_box(EXPR), &env, "bench", EvalOptions::CACHED))
    });
    g.bench_function("program", |b| {
        b.iter(|| engine.eval_with(black_box(PROGRAM), &Env::new(), "bench", EvalOptions::CACHED))
    });

    g.finish();
}

criterion_group!(benches, bench_front_end, bench_eval);
criterion_main!(benches);
