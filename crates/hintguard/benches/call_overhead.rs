// Use codspeed-criterion-compat when running on CodSpeed (CI), real criterion otherwise (for flamegraphs)
#[cfg(codspeed)]
use codspeed_criterion_compat::{Bencher, Criterion, black_box, criterion_group, criterion_main};
#[cfg(not(codspeed))]
use criterion::{Bencher, Criterion, black_box, criterion_group, criterion_main};
use hintguard::{Callable, CheckConf, CheckStrategy, Decorator, FunctionBuilder, Hint, Object, Parameter, hints};

/// `def f(x: <hint>) -> int: return 0`
fn function(hint: Hint) -> Callable {
    FunctionBuilder::new("f")
        .module("bench")
        .param(Parameter::positional("x").hint(hint))
        .returns(hints::int())
        .body(|_| Ok(Object::Int(0)))
        .build()
        .unwrap()
}

/// Calls `callable` with `arg` once per iteration.
fn run_call(bench: &mut Bencher, callable: &Callable, arg: &Object) {
    assert_eq!(callable.call_args(vec![arg.clone()]).unwrap(), Object::Int(0));
    bench.iter(|| {
        let r = callable.call_args(vec![black_box(arg.clone())]).unwrap();
        black_box(r);
    });
}

fn checked(hint: Hint, strategy: CheckStrategy) -> Callable {
    Decorator::new(CheckConf::new().strategy(strategy))
        .decorate(&function(hint))
        .unwrap()
}

/// Configures the call-overhead benchmark group.
///
/// Each checked variant is paired with the unchecked call so the difference is
/// the cost of the wrapper alone.
fn criterion_benchmark(c: &mut Criterion) {
    let int = Object::Int(1);
    c.bench_function("int__unchecked", |b| run_call(b, &function(hints::int()), &int));
    c.bench_function("int__checked", |b| {
        run_call(b, &checked(hints::int(), CheckStrategy::O1), &int);
    });

    let list = Object::List((0..1000).map(Object::Int).collect());
    let list_hint = || hints::list(hints::int());
    c.bench_function("list_1000__unchecked", |b| run_call(b, &function(list_hint()), &list));
    c.bench_function("list_1000__sampled", |b| {
        run_call(b, &checked(list_hint(), CheckStrategy::O1), &list);
    });
    c.bench_function("list_1000__exhaustive", |b| {
        run_call(b, &checked(list_hint(), CheckStrategy::On), &list);
    });

    let union = hints::union(&[hints::str(), hints::bytes(), hints::list(hints::int())]);
    c.bench_function("union__checked", |b| {
        run_call(b, &checked(union.clone(), CheckStrategy::O1), &list);
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
