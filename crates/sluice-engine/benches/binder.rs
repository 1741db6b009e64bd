use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sluice_engine::{Binder, BinderConfig};

const TYPES: &str = "namespace bench;
    type Id = int64;
    type Point = tuple<float64 x, float64 y>;
    type Tagged = tuple<Point, tuple<Id id, rstring tag>>;
    type Color = enum { red, green, blue };
    type Bag = map<rstring, list<Tagged>>;";

/// A chain of `depth` composites, each wrapping the next
fn nested_composites(depth: usize) -> String {
    let mut source = String::from("namespace bench; type T = tuple<int32 a, rstring b>;\n");
    source.push_str(
        "composite Level0(input stream<T> In; output stream<T> Out) {
            graph stream<T> Out = Functor(In) { param filter: a > 0; }
        }\n",
    );
    for level in 1..depth {
        source.push_str(&format!(
            "composite Level{level}(input stream<T> In; output stream<T> Out) {{
                graph
                    stream<T> Left = Level{prev}(In) {{ }}
                    stream<T> Out = Level{prev}(Left) {{ }}
            }}\n",
            level = level,
            prev = level - 1
        ));
    }
    source.push_str(&format!(
        "composite Main {{
            graph
                stream<T> Src = Beacon() {{ }}
                stream<T> Sink = Level{}(Src) {{ }}
        }}\n",
        depth - 1
    ));
    source
}

fn wide_graph(width: usize) -> String {
    let mut source = String::from(
        "namespace bench; type T = tuple<int32 a, rstring b>;
         composite Main { graph stream<T> S0 = Beacon() { }\n",
    );
    for i in 1..width {
        source.push_str(&format!(
            "stream<T> S{i} = Custom(S{prev}) {{
                logic state: {{ mutable int32 n = 0; }}
                onTuple S{prev}: {{ n = n + a; submit({{ a = n, b = b }}, S{i}); }}
            }}\n",
            i = i,
            prev = i - 1
        ));
    }
    source.push('}');
    source
}

fn bind_source(source: &str) -> Binder {
    let mut binder = Binder::new(BinderConfig::default());
    binder.add_source("bench.spl", source);
    binder.bind();
    binder
}

fn bench_types(c: &mut Criterion) {
    c.bench_function("bind_types", |b| {
        b.iter(|| bind_source(black_box(TYPES)));
    });
}

fn bench_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_composites");
    for depth in [2, 4, 6] {
        let source = nested_composites(depth);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &source, |b, source| {
            b.iter(|| bind_source(black_box(source)));
        });
    }
    group.finish();
}

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_graph");
    for width in [10, 100] {
        let source = wide_graph(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &source, |b, source| {
            b.iter(|| bind_source(black_box(source)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_types, bench_nested, bench_wide);
criterion_main!(benches);
