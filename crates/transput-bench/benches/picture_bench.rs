//! Picture rendering and scanning benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use transput_core::stringify::{Number, fixed, float, whole};
use transput_core::{
    EnvHandle, FormatText, MemoryFile, Mode, PictureNode, ReadItem, StaticHost, Transput,
    TransputItem, Value,
};

fn format(json: &str) -> FormatText {
    let root: PictureNode = serde_json::from_str(json).expect("bench format");
    FormatText::new(&root, EnvHandle(0))
}

fn write_all(format: &FormatText, values: &[Value]) -> String {
    let mut items = vec![TransputItem::Format(format.clone())];
    items.extend(values.iter().cloned().map(TransputItem::Value));
    let mut file = MemoryFile::new();
    Transput::new(&mut file)
        .putf(&mut StaticHost, &items)
        .expect("bench write");
    file.output()
}

fn bench_stringify(c: &mut Criterion) {
    let mut group = c.benchmark_group("stringify");
    for &x in &[0.5_f64, 3.14159, 1.0e12, -2.5e-7] {
        group.bench_with_input(BenchmarkId::new("fixed", x), &x, |b, &x| {
            b.iter(|| fixed(&Number::Real(criterion::black_box(x)), 20, 6));
        });
        group.bench_with_input(BenchmarkId::new("float", x), &x, |b, &x| {
            b.iter(|| float(&Number::Real(criterion::black_box(x)), 22, 10, 4));
        });
    }
    group.bench_function("whole/i64", |b| {
        b.iter(|| whole(&Number::Int(criterion::black_box(-9_876_543_210)), 0));
    });
    group.finish();
}

fn bench_write_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("putf");

    let integral = format(
        r#"{"replicator": {"count": {"static": 100}, "child": {"collection": [
            {"picture": {"integral": {"sign": {"frame": "minus"}, "digits": "zzzzzd"}}},
            {"insertion": "space"}]}}}"#,
    );
    let ints: Vec<Value> = (0..100).map(|i| Value::Int(i * 997 - 50_000)).collect();
    group.bench_function("integral_x100", |b| {
        b.iter(|| write_all(&integral, criterion::black_box(&ints)));
    });

    let real = format(
        r#"{"replicator": {"count": {"static": 100}, "child": {"collection": [
            {"picture": {"real": {"sign": {"frame": "minus"}, "integer": "zzzd",
                "point": {}, "fraction": "ddd"}}},
            {"insertion": "space"}]}}}"#,
    );
    let reals: Vec<Value> = (0..100).map(|i| Value::Real(f64::from(i) * 3.25 - 99.5)).collect();
    group.bench_function("real_x100", |b| {
        b.iter(|| write_all(&real, criterion::black_box(&reals)));
    });

    let cstyle = format(
        r#"{"replicator": {"count": {"static": 100}, "child": {"collection": [
            {"picture": {"c_style": "%+12.4e"}},
            {"insertion": "line_break"}]}}}"#,
    );
    group.bench_function("cstyle_x100", |b| {
        b.iter(|| write_all(&cstyle, criterion::black_box(&reals)));
    });

    group.finish();
}

fn bench_read_choice(c: &mut Criterion) {
    let choice = format(
        r#"{"collection": [
            {"picture": {"choice": {"kind": "integral", "alternatives": [
                {"literal": "january"}, {"literal": "february"}, {"literal": "march"},
                {"literal": "april"}, {"literal": "may"}, {"literal": "june"}]}}},
            {"insertion": "space"}]}"#,
    );
    let input = "june march may february ".repeat(25);
    let mut items = vec![ReadItem::Format(choice)];
    items.extend(std::iter::repeat_n(ReadItem::Value(Mode::Int), 100));

    c.bench_function("getf/choice_x100", |b| {
        b.iter(|| {
            let mut file = MemoryFile::with_input(criterion::black_box(&input));
            Transput::new(&mut file)
                .getf(&mut StaticHost, &items)
                .expect("bench read")
        });
    });
}

criterion_group!(
    benches,
    bench_stringify,
    bench_write_patterns,
    bench_read_choice
);
criterion_main!(benches);
