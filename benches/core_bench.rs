//! Benchmarks for infrabind core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use infrabind::core::binder::{bind_program, BindOptions};
use infrabind::core::diagnostics::SourceRange;
use infrabind::core::resolver::dependency_order;
use infrabind::core::schema::{parse_package, Registry};
use infrabind::core::syntax::{parse_program, parse_traversal};
use infrabind::core::token::decompose_token;
use infrabind::core::traverse::traverse_all;

const SCHEMA: &str = r##"
name: aws
resources:
  "aws:s3/bucket:Bucket":
    inputProperties:
      bucket: {type: string}
      tags: {type: object, additionalProperties: {type: string}}
      corsRules: {type: array, items: {$ref: "#/types/aws:s3/BucketCorsRule:BucketCorsRule"}}
    properties:
      arn: {type: string}
      bucket: {type: string}
      corsRules: {type: array, items: {$ref: "#/types/aws:s3/BucketCorsRule:BucketCorsRule"}}
types:
  "aws:s3/BucketCorsRule:BucketCorsRule":
    properties:
      allowedMethods: {type: array, items: {type: string}}
      maxAgeSeconds: {type: integer}
"##;

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.add_package(parse_package(SCHEMA).unwrap());
    registry
}

/// A chain of `n` buckets, each naming itself after its predecessor.
fn chain_program(n: usize) -> String {
    let mut yaml = String::from("blocks:\n  - kind: config\n    labels: [prefix, string]\n    attributes:\n      default: bench\n");
    for i in 0..n {
        let source = if i == 0 {
            "${prefix}".to_string()
        } else {
            format!("${{b{}.bucket}}", i - 1)
        };
        yaml.push_str(&format!(
            "  - kind: resource\n    labels: [b{i}, \"aws:s3/bucket:Bucket\"]\n    attributes:\n      bucket: \"{source}-{i}\"\n      tags:\n        Index: \"{i}\"\n"
        ));
    }
    yaml
}

fn bench_decompose_token(c: &mut Criterion) {
    c.bench_function("decompose_token", |b| {
        b.iter(|| {
            let parts = decompose_token(black_box("aws:s3/bucket:Bucket"), SourceRange::default());
            black_box(parts);
        });
    });
}

fn bench_traverse(c: &mut Criterion) {
    let registry = registry();
    let package = registry.package("aws").unwrap();
    let outputs = package.resources["aws:s3/bucket:Bucket"].output_type.clone();
    let (_, path) = parse_traversal("b.corsRules[0].maxAgeSeconds", SourceRange::default()).unwrap();

    c.bench_function("traverse_nested", |b| {
        b.iter(|| {
            let result = traverse_all(black_box(&outputs), black_box(&path));
            black_box(result);
        });
    });
}

fn bench_bind(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("bind_program");
    for n in [10, 100, 500] {
        let program = parse_program(&chain_program(n)).unwrap();
        for parallel in [false, true] {
            let options = BindOptions {
                parallel,
                ..BindOptions::default()
            };
            let id = BenchmarkId::new(if parallel { "parallel" } else { "sequential" }, n);
            group.bench_with_input(id, &program, |b, program| {
                b.iter(|| {
                    let bound = bind_program(black_box(program), &registry, &options).unwrap();
                    black_box(bound);
                });
            });
        }
    }
    group.finish();
}

fn bench_dependency_order(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("dependency_order");
    for n in [10, 50, 100] {
        let program = parse_program(&chain_program(n)).unwrap();
        let bound = bind_program(&program, &registry, &BindOptions::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &bound, |b, bound| {
            b.iter(|| {
                let order = dependency_order(black_box(bound)).unwrap();
                black_box(order);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_decompose_token,
    bench_traverse,
    bench_bind,
    bench_dependency_order
);
criterion_main!(benches);
