use std::{fs, hint::black_box};

use adocflow_parser::{Execution, Options, parse_str};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    let fixture_files_without_ext = vec!["user-guide", "notes", "conditionals"];
    let executions = [
        ("sequential", Execution::Sequential),
        ("threaded", Execution::Threaded { capacity: 64 }),
    ];

    for name in fixture_files_without_ext {
        let content = fs::read_to_string(format!("fixtures/documents/{name}.adoc"))
            .expect("Failed to read benchmark fixture file");
        for (label, execution) in executions {
            let options = Options::builder().with_execution(execution).build();
            group.bench_with_input(BenchmarkId::new(label, name), &content, |b, input| {
                b.iter(|| black_box(parse_str(black_box(input), &options)));
            });
        }
    }

    // A larger document: every fixture repeated.
    let large: String = ["user-guide", "notes", "conditionals"]
        .iter()
        .map(|name| {
            fs::read_to_string(format!("fixtures/documents/{name}.adoc"))
                .expect("Failed to read benchmark fixture file")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .repeat(50);
    for (label, execution) in executions {
        let options = Options::builder().with_execution(execution).build();
        group.bench_with_input(BenchmarkId::new(label, "large"), &large, |b, input| {
            b.iter(|| black_box(parse_str(black_box(input), &options)));
        });
    }

    group.finish();
}

criterion_group!(benches, parse_benchmark);
criterion_main!(benches);
