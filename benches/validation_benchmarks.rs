use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use xml_validator::{XmlValidator, decode};

/// Generate a document with a specific validation scenario
fn generate_document(elements: usize, scenario: &str) -> String {
    let mut content = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<catalog>\n");

    for i in 0..elements {
        match scenario {
            "all_valid" => {
                content.push_str(&format!(
                    "  <item id=\"{}\" price=\"{:.2}\">Item &amp; more {}</item>\n",
                    i,
                    (i as f32) * 0.5,
                    i
                ));
            }
            "undefined_entities" => {
                if i % 10 == 0 {
                    content.push_str(&format!("  <item id=\"{}\">&unknown{};</item>\n", i, i));
                } else {
                    content.push_str(&format!("  <item id=\"{}\">plain</item>\n", i));
                }
            }
            "deep_nesting" => {
                content.push_str(&format!("<level n=\"{}\">", i));
            }
            _ => unreachable!("unknown scenario {}", scenario),
        }
    }

    if scenario == "deep_nesting" {
        for _ in 0..elements {
            content.push_str("</level>");
        }
    }

    content.push_str("</catalog>\n");
    content
}

fn benchmark_validation_scenarios(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation_scenarios");

    for scenario in ["all_valid", "undefined_entities", "deep_nesting"] {
        for size in [100usize, 1_000, 10_000] {
            let document = generate_document(size, scenario);
            group.throughput(Throughput::Bytes(document.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(scenario, size),
                &document,
                |b, document| {
                    let mut validator = XmlValidator::new();
                    b.iter(|| black_box(validator.validate(black_box(document))))
                },
            );
        }
    }

    group.finish();
}

fn benchmark_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoding");

    let utf8 = generate_document(1_000, "all_valid").into_bytes();
    let mut latin1 = utf8.clone();
    latin1.extend_from_slice(b"<!-- caf\xE9 -->");

    for (name, bytes) in [("utf8", &utf8), ("latin1", &latin1)] {
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_function(name, |b| b.iter(|| black_box(decode(black_box(bytes)))));
    }

    group.finish();
}

criterion_group!(benches, benchmark_validation_scenarios, benchmark_decoding);
criterion_main!(benches);
