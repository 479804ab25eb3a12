//! Criterion benchmarks for call collection and report ranking.
//!
//! Run with: `cargo bench`
//!
//! Inputs are synthetic so results are comparable across machines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sigcov::collector::CallCollector;
use sigcov::location::Location;
use sigcov::matcher::ResolvedCall;
use sigcov::method_index::{InterfaceNode, MethodDeclaration, MethodIndex};
use sigcov::report::ReportBuilder;
use sigcov::syntax::ruby::RubyParser;
use sigcov::syntax::{SourceParser, SourceRange, SyntaxTree};

// ─── Helpers ─────────────────────────────────────────────────────────

/// A Ruby file with `classes` classes of `methods` methods, each making a few calls.
fn synthetic_ruby(classes: usize, methods: usize) -> String {
    let mut src = String::new();
    for c in 0..classes {
        src.push_str(&format!("class Model{}\n  extend T::Sig\n  include Comparable\n\n", c));
        for m in 0..methods {
            src.push_str(&format!(
                "  sig {{ params(x: Integer).returns(String) }}\n  def method_{}(x)\n    items.map {{ |i| i.to_s }}.join(\",\")\n    helper_{}(x + 1).save\n  end\n\n",
                m, m
            ));
        }
        src.push_str("end\n\n");
    }
    src
}

/// A flat tree with `n` calls under one root, bypassing the parser.
fn synthetic_tree(n: usize) -> SyntaxTree {
    let mut b = SyntaxTree::builder();
    let mut calls = Vec::with_capacity(n);
    for i in 0..n {
        let line = i as u32 + 1;
        let recv = b.other("identifier", SourceRange::new(line, 0, line, 4), vec![]);
        let name = if i % 5 == 0 { "sig" } else { "save" };
        calls.push(b.call(
            name,
            Some(recv),
            SourceRange::new(line, 5, line, 9),
            SourceRange::new(line, 0, line, 9),
            vec![recv],
        ));
    }
    let root = b.other("program", SourceRange::new(1, 0, n as u32 + 1, 0), calls);
    b.finish(root)
}

fn synthetic_resolved(n: usize) -> Vec<ResolvedCall> {
    let tree = synthetic_tree(n);
    CallCollector::default()
        .collect("bench.rb", &tree)
        .into_iter()
        .enumerate()
        .map(|(i, call)| ResolvedCall {
            call,
            receiver_type: match i % 4 {
                0 => None,
                1 => Some("T.untyped".to_string()),
                _ => Some(format!("Model{}", i % 200)),
            },
            method_signature: (i % 3 == 0).then(|| "String".to_string()),
        })
        .collect()
}

fn synthetic_index(n: usize) -> MethodIndex {
    let forest: Vec<InterfaceNode> = (0..n)
        .map(|i| {
            InterfaceNode::Method(MethodDeclaration {
                simple_name: if i % 10 == 0 { "save".to_string() } else { format!("m{}", i) },
                fully_qualified_name: format!("::Gem{}#m{}", i, i),
                location: Location::new("sorbet/rbi/gems/g.rbi", i as u32 + 1, 2, i as u32 + 1, 10),
            })
        })
        .collect();
    MethodIndex::build(&forest)
}

// ─── Benchmarks ──────────────────────────────────────────────────────

fn bench_parse_and_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_and_collect");
    for &(classes, methods) in &[(5, 10), (20, 25)] {
        let src = synthetic_ruby(classes, methods);
        let mut parser = RubyParser::new();
        let collector = CallCollector::default();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", classes, methods)),
            &src,
            |b, src| {
                b.iter(|| {
                    let tree = parser.parse("bench.rb", black_box(src)).unwrap();
                    collector.collect("bench.rb", &tree)
                })
            },
        );
    }
    group.finish();
}

fn bench_collect_tree(c: &mut Criterion) {
    let tree = synthetic_tree(10_000);
    let collector = CallCollector::default();
    c.bench_function("collect_10k_calls", |b| {
        b.iter(|| collector.collect("bench.rb", black_box(&tree)))
    });
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let index = synthetic_index(5_000);
    for &n in &[1_000usize, 50_000] {
        let calls = synthetic_resolved(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &calls, |b, calls| {
            b.iter(|| {
                let mut builder = ReportBuilder::new();
                builder.extend(calls.iter().cloned());
                builder.finish(black_box(&index))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse_and_collect, bench_collect_tree, bench_rank);
criterion_main!(benches);
