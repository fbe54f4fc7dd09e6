use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use quillstone_engine::{mark_range, Node};
use quillstone_schema::{Mark, MarkKind, NodeAttrs, NodeKind, Schema};

/// A paragraph of `runs` alternating marked/unmarked text runs.
fn build_doc(schema: &Schema, runs: usize) -> Node {
    let children: Vec<Node> = (0..runs)
        .map(|i| {
            if i % 2 == 0 {
                Node::text_marked(format!("run number {i} "), vec![Mark::highlight("yellow")])
            } else {
                Node::text_marked(
                    format!("run number {i} "),
                    vec![Mark::highlight("yellow"), Mark::link(format!("https://x/{i}"))],
                )
            }
        })
        .collect();
    let para = Node::new(schema, NodeKind::Paragraph, NodeAttrs::None, children).unwrap();
    Node::new(schema, NodeKind::Doc, NodeAttrs::None, vec![para]).unwrap()
}

fn bench_mark_range(c: &mut Criterion) {
    let schema = Schema::standard();

    for runs in [8, 64, 512] {
        let doc = build_doc(&schema, runs);
        let mid = doc.content_size() / 2;
        c.bench_function(&format!("mark_range_{runs}_runs"), |b| {
            b.iter(|| mark_range(black_box(&doc), black_box(mid), MarkKind::Highlight).unwrap())
        });
    }
}

criterion_group!(benches, bench_mark_range);
criterion_main!(benches);
