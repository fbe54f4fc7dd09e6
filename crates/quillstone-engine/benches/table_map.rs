use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use quillstone_engine::{Node, TableMap};
use quillstone_schema::{NodeAttrs, NodeKind, Schema, TableCellAttrs, TableRowAttrs};

fn build_table(schema: &Schema, rows: usize, cols: usize) -> Node {
    let row_nodes: Vec<Node> = (0..rows)
        .map(|r| {
            let cells: Vec<Node> = (0..cols)
                .map(|c| {
                    let para = Node::new(
                        schema,
                        NodeKind::Paragraph,
                        NodeAttrs::None,
                        vec![Node::text(format!("cell {r}:{c}"))],
                    )
                    .unwrap();
                    Node::new(
                        schema,
                        NodeKind::TableCell,
                        NodeAttrs::TableCell(TableCellAttrs::default()),
                        vec![para],
                    )
                    .unwrap()
                })
                .collect();
            Node::new(
                schema,
                NodeKind::TableRow,
                NodeAttrs::TableRow(TableRowAttrs { header: r == 0 }),
                cells,
            )
            .unwrap()
        })
        .collect();
    Node::new(
        schema,
        NodeKind::Table,
        NodeAttrs::default_for(NodeKind::Table),
        row_nodes,
    )
    .unwrap()
}

fn bench_table_map(c: &mut Criterion) {
    let schema = Schema::standard();

    for (rows, cols) in [(10, 5), (50, 10), (200, 20)] {
        let table = build_table(&schema, rows, cols);
        c.bench_function(&format!("table_map_build_{rows}x{cols}"), |b| {
            b.iter(|| TableMap::build(black_box(&table), 0).unwrap())
        });
    }

    let table = build_table(&schema, 50, 10);
    let map = TableMap::build(&table, 0).unwrap();
    c.bench_function("table_map_rect_between", |b| {
        b.iter(|| {
            map.rect_between(black_box(map.pos_at(3, 2)), black_box(map.pos_at(40, 8)))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_table_map);
criterion_main!(benches);
