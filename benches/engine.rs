use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use reqflow::model::{Component, ComponentKind, ComponentLink, Position, Relationship};
use reqflow::{Config, DiagramKind, LayoutState, SourceData};
use std::hint::black_box;

fn dense_component_source(nodes: usize, extra_links: usize) -> SourceData {
    let mut components: Vec<Component> = (0..nodes)
        .map(|i| Component {
            id: format!("CMP-{i}"),
            name: format!("Component {i}"),
            description: None,
            kind: if i % 3 == 0 {
                ComponentKind::Hardware
            } else {
                ComponentKind::Software
            },
            fallback_position: Position::default(),
            links: Vec::new(),
        })
        .collect();

    for i in 0..nodes.saturating_sub(1) {
        components[i].links.push(ComponentLink {
            child_id: format!("CMP-{}", i + 1),
            relationship: Relationship::Communication {
                protocol: Some("CAN".to_string()),
                data_items: Some("frames".to_string()),
            },
        });
    }

    let mut count = 0usize;
    'outer: for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_links {
                break 'outer;
            }
            components[i].links.push(ComponentLink {
                child_id: format!("CMP-{j}"),
                relationship: Relationship::Structural {
                    cardinality: Some("1".to_string()),
                },
            });
            count += 1;
        }
    }

    SourceData {
        components,
        ..SourceData::default()
    }
}

fn bench_recompute(c: &mut Criterion) {
    let config = Config::default();
    for size in [10usize, 50, 200] {
        let data = dense_component_source(size, size / 2);

        let fresh = LayoutState::new(DiagramKind::Component);
        c.bench_with_input(BenchmarkId::new("recompute_fresh", size), &size, |b, _| {
            b.iter(|| black_box(fresh.recompute(&data, &config)))
        });

        let mut pinned = LayoutState::new(DiagramKind::Component);
        for i in 0..size {
            pinned.set_node_position(
                &format!("CMP-{i}"),
                Position::new(i as f64 * 60.0 + 8.0, 40.0),
            );
        }
        c.bench_with_input(BenchmarkId::new("recompute_pinned", size), &size, |b, _| {
            b.iter(|| black_box(pinned.recompute(&data, &config)))
        });
    }
}

criterion_group!(benches, bench_recompute);
criterion_main!(benches);
