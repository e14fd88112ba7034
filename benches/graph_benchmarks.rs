use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hyperstore::graph::{DeclaredSchema, FeatureDecl, FeatureValue, Graph, Identifier};

fn schema_graph() -> Graph {
    let mut g = Graph::new("Bench", "g").unwrap();
    g.add_schema(
        "Person",
        DeclaredSchema::node()
            .with_feature("name", FeatureDecl::string())
            .with_feature("age", FeatureDecl::num())
            .with_feature(
                "degree",
                FeatureDecl::derived(true, |graph: &Graph, id: &Identifier| {
                    Ok(FeatureValue::Num(graph.get_node(id)?.degree() as f64))
                }),
            ),
    )
    .unwrap();
    g.add_schema("Group", DeclaredSchema::undirected()).unwrap();
    g.add_schema("Follows", DeclaredSchema::directed()).unwrap();
    g
}

/// Graph with `size` people, groups of five and a follow chain
fn populated(size: usize) -> (Graph, Vec<Identifier>) {
    let mut g = schema_graph();
    let people: Vec<Identifier> = (0..size)
        .map(|i| {
            let id = g.id_for("Person", format!("p{}", i));
            g.add_node(id).unwrap()
        })
        .collect();
    for (i, chunk) in people.chunks(5).enumerate() {
        let id = g.id_for("Group", format!("g{}", i));
        g.add_undirected_edge(id, chunk.iter().cloned()).unwrap();
    }
    for (i, pair) in people.windows(2).enumerate() {
        let id = g.id_for("Follows", format!("f{}", i));
        g.add_directed_edge(id, [pair[0].clone()], [pair[1].clone()]).unwrap();
    }
    (g, people)
}

/// Benchmark node insertion throughput
fn bench_node_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_insertion");

    for size in [100, 1000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut g = schema_graph();
                for i in 0..size {
                    let id = g.id_for("Person", format!("p{}", i));
                    let id = g.add_node(id).unwrap();
                    g.set_feature_value(&id, "age", (i % 100) as i64).unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark hyperedge construction over existing nodes
fn bench_edge_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_insertion");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| populated(size));
        });
    }
    group.finish();
}

/// Benchmark neighbourhood queries
fn bench_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency");

    for size in [100, 1000, 10_000].iter() {
        let (g, people) = populated(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut total = 0;
                for id in people.iter().step_by(10) {
                    total += g.node_view(id).unwrap().adjacent().len();
                }
                criterion::black_box(total);
            });
        });
    }
    group.finish();
}

/// Benchmark memoized derived feature reads
fn bench_derived_reads(c: &mut Criterion) {
    let (g, people) = populated(1000);
    c.bench_function("derived_cached_reads", |b| {
        b.iter(|| {
            for id in &people {
                criterion::black_box(g.get_feature_value(id, "degree").unwrap());
            }
        });
    });
}

/// Benchmark node removal with edge cascade
fn bench_node_removal(c: &mut Criterion) {
    c.bench_function("remove_all_nodes_1000", |b| {
        b.iter_batched(
            || populated(1000).0,
            |mut g| g.remove_all_nodes().unwrap(),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_node_insertion,
    bench_edge_insertion,
    bench_adjacency,
    bench_derived_reads,
    bench_node_removal
);
criterion_main!(benches);
