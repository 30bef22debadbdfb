use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::fmt::Write as _;
use std::hint::black_box;

/// A record-sized flowchart: a spine with forward skips and a few back links.
fn flowchart_source(node_count: usize, splines: &str) -> String {
    let mut src = String::new();
    let _ = writeln!(
        src,
        "digraph {{ graph [rankdir=TB, splines={splines}, nodesep=0.5, ranksep=0.6, pad=0.25];"
    );
    src.push_str("node [shape=box, style=\"rounded,filled\", fillcolor=\"#ffffff\"];\n");
    for i in 0..node_count {
        let _ = writeln!(src, "  \"rec{i}\" [id=\"rec{i}\", label=\"Record number {i}\"];");
    }
    for i in 0..node_count.saturating_sub(1) {
        let _ = writeln!(src, "  \"rec{i}\" -> \"rec{}\";", i + 1);
        if i % 3 == 0 && i + 4 < node_count {
            let _ = writeln!(src, "  \"rec{i}\" -> \"rec{}\";", i + 4);
        }
        if i % 10 == 9 {
            let _ = writeln!(src, "  \"rec{i}\" -> \"rec{}\";", i - 7);
        }
    }
    src.push('}');
    src
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for splines in ["ortho", "line"] {
        let src = flowchart_source(100, splines);
        group.bench_with_input(BenchmarkId::new("records_100", splines), &src, |b, src| {
            b.iter(|| siren::render(black_box(src)).expect("render"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
