use siren::{Layout, LayoutInput, DeterministicTextMeasurer, Error, layout, parse};

fn laid_out(src: &str) -> Layout {
    let dot = parse(src).unwrap();
    layout(LayoutInput::from_dot(&dot, &DeterministicTextMeasurer::default())).unwrap()
}

fn center(l: &Layout, name: &str) -> (f64, f64) {
    let n = l.nodes.iter().find(|n| n.spec.name == name).unwrap();
    (n.center.x, n.center.y)
}

#[test]
fn layout_can_layout_a_single_node() {
    let l = laid_out("digraph { pad=0; a [shape=box, width=1, height=0.5] }");
    assert_eq!((l.width, l.height), (72.0, 36.0));
    assert_eq!(center(&l, "a"), (36.0, 18.0));
}

#[test]
fn top_to_bottom_chain_is_a_vertical_line() {
    let l = laid_out("digraph { rankdir=TB; ranksep=0.5; node [shape=box]; a -> b -> c }");
    let (a, b, c) = (center(&l, "a"), center(&l, "b"), center(&l, "c"));
    assert_eq!(a.0, b.0);
    assert_eq!(b.0, c.0);
    assert!(a.1 < b.1 && b.1 < c.1);
    assert!((b.1 - a.1 - (36.0 + 36.0)).abs() < 1e-9, "node height plus ranksep");
    assert!(l.height > l.width);
}

#[test]
fn left_to_right_chain_is_a_horizontal_line() {
    let l = laid_out("digraph { rankdir=LR; node [shape=box]; a -> b -> c }");
    let (a, b, c) = (center(&l, "a"), center(&l, "b"), center(&l, "c"));
    assert_eq!(a.1, b.1);
    assert_eq!(b.1, c.1);
    assert!(a.0 < b.0 && b.0 < c.0);
    assert!(l.width > l.height);
}

#[test]
fn bottom_to_top_puts_sources_last() {
    let l = laid_out("digraph { rankdir=BT; a -> b }");
    assert!(center(&l, "a").1 > center(&l, "b").1);
}

#[test]
fn siblings_do_not_overlap() {
    let l = laid_out("digraph { node [shape=box]; r -> a; r -> b; r -> c; r -> d }");
    let mut xs: Vec<(f64, f64)> = ["a", "b", "c", "d"]
        .iter()
        .map(|n| {
            let node = l.nodes.iter().find(|p| p.spec.name == *n).unwrap();
            (node.center.x, node.spec.width)
        })
        .collect();
    xs.sort_by(|a, b| a.0.total_cmp(&b.0));
    for pair in xs.windows(2) {
        let gap = (pair[1].0 - pair[1].1 / 2.0) - (pair[0].0 + pair[0].1 / 2.0);
        assert!(gap >= 18.0 - 1e-9, "gap {gap}");
    }
}

#[test]
fn cycles_are_laid_out_with_every_edge_pointing_forward() {
    let l = laid_out("digraph { a -> b -> c -> a }");
    assert_eq!(l.edges.len(), 3);
    for e in &l.edges {
        let to = &l.nodes[e.spec.to];
        let tip = e.arrow.expect("directed edges have arrowheads")[0];
        let dx = (tip.x - to.center.x) / (to.spec.width / 2.0);
        let dy = (tip.y - to.center.y) / (to.spec.height / 2.0);
        assert!((dx * dx + dy * dy - 1.0).abs() < 1e-6, "tip on target ellipse");
    }
}

#[test]
fn straight_edges_have_two_points() {
    let l = laid_out("digraph { splines=line; a -> b -> c -> d; a -> d }");
    assert!(l.edges.iter().all(|e| e.points.len() == 2));
}

#[test]
fn polyline_edges_follow_their_dummy_chain() {
    let l = laid_out("digraph { splines=polyline; a -> b -> c -> d; a -> d }");
    assert_eq!(l.edges[3].points.len(), 4);
}

#[test]
fn ortho_edges_use_right_angles_in_both_orientations() {
    for dir in ["TB", "LR"] {
        let l = laid_out(&format!(
            "digraph {{ rankdir={dir}; splines=ortho; node [shape=box]; a -> b; a -> c; a -> d; b -> d; c -> a }}"
        ));
        for e in &l.edges {
            for pair in e.points.windows(2) {
                assert!(
                    pair[0].x == pair[1].x || pair[0].y == pair[1].y,
                    "{dir}: {:?}",
                    e.points
                );
            }
        }
    }
}

#[test]
fn self_loops_are_drawn_beside_the_node() {
    let l = laid_out("digraph { a -> a }");
    let a = &l.nodes[0];
    assert!(l.edges[0].points.iter().all(|p| p.x >= a.center.x));
    assert!(l.width > a.spec.width);
}

#[test]
fn dummy_node_budget_is_enforced() {
    let mut src = String::from("digraph {");
    for i in 0..2_000 {
        src.push_str(&format!(" n{i} -> n{};", i + 1));
    }
    for i in 0..60 {
        src.push_str(&format!(" n0 -> n{};", 2_000 - i));
    }
    src.push('}');
    let dot = parse(&src).unwrap();
    let err = layout(LayoutInput::from_dot(&dot, &DeterministicTextMeasurer::default())).unwrap_err();
    assert!(matches!(err, Error::Overflow { what: "dummy nodes", .. }));
}
