//! Rank assignment.
//!
//! Longest-path ranking from the sources, followed by a tightening pass that pulls each source
//! down next to its nearest successor so short side branches do not stretch edges. Ranks are
//! normalized to start at 0.

use super::LayerGraph;

/// Topological order over the (acyclic) layer graph; ties resolve by node index.
pub(crate) fn topo_order(g: &LayerGraph) -> Vec<usize> {
    let out = g.out_edges();
    let mut indeg = vec![0usize; g.nodes.len()];
    for e in &g.edges {
        indeg[e.w] += 1;
    }
    let mut ready: std::collections::BTreeSet<usize> =
        (0..g.nodes.len()).filter(|&v| indeg[v] == 0).collect();
    let mut order = Vec::with_capacity(g.nodes.len());
    while let Some(v) = ready.pop_first() {
        order.push(v);
        for &e in &out[v] {
            let w = g.edges[e].w;
            indeg[w] -= 1;
            if indeg[w] == 0 {
                ready.insert(w);
            }
        }
    }
    order
}

pub(crate) fn run(g: &mut LayerGraph) {
    let order = topo_order(g);
    let inn = g.in_edges();
    let out = g.out_edges();

    for &v in &order {
        let rank = inn[v]
            .iter()
            .map(|&e| g.nodes[g.edges[e].v].rank + g.edges[e].minlen)
            .max()
            .unwrap_or(0);
        g.nodes[v].rank = rank;
    }

    for &v in order.iter().rev() {
        if !inn[v].is_empty() || out[v].is_empty() {
            continue;
        }
        let tight = out[v]
            .iter()
            .map(|&e| g.nodes[g.edges[e].w].rank - g.edges[e].minlen)
            .min();
        if let Some(tight) = tight {
            g.nodes[v].rank = tight;
        }
    }

    let min = g.nodes.iter().map(|n| n.rank).min().unwrap_or(0);
    for n in &mut g.nodes {
        n.rank -= min;
    }
}
