//! Break cycles by reversing a DFS feedback arc set.

use super::LayerGraph;

/// Reverses every edge that closes a cycle in a depth-first walk over the nodes in input order.
/// Returns the number of reversed edges.
pub(crate) fn run(g: &mut LayerGraph) -> usize {
    let fas = dfs_fas(g);
    for &e in &fas {
        let edge = &mut g.edges[e];
        std::mem::swap(&mut edge.v, &mut edge.w);
        edge.reversed = true;
    }
    fas.len()
}

fn dfs_fas(g: &LayerGraph) -> Vec<usize> {
    let out = g.out_edges();
    let mut visited = vec![false; g.nodes.len()];
    let mut on_stack = vec![false; g.nodes.len()];
    let mut fas = Vec::new();

    // Explicit stack of (node, next out-edge position) so long chains cannot overflow.
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for root in 0..g.nodes.len() {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        on_stack[root] = true;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let (v, next) = *top;
            let Some(&e) = out[v].get(next) else {
                on_stack[v] = false;
                stack.pop();
                continue;
            };
            top.1 += 1;
            let w = g.edges[e].w;
            if on_stack[w] {
                fas.push(e);
            } else if !visited[w] {
                visited[w] = true;
                on_stack[w] = true;
                stack.push((w, 0));
            }
        }
    }
    fas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LEdge, LNode};

    fn graph(n: usize, edges: &[(usize, usize)]) -> LayerGraph {
        LayerGraph {
            nodes: vec![LNode::default(); n],
            edges: edges
                .iter()
                .enumerate()
                .map(|(i, &(v, w))| LEdge {
                    v,
                    w,
                    minlen: 1,
                    reversed: false,
                    orig: i,
                })
                .collect(),
            ..LayerGraph::default()
        }
    }

    fn is_acyclic(g: &LayerGraph) -> bool {
        // Kahn's algorithm consumes every node iff there is no cycle.
        let mut indeg = vec![0usize; g.nodes.len()];
        for e in &g.edges {
            indeg[e.w] += 1;
        }
        let mut ready: Vec<usize> = (0..g.nodes.len()).filter(|&v| indeg[v] == 0).collect();
        let out = g.out_edges();
        let mut seen = 0;
        while let Some(v) = ready.pop() {
            seen += 1;
            for &e in &out[v] {
                let w = g.edges[e].w;
                indeg[w] -= 1;
                if indeg[w] == 0 {
                    ready.push(w);
                }
            }
        }
        seen == g.nodes.len()
    }

    #[test]
    fn leaves_dags_untouched() {
        let mut g = graph(3, &[(0, 1), (1, 2), (0, 2)]);
        assert_eq!(run(&mut g), 0);
        assert!(g.edges.iter().all(|e| !e.reversed));
    }

    #[test]
    fn reverses_the_back_edge_of_a_cycle() {
        let mut g = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(run(&mut g), 1);
        assert!(g.edges[2].reversed);
        assert_eq!((g.edges[2].v, g.edges[2].w), (0, 2));
        assert!(is_acyclic(&g));
    }

    #[test]
    fn breaks_every_cycle_in_a_tangle() {
        let mut g = graph(
            5,
            &[(0, 1), (1, 0), (1, 2), (2, 3), (3, 1), (3, 4), (4, 2), (4, 0)],
        );
        run(&mut g);
        assert!(is_acyclic(&g));
    }

    #[test]
    fn handles_long_chains_without_recursion() {
        let n = 50_000;
        let edges: Vec<_> = (0..n - 1).map(|i| (i, i + 1)).chain([(n - 1, 0)]).collect();
        let mut g = graph(n, &edges);
        assert_eq!(run(&mut g), 1);
    }
}
