//! Node ordering within ranks: DFS initial order, then barycenter sweeps that keep the layering
//! with the fewest crossings.

use super::LayerGraph;

/// Sweeps stop after this many consecutive sweeps without improvement.
const PATIENCE: usize = 4;
const MAX_SWEEPS: usize = 24;

pub(crate) fn run(g: &mut LayerGraph) -> Vec<Vec<usize>> {
    let mut layers = init_order(g);
    let preds = neighbours(g, true);
    let succs = neighbours(g, false);

    let mut best = layers.clone();
    let mut best_cc = cross_count(g, &layers, &succs);
    let mut since_best = 0;
    let mut sweep = 0;
    while best_cc > 0 && since_best < PATIENCE && sweep < MAX_SWEEPS {
        if sweep % 2 == 0 {
            for r in 1..layers.len() {
                let (fixed, free) = layers.split_at_mut(r);
                reorder(&mut free[0], &fixed[r - 1], &preds);
            }
        } else {
            for r in (0..layers.len().saturating_sub(1)).rev() {
                let (free, fixed) = layers.split_at_mut(r + 1);
                reorder(&mut free[r], &fixed[0], &succs);
            }
        }
        let cc = cross_count(g, &layers, &succs);
        if cc < best_cc {
            best = layers.clone();
            best_cc = cc;
            since_best = 0;
        } else {
            since_best += 1;
        }
        sweep += 1;
    }

    for layer in &best {
        for (i, &v) in layer.iter().enumerate() {
            g.nodes[v].order = i;
        }
    }
    tracing::trace!(crossings = best_cc, sweeps = sweep, "ordering done");
    best
}

fn neighbours(g: &LayerGraph, incoming: bool) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); g.nodes.len()];
    for e in &g.edges {
        if incoming {
            adj[e.w].push(e.v);
        } else {
            adj[e.v].push(e.w);
        }
    }
    adj
}

/// Depth-first placement: visiting nodes by (rank, index) and following successors keeps
/// connected nodes next to each other in the first layering.
pub(crate) fn init_order(g: &LayerGraph) -> Vec<Vec<usize>> {
    let rank_count = g.max_rank().max(0) as usize + 1;
    let mut layers = vec![Vec::new(); if g.nodes.is_empty() { 0 } else { rank_count }];
    let succs = neighbours(g, false);
    let mut visited = vec![false; g.nodes.len()];

    let mut roots: Vec<usize> = (0..g.nodes.len()).collect();
    roots.sort_by_key(|&v| (g.nodes[v].rank, v));

    let mut stack = Vec::new();
    for root in roots {
        stack.push(root);
        while let Some(v) = stack.pop() {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            layers[g.nodes[v].rank.max(0) as usize].push(v);
            // Reverse so the first successor is visited first.
            stack.extend(succs[v].iter().rev().copied().filter(|&w| !visited[w]));
        }
    }
    layers
}

/// Sorts `free` by the mean position of each node's neighbours in `fixed`. Nodes without
/// neighbours there keep their slot.
fn reorder(free: &mut Vec<usize>, fixed: &[usize], adj: &[Vec<usize>]) {
    let mut pos = rustc_hash::FxHashMap::default();
    for (i, &v) in fixed.iter().enumerate() {
        pos.insert(v, i as f64);
    }

    let mut sortable: Vec<(f64, usize, usize)> = Vec::new();
    let mut pinned: Vec<(usize, usize)> = Vec::new();
    for (i, &v) in free.iter().enumerate() {
        let ps: Vec<f64> = adj[v].iter().filter_map(|w| pos.get(w).copied()).collect();
        if ps.is_empty() {
            pinned.push((i, v));
        } else {
            sortable.push((ps.iter().sum::<f64>() / ps.len() as f64, i, v));
        }
    }
    sortable.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut out = Vec::with_capacity(free.len());
    let mut sortable = sortable.into_iter().map(|(_, _, v)| v);
    let mut pinned = pinned.into_iter().peekable();
    while out.len() < free.len() {
        let slot = out.len();
        let take_pinned = match pinned.peek() {
            Some(&(i, _)) => i <= slot,
            None => false,
        };
        let next = if take_pinned {
            pinned.next().map(|(_, v)| v)
        } else {
            sortable.next().or_else(|| pinned.next().map(|(_, v)| v))
        };
        match next {
            Some(v) => out.push(v),
            None => break,
        }
    }
    *free = out;
}

/// Total crossings between every pair of adjacent ranks.
pub(crate) fn cross_count(g: &LayerGraph, layers: &[Vec<usize>], succs: &[Vec<usize>]) -> usize {
    let mut south_pos = vec![0usize; g.nodes.len()];
    let mut cc = 0;
    for pair in layers.windows(2) {
        let (north, south) = (&pair[0], &pair[1]);
        for (i, &v) in south.iter().enumerate() {
            south_pos[v] = i;
        }
        cc += bilayer_cross_count(north, south.len(), succs, &south_pos);
    }
    cc
}

/// Accumulator-tree count of crossings between two ranks.
fn bilayer_cross_count(
    north: &[usize],
    south_len: usize,
    succs: &[Vec<usize>],
    south_pos: &[usize],
) -> usize {
    if south_len == 0 {
        return 0;
    }
    let mut entries = Vec::new();
    for &v in north {
        let mut ps: Vec<usize> = succs[v].iter().map(|&w| south_pos[w]).collect();
        ps.sort_unstable();
        entries.extend(ps);
    }

    let mut first_index = 1;
    while first_index < south_len {
        first_index <<= 1;
    }
    let tree_size = 2 * first_index - 1;
    first_index -= 1;
    let mut tree = vec![0usize; tree_size];

    let mut cc = 0;
    for pos in entries {
        let mut index = pos + first_index;
        tree[index] += 1;
        let mut weight_sum = 0;
        while index > 0 {
            if index % 2 == 1 {
                weight_sum += tree[index + 1];
            }
            index = (index - 1) >> 1;
            tree[index] += 1;
        }
        cc += weight_sum;
    }
    cc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LEdge, LNode};

    fn graph(ranks: &[i32], edges: &[(usize, usize)]) -> LayerGraph {
        LayerGraph {
            nodes: ranks
                .iter()
                .map(|&rank| LNode {
                    rank,
                    ..LNode::default()
                })
                .collect(),
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

    #[test]
    fn counts_crossings_between_two_ranks() {
        let g = graph(&[0, 0, 1, 1], &[(0, 3), (1, 2)]);
        let succs = neighbours(&g, false);
        assert_eq!(cross_count(&g, &[vec![0, 1], vec![2, 3]], &succs), 1);
        assert_eq!(cross_count(&g, &[vec![0, 1], vec![3, 2]], &succs), 0);
    }

    #[test]
    fn init_order_groups_by_rank() {
        let g = graph(&[0, 1, 0, 1], &[(0, 3), (2, 1)]);
        let layers = init_order(&g);
        assert_eq!(layers, [vec![0, 2], vec![3, 1]]);
    }

    #[test]
    fn sweeps_remove_avoidable_crossings() {
        // Two parallel pairs drawn crossed by construction order.
        let mut g = graph(&[0, 0, 1, 1, 2, 2], &[(0, 3), (1, 2), (3, 4), (2, 5)]);
        let layers = run(&mut g);
        let succs = neighbours(&g, false);
        assert_eq!(cross_count(&g, &layers, &succs), 0);
        for layer in &layers {
            for (i, &v) in layer.iter().enumerate() {
                assert_eq!(g.nodes[v].order, i);
            }
        }
    }

    #[test]
    fn unconnected_nodes_keep_their_slot() {
        let mut free = vec![10, 11, 12];
        let mut adj = vec![Vec::new(); 13];
        adj[10] = vec![1];
        adj[12] = vec![0];
        reorder(&mut free, &[0, 1], &adj);
        assert_eq!(free, [12, 11, 10]);
    }
}
