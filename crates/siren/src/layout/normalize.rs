//! Split long edges into chains of rank-adjacent edges through dummy nodes.

use super::{LEdge, LNode, LayerGraph, MAX_DUMMY_NODES};
use crate::{Error, Result};

/// Returns the number of dummy nodes inserted.
pub(crate) fn run(g: &mut LayerGraph) -> Result<usize> {
    let needed: usize = g
        .edges
        .iter()
        .map(|e| (g.nodes[e.w].rank - g.nodes[e.v].rank - 1).max(0) as usize)
        .sum();
    if needed > MAX_DUMMY_NODES {
        return Err(Error::Overflow {
            what: "dummy nodes",
            count: needed,
            limit: MAX_DUMMY_NODES,
        });
    }

    let edges = std::mem::take(&mut g.edges);
    for edge in edges {
        let v_rank = g.nodes[edge.v].rank;
        let w_rank = g.nodes[edge.w].rank;
        let mut chain = vec![edge.v];
        let mut prev = edge.v;
        for rank in v_rank + 1..w_rank {
            let dummy = g.nodes.len();
            g.nodes.push(LNode {
                rank,
                dummy: true,
                ..LNode::default()
            });
            g.edges.push(LEdge {
                v: prev,
                w: dummy,
                minlen: 1,
                ..edge
            });
            chain.push(dummy);
            prev = dummy;
        }
        g.edges.push(LEdge {
            v: prev,
            minlen: 1,
            ..edge
        });
        chain.push(edge.w);
        g.chains[edge.orig] = chain;
    }
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::*;

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
            chains: vec![Vec::new(); edges.len()],
            ..LayerGraph::default()
        }
    }

    #[test]
    fn short_edges_are_kept() {
        let mut g = graph(&[0, 1], &[(0, 1)]);
        assert_eq!(run(&mut g).unwrap(), 0);
        assert_eq!(g.edges.len(), 1);
        assert_eq!(g.chains[0], [0, 1]);
    }

    #[test]
    fn long_edges_get_one_dummy_per_skipped_rank() {
        let mut g = graph(&[0, 3], &[(0, 1)]);
        assert_eq!(run(&mut g).unwrap(), 2);
        assert_eq!(g.nodes.len(), 4);
        assert_eq!(g.chains[0], [0, 2, 3, 1]);
        assert_eq!(
            g.nodes[2..].iter().map(|n| (n.rank, n.dummy)).collect::<Vec<_>>(),
            [(1, true), (2, true)]
        );
        for e in &g.edges {
            assert_eq!(g.nodes[e.w].rank - g.nodes[e.v].rank, 1);
            assert_eq!(e.orig, 0);
        }
    }

    #[test]
    fn too_many_dummies_overflow() {
        let mut g = graph(&[0, (MAX_DUMMY_NODES + 2) as i32], &[(0, 1)]);
        assert!(matches!(
            run(&mut g),
            Err(Error::Overflow {
                what: "dummy nodes",
                ..
            })
        ));
    }
}
