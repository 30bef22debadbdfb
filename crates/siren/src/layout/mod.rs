//! Layered layout.
//!
//! Pipeline: acyclic -> rank -> normalize -> order -> position -> route, with the coordinate
//! system swapped around positioning for left-to-right layouts. Every pass works on the
//! index-based [`LayerGraph`] in a top-to-bottom frame.

mod acyclic;
mod coordinate_system;
mod normalize;
mod order;
mod position;
mod rank;
mod route;

use crate::model::{Layout, LayoutInput, PlacedNode, Point, RoutedEdge};
use crate::{Error, Result};

/// Inputs with more real nodes than this are rejected.
pub const MAX_NODES: usize = 10_000;
/// Inputs whose long edges would need more dummy nodes than this are rejected.
pub const MAX_DUMMY_NODES: usize = 100_000;

#[derive(Debug, Clone, Default)]
pub(crate) struct LNode {
    pub width: f64,
    pub height: f64,
    pub rank: i32,
    pub order: usize,
    pub x: f64,
    pub y: f64,
    pub dummy: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LEdge {
    pub v: usize,
    pub w: usize,
    pub minlen: i32,
    pub reversed: bool,
    /// Index of the input edge this (possibly split) edge came from.
    pub orig: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LayerGraph {
    pub nodes: Vec<LNode>,
    pub edges: Vec<LEdge>,
    /// Per input edge: the node chain from the layout source to the layout target, dummies
    /// included. Empty for self-loops.
    pub chains: Vec<Vec<usize>>,
    pub nodesep: f64,
    pub ranksep: f64,
}

impl LayerGraph {
    pub(crate) fn out_edges(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.nodes.len()];
        for (i, e) in self.edges.iter().enumerate() {
            out[e.v].push(i);
        }
        out
    }

    pub(crate) fn in_edges(&self) -> Vec<Vec<usize>> {
        let mut inn = vec![Vec::new(); self.nodes.len()];
        for (i, e) in self.edges.iter().enumerate() {
            inn[e.w].push(i);
        }
        inn
    }

    pub(crate) fn max_rank(&self) -> i32 {
        self.nodes.iter().map(|n| n.rank).max().unwrap_or(0)
    }
}

/// Lays out a styled graph. Deterministic: equal inputs give equal layouts.
pub fn layout(input: LayoutInput) -> Result<Layout> {
    if input.nodes.len() > MAX_NODES {
        return Err(Error::Overflow {
            what: "nodes",
            count: input.nodes.len(),
            limit: MAX_NODES,
        });
    }

    let rankdir = input.graph.rankdir;
    let mut g = LayerGraph {
        nodes: input
            .nodes
            .iter()
            .map(|n| LNode {
                width: n.width,
                height: n.height,
                ..LNode::default()
            })
            .collect(),
        edges: Vec::new(),
        chains: vec![Vec::new(); input.edges.len()],
        nodesep: input.graph.nodesep,
        ranksep: input.graph.ranksep,
    };
    for (i, e) in input.edges.iter().enumerate() {
        if e.from != e.to {
            g.edges.push(LEdge {
                v: e.from,
                w: e.to,
                minlen: e.minlen,
                reversed: false,
                orig: i,
            });
        }
    }

    coordinate_system::adjust(&mut g, rankdir);
    let reversed = acyclic::run(&mut g);
    rank::run(&mut g);
    let dummies = normalize::run(&mut g)?;
    let layers = order::run(&mut g);
    position::run(&mut g, &layers);
    let mut routes = route::run(&g, &input);
    coordinate_system::undo(&mut g, &mut routes, rankdir);

    tracing::debug!(
        nodes = input.nodes.len(),
        edges = input.edges.len(),
        reversed,
        dummies,
        ranks = g.max_rank() + 1,
        "layout complete"
    );

    Ok(finish(input, &g, routes))
}

/// Translates everything into the positive quadrant, leaving `pad` on every side.
fn finish(input: LayoutInput, g: &LayerGraph, routes: Vec<route::Route>) -> Layout {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    let mut grow = |p: Point| {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    };
    for (spec, n) in input.nodes.iter().zip(&g.nodes) {
        grow(Point::new(n.x - spec.width / 2.0, n.y - spec.height / 2.0));
        grow(Point::new(n.x + spec.width / 2.0, n.y + spec.height / 2.0));
    }
    for r in &routes {
        r.points.iter().copied().for_each(&mut grow);
        if let Some(arrow) = r.arrow {
            arrow.into_iter().for_each(&mut grow);
        }
    }
    if !min.x.is_finite() {
        min = Point::default();
        max = Point::default();
    }

    let pad = input.graph.pad;
    let width = (max.x - min.x + 2.0 * pad).ceil();
    let height = (max.y - min.y + 2.0 * pad).ceil();
    let shift = |p: Point| Point::new(p.x - min.x + pad, p.y - min.y + pad);

    let nodes = input
        .nodes
        .into_iter()
        .zip(&g.nodes)
        .map(|(spec, n)| PlacedNode {
            spec,
            center: shift(Point::new(n.x, n.y)),
        })
        .collect();
    let edges = input
        .edges
        .into_iter()
        .zip(routes)
        .map(|(spec, r)| RoutedEdge {
            spec,
            points: r.points.into_iter().map(shift).collect(),
            arrow: r.arrow.map(|a| a.map(shift)),
        })
        .collect();

    Layout {
        graph: input.graph,
        nodes,
        edges,
        width,
        height,
    }
}
