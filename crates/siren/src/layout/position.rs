//! Coordinate assignment (top-to-bottom frame).
//!
//! `y`: ranks are stacked with `ranksep` between the tallest nodes of adjacent ranks.
//! `x`: ranks start packed left to right, then alternate down/up passes move every node towards
//! the mean of its neighbours in the previous rank. Each rank is placed as the closest
//! order-preserving solution to those targets (weighted isotonic regression with separation
//! offsets), so nodes never overlap and never swap.

use super::LayerGraph;

const ITERATIONS: usize = 8;
const DUMMY_WEIGHT: f64 = 2.0;
const FREE_WEIGHT: f64 = 0.25;

pub(crate) fn run(g: &mut LayerGraph, layers: &[Vec<usize>]) {
    assign_y(g, layers);
    assign_x(g, layers);
}

fn assign_y(g: &mut LayerGraph, layers: &[Vec<usize>]) {
    let mut y = 0.0;
    let mut prev_height: Option<f64> = None;
    for layer in layers {
        let height = layer
            .iter()
            .map(|&v| g.nodes[v].height)
            .fold(0.0_f64, f64::max);
        y = match prev_height {
            None => height / 2.0,
            Some(prev) => y + prev / 2.0 + g.ranksep + height / 2.0,
        };
        for &v in layer {
            g.nodes[v].y = y;
        }
        prev_height = Some(height);
    }
}

fn separation(g: &LayerGraph, a: usize, b: usize) -> f64 {
    let (na, nb) = (&g.nodes[a], &g.nodes[b]);
    let gap = match (na.dummy, nb.dummy) {
        (false, false) => g.nodesep,
        (true, true) => g.nodesep / 4.0,
        _ => g.nodesep / 2.0,
    };
    (na.width + nb.width) / 2.0 + gap
}

fn assign_x(g: &mut LayerGraph, layers: &[Vec<usize>]) {
    let mut preds = vec![Vec::new(); g.nodes.len()];
    let mut succs = vec![Vec::new(); g.nodes.len()];
    for e in &g.edges {
        succs[e.v].push(e.w);
        preds[e.w].push(e.v);
    }

    for layer in layers {
        let mut x = 0.0;
        for (i, &v) in layer.iter().enumerate() {
            x = if i == 0 {
                g.nodes[v].width / 2.0
            } else {
                x + separation(g, layer[i - 1], v)
            };
            g.nodes[v].x = x;
        }
    }

    for _ in 0..ITERATIONS {
        for layer in layers.iter().skip(1) {
            place_layer(g, layer, &preds);
        }
        for layer in layers.iter().rev().skip(1) {
            place_layer(g, layer, &succs);
        }
    }
    // A final downward pass keeps children centred under their parents.
    for layer in layers.iter().skip(1) {
        place_layer(g, layer, &preds);
    }

    let left = g
        .nodes
        .iter()
        .map(|n| n.x - n.width / 2.0)
        .fold(f64::INFINITY, f64::min);
    if left.is_finite() {
        for n in &mut g.nodes {
            n.x -= left;
        }
    }
}

fn place_layer(g: &mut LayerGraph, layer: &[usize], adj: &[Vec<usize>]) {
    if layer.is_empty() {
        return;
    }
    let mut targets = Vec::with_capacity(layer.len());
    let mut weights = Vec::with_capacity(layer.len());
    for &v in layer {
        let xs: Vec<f64> = adj[v].iter().map(|&w| g.nodes[w].x).collect();
        if xs.is_empty() {
            targets.push(g.nodes[v].x);
            weights.push(FREE_WEIGHT);
        } else {
            targets.push(xs.iter().sum::<f64>() / xs.len() as f64);
            weights.push(if g.nodes[v].dummy { DUMMY_WEIGHT } else { 1.0 });
        }
    }

    let mut offsets = Vec::with_capacity(layer.len());
    let mut offset = 0.0;
    for (i, &v) in layer.iter().enumerate() {
        if i > 0 {
            offset += separation(g, layer[i - 1], v);
        }
        offsets.push(offset);
    }

    let shifted: Vec<f64> = targets.iter().zip(&offsets).map(|(t, o)| t - o).collect();
    let fitted = isotonic(&shifted, &weights);
    for ((&v, y), o) in layer.iter().zip(fitted).zip(offsets) {
        g.nodes[v].x = y + o;
    }
}

/// Weighted least-squares non-decreasing fit (pool adjacent violators).
fn isotonic(values: &[f64], weights: &[f64]) -> Vec<f64> {
    // (weighted sum, total weight, count)
    let mut blocks: Vec<(f64, f64, usize)> = Vec::with_capacity(values.len());
    for (&v, &w) in values.iter().zip(weights) {
        blocks.push((v * w, w, 1));
        while blocks.len() >= 2 {
            let (s2, w2, c2) = blocks[blocks.len() - 1];
            let (s1, w1, c1) = blocks[blocks.len() - 2];
            if s1 / w1 <= s2 / w2 {
                break;
            }
            blocks.pop();
            let last = blocks.len() - 1;
            blocks[last] = (s1 + s2, w1 + w2, c1 + c2);
        }
    }
    blocks
        .into_iter()
        .flat_map(|(s, w, c)| std::iter::repeat_n(s / w, c))
        .collect()
}
