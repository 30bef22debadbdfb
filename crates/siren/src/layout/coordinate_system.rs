//! The layout passes assume top-to-bottom. Left-to-right layouts swap axes around them and
//! bottom-to-top layouts mirror the rank axis afterwards.

use super::LayerGraph;
use super::route::Route;
use crate::model::{Point, RankDir};

pub(crate) fn adjust(g: &mut LayerGraph, rankdir: RankDir) {
    if rankdir.is_horizontal() {
        swap_width_height(g);
    }
}

pub(crate) fn undo(g: &mut LayerGraph, routes: &mut [Route], rankdir: RankDir) {
    if matches!(rankdir, RankDir::BT | RankDir::RL) {
        transform(g, routes, |p| Point::new(p.x, -p.y));
    }
    if rankdir.is_horizontal() {
        transform(g, routes, |p| Point::new(p.y, p.x));
        swap_width_height(g);
    }
}

fn swap_width_height(g: &mut LayerGraph) {
    for n in &mut g.nodes {
        (n.width, n.height) = (n.height, n.width);
    }
}

fn transform(g: &mut LayerGraph, routes: &mut [Route], f: impl Fn(Point) -> Point) {
    for n in &mut g.nodes {
        let p = f(Point::new(n.x, n.y));
        (n.x, n.y) = (p.x, p.y);
    }
    for r in routes {
        for p in &mut r.points {
            *p = f(*p);
        }
        if let Some(arrow) = r.arrow.as_mut() {
            for p in arrow {
                *p = f(*p);
            }
        }
    }
}
