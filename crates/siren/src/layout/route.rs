//! Edge routing and clipping (top-to-bottom frame).

use super::LayerGraph;
use crate::model::{LayoutInput, Point, Shape, Splines};

/// Arrowhead length and half-width at `penwidth=1`, in points.
const ARROW_LEN: f64 = 10.0;
const ARROW_HALF_WIDTH: f64 = 3.5;
/// How far a self-loop reaches out of its node.
const LOOP_REACH: f64 = 18.0;
const EPS: f64 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Route {
    pub points: Vec<Point>,
    pub arrow: Option<[Point; 3]>,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    center: Point,
    width: f64,
    height: f64,
    shape: Shape,
}

impl Bounds {
    /// Where the ray from the centre towards `toward` leaves the node outline.
    fn clip(&self, toward: Point) -> Point {
        match self.shape {
            Shape::Box | Shape::Plain => intersect_rect(self, toward),
            Shape::Ellipse | Shape::Circle => intersect_ellipse(self, toward),
            Shape::Diamond => intersect_diamond(self, toward),
        }
    }

    fn top(&self) -> Point {
        Point::new(self.center.x, self.center.y - self.height / 2.0)
    }

    fn bottom(&self) -> Point {
        Point::new(self.center.x, self.center.y + self.height / 2.0)
    }
}

pub(crate) fn run(g: &LayerGraph, input: &LayoutInput) -> Vec<Route> {
    let bounds = |v: usize| Bounds {
        center: Point::new(g.nodes[v].x, g.nodes[v].y),
        width: g.nodes[v].width,
        height: g.nodes[v].height,
        shape: input
            .nodes
            .get(v)
            .map(|n| n.style.shape)
            .unwrap_or(Shape::Box),
    };

    input
        .edges
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let mut points = if spec.from == spec.to {
                self_loop(bounds(spec.from))
            } else {
                let chain = &g.chains[i];
                let centers: Vec<Point> = chain
                    .iter()
                    .map(|&v| Point::new(g.nodes[v].x, g.nodes[v].y))
                    .collect();
                let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
                    return Route::default();
                };
                let mut points = match input.graph.splines {
                    Splines::Line => straight(bounds(first), bounds(last)),
                    Splines::Polyline | Splines::Spline => {
                        polyline(bounds(first), bounds(last), &centers)
                    }
                    Splines::Ortho => ortho(bounds(first), bounds(last), &centers),
                };
                if first != spec.from {
                    points.reverse();
                }
                points
            };
            let arrow = if spec.arrowhead {
                attach_arrow(&mut points, spec.pen_width)
            } else {
                None
            };
            Route { points, arrow }
        })
        .collect()
}

fn straight(src: Bounds, tgt: Bounds) -> Vec<Point> {
    vec![src.clip(tgt.center), tgt.clip(src.center)]
}

fn polyline(src: Bounds, tgt: Bounds, centers: &[Point]) -> Vec<Point> {
    let inner = &centers[1..centers.len() - 1];
    let first_toward = inner.first().copied().unwrap_or(tgt.center);
    let last_toward = inner.last().copied().unwrap_or(src.center);
    let mut points = Vec::with_capacity(centers.len());
    points.push(src.clip(first_toward));
    points.extend_from_slice(inner);
    points.push(tgt.clip(last_toward));
    points
}

/// Right-angle route: leave the source at its bottom, jog horizontally halfway between ranks
/// whenever the dummy chain shifts, enter the target at its top.
fn ortho(src: Bounds, tgt: Bounds, centers: &[Point]) -> Vec<Point> {
    let mut points = vec![src.bottom()];
    let mut x = src.center.x;
    let mut upper_bottom = src.bottom().y;
    for (k, next) in centers.iter().enumerate().skip(1) {
        let is_target = k == centers.len() - 1;
        let lower_top = if is_target { tgt.top().y } else { next.y };
        if (next.x - x).abs() > EPS {
            let mid = (upper_bottom + lower_top) / 2.0;
            points.push(Point::new(x, mid));
            points.push(Point::new(next.x, mid));
            x = next.x;
        }
        upper_bottom = next.y;
    }
    points.push(tgt.top());
    points
}

fn self_loop(node: Bounds) -> Vec<Point> {
    let c = node.center;
    let right = c.x + node.width / 2.0 + LOOP_REACH;
    let dy = node.height / 4.0;
    let start = node.clip(Point::new(c.x + node.width, c.y - dy));
    let end = node.clip(Point::new(c.x + node.width, c.y + dy));
    vec![
        start,
        Point::new(right, start.y),
        Point::new(right, end.y),
        end,
    ]
}

/// Pulls the last point back by the arrow length and returns the arrowhead triangle.
fn attach_arrow(points: &mut [Point], pen_width: f64) -> Option<[Point; 3]> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let tip = points[n - 1];
    let prev = points[n - 2];
    let (dx, dy) = (tip.x - prev.x, tip.y - prev.y);
    let len = dx.hypot(dy);
    if len < EPS {
        return None;
    }
    let (ux, uy) = (dx / len, dy / len);
    let scale = pen_width.max(1.0).sqrt();
    let arrow_len = (ARROW_LEN * scale).min(len);
    let half = ARROW_HALF_WIDTH * scale;
    let base = Point::new(tip.x - ux * arrow_len, tip.y - uy * arrow_len);
    points[n - 1] = base;
    Some([
        tip,
        Point::new(base.x - uy * half, base.y + ux * half),
        Point::new(base.x + uy * half, base.y - ux * half),
    ])
}

fn intersect_rect(node: &Bounds, point: Point) -> Point {
    let Point { x, y } = node.center;
    let dx = point.x - x;
    let dy = point.y - y;
    let mut w = node.width / 2.0;
    let mut h = node.height / 2.0;

    if dx == 0.0 && dy == 0.0 {
        return Point::new(x + w, y);
    }

    let (sx, sy) = if dy.abs() * w > dx.abs() * h {
        if dy < 0.0 {
            h = -h;
        }
        (h * dx / dy, h)
    } else {
        if dx < 0.0 {
            w = -w;
        }
        (w, w * dy / dx)
    };
    Point::new(x + sx, y + sy)
}

fn intersect_ellipse(node: &Bounds, point: Point) -> Point {
    let Point { x, y } = node.center;
    let (a, b) = (node.width / 2.0, node.height / 2.0);
    let (dx, dy) = (point.x - x, point.y - y);
    if dx == 0.0 && dy == 0.0 {
        return Point::new(x + a, y);
    }
    let t = 1.0 / ((dx * dx) / (a * a) + (dy * dy) / (b * b)).sqrt();
    Point::new(x + dx * t, y + dy * t)
}

fn intersect_diamond(node: &Bounds, point: Point) -> Point {
    let Point { x, y } = node.center;
    let (a, b) = (node.width / 2.0, node.height / 2.0);
    let (dx, dy) = (point.x - x, point.y - y);
    if dx == 0.0 && dy == 0.0 {
        return Point::new(x + a, y);
    }
    let t = 1.0 / (dx.abs() / a + dy.abs() / b);
    Point::new(x + dx * t, y + dy * t)
}
