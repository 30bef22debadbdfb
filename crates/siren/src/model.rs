//! Styled layout input and positioned layout output.

use crate::dot::{Attrs, DotGraph};
use crate::text::{TextMeasurer, TextStyle, label_lines};

pub const POINTS_PER_INCH: f64 = 72.0;

const DEFAULT_NODESEP_IN: f64 = 0.25;
const DEFAULT_RANKSEP_IN: f64 = 0.5;
const DEFAULT_PAD_IN: f64 = 0.0555;
const DEFAULT_WIDTH_IN: f64 = 0.75;
const DEFAULT_HEIGHT_IN: f64 = 0.5;
const LABEL_MARGIN_X: f64 = 0.11 * POINTS_PER_INCH;
const LABEL_MARGIN_Y: f64 = 0.055 * POINTS_PER_INCH;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankDir {
    #[default]
    TB,
    BT,
    LR,
    RL,
}

impl RankDir {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "LR" => Self::LR,
            "RL" => Self::RL,
            "BT" => Self::BT,
            _ => Self::TB,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LR | Self::RL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Splines {
    /// Rendered as a polyline through the dummy chain.
    #[default]
    Spline,
    Polyline,
    Line,
    Ortho,
}

impl Splines {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "ortho" => Self::Ortho,
            "line" | "false" | "none" | "" => Self::Line,
            "polyline" => Self::Polyline,
            _ => Self::Spline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Ellipse,
    Box,
    Circle,
    Diamond,
    Plain,
}

impl Shape {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" | "rect" | "rectangle" | "square" => Self::Box,
            "circle" => Self::Circle,
            "diamond" => Self::Diamond,
            "plaintext" | "plain" | "none" => Self::Plain,
            _ => Self::Ellipse,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphStyle {
    pub name: String,
    pub rankdir: RankDir,
    pub splines: Splines,
    /// Minimum space between adjacent nodes of one rank, in points.
    pub nodesep: f64,
    /// Minimum space between ranks, in points.
    pub ranksep: f64,
    pub pad: f64,
    pub bgcolor: Option<String>,
    pub font: TextStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStyle {
    pub shape: Shape,
    pub rounded: bool,
    pub fill: Option<String>,
    pub stroke: String,
    pub pen_width: f64,
    pub font: TextStyle,
    pub font_color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    /// The DOT node name.
    pub name: String,
    /// The SVG element id (`id` attribute, or a generated `nodeN`).
    pub element_id: String,
    pub lines: Vec<String>,
    pub style: NodeStyle,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub from: usize,
    pub to: usize,
    pub element_id: String,
    pub color: String,
    pub pen_width: f64,
    pub minlen: i32,
    pub arrowhead: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutInput {
    pub graph: GraphStyle,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    pub spec: NodeSpec,
    pub center: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub spec: EdgeSpec,
    pub points: Vec<Point>,
    /// Arrowhead triangle: tip, then the two base corners.
    pub arrow: Option<[Point; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub graph: GraphStyle,
    pub nodes: Vec<PlacedNode>,
    pub edges: Vec<RoutedEdge>,
    pub width: f64,
    pub height: f64,
}

fn number(attrs: &Attrs, key: &str) -> Option<f64> {
    attrs
        .get(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn inches(attrs: &Attrs, key: &str, default: f64, min: f64) -> f64 {
    number(attrs, key).unwrap_or(default).max(min) * POINTS_PER_INCH
}

fn style_flags(attrs: &Attrs) -> (bool, bool) {
    let style = attrs.get("style").map(String::as_str).unwrap_or("");
    let mut rounded = false;
    let mut filled = false;
    for part in style.split(',') {
        match part.trim() {
            "rounded" => rounded = true,
            "filled" => filled = true,
            _ => {}
        }
    }
    (rounded, filled)
}

impl LayoutInput {
    /// Resolves DOT attributes into concrete styles and node sizes.
    pub fn from_dot(dot: &DotGraph, measurer: &dyn TextMeasurer) -> Self {
        let attrs = &dot.attrs;
        let graph_font = TextStyle {
            font_family: attrs
                .get("fontname")
                .cloned()
                .unwrap_or_else(|| TextStyle::default().font_family),
            font_size: number(attrs, "fontsize").unwrap_or(14.0).max(1.0),
        };
        let graph = GraphStyle {
            name: dot.id.clone().unwrap_or_else(|| "%0".to_string()),
            rankdir: attrs.get("rankdir").map(|s| RankDir::parse(s)).unwrap_or_default(),
            splines: attrs.get("splines").map(|s| Splines::parse(s)).unwrap_or_default(),
            nodesep: inches(attrs, "nodesep", DEFAULT_NODESEP_IN, 0.02),
            ranksep: inches(attrs, "ranksep", DEFAULT_RANKSEP_IN, 0.02),
            pad: inches(attrs, "pad", DEFAULT_PAD_IN, 0.0),
            bgcolor: attrs.get("bgcolor").cloned(),
            font: graph_font.clone(),
        };

        let nodes = dot
            .nodes
            .iter()
            .enumerate()
            .map(|(i, (name, attrs))| node_spec(i, name, attrs, &graph_font, measurer))
            .collect();

        let edges = dot
            .edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                let from = dot.nodes.get_index_of(&e.from)?;
                let to = dot.nodes.get_index_of(&e.to)?;
                let attrs = &e.attrs;
                Some(EdgeSpec {
                    from,
                    to,
                    element_id: attrs
                        .get("id")
                        .cloned()
                        .unwrap_or_else(|| format!("edge{}", i + 1)),
                    color: attrs.get("color").cloned().unwrap_or_else(|| "black".to_string()),
                    pen_width: number(attrs, "penwidth").unwrap_or(1.0).max(0.0),
                    minlen: number(attrs, "minlen").map_or(1, |v| v.round().max(1.0) as i32),
                    arrowhead: dot.directed
                        && attrs.get("arrowhead").map(String::as_str) != Some("none"),
                })
            })
            .collect();

        Self {
            graph,
            nodes,
            edges,
        }
    }
}

fn node_spec(
    index: usize,
    name: &str,
    attrs: &Attrs,
    graph_font: &TextStyle,
    measurer: &dyn TextMeasurer,
) -> NodeSpec {
    let shape = attrs.get("shape").map(|s| Shape::parse(s)).unwrap_or_default();
    let (rounded, filled) = style_flags(attrs);
    let stroke = attrs.get("color").cloned().unwrap_or_else(|| "black".to_string());
    let fill = filled.then(|| {
        attrs
            .get("fillcolor")
            .or_else(|| attrs.get("color"))
            .cloned()
            .unwrap_or_else(|| "lightgrey".to_string())
    });
    let font = TextStyle {
        font_family: attrs
            .get("fontname")
            .cloned()
            .unwrap_or_else(|| graph_font.font_family.clone()),
        font_size: number(attrs, "fontsize")
            .unwrap_or(graph_font.font_size)
            .max(1.0),
    };
    let label = attrs.get("label").map(String::as_str).unwrap_or("\\N");
    let lines = label_lines(label, name);
    let metrics = measurer.measure(&lines, &font);

    let min_width = inches(attrs, "width", DEFAULT_WIDTH_IN, 0.01);
    let min_height = inches(attrs, "height", DEFAULT_HEIGHT_IN, 0.01);
    let (width, height) = if attrs.get("fixedsize").map(String::as_str) == Some("true") {
        (min_width, min_height)
    } else {
        let w = metrics.width + 2.0 * LABEL_MARGIN_X;
        let h = metrics.height + 2.0 * LABEL_MARGIN_Y;
        let (w, h) = match shape {
            Shape::Box | Shape::Plain => (w, h),
            Shape::Ellipse => (w * std::f64::consts::SQRT_2, h * std::f64::consts::SQRT_2),
            Shape::Diamond => (w * 2.0, h * 2.0),
            Shape::Circle => {
                let d = w.hypot(h);
                (d, d)
            }
        };
        (w.max(min_width), h.max(min_height))
    };
    let (width, height) = if shape == Shape::Circle {
        let d = width.max(height);
        (d, d)
    } else {
        (width, height)
    };

    NodeSpec {
        name: name.to_string(),
        element_id: attrs
            .get("id")
            .cloned()
            .unwrap_or_else(|| format!("node{}", index + 1)),
        lines,
        style: NodeStyle {
            shape,
            rounded,
            fill,
            stroke,
            pen_width: number(attrs, "penwidth").unwrap_or(1.0).max(0.0),
            font,
            font_color: attrs
                .get("fontcolor")
                .cloned()
                .unwrap_or_else(|| "black".to_string()),
        },
        width,
        height,
    }
}
