//! Flowchart graph -> DOT source for the layout engine.

use recflow_core::{ChartOrientation, Graph, LinkStyle, Node, RecordShape};
use std::fmt::Write as _;

/// Engine tuning emitted as graph attributes. Lengths are in inches, as in DOT.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutStyle {
    pub nodesep: f64,
    pub ranksep: f64,
    pub pad: f64,
    pub font_name: String,
    pub font_size: f64,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            nodesep: 0.5,
            ranksep: 0.6,
            pad: 0.25,
            font_name: "Helvetica".to_string(),
            font_size: 14.0,
        }
    }
}

pub fn rankdir(orientation: ChartOrientation) -> &'static str {
    match orientation {
        ChartOrientation::Vertical => "TB",
        ChartOrientation::Horizontal => "LR",
    }
}

pub fn splines(link_style: LinkStyle) -> &'static str {
    match link_style {
        LinkStyle::RightAngles => "ortho",
        LinkStyle::StraightLines => "line",
    }
}

/// `(shape, style)` attribute values for a record shape.
fn shape_attrs(shape: RecordShape) -> (&'static str, &'static str) {
    match shape {
        RecordShape::Rounded => ("box", "rounded,filled"),
        RecordShape::Rectangle => ("box", "filled"),
        RecordShape::Ellipse => ("ellipse", "filled"),
        RecordShape::Circle => ("circle", "filled"),
        RecordShape::Diamond => ("diamond", "filled"),
    }
}

/// Quotes a DOT id. Record names are free text, so every id is quoted.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn num(v: f64) -> String {
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Serializes a flowchart graph. Element ids are the record ids, so the drawn node groups can be
/// mapped back to records.
pub fn to_dot(graph: &Graph, name: &str, style: &LayoutStyle) -> String {
    let mut out = String::new();
    let font = quote(&style.font_name);
    let font_size = num(style.font_size);

    let _ = writeln!(&mut out, "digraph {} {{", quote(name));
    let _ = writeln!(
        &mut out,
        "  graph [rankdir={}, splines={}, nodesep={}, ranksep={}, pad={}, fontname={font}, fontsize={font_size}];",
        rankdir(graph.orientation),
        splines(graph.link_style),
        num(style.nodesep),
        num(style.ranksep),
        num(style.pad),
    );
    let _ = writeln!(&mut out, "  node [fontname={font}, fontsize={font_size}];");
    if let Some(stroke) = graph.nodes.first().map(|n| n.stroke_color.as_str()) {
        let _ = writeln!(&mut out, "  edge [color={}];", quote(stroke));
    }

    for node in &graph.nodes {
        write_node(&mut out, node);
    }
    for edge in &graph.edges {
        let _ = writeln!(
            &mut out,
            "  {} -> {};",
            quote(&edge.from_id),
            quote(&edge.to_id)
        );
    }
    out.push_str("}\n");
    out
}

fn write_node(out: &mut String, node: &Node) {
    let (shape, style) = shape_attrs(node.shape);
    let _ = writeln!(
        out,
        "  {id} [id={id}, label={}, shape={shape}, style={}, fillcolor={}, color={}];",
        quote(&node.label),
        quote(style),
        quote(&node.fill_color),
        quote(&node.stroke_color),
        id = quote(&node.id),
    );
}
