//! SVG writer.
//!
//! Output follows the familiar Graphviz document shape: a `graph0` group holding one
//! `class="node"` group per node and one `class="edge"` group per edge, each with a `<title>`.
//! Element ids come from the DOT `id` attributes so callers can map clicks back to their data.

use crate::model::{Layout, PlacedNode, Point, RoutedEdge, Shape};
use std::fmt::Write as _;

const ROUNDED_RADIUS: f64 = 6.0;

pub(crate) fn fmt_num(v: f64) -> String {
    let mut out = String::new();
    let rounded = (v * 100.0).round() / 100.0;
    let _ = write!(&mut out, "{rounded:.2}");
    if out.contains('.') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    if out == "-0" {
        out = "0".to_string();
    }
    out
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(p.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stroke_width_attr(pen_width: f64) -> String {
    if (pen_width - 1.0).abs() < f64::EPSILON {
        String::new()
    } else {
        format!(r#" stroke-width="{}""#, fmt_num(pen_width))
    }
}

pub fn write_svg(layout: &Layout) -> String {
    let (w, h) = (fmt_num(layout.width), fmt_num(layout.height));
    let mut out = String::new();
    let _ = writeln!(
        &mut out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    out.push_str("<g id=\"graph0\" class=\"graph\">\n");
    let _ = writeln!(&mut out, "<title>{}</title>", escape_xml(&layout.graph.name));
    let bg = layout.graph.bgcolor.as_deref().unwrap_or("white");
    let _ = writeln!(
        &mut out,
        r#"<polygon fill="{}" stroke="none" points="0,0 0,{h} {w},{h} {w},0 0,0"/>"#,
        escape_xml(bg)
    );

    for node in &layout.nodes {
        write_node(&mut out, node);
    }
    for edge in &layout.edges {
        write_edge(&mut out, layout, edge);
    }

    out.push_str("</g>\n</svg>\n");
    out
}

fn write_node(out: &mut String, node: &PlacedNode) {
    let spec = &node.spec;
    let style = &spec.style;
    let Point { x: cx, y: cy } = node.center;
    let (hw, hh) = (spec.width / 2.0, spec.height / 2.0);

    let _ = writeln!(
        out,
        r#"<g id="{}" class="node">"#,
        escape_xml(&spec.element_id)
    );
    let _ = writeln!(out, "<title>{}</title>", escape_xml(&spec.name));

    let paint = format!(
        r#"fill="{}" stroke="{}"{}"#,
        escape_xml(style.fill.as_deref().unwrap_or("none")),
        escape_xml(&style.stroke),
        stroke_width_attr(style.pen_width)
    );
    match style.shape {
        Shape::Plain => {}
        Shape::Ellipse | Shape::Circle => {
            let _ = writeln!(
                out,
                r#"<ellipse {paint} cx="{}" cy="{}" rx="{}" ry="{}"/>"#,
                fmt_num(cx),
                fmt_num(cy),
                fmt_num(hw),
                fmt_num(hh)
            );
        }
        Shape::Diamond => {
            let pts = [
                Point::new(cx, cy - hh),
                Point::new(cx + hw, cy),
                Point::new(cx, cy + hh),
                Point::new(cx - hw, cy),
                Point::new(cx, cy - hh),
            ];
            let _ = writeln!(out, r#"<polygon {paint} points="{}"/>"#, points_attr(&pts));
        }
        Shape::Box if style.rounded => {
            let r = ROUNDED_RADIUS.min(hw).min(hh);
            let (l, t, rt, b) = (cx - hw, cy - hh, cx + hw, cy + hh);
            let n = fmt_num;
            let _ = writeln!(
                out,
                r#"<path {paint} d="M{},{} L{},{} Q{},{} {},{} L{},{} Q{},{} {},{} L{},{} Q{},{} {},{} L{},{} Q{},{} {},{} Z"/>"#,
                n(l + r), n(t),
                n(rt - r), n(t),
                n(rt), n(t), n(rt), n(t + r),
                n(rt), n(b - r),
                n(rt), n(b), n(rt - r), n(b),
                n(l + r), n(b),
                n(l), n(b), n(l), n(b - r),
                n(l), n(t + r),
                n(l), n(t), n(l + r), n(t),
            );
        }
        Shape::Box => {
            let pts = [
                Point::new(cx + hw, cy - hh),
                Point::new(cx - hw, cy - hh),
                Point::new(cx - hw, cy + hh),
                Point::new(cx + hw, cy + hh),
                Point::new(cx + hw, cy - hh),
            ];
            let _ = writeln!(out, r#"<polygon {paint} points="{}"/>"#, points_attr(&pts));
        }
    }

    let font_size = style.font.font_size;
    let line_height = font_size * 1.2;
    let first = cy - (spec.lines.len().saturating_sub(1) as f64) * line_height / 2.0;
    for (i, line) in spec.lines.iter().enumerate() {
        let baseline = first + i as f64 * line_height + font_size * 0.3;
        let _ = writeln!(
            out,
            r#"<text text-anchor="middle" x="{}" y="{}" font-family="{}" font-size="{}" fill="{}">{}</text>"#,
            fmt_num(cx),
            fmt_num(baseline),
            escape_xml(&style.font.font_family),
            fmt_num(font_size),
            escape_xml(&style.font_color),
            escape_xml(line)
        );
    }
    out.push_str("</g>\n");
}

fn write_edge(out: &mut String, layout: &Layout, edge: &RoutedEdge) {
    let spec = &edge.spec;
    let name = |i: usize| {
        layout
            .nodes
            .get(i)
            .map(|n| n.spec.name.as_str())
            .unwrap_or("")
    };
    let _ = writeln!(
        out,
        r#"<g id="{}" class="edge">"#,
        escape_xml(&spec.element_id)
    );
    let _ = writeln!(
        out,
        "<title>{}</title>",
        escape_xml(&format!("{}->{}", name(spec.from), name(spec.to)))
    );
    let color = escape_xml(&spec.color);
    let stroke_width = stroke_width_attr(spec.pen_width);
    if let Some((first, rest)) = edge.points.split_first() {
        let mut d = format!("M{},{}", fmt_num(first.x), fmt_num(first.y));
        for p in rest {
            let _ = write!(&mut d, " L{},{}", fmt_num(p.x), fmt_num(p.y));
        }
        let _ = writeln!(
            out,
            r#"<path fill="none" stroke="{color}"{stroke_width} d="{d}"/>"#
        );
    }
    if let Some(arrow) = &edge.arrow {
        let mut pts = arrow.to_vec();
        pts.push(arrow[0]);
        let _ = writeln!(
            out,
            r#"<polygon fill="{color}" stroke="{color}"{stroke_width} points="{}"/>"#,
            points_attr(&pts)
        );
    }
    out.push_str("</g>\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(fmt_num(12.0), "12");
        assert_eq!(fmt_num(12.5), "12.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.33");
        assert_eq!(fmt_num(-0.001), "0");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml(r#"a<b & "c">'"#), "a&lt;b &amp; &quot;c&quot;&gt;&#39;");
    }
}
