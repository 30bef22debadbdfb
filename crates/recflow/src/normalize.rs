//! Drawing normalization: fit the engine's SVG to the viewport and index its nodes.

use crate::layout::{LayoutError, RawDrawing, Result};
use indexmap::IndexMap;

/// The area the drawing is displayed in, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerBox {
    pub width: f64,
    pub height: f64,
}

impl Default for ContainerBox {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
        }
    }
}

impl std::str::FromStr for ContainerBox {
    type Err = String;

    /// Parses `<width>x<height>`, e.g. `1280x720`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected <width>x<height>, got `{s}`"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| format!("invalid container size `{s}`"))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

/// A drawing ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    /// Markup with the root sized to fill the container along its dominant axis.
    pub markup: String,
    /// Markup exactly as the engine produced it.
    pub intrinsic_markup: String,
    pub width: f64,
    pub height: f64,
    /// Container length / intrinsic length along the dominant axis.
    pub scale: f64,
    /// Node element id -> record id, in document order.
    pub node_id_index: IndexMap<String, String>,
}

impl Drawing {
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    pub fn record_id_for_element(&self, element_id: &str) -> Option<&str> {
        self.node_id_index.get(element_id).map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.node_id_index.len()
    }
}

/// Parses an SVG length in user units. Percentages and other units are not sizes.
fn parse_length(value: &str) -> Option<f64> {
    let v = value.trim();
    let v = v
        .strip_suffix("pt")
        .or_else(|| v.strip_suffix("px"))
        .unwrap_or(v);
    v.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
}

fn parse_view_box(value: &str) -> Option<(f64, f64)> {
    let mut it = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok());
    let (_min_x, _min_y) = (it.next()??, it.next()??);
    let (w, h) = (it.next()??, it.next()??);
    (w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0).then_some((w, h))
}

fn has_class(node: roxmltree::Node<'_, '_>, class: &str) -> bool {
    node.attribute("class")
        .is_some_and(|c| c.split_whitespace().any(|token| token == class))
}

/// Intrinsic size of an SVG document's root: `width`/`height` attributes, else the `viewBox`.
pub(crate) fn intrinsic_size(root: roxmltree::Node<'_, '_>) -> Option<(f64, f64)> {
    let w = root.attribute("width").and_then(parse_length);
    let h = root.attribute("height").and_then(parse_length);
    let vb = root.attribute("viewBox").and_then(parse_view_box);
    match (w, h, vb) {
        (Some(w), Some(h), _) => Some((w, h)),
        (w, h, Some((vw, vh))) => Some((w.unwrap_or(vw), h.unwrap_or(vh))),
        _ => None,
    }
}

pub fn normalize(raw: &RawDrawing, container: ContainerBox) -> Result<Drawing> {
    let doc = roxmltree::Document::parse(&raw.markup)?;
    let root = doc.root_element();
    let (width, height) = intrinsic_size(root)
        .or_else(|| (raw.width > 0.0 && raw.height > 0.0).then_some((raw.width, raw.height)))
        .ok_or(LayoutError::MissingSize)?;

    let mut node_id_index = IndexMap::new();
    for node in root.descendants().filter(|n| n.is_element()) {
        if !has_class(node, "node") {
            continue;
        }
        if let Some(id) = node.attribute("id") {
            node_id_index.insert(id.to_string(), id.to_string());
        }
    }

    let (fill, drop, scale) = if width > height {
        ("width", "height", container.width / width)
    } else {
        ("height", "width", container.height / height)
    };
    let markup = edit_root(&raw.markup, &[drop], &[(fill, "100%")])
        .ok_or(LayoutError::MissingSize)?;
    tracing::trace!(width, height, scale, nodes = node_id_index.len(), "normalized drawing");

    Ok(Drawing {
        markup,
        intrinsic_markup: raw.markup.clone(),
        width,
        height,
        scale: if scale.is_finite() { scale } else { 1.0 },
        node_id_index,
    })
}

struct RootTag<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    /// `(name, quote, raw value)`
    attrs: Vec<(&'a str, char, &'a str)>,
    self_closing: bool,
}

/// Locates the root element's start tag, skipping the prolog.
fn root_tag(markup: &str) -> Option<RootTag<'_>> {
    let mut pos = 0;
    let start = loop {
        let lt = pos + markup[pos..].find('<')?;
        let rest = &markup[lt..];
        if rest.starts_with("<?") {
            pos = lt + rest.find("?>")? + 2;
        } else if rest.starts_with("<!--") {
            pos = lt + rest.find("-->")? + 3;
        } else if rest.starts_with("<!") {
            pos = lt + rest.find('>')? + 1;
        } else {
            break lt;
        }
    };

    let bytes = markup.as_bytes();
    let mut i = start + 1;
    let name_start = i;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/'
    {
        i += 1;
    }
    let name = &markup[name_start..i];
    if name.is_empty() {
        return None;
    }

    let mut attrs = Vec::new();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => {
                return Some(RootTag {
                    start,
                    end: i + 1,
                    name,
                    attrs,
                    self_closing: false,
                });
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some(RootTag {
                    start,
                    end: i + 2,
                    name,
                    attrs,
                    self_closing: true,
                });
            }
            _ => {}
        }
        let attr_start = i;
        while i < bytes.len() && bytes[i] != b'=' && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let attr_name = &markup[attr_start..i];
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') || attr_name.is_empty() {
            return None;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let quote = *bytes.get(i)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = i + 1;
        let value_end = value_start + markup[value_start..].find(quote as char)?;
        attrs.push((attr_name, quote as char, &markup[value_start..value_end]));
        i = value_end + 1;
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Rewrites the root start tag: drops `remove`, replaces or appends `set`. Everything else in the
/// document is kept byte for byte. `None` when the markup has no well-formed root tag.
/// Whether the root element's start tag carries the attribute `name`.
pub(crate) fn root_has_attr(markup: &str, name: &str) -> bool {
    root_tag(markup).is_some_and(|tag| tag.attrs.iter().any(|(n, _, _)| *n == name))
}

pub(crate) fn edit_root(markup: &str, remove: &[&str], set: &[(&str, &str)]) -> Option<String> {
    let tag = root_tag(markup)?;
    let mut out = String::with_capacity(markup.len() + 32);
    out.push_str(&markup[..tag.start]);
    out.push('<');
    out.push_str(tag.name);

    let mut written: Vec<&str> = Vec::new();
    for (name, quote, value) in &tag.attrs {
        if remove.contains(name) {
            continue;
        }
        match set.iter().find(|(k, _)| k == name) {
            Some((k, v)) => {
                out.push_str(&format!(r#" {k}="{}""#, escape_attr(v)));
                written.push(*k);
            }
            None => out.push_str(&format!(" {name}={quote}{value}{quote}")),
        }
    }
    for (k, v) in set {
        if !written.contains(k) {
            out.push_str(&format!(r#" {k}="{}""#, escape_attr(v)));
        }
    }
    out.push_str(if tag.self_closing { "/>" } else { ">" });
    out.push_str(&markup[tag.end..]);
    Some(out)
}
