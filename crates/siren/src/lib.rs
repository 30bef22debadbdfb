#![forbid(unsafe_code)]

//! Layered graph layout for a subset of DOT, rendered to SVG.
//!
//! ```
//! let drawing = siren::render("digraph { a -> b -> c }").unwrap();
//! assert!(drawing.svg.contains(r#"class="node""#));
//! assert!(drawing.height > drawing.width);
//! ```
//!
//! The engine is a pure function of its input text: the same DOT source always produces the same
//! markup, independent of installed fonts.

pub mod dot;
pub mod error;
pub mod layout;
pub mod model;
pub mod svg;
pub mod text;

pub use dot::{DotEdge, DotGraph, parse};
pub use error::{Error, Result};
pub use layout::{MAX_DUMMY_NODES, MAX_NODES, layout};
pub use model::{Layout, LayoutInput, Point, RankDir, Shape, Splines};
pub use svg::write_svg;
pub use text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SVG markup plus its intrinsic size in points.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub svg: String,
    pub width: f64,
    pub height: f64,
}

pub fn render(source: &str) -> Result<Rendered> {
    render_with(source, &DeterministicTextMeasurer::default())
}

pub fn render_with(source: &str, measurer: &dyn TextMeasurer) -> Result<Rendered> {
    let dot = parse(source)?;
    let layout = layout(LayoutInput::from_dot(&dot, measurer))?;
    Ok(Rendered {
        svg: write_svg(&layout),
        width: layout.width,
        height: layout.height,
    })
}
