//! Export of the displayed drawing as a standalone file.

use crate::normalize::{Drawing, edit_root, root_has_attr};
use base64::Engine as _;
use std::path::{Path, PathBuf};

/// Raster exports are drawn at this multiple of the intrinsic size.
pub const RASTER_SCALE: f32 = 2.0;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Svg,
    #[cfg(feature = "raster")]
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            #[cfg(feature = "raster")]
            Self::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            #[cfg(feature = "raster")]
            Self::Png => "image/png",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            #[cfg(feature = "raster")]
            "png" => Ok(Self::Png),
            other => Err(format!("unsupported export format `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Writes the file into `dir` under its export name and returns the full path.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(sanitize_file_name(&self.file_name));
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// View names are free text; keep them readable but never let them leave the target directory.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "flowchart".to_string()
    } else {
        trimmed.to_string()
    }
}

/// The displayed drawing as a standalone SVG document at its natural size.
pub fn standalone_svg(drawing: &Drawing) -> String {
    let width = fmt_len(drawing.width);
    let height = fmt_len(drawing.height);
    let mut set: Vec<(&str, &str)> = Vec::new();
    if !root_has_attr(&drawing.markup, "xmlns") {
        set.push(("xmlns", SVG_NS));
    }
    if !root_has_attr(&drawing.markup, "xmlns:xlink") {
        set.push(("xmlns:xlink", XLINK_NS));
    }
    set.push(("width", width.as_str()));
    set.push(("height", height.as_str()));

    let body = edit_root(&drawing.markup, &[], &set).unwrap_or_else(|| drawing.markup.clone());
    let body = body.trim_start();
    if body.starts_with("<?xml") {
        body.to_string()
    } else {
        format!("{XML_DECLARATION}\n{body}")
    }
}

fn fmt_len(v: f64) -> String {
    let s = format!("{v:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Serializes the displayed drawing as `<view name>.<ext>`. Never re-runs layout.
pub fn export(drawing: &Drawing, view_name: &str, format: ExportFormat) -> Result<ExportFile> {
    let svg = standalone_svg(drawing);
    let bytes = match format {
        ExportFormat::Svg => svg.into_bytes(),
        #[cfg(feature = "raster")]
        ExportFormat::Png => raster::svg_to_png(&svg, RASTER_SCALE)?,
    };
    tracing::debug!(
        format = format.extension(),
        bytes = bytes.len(),
        view = view_name,
        "exported drawing"
    );
    Ok(ExportFile {
        file_name: format!("{view_name}.{}", format.extension()),
        mime_type: format.mime_type(),
        bytes,
    })
}

#[cfg(feature = "raster")]
mod raster {
    use super::{ExportError, Result};

    pub(super) fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>> {
        let pixmap = svg_to_pixmap(svg, scale)?;
        pixmap.encode_png().map_err(|_| ExportError::PngEncode)
    }

    fn svg_to_pixmap(svg: &str, scale: f32) -> Result<tiny_skia::Pixmap> {
        let mut opt = usvg::Options::default();
        opt.fontdb_mut().load_system_fonts();
        // Drawings ask for Helvetica; fall back to a common sans face when it is missing.
        opt.font_family = "Arial".to_string();

        let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| ExportError::SvgParse)?;
        let size = tree.size();
        let width_px = (size.width() * scale).ceil().max(1.0) as u32;
        let height_px = (size.height() * scale).ceil().max(1.0) as u32;

        let mut pixmap =
            tiny_skia::Pixmap::new(width_px, height_px).ok_or(ExportError::PixmapAlloc)?;
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );
        Ok(pixmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RawDrawing;
    use crate::normalize::{ContainerBox, normalize};

    fn drawing() -> Drawing {
        let raw = RawDrawing {
            markup: r##"<svg xmlns="http://www.w3.org/2000/svg" width="30" height="20" viewBox="0 0 30 20"><g id="recA" class="node"><rect width="30" height="20" fill="#cfdfff"/></g></svg>"##.to_string(),
            width: 30.0,
            height: 20.0,
        };
        normalize(&raw, ContainerBox::default()).unwrap()
    }

    #[test]
    fn svg_export_restores_natural_size() {
        let d = drawing();
        assert!(d.markup.contains(r#"width="100%""#));
        let file = export(&d, "Release chain", ExportFormat::Svg).unwrap();
        assert_eq!(file.file_name, "Release chain.svg");
        assert_eq!(file.mime_type, "image/svg+xml");
        let text = String::from_utf8(file.bytes).unwrap();
        assert!(text.starts_with("<?xml"));
        let doc = roxmltree::Document::parse(&text).unwrap();
        let root = doc.root_element();
        assert_eq!(root.attribute("width"), Some("30"));
        assert_eq!(root.attribute("height"), Some("20"));
        assert!(text.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#));
        assert!(text.contains(r#"id="recA""#));
    }

    #[test]
    fn missing_namespace_is_added() {
        let mut d = drawing();
        d.markup = d.markup.replace(r#" xmlns="http://www.w3.org/2000/svg""#, "");
        let svg = standalone_svg(&d);
        assert!(svg.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
    }

    #[test]
    fn nested_namespaces_do_not_count_for_the_root() {
        let mut d = drawing();
        d.markup = d
            .markup
            .replace(r#" xmlns="http://www.w3.org/2000/svg""#, "")
            .replace(
                "</svg>",
                r#"<foreignObject><div xmlns="http://www.w3.org/1999/xhtml" xmlns:xlink="urn:x">x</div></foreignObject></svg>"#,
            );
        let svg = standalone_svg(&d);
        let doc = roxmltree::Document::parse(&svg).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().namespace(), Some(SVG_NS));
        assert_eq!(root.lookup_namespace_uri(Some("xlink")), Some(XLINK_NS));
    }

    #[test]
    fn data_uri_is_base64() {
        let file = ExportFile {
            file_name: "v.svg".to_string(),
            mime_type: "image/svg+xml",
            bytes: b"<svg/>".to_vec(),
        };
        assert_eq!(file.data_uri(), "data:image/svg+xml;base64,PHN2Zy8+");
    }

    #[test]
    fn file_names_stay_inside_the_target_dir() {
        assert_eq!(sanitize_file_name("Q3/Q4 plan.svg"), "Q3_Q4 plan.svg");
        assert_eq!(sanitize_file_name("../x.png"), "_x.png");
        assert_eq!(sanitize_file_name(".."), "flowchart");
    }

    #[test]
    fn write_to_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = export(&drawing(), "All tasks", ExportFormat::Svg).unwrap();
        let path = file.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("All tasks.svg"));
        assert_eq!(std::fs::read(path).unwrap(), file.bytes);
    }

    #[test]
    fn parses_formats() {
        assert_eq!("SVG".parse::<ExportFormat>(), Ok(ExportFormat::Svg));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[cfg(feature = "raster")]
    #[test]
    fn png_export_is_twice_the_natural_size() {
        let file = export(&drawing(), "All tasks", ExportFormat::Png).unwrap();
        assert_eq!(file.file_name, "All tasks.png");
        assert!(file.bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
        // IHDR: width and height are the first two big-endian u32s after the chunk header.
        let w = u32::from_be_bytes([file.bytes[16], file.bytes[17], file.bytes[18], file.bytes[19]]);
        let h = u32::from_be_bytes([file.bytes[20], file.bytes[21], file.bytes[22], file.bytes[23]]);
        assert_eq!((w, h), (60, 40));
    }
}
