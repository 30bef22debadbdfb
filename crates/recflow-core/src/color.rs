//! Host record colors.
//!
//! Views color records with named swatches (`blueLight2`, `redBright`, ...). The layout engine
//! only understands literal colors, so names are resolved to hex here.

/// Fill used for records the view does not color.
pub const DEFAULT_FILL: &str = "#ffffff";
/// Outline used for every node.
pub const DEFAULT_STROKE: &str = "#333333";

const PALETTE: &[(&str, &str)] = &[
    ("blueLight2", "#cfdfff"),
    ("cyanLight2", "#d0f0fd"),
    ("tealLight2", "#c2f5e9"),
    ("greenLight2", "#d1f7c4"),
    ("yellowLight2", "#ffeab6"),
    ("orangeLight2", "#fee2d5"),
    ("redLight2", "#ffdce5"),
    ("pinkLight2", "#ffdaf6"),
    ("purpleLight2", "#ede2fe"),
    ("grayLight2", "#eeeeee"),
    ("blueLight1", "#9cc7ff"),
    ("cyanLight1", "#77d1f3"),
    ("tealLight1", "#72ddc3"),
    ("greenLight1", "#93e088"),
    ("yellowLight1", "#ffd66e"),
    ("orangeLight1", "#ffa981"),
    ("redLight1", "#ff9eb7"),
    ("pinkLight1", "#f99de2"),
    ("purpleLight1", "#cdb0ff"),
    ("grayLight1", "#cccccc"),
    ("blueBright", "#2d7ff9"),
    ("cyanBright", "#18bfff"),
    ("tealBright", "#20d9d2"),
    ("greenBright", "#20c933"),
    ("yellowBright", "#fcb400"),
    ("orangeBright", "#ff6f2c"),
    ("redBright", "#f82b60"),
    ("pinkBright", "#ff08c2"),
    ("purpleBright", "#8b46ff"),
    ("grayBright", "#666666"),
    ("blueDark1", "#2750ae"),
    ("cyanDark1", "#0b76b7"),
    ("tealDark1", "#06a09b"),
    ("greenDark1", "#338a17"),
    ("yellowDark1", "#b87503"),
    ("orangeDark1", "#d74d26"),
    ("redDark1", "#ba1e45"),
    ("pinkDark1", "#b2158b"),
    ("purpleDark1", "#6b1cb0"),
    ("grayDark1", "#444444"),
];

/// Resolves a swatch name or a literal `#rgb`/`#rrggbb` color to lowercase hex.
pub fn hex_for_color(color: &str) -> Option<String> {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        let ok = matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit());
        return ok.then(|| format!("#{}", hex.to_ascii_lowercase()));
    }
    PALETTE
        .iter()
        .find(|(name, _)| *name == color)
        .map(|(_, hex)| (*hex).to_string())
}

/// Fill color for a record: its view color when resolvable, otherwise `default_fill`.
pub fn fill_for_record(color: Option<&str>, default_fill: &str) -> String {
    color
        .and_then(hex_for_color)
        .unwrap_or_else(|| default_fill.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_swatch_names() {
        assert_eq!(hex_for_color("blueLight2").as_deref(), Some("#cfdfff"));
        assert_eq!(hex_for_color("grayDark1").as_deref(), Some("#444444"));
        assert_eq!(hex_for_color("mauve"), None);
    }

    #[test]
    fn accepts_literal_hex_and_rejects_garbage() {
        assert_eq!(hex_for_color("#ABCDEF").as_deref(), Some("#abcdef"));
        assert_eq!(hex_for_color("#fff").as_deref(), Some("#fff"));
        assert_eq!(hex_for_color("#12345"), None);
        assert_eq!(hex_for_color("#zzzzzz"), None);
    }

    #[test]
    fn falls_back_to_default_fill() {
        assert_eq!(fill_for_record(None, DEFAULT_FILL), DEFAULT_FILL);
        assert_eq!(fill_for_record(Some("nope"), DEFAULT_FILL), DEFAULT_FILL);
        assert_eq!(fill_for_record(Some("redBright"), DEFAULT_FILL), "#f82b60");
    }
}
