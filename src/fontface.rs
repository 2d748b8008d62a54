//! External `@font-face` rule parser seam
//!
//! Rule parsing is a collaborator, not part of this crate: the session hands
//! the combined stylesheet text and page origin to a `FontFaceParser` and
//! includes whatever descriptors it returns in the result.

use serde::{Deserialize, Serialize};

/// One parsed `@font-face` rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFaceDescriptor {
    /// Declared font family name
    pub family: String,
    /// Source URLs, resolved against the page origin by the parser
    pub sources: Vec<String>,
    pub weight: Option<String>,
    pub style: Option<String>,
    pub display: Option<String>,
    pub unicode_range: Option<String>,
}

/// Collaborator interface: parse `@font-face` rules out of a CSS blob
pub trait FontFaceParser {
    fn parse_font_faces(&self, css_text: &str, origin: &str) -> Vec<FontFaceDescriptor>;
}

/// Parser that yields no descriptors; used when no rule parser is wired in
pub struct NullFontFaceParser;

impl FontFaceParser for NullFontFaceParser {
    fn parse_font_faces(&self, _css_text: &str, _origin: &str) -> Vec<FontFaceDescriptor> {
        Vec::new()
    }
}
