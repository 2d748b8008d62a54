//! Fontprobe
//!
//! Drives a headless browsing session for a single web page and extracts the
//! font-loading metadata needed to generate preload recommendations: which
//! fonts are used above the fold (critical), which are not, declared font
//! preload links, and every stylesheet active on the page.
//!
//! # Example
//!
//! ```no_run
//! use fontprobe::{AnalyzerConfig, NullFontFaceParser, Session, Viewport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AnalyzerConfig {
//!     viewport: Viewport { width: 393, height: 851 },
//!     ..Default::default()
//! };
//!
//! let session = Session::start(config)?;
//! let result = session.execute("https://example.com", &NullFontFaceParser)?;
//! println!("critical fonts: {:?}", result.critical_fonts);
//! session.shutdown()?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod analyzer;
pub mod fontface;
pub mod policy;
pub mod session;
pub mod styles;

// Async-friendly facade (worker-thread backed)
pub mod async_api;

pub use async_api::Analyzer;
pub use fontface::{FontFaceDescriptor, FontFaceParser, NullFontFaceParser};
pub use session::Session;

/// Default viewport width, a common mobile device size
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 393;
/// Default viewport height, a common mobile device size
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 851;

/// Viewport dimensions applied to the session before navigation
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

/// Configuration for an analysis session
///
/// Defaults are conservative: a mobile-sized viewport (above-the-fold
/// classification is most useful on the small end) and page console output
/// kept out of the host log unless `debug` is set.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Viewport dimensions, applied once per session before navigation
    pub viewport: Viewport,
    /// When true, page console output is routed to the host log
    pub debug: bool,
    /// Timeout for page loads in milliseconds
    pub timeout_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            debug: false,
            timeout_ms: 30000,
        }
    }
}

/// Composed output of one `execute` call
///
/// `critical_fonts` and `non_critical_fonts` are disjoint: a font used both
/// above and below the fold is reported as critical only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Origin of the analyzed page
    pub origin: String,
    /// Full text of every network-delivered stylesheet, in arrival order
    pub remote_styles: Vec<String>,
    /// Fonts used by at least one above-the-fold element
    pub critical_fonts: Vec<String>,
    /// Fonts used only below the fold
    pub non_critical_fonts: Vec<String>,
    /// Resolved font preload URLs, one slot per preload link element;
    /// `None` marks an unresolvable href
    pub font_preloads: Vec<Option<String>>,
    /// Parsed `@font-face` descriptors from the external rule parser
    pub font_faces: Vec<FontFaceDescriptor>,
}
