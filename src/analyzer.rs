//! In-page document analysis
//!
//! Extraction is split across the capability boundary: the probe script runs
//! where DOM access exists and returns one JSON-serialized record of raw
//! document state; everything that can be computed outside the page
//! (viewport classification, font-name extraction, preload resolution) runs
//! host-side so it stays unit-testable.

use crate::Viewport;
use serde::Deserialize;
use url::Url;

/// JS probe evaluated against the fully loaded document. Pure read of
/// document state, no external I/O; returns a JSON string so the value
/// crosses CDP as a plain string primitive.
pub const PROBE_SCRIPT: &str = r#"
(function() {
    var preloads = [];
    var links = document.querySelectorAll('link[rel="preload"][as="font"]');
    for (var i = 0; i < links.length; i++) {
        preloads.push(links[i].getAttribute('href') || '');
    }

    var inline = [];
    var styles = document.querySelectorAll('style');
    for (var i = 0; i < styles.length; i++) {
        inline.push(styles[i].textContent || '');
    }

    var elements = [];
    if (document.body) {
        var all = document.body.querySelectorAll('*');
        for (var i = 0; i < all.length; i++) {
            var rect = all[i].getBoundingClientRect();
            elements.push({
                family: getComputedStyle(all[i]).fontFamily || '',
                top: rect.top,
                left: rect.left
            });
        }
    }

    return JSON.stringify({
        origin: location.origin,
        preloadHrefs: preloads,
        inlineStyles: inline,
        elements: elements
    });
})()
"#;

/// One element's computed font and bounding-box top-left corner
#[derive(Debug, Clone, Deserialize)]
pub struct ElementFontRecord {
    pub family: String,
    pub top: f64,
    pub left: f64,
}

/// The single serializable record returned by the probe script
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub origin: String,
    pub preload_hrefs: Vec<String>,
    pub inline_styles: Vec<String>,
    pub elements: Vec<ElementFontRecord>,
}

/// Top-left-corner visibility heuristic: an element counts as above the
/// fold iff its bounding-box top is within the viewport height and its left
/// within the viewport width. Bottom/right edges and occlusion are not
/// checked, so overflowing or covered elements can be misclassified; this
/// is a documented limitation.
pub fn is_in_viewport(top: f64, left: f64, viewport: Viewport) -> bool {
    top <= viewport.height as f64 && left <= viewport.width as f64
}

/// First comma-separated token of a font-family declaration, with
/// surrounding quotes stripped. `None` for empty/absent input.
pub fn extract_first_font(family_value: &str) -> Option<String> {
    let first = family_value.split(',').next()?.trim();
    let name = first.trim_matches(|c| c == '"' || c == '\'').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Classify every element's first font as critical or non-critical, then
/// reconcile with a final subtraction pass: a font seen both above and
/// below the fold is reported as critical only. Insertion order is
/// preserved within each list; weight variants of one family are not
/// distinguished.
pub fn classify_fonts(elements: &[ElementFontRecord], viewport: Viewport) -> (Vec<String>, Vec<String>) {
    let mut critical: Vec<String> = Vec::new();
    let mut non_critical: Vec<String> = Vec::new();

    for element in elements {
        let Some(font) = extract_first_font(&element.family) else {
            continue;
        };
        if is_in_viewport(element.top, element.left, viewport) {
            if !critical.contains(&font) {
                critical.push(font);
            }
        } else if !non_critical.contains(&font) {
            non_critical.push(font);
        }
    }

    non_critical.retain(|font| !critical.contains(font));
    (critical, non_critical)
}

/// Resolve every preload href against the page origin. A slot is never
/// dropped: an empty or unresolvable href yields `None` at its position.
pub fn resolve_preloads(origin: &str, hrefs: &[String]) -> Vec<Option<String>> {
    let base = Url::parse(origin).ok();
    hrefs
        .iter()
        .map(|href| {
            if href.trim().is_empty() {
                return None;
            }
            base.as_ref()?.join(href).ok().map(String::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            width: 393,
            height: 851,
        }
    }

    fn record(family: &str, top: f64, left: f64) -> ElementFontRecord {
        ElementFontRecord {
            family: family.to_string(),
            top,
            left,
        }
    }

    #[test]
    fn test_extract_first_font() {
        assert_eq!(extract_first_font("Arial, sans-serif"), Some("Arial".to_string()));
        assert_eq!(
            extract_first_font("'Open Sans', sans-serif"),
            Some("Open Sans".to_string())
        );
        assert_eq!(extract_first_font("\"Noto Serif\""), Some("Noto Serif".to_string()));
        assert_eq!(extract_first_font(""), None);
        assert_eq!(extract_first_font("   "), None);
    }

    #[test]
    fn test_viewport_heuristic_edges() {
        let vp = viewport();
        assert!(is_in_viewport(0.0, 0.0, vp));
        assert!(is_in_viewport(851.0, 393.0, vp));
        assert!(!is_in_viewport(851.1, 0.0, vp));
        assert!(!is_in_viewport(0.0, 393.1, vp));
        // Negative offsets (scrolled-past or off-canvas left) still count
        assert!(is_in_viewport(-20.0, -5.0, vp));
    }

    #[test]
    fn test_critical_wins_over_non_critical() {
        // Two elements share "Bar": one above the fold, one below
        let elements = vec![record("Bar, serif", 10.0, 10.0), record("Bar, serif", 2000.0, 10.0)];
        let (critical, non_critical) = classify_fonts(&elements, viewport());
        assert_eq!(critical, vec!["Bar".to_string()]);
        assert!(non_critical.is_empty());
    }

    #[test]
    fn test_classification_disjoint_and_ordered() {
        let elements = vec![
            record("Foo", 0.0, 0.0),
            record("'Open Sans', sans-serif", 20.0, 0.0),
            record("Below", 1500.0, 0.0),
            record("Foo", 1500.0, 0.0),
            record("Below", 1600.0, 0.0),
        ];
        let (critical, non_critical) = classify_fonts(&elements, viewport());
        assert_eq!(critical, vec!["Foo".to_string(), "Open Sans".to_string()]);
        assert_eq!(non_critical, vec!["Below".to_string()]);
        for font in &non_critical {
            assert!(!critical.contains(font));
        }
    }

    #[test]
    fn test_empty_family_skipped() {
        let elements = vec![record("", 0.0, 0.0)];
        let (critical, non_critical) = classify_fonts(&elements, viewport());
        assert!(critical.is_empty());
        assert!(non_critical.is_empty());
    }

    #[test]
    fn test_resolve_preloads_keeps_slots() {
        let resolved = resolve_preloads(
            "https://example.com",
            &[
                "/fonts/a.woff2".to_string(),
                "".to_string(),
                "https://cdn.example.net/b.woff2".to_string(),
            ],
        );
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].as_deref(), Some("https://example.com/fonts/a.woff2"));
        assert_eq!(resolved[1], None);
        assert_eq!(resolved[2].as_deref(), Some("https://cdn.example.net/b.woff2"));
    }

    #[test]
    fn test_resolve_preloads_bad_origin() {
        let resolved = resolve_preloads("not an origin", &["/a.woff2".to_string()]);
        assert_eq!(resolved, vec![None]);
    }

    #[test]
    fn test_snapshot_deserializes_probe_shape() {
        let raw = r#"{
            "origin": "https://example.com",
            "preloadHrefs": ["/f.woff2", ""],
            "inlineStyles": ["@font-face{font-family:'Foo'}"],
            "elements": [{"family": "Foo", "top": 1.5, "left": 0}]
        }"#;
        let snapshot: DocumentSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.origin, "https://example.com");
        assert_eq!(snapshot.preload_hrefs.len(), 2);
        assert_eq!(snapshot.inline_styles.len(), 1);
        assert_eq!(snapshot.elements[0].family, "Foo");
    }
}
