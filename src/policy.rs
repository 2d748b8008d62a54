//! Request disposition policy
//!
//! Every outgoing page request gets exactly one disposition before it is
//! sent; an undecided request stalls navigation, so `decide` is total over
//! all resource types. Only resources needed to reproduce layout (markup,
//! stylesheets, fonts, first-party scripts) are allowed through; images and
//! video are irrelevant to font analysis and costly to fetch.

use headless_chrome::protocol::cdp::Network::ResourceType;
use url::Url;

/// Outcome of the policy for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Let the request proceed normally
    Continue,
    /// Block the request before it is sent
    Abort,
}

/// Classify one outgoing request.
///
/// Scripts are allowed only when served from `permitted_script_origin` (the
/// first-party runtime origin); a script URL that does not parse is treated
/// as outside that origin. Everything that is not an image, video, or
/// third-party script continues.
pub fn decide(resource_type: &ResourceType, url: &str, permitted_script_origin: &Url) -> Disposition {
    match resource_type {
        ResourceType::Image | ResourceType::Media => Disposition::Abort,
        ResourceType::Script => {
            if same_origin(url, permitted_script_origin) {
                Disposition::Continue
            } else {
                Disposition::Abort
            }
        }
        _ => Disposition::Continue,
    }
}

fn same_origin(url: &str, origin: &Url) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.origin() == origin.origin(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_images_and_video_abort() {
        let o = origin();
        assert_eq!(
            decide(&ResourceType::Image, "https://example.com/a.png", &o),
            Disposition::Abort
        );
        assert_eq!(
            decide(&ResourceType::Media, "https://cdn.example.net/clip.mp4", &o),
            Disposition::Abort
        );
    }

    #[test]
    fn test_first_party_script_continues() {
        let o = origin();
        assert_eq!(
            decide(&ResourceType::Script, "https://example.com/js/app.js", &o),
            Disposition::Continue
        );
    }

    #[test]
    fn test_third_party_script_aborts() {
        let o = origin();
        assert_eq!(
            decide(&ResourceType::Script, "https://tracker.example.net/t.js", &o),
            Disposition::Abort
        );
        // Same host, different scheme is a different origin
        assert_eq!(
            decide(&ResourceType::Script, "http://example.com/js/app.js", &o),
            Disposition::Abort
        );
    }

    #[test]
    fn test_unparsable_script_url_aborts() {
        let o = origin();
        assert_eq!(
            decide(&ResourceType::Script, "not a url", &o),
            Disposition::Abort
        );
    }

    #[test]
    fn test_layout_resources_continue() {
        let o = origin();
        for rt in [
            ResourceType::Document,
            ResourceType::Stylesheet,
            ResourceType::Font,
            ResourceType::Xhr,
            ResourceType::Fetch,
            ResourceType::Other,
        ] {
            assert_eq!(
                decide(&rt, "https://cdn.example.net/res", &o),
                Disposition::Continue,
                "{:?} should continue",
                rt
            );
        }
    }
}
