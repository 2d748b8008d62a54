//! Remote stylesheet aggregation
//!
//! Captures the full text of every network-delivered stylesheet response.
//! Responses resolve asynchronously and out of order, so the collection
//! order is response-completion order, not request-issuance order. The
//! aggregator also backs the settle barrier: the interception side counts
//! stylesheet requests it lets through, the response side counts bodies it
//! has recorded, and `wait_settled` blocks until the two match (bounded by a
//! grace timeout so a dropped response cannot hang the caller).

use base64::Engine as Base64Engine;
use log::warn;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Marker recorded in place of a stylesheet body that could not be decoded
pub const DECODE_FAILURE_MARKER: &str = "/* fontprobe: undecodable stylesheet body */";

/// Shared collector for network-delivered stylesheet bodies
#[derive(Default)]
pub struct StyleAggregator {
    sheets: Mutex<Vec<String>>,
    expected: AtomicUsize,
    settled: AtomicUsize,
}

impl StyleAggregator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Note a stylesheet request that was allowed to proceed. Called from
    /// the interception handler, before the response exists.
    pub fn note_request(&self) {
        self.expected.fetch_add(1, Ordering::SeqCst);
    }

    /// Record one stylesheet response body. `base64_encoded` follows the
    /// CDP `getResponseBody` flag. A body that cannot be decoded records
    /// the failure marker instead of aborting aggregation.
    pub fn record_body(&self, body: &str, base64_encoded: bool) {
        let text = if base64_encoded {
            match base64::engine::general_purpose::STANDARD
                .decode(body)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
            {
                Some(text) => text,
                None => {
                    warn!("stylesheet body could not be decoded; recording marker");
                    DECODE_FAILURE_MARKER.to_string()
                }
            }
        } else {
            body.to_string()
        };

        self.sheets.lock().unwrap().push(text);
        self.settled.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a stylesheet response whose body could not be fetched at all
    pub fn record_failure(&self) {
        warn!("stylesheet body fetch failed; recording marker");
        self.sheets.lock().unwrap().push(DECODE_FAILURE_MARKER.to_string());
        self.settled.fetch_add(1, Ordering::SeqCst);
    }

    /// Block until every stylesheet request that was let through has a
    /// recorded body, or until `grace` elapses. Returns whether the counts
    /// matched in time.
    pub fn wait_settled(&self, grace: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.settled.load(Ordering::SeqCst) >= self.expected.load(Ordering::SeqCst) {
                return true;
            }
            if start.elapsed() >= grace {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// All captured stylesheet texts, in arrival order
    pub fn remote_styles(&self) -> Vec<String> {
        self.sheets.lock().unwrap().clone()
    }
}

/// Join remote stylesheet texts (arrival order) followed by inline style
/// texts (document order) into the single CSS blob handed to the
/// `@font-face` rule parser.
pub fn combine(remote: &[String], inline: &[String]) -> String {
    remote
        .iter()
        .chain(inline.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_order_preserved() {
        let agg = StyleAggregator::new();
        agg.record_body("b { color: red }", false);
        agg.record_body("a { color: blue }", false);
        assert_eq!(
            agg.remote_styles(),
            vec!["b { color: red }".to_string(), "a { color: blue }".to_string()]
        );
    }

    #[test]
    fn test_decode_failure_records_marker() {
        let agg = StyleAggregator::new();
        agg.record_body("%%% not base64 %%%", true);
        agg.record_body("p { margin: 0 }", false);
        let styles = agg.remote_styles();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles[0], DECODE_FAILURE_MARKER);
        assert_eq!(styles[1], "p { margin: 0 }");
    }

    #[test]
    fn test_base64_body_decoded() {
        let agg = StyleAggregator::new();
        let encoded = base64::engine::general_purpose::STANDARD.encode("h1 { font-family: Foo }");
        agg.record_body(&encoded, true);
        assert_eq!(agg.remote_styles(), vec!["h1 { font-family: Foo }".to_string()]);
    }

    #[test]
    fn test_wait_settled_matches_counts() {
        let agg = StyleAggregator::new();
        agg.note_request();
        assert!(!agg.wait_settled(Duration::from_millis(30)));
        agg.record_body("x{}", false);
        assert!(agg.wait_settled(Duration::from_millis(30)));
    }

    #[test]
    fn test_combine_exact_order() {
        let remote = vec!["remote-a".to_string(), "remote-b".to_string()];
        let inline = vec!["inline-a".to_string(), "inline-b".to_string()];
        assert_eq!(combine(&remote, &inline), "remote-a\nremote-b\ninline-a\ninline-b");
    }

    #[test]
    fn test_combine_empty_sides() {
        assert_eq!(combine(&[], &[]), "");
        assert_eq!(combine(&["r".to_string()], &[]), "r");
        assert_eq!(combine(&[], &["i".to_string()]), "i");
    }
}
