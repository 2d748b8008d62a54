//! Session orchestration over the Chrome DevTools Protocol
//!
//! One `Session` owns one headless Chrome process. Each `execute` call opens
//! a fresh page context, installs the request policy and stylesheet
//! aggregator before navigation begins (early requests must not bypass
//! them), navigates, waits for load completion, runs the in-page probe, and
//! composes the result. The page context is closed on every exit path.
//! Concurrent `execute` calls on one session are not supported; callers
//! serialize.

use crate::analyzer::{self, DocumentSnapshot};
use crate::fontface::FontFaceParser;
use crate::policy::{self, Disposition};
use crate::styles::{self, StyleAggregator};
use crate::{AnalysisResult, AnalyzerConfig, Error, Result, Viewport};
use headless_chrome::browser::tab::{RequestInterceptor, RequestPausedDecision, Tab};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::FailRequest;
use headless_chrome::protocol::cdp::Network::{ErrorReason, ResourceType};
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Bounded wait for in-flight stylesheet responses after load completion;
/// a response that never arrives must not hang `execute`.
const STYLE_SETTLE_GRACE: Duration = Duration::from_secs(2);

/// One rendering session: a headless Chrome process plus at most one active
/// page context at a time.
pub struct Session {
    browser: Browser,
    config: AnalyzerConfig,
}

impl Session {
    /// Launch the browser process with the configured viewport.
    pub fn start(config: AnalyzerConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .build()
            .map_err(|e| Error::Launch(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Launch(format!("Failed to launch browser: {}", e)))?;

        Ok(Self { browser, config })
    }

    /// Analyze one page. No built-in retry: a navigation failure is fatal
    /// for this call and the caller owns any retry policy.
    pub fn execute(&self, url: &str, parser: &dyn FontFaceParser) -> Result<AnalysisResult> {
        let target = Url::parse(url)
            .map_err(|e| Error::Navigation(format!("Invalid target URL '{}': {}", url, e)))?;

        let tab = self
            .browser
            .new_tab()
            .map_err(|e| Error::Cdp(format!("Failed to open page context: {}", e)))?;

        // Close the page context on every exit path, success or failure.
        let result = self.analyze(&tab, url, &target, parser);
        if let Err(e) = tab.close(true) {
            debug!("page context close failed: {}", e);
        }
        result
    }

    fn analyze(
        &self,
        tab: &Arc<Tab>,
        url: &str,
        target: &Url,
        parser: &dyn FontFaceParser,
    ) -> Result<AnalysisResult> {
        tab.set_default_timeout(Duration::from_millis(self.config.timeout_ms));

        if self.config.debug {
            install_console_bridge(tab);
        }

        let aggregator = StyleAggregator::new();

        let response_agg = aggregator.clone();
        tab.register_response_handling(
            "fontprobe-styles",
            Box::new(move |params, fetch_body| {
                if !matches!(params.Type, ResourceType::Stylesheet) {
                    return;
                }
                match fetch_body() {
                    Ok(body) => response_agg.record_body(&body.body, body.base_64_encoded),
                    Err(e) => {
                        warn!("failed to read stylesheet body: {}", e);
                        response_agg.record_failure();
                    }
                }
            }),
        )
        .map_err(|e| Error::Cdp(format!("Failed to register response handler: {}", e)))?;

        tab.enable_fetch(None, Some(false))
            .map_err(|e| Error::Cdp(format!("Failed to enable fetch domain: {}", e)))?;

        // Every paused request gets a synchronous disposition; handlers run
        // on the transport thread and must return promptly.
        let request_agg = aggregator.clone();
        let permitted_origin = target.clone();
        let interceptor: Arc<dyn RequestInterceptor + Send + Sync> = Arc::new(
            move |_transport, _session_id, event: RequestPausedEvent| {
                let params = &event.params;
                match policy::decide(&params.resource_Type, &params.request.url, &permitted_origin)
                {
                    Disposition::Continue => {
                        if matches!(params.resource_Type, ResourceType::Stylesheet) {
                            request_agg.note_request();
                        }
                        RequestPausedDecision::Continue(None)
                    }
                    Disposition::Abort => {
                        debug!(
                            "aborting {:?} request to {}",
                            params.resource_Type, params.request.url
                        );
                        RequestPausedDecision::Fail(FailRequest {
                            request_id: params.request_id.clone(),
                            error_reason: ErrorReason::BlockedByClient,
                        })
                    }
                }
            },
        );
        tab.enable_request_interception(interceptor)
            .map_err(|e| Error::Cdp(format!("Failed to enable request interception: {}", e)))?;

        tab.navigate_to(url)
            .map_err(|e| Error::Navigation(format!("Navigation to '{}' failed: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| Error::Navigation(format!("Wait for navigation failed: {}", e)))?;

        // Barrier: let in-flight stylesheet responses land before extraction.
        if !aggregator.wait_settled(STYLE_SETTLE_GRACE) {
            warn!("stylesheet responses still pending after grace period; remote styles may be incomplete");
        }

        let eval = tab
            .evaluate(analyzer::PROBE_SCRIPT, false)
            .map_err(|e| Error::Extraction(format!("Probe evaluation failed: {}", e)))?;

        let raw = eval
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Extraction("Probe returned no value".into()))?;

        let snapshot: DocumentSnapshot = serde_json::from_str(raw)
            .map_err(|e| Error::Extraction(format!("Malformed probe payload: {}", e)))?;

        Ok(compose(
            snapshot,
            aggregator.remote_styles(),
            self.config.viewport,
            parser,
        ))
    }

    /// Graceful-then-forced teardown. Closes remaining page contexts, drops
    /// the browser handle, then unconditionally kills the recorded pid.
    /// Safe to call after the session already exited; a kill of a dead
    /// process is ignored.
    pub fn shutdown(self) -> Result<()> {
        let pid = self.browser.get_process_id();

        if let Ok(tabs) = self.browser.get_tabs().lock() {
            for tab in tabs.iter() {
                let _ = tab.close(false);
            }
        }
        drop(self.browser);

        if let Some(pid) = pid {
            force_kill(pid);
        }
        Ok(())
    }
}

/// Classify fonts, resolve preloads, and hand the combined stylesheet text
/// (remote in arrival order, then inline in document order) to the rule
/// parser collaborator.
fn compose(
    snapshot: DocumentSnapshot,
    remote_styles: Vec<String>,
    viewport: Viewport,
    parser: &dyn FontFaceParser,
) -> AnalysisResult {
    let (critical_fonts, non_critical_fonts) = analyzer::classify_fonts(&snapshot.elements, viewport);
    let font_preloads = analyzer::resolve_preloads(&snapshot.origin, &snapshot.preload_hrefs);
    let combined = styles::combine(&remote_styles, &snapshot.inline_styles);
    let font_faces = parser.parse_font_faces(&combined, &snapshot.origin);

    AnalysisResult {
        origin: snapshot.origin,
        remote_styles,
        critical_fonts,
        non_critical_fonts,
        font_preloads,
        font_faces,
    }
}

/// Route page console output to the host log. Best-effort: a failure to
/// install the bridge only loses debug output.
fn install_console_bridge(tab: &Arc<Tab>) {
    let binding_name = "__fontprobe_console";

    let _ = tab
        .expose_function(
            binding_name,
            Arc::new(move |payload: serde_json::Value| {
                let msg = if payload.is_string() {
                    let s = payload.as_str().unwrap_or("");
                    match serde_json::from_str::<serde_json::Value>(s) {
                        Ok(v) => v,
                        Err(_) => serde_json::Value::String(s.to_string()),
                    }
                } else {
                    payload
                };

                let level = msg.get("level").and_then(|v| v.as_str()).unwrap_or("log");
                let text = match msg.get("args") {
                    Some(args) if args.is_array() => args
                        .as_array()
                        .unwrap()
                        .iter()
                        .map(|v| v.as_str().map(|s| s.to_string()).unwrap_or_else(|| v.to_string()))
                        .collect::<Vec<_>>()
                        .join(" "),
                    Some(args) => args.to_string(),
                    None => String::new(),
                };
                debug!("page console [{}]: {}", level, text);
            }),
        )
        .map_err(|e| warn!("Failed to expose console binding: {}", e))
        .ok();

    // Wrap console methods so the page posts messages to the binding
    let wrapper = r#"(function(){
        const bind = window.__fontprobe_console;
        if (!bind) return;
        ['log','info','warn','error'].forEach(function(k){
            const orig = console[k];
            console[k] = function(...args){
                try{ bind(JSON.stringify({ level:k, args: args.map(a=>String(a)) })); }catch(e){}
                try{ orig.apply(console, args); }catch(e){}
            };
        });
    })();"#;

    let _ = tab
        .call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: wrapper.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(|e| warn!("Failed to inject console wrapper: {}", e))
        .ok();
}

#[cfg(unix)]
fn force_kill(pid: u32) {
    let _ = std::process::Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .status();
}

#[cfg(windows)]
fn force_kill(pid: u32) {
    let _ = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .status();
}

#[cfg(not(any(unix, windows)))]
fn force_kill(_pid: u32) {}
