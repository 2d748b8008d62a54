//! Async-friendly facade over the synchronous session
//!
//! A dedicated worker thread owns the `Session` and executes commands sent
//! from async tasks, so callers get an async interface without requiring
//! the session to be `Send` across threads. Commands are processed one at a
//! time, which also serializes `execute` calls as the session requires.

use crate::fontface::FontFaceParser;
use crate::session::Session;
use crate::{AnalysisResult, AnalyzerConfig, Error, Result};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Execute(String, oneshot::Sender<Result<AnalysisResult>>),
    Shutdown(oneshot::Sender<Result<()>>),
}

/// Handle to a worker-thread-backed analysis session
#[derive(Clone)]
pub struct Analyzer {
    cmd_tx: Sender<Command>,
}

impl Analyzer {
    /// Start a session on a background worker thread. The parser collaborator
    /// is owned by the worker and applied to every `execute` call.
    pub async fn new(
        config: Option<AnalyzerConfig>,
        parser: Arc<dyn FontFaceParser + Send + Sync>,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            let session = match Session::start(config) {
                Ok(s) => s,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(()));

            // Held in an Option so shutdown can consume the session by value
            let mut session = Some(session);
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Execute(url, resp) => {
                        let res = match session.as_ref() {
                            Some(s) => s.execute(&url, parser.as_ref()),
                            None => Err(Error::Other("Session already shut down".into())),
                        };
                        let _ = resp.send(res);
                    }
                    Command::Shutdown(resp) => {
                        let res = match session.take() {
                            Some(s) => s.shutdown(),
                            None => Ok(()),
                        };
                        let _ = resp.send(res);
                        break;
                    }
                }
            }
        });

        let init_res = init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Analyze one page
    pub async fn execute(&self, url: &str) -> Result<AnalysisResult> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Execute(url.to_string(), tx));
        rx.await
            .map_err(|e| Error::Other(format!("Execute canceled: {}", e)))?
    }

    /// Shut down the worker and the browser process
    pub async fn shutdown(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Shutdown(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Shutdown canceled: {}", e)))?
    }
}
