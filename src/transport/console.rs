//! Line-delimited JSON transport.
//!
//! Input carries one [`UserStatus`] object per line. Output receives one line
//! per side effect:
//!
//! ```text
//! {"post":{"text":"@alice Working on scala.","in_reply_to":7}}
//! {"rebroadcast":12}
//! ```
//!
//! Every delivered status is remembered in a bounded history so `search` has
//! something to look through. The input can be consumed once: after
//! `stop_stream` (or end of input) the stream cannot be restarted.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, RwLock};

use super::{Poster, StatusStream, StreamTransport};
use crate::config::DEFAULT_SEARCH_HISTORY;
use crate::error::TransportError;
use crate::messages::{MessageId, OutboundUpdate, UserStatus};

type BoxedInput = Box<dyn AsyncBufRead + Send + Unpin>;
type BoxedOutput = Box<dyn AsyncWrite + Send + Unpin>;

/// Transport over an async reader (statuses in) and writer (effects out).
pub struct ConsoleTransport {
    input: Mutex<Option<BoxedInput>>,
    output: Mutex<BoxedOutput>,
    history: Arc<RwLock<VecDeque<UserStatus>>>,
    history_limit: usize,
    stopped: Arc<AtomicBool>,
}

impl ConsoleTransport {
    /// Create a transport reading statuses from `input` and writing effects to `output`.
    pub fn new<R, W>(input: R, output: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            input: Mutex::new(Some(Box::new(BufReader::new(input)))),
            output: Mutex::new(Box::new(output)),
            history: Arc::new(RwLock::new(VecDeque::new())),
            history_limit: DEFAULT_SEARCH_HISTORY,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Transport bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Set how many delivered statuses are kept for search.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Number of statuses currently held for search.
    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }

    async fn write_line(&self, value: &serde_json::Value) -> Result<(), TransportError> {
        let mut line = serde_json::to_string(value)?;
        line.push('\n');

        let mut output = self.output.lock().await;
        output.write_all(line.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }
}

/// Parse one input line. Blank lines are skipped silently, malformed ones with a warning.
fn parse_status_line(line: &str) -> Option<UserStatus> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<UserStatus>(line) {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping unrecognized stream line");
            None
        }
    }
}

/// Decode one raw input line. Lines that are not UTF-8 are skipped with a warning.
fn decode_status_line(raw: &[u8]) -> Option<UserStatus> {
    match std::str::from_utf8(raw) {
        Ok(line) => parse_status_line(line),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping stream line that is not UTF-8");
            None
        }
    }
}

/// Whether `status` satisfies every term of a search query.
///
/// `from:<name>` terms match the author exactly (ignoring case); other terms
/// match as case-insensitive substrings of the text or author.
fn matches_query(status: &UserStatus, terms: &[String]) -> bool {
    let text = status.text.to_lowercase();
    let author = status.author.to_lowercase();
    terms.iter().all(|term| match term.strip_prefix("from:") {
        Some(name) => author == name.trim_start_matches('@'),
        None => text.contains(term.as_str()) || author.contains(term.as_str()),
    })
}

#[async_trait]
impl StreamTransport for ConsoleTransport {
    async fn start_user_stream(&self, identity: &str) -> Result<StatusStream, TransportError> {
        let reader = self
            .input
            .lock()
            .await
            .take()
            .ok_or_else(|| TransportError::StreamUnavailable {
                reason: "console input already consumed".to_string(),
            })?;

        tracing::info!(identity, "Console user stream opened");
        self.stopped.store(false, Ordering::SeqCst);

        let history = Arc::clone(&self.history);
        let stopped = Arc::clone(&self.stopped);
        let limit = self.history_limit;

        let stream = futures::stream::unfold((reader, Vec::new()), move |(mut reader, mut buf)| {
            let history = Arc::clone(&history);
            let stopped = Arc::clone(&stopped);
            async move {
                loop {
                    if stopped.load(Ordering::SeqCst) {
                        return None;
                    }
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf).await {
                        Ok(0) => {
                            tracing::info!("Console input closed");
                            return None;
                        }
                        Ok(_) => {
                            let Some(status) = decode_status_line(&buf) else {
                                continue;
                            };
                            let mut history = history.write().await;
                            if history.len() >= limit {
                                history.pop_front();
                            }
                            history.push_back(status.clone());
                            drop(history);
                            return Some((status, (reader, buf)));
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Console input failed");
                            return None;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn stop_stream(&self) -> Result<(), TransportError> {
        self.stopped.store(true, Ordering::SeqCst);
        tracing::info!("Console user stream stopped");
        Ok(())
    }
}

#[async_trait]
impl Poster for ConsoleTransport {
    async fn post(&self, update: &OutboundUpdate) -> Result<(), TransportError> {
        self.write_line(&serde_json::json!({ "post": update }))
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })
    }

    async fn rebroadcast(&self, id: MessageId) -> Result<(), TransportError> {
        self.write_line(&serde_json::json!({ "rebroadcast": id }))
            .await
            .map_err(|e| TransportError::RebroadcastFailed {
                id: id.0,
                reason: e.to_string(),
            })
    }

    async fn search(&self, query: &str) -> Result<Vec<UserStatus>, TransportError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let history = self.history.read().await;
        Ok(history
            .iter()
            .filter(|status| matches_query(status, &terms))
            .cloned()
            .collect())
    }
}
