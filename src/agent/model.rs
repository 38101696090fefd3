//! Filter model: the collaborator that learns from filter requests and feedback.
//!
//! The router forwards [`FilterRequest`]s and [`FeedbackSignal`]s here without
//! waiting for an answer. The rebroadcaster asks [`ModelHandle::matches`]
//! whether a status fits any active filter.
//!
//! Matching is a plain predicate, not a ranking: a status matches a filter
//! when its author is one of the example authors and its text mentions one of
//! the topics (an empty set on either side matches anything). Statuses that
//! received negative feedback never match. The model remembers the most
//! recent [`DEFAULT_CAPACITY`] negatively labelled ids.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::handle::await_reply;
use super::recent::{DEFAULT_CAPACITY, RecentSet};
use crate::error::RouterError;
use crate::messages::{FeedbackSignal, FilterRequest, MessageId, Polarity, UserStatus};

/// Messages understood by the model.
#[derive(Debug)]
pub enum ModelMessage {
    Filter(FilterRequest),
    Feedback(FeedbackSignal),
    Matches {
        status: UserStatus,
        respond_to: oneshot::Sender<bool>,
    },
}

/// Handle for sending to the model.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    tx: mpsc::UnboundedSender<ModelMessage>,
    request_timeout: Duration,
}

impl ModelHandle {
    pub fn channel(request_timeout: Duration) -> (Self, mpsc::UnboundedReceiver<ModelMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, request_timeout }, rx)
    }

    fn send(&self, message: ModelMessage) -> Result<(), RouterError> {
        self.tx
            .send(message)
            .map_err(|_| RouterError::MailboxClosed { component: "model" })
    }

    pub fn filter(&self, request: FilterRequest) -> Result<(), RouterError> {
        self.send(ModelMessage::Filter(request))
    }

    pub fn feedback(&self, signal: FeedbackSignal) -> Result<(), RouterError> {
        self.send(ModelMessage::Feedback(signal))
    }

    /// Ask whether `status` fits an active filter, bounded by the request timeout.
    pub async fn matches(&self, status: UserStatus) -> Result<bool, RouterError> {
        let (respond_to, rx) = oneshot::channel();
        self.send(ModelMessage::Matches { status, respond_to })?;
        await_reply(rx, "model query", "model", self.request_timeout).await
    }
}

/// Whether `status` satisfies `filter`.
pub fn filter_matches(filter: &FilterRequest, status: &UserStatus) -> bool {
    let author_ok = filter.from.is_empty()
        || filter
            .from
            .iter()
            .any(|a| a.trim_start_matches('@').eq_ignore_ascii_case(&status.author));

    let text = status.text.to_lowercase();
    let topic_ok =
        filter.about.is_empty() || filter.about.iter().any(|t| text.contains(&t.to_lowercase()));

    author_ok && topic_ok
}

/// The in-memory filter model actor.
pub struct FilterModel {
    inbox: mpsc::UnboundedReceiver<ModelMessage>,
    /// Latest filter per requester.
    filters: HashMap<String, FilterRequest>,
    /// Statuses that received negative feedback.
    negative: RecentSet<MessageId>,
}

impl FilterModel {
    pub fn new(inbox: mpsc::UnboundedReceiver<ModelMessage>) -> Self {
        Self {
            inbox,
            filters: HashMap::new(),
            negative: RecentSet::new(DEFAULT_CAPACITY),
        }
    }

    /// Remember at most `limit` negatively labelled ids.
    pub fn with_feedback_memory(mut self, limit: usize) -> Self {
        self.negative = RecentSet::new(limit);
        self
    }

    pub async fn run(mut self) {
        tracing::debug!("Filter model started");
        while let Some(message) = self.inbox.recv().await {
            self.handle(message);
        }
        tracing::debug!(
            filters = self.filters.len(),
            negative = self.negative.len(),
            "Filter model stopped"
        );
    }

    fn handle(&mut self, message: ModelMessage) {
        match message {
            ModelMessage::Filter(request) => {
                tracing::info!(by = %request.by, about = ?request.about, "Filter registered");
                self.filters.insert(request.by.clone(), request);
            }
            ModelMessage::Feedback(signal) => {
                tracing::info!(target_id = %signal.target, label = %signal.label, "Feedback recorded");
                match signal.label {
                    Polarity::Negative => {
                        self.negative.insert(signal.target);
                    }
                }
            }
            ModelMessage::Matches { status, respond_to } => {
                let _ = respond_to.send(self.matches(&status));
            }
        }
    }

    fn matches(&self, status: &UserStatus) -> bool {
        if self.negative.contains(&status.id) {
            return false;
        }
        self.filters.values().any(|f| filter_matches(f, status))
    }
}
