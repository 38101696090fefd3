//! Rebroadcaster: decides which unaddressed statuses the bot republishes.
//!
//! It receives every status the router does not route to the reply handler.
//! Until a model is registered it rebroadcasts nothing; afterwards it asks
//! the model about each status and requests a rebroadcast for matches.
//! Only the most recent [`DEFAULT_CAPACITY`] requested ids are remembered for
//! duplicate suppression.

use tokio::sync::mpsc;

use super::handle::{RouterHandle, RouterMessage};
use super::model::ModelHandle;
use super::recent::{DEFAULT_CAPACITY, RecentSet};
use crate::error::RouterError;
use crate::messages::{MessageId, RebroadcastRequest, UserStatus};

#[derive(Debug)]
pub enum RebroadcastMessage {
    /// Use this model for all later decisions.
    RegisterModel(ModelHandle),
    /// A status not addressed to the bot.
    Status(UserStatus),
}

/// Handle for sending to the rebroadcaster.
#[derive(Debug, Clone)]
pub struct RebroadcastHandle {
    tx: mpsc::UnboundedSender<RebroadcastMessage>,
}

impl RebroadcastHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RebroadcastMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, message: RebroadcastMessage) -> Result<(), RouterError> {
        self.tx.send(message).map_err(|_| RouterError::MailboxClosed {
            component: "rebroadcaster",
        })
    }

    pub fn register_model(&self, model: ModelHandle) -> Result<(), RouterError> {
        self.send(RebroadcastMessage::RegisterModel(model))
    }

    pub fn status(&self, status: UserStatus) -> Result<(), RouterError> {
        self.send(RebroadcastMessage::Status(status))
    }
}

/// The rebroadcaster actor.
pub struct Rebroadcaster {
    identity: String,
    inbox: mpsc::UnboundedReceiver<RebroadcastMessage>,
    supervisor: RouterHandle,
    model: Option<ModelHandle>,
    requested: RecentSet<MessageId>,
}

impl Rebroadcaster {
    pub fn new(
        identity: impl Into<String>,
        inbox: mpsc::UnboundedReceiver<RebroadcastMessage>,
        supervisor: RouterHandle,
    ) -> Self {
        Self {
            identity: identity.into(),
            inbox,
            supervisor,
            model: None,
            requested: RecentSet::new(DEFAULT_CAPACITY),
        }
    }

    /// Remember at most `limit` requested ids.
    pub fn with_memory(mut self, limit: usize) -> Self {
        self.requested = RecentSet::new(limit);
        self
    }

    /// Runs until the router releases its handle. Holding a strong handle
    /// keeps the router alive until every queued status has been considered.
    pub async fn run(mut self) {
        tracing::debug!("Rebroadcaster started");
        while let Some(message) = self.inbox.recv().await {
            match message {
                RebroadcastMessage::RegisterModel(model) => {
                    tracing::debug!("Rebroadcast model registered");
                    self.model = Some(model);
                }
                RebroadcastMessage::Status(status) => self.consider(status).await,
            }
        }
        tracing::debug!(requested = self.requested.len(), "Rebroadcaster stopped");
    }

    async fn consider(&mut self, status: UserStatus) {
        if status.author.eq_ignore_ascii_case(&self.identity) || self.requested.contains(&status.id) {
            return;
        }
        let Some(model) = &self.model else {
            tracing::trace!(id = %status.id, "No model registered, skipping status");
            return;
        };

        let id = status.id;
        match model.matches(status).await {
            Ok(true) => {
                tracing::info!(id = %id, "Requesting rebroadcast");
                self.requested.insert(id);
                self.supervisor
                    .send_or_log(RouterMessage::Rebroadcast(RebroadcastRequest { id }), "rebroadcast");
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(id = %id, error = %e, "Model query failed"),
        }
    }
}
