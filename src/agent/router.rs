//! Event router: the supervisor every message passes through.
//!
//! The router is the only component that touches the network collaborators.
//! It classifies each [`RouterMessage`] and performs exactly one action for
//! it. Statuses addressed to the bot go to the reply handler, all other
//! statuses go to the rebroadcaster, and filter/feedback messages go to the
//! model.
//!
//! [`RouterMessage::Close`] stops the stream and releases the reply handler
//! and rebroadcaster. They finish what is queued, their replies and
//! rebroadcast requests still reach the poster, and once their handles and
//! every outside handle are gone the router stops. Statuses that arrive
//! after `Close` are dropped.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::handle::{RouterMessage, SearchReply, WeakRouterHandle};
use super::model::ModelHandle;
use super::rebroadcast::RebroadcastHandle;
use super::reply::ReplyHandle;
use crate::error::RouterError;
use crate::messages::{ControlCommand, MessageId, OutboundUpdate, ReplyToStatus, UserStatus};
use crate::transport::{Poster, StatusStream, StreamTransport};

/// Mailboxes of the components the router supervises.
#[derive(Debug, Clone)]
pub struct Children {
    pub reply: ReplyHandle,
    pub rebroadcast: RebroadcastHandle,
    pub model: ModelHandle,
}

/// Network collaborators used by the router.
#[derive(Clone)]
pub struct Collaborators {
    pub stream: Arc<dyn StreamTransport>,
    pub poster: Arc<dyn Poster>,
}

pub struct EventRouter {
    identity: String,
    inbox: mpsc::UnboundedReceiver<RouterMessage>,
    /// Weak handle to our own mailbox, used by the stream pump.
    this: WeakRouterHandle,
    /// `None` once closed.
    reply: Option<ReplyHandle>,
    rebroadcast: Option<RebroadcastHandle>,
    model: ModelHandle,
    collaborators: Collaborators,
    pump: Option<JoinHandle<()>>,
}

impl EventRouter {
    pub fn new(
        identity: impl Into<String>,
        inbox: mpsc::UnboundedReceiver<RouterMessage>,
        this: WeakRouterHandle,
        children: Children,
        collaborators: Collaborators,
    ) -> Self {
        let Children {
            reply,
            rebroadcast,
            model,
        } = children;
        Self {
            identity: identity.into(),
            inbox,
            this,
            reply: Some(reply),
            rebroadcast: Some(rebroadcast),
            model,
            collaborators,
            pump: None,
        }
    }

    /// Run until every strong [`RouterHandle`](super::RouterHandle) is dropped.
    pub async fn run(mut self) {
        tracing::info!(identity = %self.identity, "Event router started");

        if let Some(rebroadcast) = &self.rebroadcast {
            if let Err(e) = rebroadcast.register_model(self.model.clone()) {
                tracing::error!(error = %e, "Failed to register model with rebroadcaster");
            }
        }

        while let Some(message) = self.inbox.recv().await {
            self.dispatch(message).await;
        }

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        tracing::info!("Event router stopped");
    }

    async fn dispatch(&mut self, message: RouterMessage) {
        match message {
            RouterMessage::Control(ControlCommand::Start) => self.start_stream().await,
            RouterMessage::Control(ControlCommand::Shutdown) => self.stop_stream().await,
            RouterMessage::Search { query, respond_to } => self.search(query, respond_to),
            RouterMessage::PostUpdate(update) => self.post(update).await,
            RouterMessage::Status(status) => self.route_status(status),
            RouterMessage::Rebroadcast(request) => self.rebroadcast(request.id).await,
            RouterMessage::Filter(request) => {
                if let Err(e) = self.model.filter(request) {
                    tracing::warn!(error = %e, "Dropping filter request");
                }
            }
            RouterMessage::Feedback(signal) => {
                if let Err(e) = self.model.feedback(signal) {
                    tracing::warn!(error = %e, "Dropping feedback signal");
                }
            }
            RouterMessage::Close => self.close().await,
        }
    }

    async fn close(&mut self) {
        self.stop_stream().await;
        self.rebroadcast = None;
        if self.reply.take().is_some() {
            tracing::info!("Router closed, draining children");
        } else {
            tracing::debug!("Close received twice, ignoring");
        }
    }

    fn streaming(&self) -> bool {
        self.pump.as_ref().is_some_and(|pump| !pump.is_finished())
    }

    async fn start_stream(&mut self) {
        if self.streaming() {
            tracing::debug!("Start received while already streaming, ignoring");
            return;
        }

        match self
            .collaborators
            .stream
            .start_user_stream(&self.identity)
            .await
        {
            Ok(stream) => {
                tracing::info!(identity = %self.identity, "Consuming user stream");
                self.pump = Some(spawn_pump(stream, self.this.clone()));
            }
            Err(e) => tracing::error!(error = %e, "Could not start user stream"),
        }
    }

    async fn stop_stream(&mut self) {
        let Some(pump) = self.pump.take().filter(|pump| !pump.is_finished()) else {
            tracing::debug!("Shutdown received while idle, ignoring");
            return;
        };

        if let Err(e) = self.collaborators.stream.stop_stream().await {
            tracing::warn!(error = %e, "Transport reported an error while stopping");
        }
        pump.abort();
        tracing::info!("User stream stopped");
    }

    /// Searches run off the mailbox; the requester gets the outcome, success or not.
    fn search(&self, query: String, respond_to: SearchReply) {
        let poster = Arc::clone(&self.collaborators.poster);
        tokio::spawn(async move {
            let result = poster.search(&query).await;
            match &result {
                Ok(found) => tracing::debug!(%query, results = found.len(), "Search finished"),
                Err(e) => tracing::warn!(%query, error = %e, "Search failed"),
            }
            if respond_to.send(result).is_err() {
                tracing::debug!(%query, "Search requester went away");
            }
        });
    }

    async fn post(&self, update: OutboundUpdate) {
        match self.collaborators.poster.post(&update).await {
            Ok(()) => tracing::info!(in_reply_to = ?update.in_reply_to, "Posted update"),
            Err(e) => tracing::error!(error = %e, "Failed to post update"),
        }
    }

    async fn rebroadcast(&self, id: MessageId) {
        match self.collaborators.poster.rebroadcast(id).await {
            Ok(()) => tracing::info!(id = %id, "Rebroadcast status"),
            Err(e) => tracing::error!(id = %id, error = %e, "Failed to rebroadcast"),
        }
    }

    fn route_status(&self, status: UserStatus) {
        let id = status.id;
        let result = if status.is_addressed_to(&self.identity) {
            tracing::debug!(id = %id, author = %status.author, "Status addressed to bot");
            match &self.reply {
                Some(reply) => reply.reply_to(ReplyToStatus(status)),
                None => Err(RouterError::MailboxClosed {
                    component: "reply handler",
                }),
            }
        } else {
            tracing::trace!(id = %id, "Status for rebroadcaster");
            match &self.rebroadcast {
                Some(rebroadcast) => rebroadcast.status(status),
                None => Err(RouterError::MailboxClosed {
                    component: "rebroadcaster",
                }),
            }
        };
        if let Err(e) = result {
            tracing::warn!(id = %id, error = %e, "Dropping status");
        }
    }
}

/// Forward every streamed status into the router's mailbox.
fn spawn_pump(mut stream: StatusStream, router: WeakRouterHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(status) = stream.next().await {
            let Some(handle) = router.upgrade() else {
                break;
            };
            if handle.status(status).is_err() {
                break;
            }
        }
        tracing::info!("User stream ended");
    })
}
