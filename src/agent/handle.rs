//! Router mailbox and the handles other components use to reach it.
//!
//! The router owns the receiving end of an unbounded `mpsc` channel. Everyone
//! else holds a [`RouterHandle`] (strong) or a [`WeakRouterHandle`] (weak).
//! The reply handler and rebroadcaster hold strong handles, so the router
//! keeps running while they still have work queued. [`RouterMessage::Close`]
//! releases the router's handles to them, which lets the graph wind down once
//! they have drained. Only the stream pump holds a weak handle.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::{RouterError, TransportError};
use crate::messages::{
    ControlCommand, FeedbackSignal, FilterRequest, MessageId, OutboundUpdate, RebroadcastRequest,
    StreamEvent, UserStatus,
};

/// Reply channel for a search request.
pub type SearchReply = oneshot::Sender<Result<Vec<UserStatus>, TransportError>>;

/// Everything the router understands. The set is closed: the router matches
/// it exhaustively, so there is no "unrecognised message" case.
#[derive(Debug)]
pub enum RouterMessage {
    /// Start or stop consuming the live stream.
    Control(ControlCommand),
    /// Run a search and answer on `respond_to`.
    Search {
        query: String,
        respond_to: SearchReply,
    },
    /// Post a status.
    PostUpdate(OutboundUpdate),
    /// A status from the live stream.
    Status(UserStatus),
    /// Republish a status by id.
    Rebroadcast(RebroadcastRequest),
    /// Forward a parsed filter request to the model.
    Filter(FilterRequest),
    /// Forward a feedback signal to the model.
    Feedback(FeedbackSignal),
    /// Stop the stream and release the reply handler and rebroadcaster.
    /// Work already queued with them still completes.
    Close,
}

impl From<StreamEvent> for RouterMessage {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Status(status) => RouterMessage::Status(status),
            StreamEvent::Control(command) => RouterMessage::Control(command),
        }
    }
}

/// Wait for a typed response, bounded by `timeout`.
///
/// A dropped responder means the answering component is gone.
pub(crate) async fn await_reply<T>(
    rx: oneshot::Receiver<T>,
    operation: &'static str,
    component: &'static str,
    timeout: Duration,
) -> Result<T, RouterError> {
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(RouterError::MailboxClosed { component }),
        Err(_) => Err(RouterError::Timeout { operation, timeout }),
    }
}

/// Strong handle to the router's mailbox.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    tx: mpsc::UnboundedSender<RouterMessage>,
    request_timeout: Duration,
}

impl RouterHandle {
    /// Create a router mailbox. The receiver goes to [`EventRouter`](super::EventRouter).
    pub fn channel(request_timeout: Duration) -> (Self, mpsc::UnboundedReceiver<RouterMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, request_timeout }, rx)
    }

    /// Enqueue any router message.
    pub fn send(&self, message: RouterMessage) -> Result<(), RouterError> {
        self.tx
            .send(message)
            .map_err(|_| RouterError::MailboxClosed { component: "router" })
    }

    /// Enqueue an event as delivered by a transport.
    pub fn event(&self, event: StreamEvent) -> Result<(), RouterError> {
        self.send(event.into())
    }

    pub fn start(&self) -> Result<(), RouterError> {
        self.send(RouterMessage::Control(ControlCommand::Start))
    }

    pub fn shutdown(&self) -> Result<(), RouterError> {
        self.send(RouterMessage::Control(ControlCommand::Shutdown))
    }

    pub fn close(&self) -> Result<(), RouterError> {
        self.send(RouterMessage::Close)
    }

    pub fn status(&self, status: UserStatus) -> Result<(), RouterError> {
        self.send(RouterMessage::Status(status))
    }

    pub fn post(&self, update: OutboundUpdate) -> Result<(), RouterError> {
        self.send(RouterMessage::PostUpdate(update))
    }

    pub fn rebroadcast(&self, id: MessageId) -> Result<(), RouterError> {
        self.send(RouterMessage::Rebroadcast(RebroadcastRequest { id }))
    }

    pub fn filter(&self, request: FilterRequest) -> Result<(), RouterError> {
        self.send(RouterMessage::Filter(request))
    }

    pub fn feedback(&self, signal: FeedbackSignal) -> Result<(), RouterError> {
        self.send(RouterMessage::Feedback(signal))
    }

    /// Search through the router and wait for the result.
    ///
    /// Fails with [`RouterError::Timeout`] if no answer arrives within the
    /// configured request timeout. Nothing is retried.
    pub async fn search(&self, query: impl Into<String>) -> Result<Vec<UserStatus>, RouterError> {
        let (respond_to, rx) = oneshot::channel();
        self.send(RouterMessage::Search {
            query: query.into(),
            respond_to,
        })?;
        let result = await_reply(rx, "search", "router", self.request_timeout).await?;
        Ok(result?)
    }

    /// Send, logging instead of failing when the router has already stopped.
    pub(crate) fn send_or_log(&self, message: RouterMessage, what: &'static str) {
        if let Err(e) = self.send(message) {
            tracing::debug!(what, error = %e, "Router stopped before message was sent");
        }
    }

    /// Timeout applied to request/response exchanges.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Weak handle that does not keep the router running.
    pub fn downgrade(&self) -> WeakRouterHandle {
        WeakRouterHandle {
            tx: self.tx.downgrade(),
            request_timeout: self.request_timeout,
        }
    }
}

/// Weak handle to the router; does not keep its mailbox open.
#[derive(Debug, Clone)]
pub struct WeakRouterHandle {
    tx: mpsc::WeakUnboundedSender<RouterMessage>,
    request_timeout: Duration,
}

impl WeakRouterHandle {
    /// Upgrade to a strong handle while the router is still reachable.
    pub fn upgrade(&self) -> Option<RouterHandle> {
        self.tx.upgrade().map(|tx| RouterHandle {
            tx,
            request_timeout: self.request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_arrive_in_send_order() {
        let (router, mut rx) = RouterHandle::channel(Duration::from_secs(1));
        router.start().unwrap();
        router.post(OutboundUpdate::new("one")).unwrap();
        router.rebroadcast(MessageId(3)).unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(RouterMessage::Control(ControlCommand::Start))
        ));
        assert!(matches!(rx.recv().await, Some(RouterMessage::PostUpdate(u)) if u.text == "one"));
        assert!(matches!(
            rx.recv().await,
            Some(RouterMessage::Rebroadcast(RebroadcastRequest { id: MessageId(3) }))
        ));
    }

    #[tokio::test]
    async fn test_stream_events_convert() {
        let (router, mut rx) = RouterHandle::channel(Duration::from_secs(1));
        router
            .event(StreamEvent::Status(UserStatus::new(1, "alice", "hi")))
            .unwrap();
        router
            .event(StreamEvent::Control(ControlCommand::Shutdown))
            .unwrap();

        assert!(matches!(rx.recv().await, Some(RouterMessage::Status(_))));
        assert!(matches!(
            rx.recv().await,
            Some(RouterMessage::Control(ControlCommand::Shutdown))
        ));
    }

    #[tokio::test]
    async fn test_search_round_trip() {
        let (router, mut rx) = RouterHandle::channel(Duration::from_secs(1));
        tokio::spawn(async move {
            if let Some(RouterMessage::Search { query, respond_to }) = rx.recv().await {
                let _ = respond_to.send(Ok(vec![UserStatus::new(5, "bob", query)]));
            }
        });

        let found = router.search("scala").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "scala");
    }

    #[tokio::test]
    async fn test_search_failure_reaches_requester() {
        let (router, mut rx) = RouterHandle::channel(Duration::from_secs(1));
        tokio::spawn(async move {
            if let Some(RouterMessage::Search { query, respond_to }) = rx.recv().await {
                let _ = respond_to.send(Err(TransportError::SearchFailed {
                    query,
                    reason: "offline".to_string(),
                }));
            }
        });

        let err = router.search("scala").await.unwrap_err();
        assert!(matches!(
            err,
            RouterError::Transport(TransportError::SearchFailed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_times_out() {
        let (router, _rx) = RouterHandle::channel(Duration::from_secs(10));
        let err = router.search("scala").await.unwrap_err();
        assert!(matches!(
            err,
            RouterError::Timeout {
                operation: "search",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_search_fails_when_responder_dropped() {
        let (router, mut rx) = RouterHandle::channel(Duration::from_secs(1));
        tokio::spawn(async move {
            // Receive and drop the request without answering.
            let _ = rx.recv().await;
        });
        let err = router.search("scala").await.unwrap_err();
        assert!(matches!(err, RouterError::MailboxClosed { .. }));
    }

    #[test]
    fn test_send_fails_after_receiver_dropped() {
        let (router, rx) = RouterHandle::channel(Duration::from_secs(1));
        drop(rx);
        assert!(matches!(
            router.start(),
            Err(RouterError::MailboxClosed { component: "router" })
        ));
    }

    #[test]
    fn test_send_or_log_tolerates_stopped_router() {
        let (router, rx) = RouterHandle::channel(Duration::from_secs(1));
        router.send_or_log(RouterMessage::Close, "close");
        drop(rx);
        router.send_or_log(RouterMessage::Close, "close");
    }

    #[test]
    fn test_weak_handle_does_not_keep_router_alive() {
        let (router, _rx) = RouterHandle::channel(Duration::from_secs(1));
        let weak = router.downgrade();
        assert!(weak.upgrade().is_some());
        drop(router);
        assert!(weak.upgrade().is_none());
    }
}
