//! The bot's actor graph.
//!
//! ```text
//!                ┌──────────────┐
//!  stream ──────►│ EventRouter  │──► Poster (post / rebroadcast / search)
//!                └──┬────┬───┬──┘
//!     ReplyToStatus │    │   │ Filter / Feedback
//!                   ▼    │   ▼
//!          ReplyHandler  │  FilterModel
//!                        ▼
//!                  Rebroadcaster ──(matches?)──► FilterModel
//! ```
//!
//! Every box is a tokio task with its own mailbox. The reply handler and the
//! rebroadcaster hold [`RouterHandle`]s, so work they have queued still
//! reaches the poster during shutdown. Dropping the [`Bot`] sends
//! [`RouterMessage::Close`], the children drain and end, and the router and
//! model follow once the last handle is gone.

pub mod handle;
pub mod model;
pub mod rebroadcast;
pub mod recent;
pub mod reply;
pub mod router;

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use handle::{RouterHandle, RouterMessage, WeakRouterHandle};
pub use model::{FilterModel, ModelHandle};
pub use rebroadcast::{RebroadcastHandle, Rebroadcaster};
pub use reply::{ReplyDecision, ReplyHandle, ReplyHandler, decide_reply};
pub use router::{Children, Collaborators, EventRouter};

use crate::config::BotConfig;
use crate::transport::{Poster, StreamTransport};

/// A running bot: the router handle plus the tasks behind it.
pub struct Bot {
    router: RouterHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl Bot {
    /// Spawn the router and its children on the current runtime.
    ///
    /// Nothing is consumed until [`RouterHandle::start`] is sent.
    pub fn spawn(
        config: &BotConfig,
        stream: Arc<dyn StreamTransport>,
        poster: Arc<dyn Poster>,
    ) -> Self {
        let (router, router_rx) = RouterHandle::channel(config.request_timeout);
        let (reply, reply_rx) = ReplyHandle::channel();
        let (rebroadcast, rebroadcast_rx) = RebroadcastHandle::channel();
        let (model, model_rx) = ModelHandle::channel(config.request_timeout);

        let tasks = vec![
            tokio::spawn(ReplyHandler::new(reply_rx, router.clone()).run()),
            tokio::spawn(FilterModel::new(model_rx).run()),
            tokio::spawn(
                Rebroadcaster::new(&config.screen_name, rebroadcast_rx, router.clone()).run(),
            ),
            tokio::spawn(
                EventRouter::new(
                    &config.screen_name,
                    router_rx,
                    router.downgrade(),
                    Children {
                        reply,
                        rebroadcast,
                        model,
                    },
                    Collaborators { stream, poster },
                )
                .run(),
            ),
        ];

        tracing::debug!(identity = %config.screen_name, "Bot spawned");
        Self { router, tasks }
    }

    /// Handle for sending messages to the router.
    pub fn router(&self) -> &RouterHandle {
        &self.router
    }

    /// Close the router and wait for every task to end.
    ///
    /// Statuses already queued are still answered and their replies posted.
    /// Clones of the router handle held elsewhere keep the graph alive until
    /// they are dropped too.
    pub async fn shutdown(mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        drop(self);

        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Bot task ended abnormally");
            }
        }
        tracing::info!("Bot stopped");
    }
}

impl Drop for Bot {
    fn drop(&mut self) {
        if let Err(e) = self.router.close() {
            tracing::debug!(error = %e, "Router already stopped");
        }
    }
}
