//! Network-facing collaborators.
//!
//! The core reaches the outside world only through two traits:
//!
//! ```text
//!   StreamTransport ──(StatusStream)──► EventRouter ──► Poster
//!   start_user_stream / stop_stream                     post / rebroadcast / search
//! ```
//!
//! Every call is at-most-once from the core's point of view. Implementations
//! report failures with [`TransportError`] and the core never retries them.
//!
//! [`console::ConsoleTransport`] implements both traits over line-delimited
//! JSON, which is what the binary wires to stdin/stdout.

pub mod console;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::TransportError;
use crate::messages::{MessageId, OutboundUpdate, UserStatus};

pub use console::ConsoleTransport;

/// Live statuses, in delivery order for one connection.
pub type StatusStream = Pin<Box<dyn Stream<Item = UserStatus> + Send>>;

/// Source of the live status stream.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open the stream of statuses visible to `identity`.
    async fn start_user_stream(&self, identity: &str) -> Result<StatusStream, TransportError>;

    /// Close the stream opened by [`start_user_stream`](Self::start_user_stream).
    async fn stop_stream(&self) -> Result<(), TransportError>;
}

/// Outbound side effects: posting, rebroadcasting and searching.
#[async_trait]
pub trait Poster: Send + Sync {
    /// Post a new status.
    async fn post(&self, update: &OutboundUpdate) -> Result<(), TransportError>;

    /// Republish an existing status as the bot.
    async fn rebroadcast(&self, id: MessageId) -> Result<(), TransportError>;

    /// Search recent statuses.
    async fn search(&self, query: &str) -> Result<Vec<UserStatus>, TransportError>;
}
