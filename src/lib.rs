//! flockbot: a social-network bot that curates statuses for its followers.
//!
//! Followers address the bot with requests such as
//! `"tweets about scala like odersky"`. The bot parses them into filter
//! requests, answers every addressed status with exactly one reply, and
//! rebroadcasts unaddressed statuses that match an active filter.
//!
//! The core is an actor graph (see [`agent`]) that reaches the network only
//! through the traits in [`transport`].

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod intent;
pub mod messages;
pub mod transport;

pub use agent::Bot;
pub use config::BotConfig;
pub use error::{Error, Result};
