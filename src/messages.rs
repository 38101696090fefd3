//! Value messages passed between the bot's components.
//!
//! Every type here is immutable once built. Components hand them to each
//! other by value over their mailboxes, so ownership always moves with the
//! message and nothing is shared.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a status on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A status delivered by the live stream or returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    /// Identifier of this status.
    pub id: MessageId,
    /// Screen name of the author.
    pub author: String,
    /// Status text as posted.
    pub text: String,
    /// Screen name of the author this status replies to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_author: Option<String>,
    /// Identifier of the status this one replies to, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<MessageId>,
}

impl UserStatus {
    /// Create a top-level status (not a reply).
    pub fn new(id: impl Into<MessageId>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            text: text.into(),
            in_reply_to_author: None,
            in_reply_to_id: None,
        }
    }

    /// Mark this status as a reply to `author`, optionally to a specific status.
    pub fn replying_to(mut self, author: impl Into<String>, id: Option<MessageId>) -> Self {
        self.in_reply_to_author = Some(author.into());
        self.in_reply_to_id = id;
        self
    }

    /// Whether this status replies to the given identity.
    ///
    /// Screen names compare case-insensitively, as they do on the network.
    pub fn is_addressed_to(&self, identity: &str) -> bool {
        self.in_reply_to_author
            .as_deref()
            .is_some_and(|author| author.eq_ignore_ascii_case(identity))
    }
}

/// Control commands understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Begin consuming the live stream addressed to the bot.
    Start,
    /// Stop consuming the live stream.
    Shutdown,
}

/// A unit pushed into the router by the live transport or the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    Status(UserStatus),
    Control(ControlCommand),
}

/// Structured topic/author query parsed from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRequest {
    /// Topic tokens, without any leading `#`.
    pub about: BTreeSet<String>,
    /// Example authors.
    pub from: BTreeSet<String>,
    /// Screen name of whoever asked.
    pub by: String,
}

/// Polarity of a feedback signal. Only negative feedback exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Negative,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Negative => write!(f, "negative"),
        }
    }
}

/// Correction tied to a status the bot produced earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSignal {
    pub target: MessageId,
    pub label: Polarity,
}

impl FeedbackSignal {
    pub fn negative(target: MessageId) -> Self {
        Self {
            target,
            label: Polarity::Negative,
        }
    }
}

/// A status the bot wants to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundUpdate {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MessageId>,
}

impl OutboundUpdate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            in_reply_to: None,
        }
    }

    pub fn in_reply_to(mut self, id: MessageId) -> Self {
        self.in_reply_to = Some(id);
        self
    }
}

/// Request to republish an existing status as the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebroadcastRequest {
    pub id: MessageId,
}

/// A status addressed to the bot, handed to the reply handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyToStatus(pub UserStatus);
