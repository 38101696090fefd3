//! Reply handler: one addressed status in, exactly one outbound update out.
//!
//! The decision itself is the pure function [`decide_reply`]. The actor around
//! it forwards the side messages (filter request or feedback signal) and the
//! reply to its supervisor, the router.

use std::sync::LazyLock;

use regex::Regex;
use tokio::sync::mpsc;

use super::handle::{RouterHandle, RouterMessage};
use crate::error::RouterError;
use crate::intent::parse_filter_request;
use crate::messages::{FeedbackSignal, FilterRequest, OutboundUpdate, ReplyToStatus, UserStatus};

/// Reply after a negative feedback signal was recorded.
pub const APOLOGY: &str = "Sorry about that! I'll try to do better.";

/// Reply to a negation that does not point at any earlier status.
pub const REPLY_TO_TWEET: &str =
    "Please reply directly to the tweet in question so I know which one you mean.";

/// Reply to text that is neither a filter request nor a negation.
pub const PARSE_MISS: &str =
    "Sorry, I couldn't parse that. Try something like: tweets about scala like odersky";

// `no`, `no.`, `no!`, `bad bot` with any trailing punctuation.
static NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:no[.!]?|bad\s+bot[[:punct:]]*)$").expect("negation pattern is a valid regex")
});

static LEADING_MENTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@\w+[\s,:]*)+").expect("mention pattern is a valid regex")
});

/// Whether `text` is a negation, ignoring any `@mentions` in front of it.
pub fn is_negation(text: &str) -> bool {
    let stripped = LEADING_MENTIONS.replace(text.trim(), "");
    NEGATION.is_match(stripped.trim())
}

/// Message forwarded to the supervisor alongside the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Forward {
    Filter(FilterRequest),
    Feedback(FeedbackSignal),
}

/// Outcome of handling one addressed status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDecision {
    /// Side message for the model, if any.
    pub forward: Option<Forward>,
    /// The single reply posted back to the author.
    pub update: OutboundUpdate,
}

/// Decide how to answer a status addressed to the bot.
pub fn decide_reply(status: &UserStatus) -> ReplyDecision {
    let (forward, reply_text) = match parse_filter_request(&status.text, &status.author) {
        Some(request) => {
            let about: Vec<&str> = request.about.iter().map(String::as_str).collect();
            let text = format!("Working on {}.", about.join(" "));
            (Some(Forward::Filter(request)), text)
        }
        None if is_negation(&status.text) => match status.in_reply_to_id {
            Some(target) => (
                Some(Forward::Feedback(FeedbackSignal::negative(target))),
                APOLOGY.to_string(),
            ),
            None => (None, REPLY_TO_TWEET.to_string()),
        },
        None => (None, PARSE_MISS.to_string()),
    };

    ReplyDecision {
        forward,
        update: OutboundUpdate::new(format!("@{} {}", status.author, reply_text))
            .in_reply_to(status.id),
    }
}

/// Handle for sending addressed statuses to the reply handler.
#[derive(Debug, Clone)]
pub struct ReplyHandle {
    tx: mpsc::UnboundedSender<ReplyToStatus>,
}

impl ReplyHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReplyToStatus>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn reply_to(&self, status: ReplyToStatus) -> Result<(), RouterError> {
        self.tx.send(status).map_err(|_| RouterError::MailboxClosed {
            component: "reply handler",
        })
    }
}

/// The reply handler actor.
pub struct ReplyHandler {
    inbox: mpsc::UnboundedReceiver<ReplyToStatus>,
    supervisor: RouterHandle,
}

impl ReplyHandler {
    pub fn new(inbox: mpsc::UnboundedReceiver<ReplyToStatus>, supervisor: RouterHandle) -> Self {
        Self { inbox, supervisor }
    }

    /// Process addressed statuses until every [`ReplyHandle`] is dropped.
    ///
    /// The strong supervisor handle keeps the router running until the last
    /// queued status has been answered.
    pub async fn run(mut self) {
        tracing::debug!("Reply handler started");
        while let Some(ReplyToStatus(status)) = self.inbox.recv().await {
            self.handle(&status);
        }
        tracing::debug!("Reply handler stopped");
    }

    fn handle(&self, status: &UserStatus) {
        let decision = decide_reply(status);

        match decision.forward {
            Some(Forward::Filter(request)) => {
                tracing::info!(
                    author = %status.author,
                    about = ?request.about,
                    from = ?request.from,
                    "Parsed filter request"
                );
                self.supervisor
                    .send_or_log(RouterMessage::Filter(request), "filter request");
            }
            Some(Forward::Feedback(signal)) => {
                tracing::info!(
                    author = %status.author,
                    target_id = %signal.target,
                    label = %signal.label,
                    "Received feedback"
                );
                self.supervisor
                    .send_or_log(RouterMessage::Feedback(signal), "feedback signal");
            }
            None => {
                tracing::debug!(author = %status.author, id = %status.id, "No structured intent");
            }
        }

        self.supervisor
            .send_or_log(RouterMessage::PostUpdate(decision.update), "reply");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::agent::handle::RouterHandle;
    use crate::messages::MessageId;

    fn addressed(id: u64, author: &str, text: &str, prior: Option<u64>) -> UserStatus {
        UserStatus::new(id, author, text).replying_to("flockbot", prior.map(MessageId))
    }

    #[test]
    fn test_filter_request_is_acknowledged() {
        let status = addressed(
            7,
            "alice",
            "Bot, tweets about scala like etorreborre jasonbaldridge",
            None,
        );
        let decision = decide_reply(&status);

        assert_eq!(
            decision.forward,
            Some(Forward::Filter(FilterRequest {
                about: BTreeSet::from(["scala".to_string()]),
                from: BTreeSet::from(["etorreborre".to_string(), "jasonbaldridge".to_string()]),
                by: "alice".to_string(),
            }))
        );
        assert_eq!(decision.update.text, "@alice Working on scala.");
        assert_eq!(decision.update.in_reply_to, Some(MessageId(7)));
    }

    #[test]
    fn test_negation_with_prior_id_sends_feedback() {
        let decision = decide_reply(&addressed(8, "alice", "no.", Some(42)));
        assert_eq!(
            decision.forward,
            Some(Forward::Feedback(FeedbackSignal::negative(MessageId(42))))
        );
        assert_eq!(decision.update.text, format!("@alice {}", APOLOGY));
        assert_eq!(decision.update.in_reply_to, Some(MessageId(8)));
    }

    #[test]
    fn test_negation_without_prior_id_asks_for_context() {
        let decision = decide_reply(&addressed(9, "alice", "no.", None));
        assert_eq!(decision.forward, None);
        assert_eq!(decision.update.text, format!("@alice {}", REPLY_TO_TWEET));
        assert_eq!(decision.update.in_reply_to, Some(MessageId(9)));
    }

    #[test]
    fn test_gibberish_gets_usage_message() {
        let decision = decide_reply(&addressed(10, "alice", "gibberish", Some(3)));
        assert_eq!(decision.forward, None);
        assert_eq!(decision.update.text, format!("@alice {}", PARSE_MISS));
        assert_eq!(decision.update.in_reply_to, Some(MessageId(10)));
    }

    #[test]
    fn test_negation_variants() {
        for text in [
            "no",
            "No.",
            "NO!",
            "bad bot",
            "Bad Bot!!",
            "bad bot...",
            "@flockbot no.",
            "@flockbot, bad bot",
            "  no  ",
        ] {
            assert!(is_negation(text), "expected negation: {:?}", text);
        }
        for text in ["nope", "no way", "not bad bot", "bad", "no!!", ""] {
            assert!(!is_negation(text), "expected no negation: {:?}", text);
        }
    }

    #[test]
    fn test_filter_request_takes_priority_over_negation() {
        let decision = decide_reply(&addressed(11, "alice", "about no like bob", Some(1)));
        assert!(matches!(decision.forward, Some(Forward::Filter(_))));
        assert_eq!(decision.update.text, "@alice Working on no.");
    }

    #[tokio::test]
    async fn test_handler_forwards_side_message_before_reply() {
        let (router, mut router_rx) = RouterHandle::channel(Duration::from_secs(1));
        let (reply, reply_rx) = ReplyHandle::channel();
        let handler = tokio::spawn(ReplyHandler::new(reply_rx, router.clone()).run());

        reply
            .reply_to(ReplyToStatus(addressed(12, "bob", "no!", Some(99))))
            .unwrap();

        match router_rx.recv().await {
            Some(RouterMessage::Feedback(signal)) => assert_eq!(signal.target, MessageId(99)),
            other => panic!("expected feedback, got {:?}", other),
        }
        match router_rx.recv().await {
            Some(RouterMessage::PostUpdate(update)) => {
                assert_eq!(update.text, format!("@bob {}", APOLOGY));
                assert_eq!(update.in_reply_to, Some(MessageId(12)));
            }
            other => panic!("expected reply, got {:?}", other),
        }

        drop(reply);
        handler.await.unwrap();
    }

    #[tokio::test]
    async fn test_handler_emits_exactly_one_update_per_status() {
        let (router, mut router_rx) = RouterHandle::channel(Duration::from_secs(1));
        let (reply, reply_rx) = ReplyHandle::channel();
        let handler = tokio::spawn(ReplyHandler::new(reply_rx, router.clone()).run());

        let texts = ["gibberish", "no.", "about rust like alice", "bad bot"];
        for (i, text) in texts.iter().enumerate() {
            reply
                .reply_to(ReplyToStatus(addressed(i as u64 + 1, "carol", text, None)))
                .unwrap();
        }
        drop(reply);
        handler.await.unwrap();
        drop(router);

        let mut updates = Vec::new();
        while let Some(message) = router_rx.recv().await {
            if let RouterMessage::PostUpdate(update) = message {
                updates.push(update.in_reply_to);
            }
        }
        let expected: Vec<Option<MessageId>> = (1..=4).map(|i| Some(MessageId(i))).collect();
        assert_eq!(updates, expected);
    }
}
