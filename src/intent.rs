//! Filter-request parser for free-text mentions.
//!
//! Users ask the bot to follow a topic by pointing at example authors, in
//! either order:
//!
//! ```rust
//! use flockbot::intent::parse_filter_request;
//!
//! let request = parse_filter_request("Bot, tweets about scala like odersky", "alice").unwrap();
//! assert!(request.about.contains("scala"));
//! assert!(request.from.contains("odersky"));
//!
//! let flipped = parse_filter_request("such as odersky about scala", "alice").unwrap();
//! assert_eq!(request, flipped);
//! ```
//!
//! Each word order has its own grammar function. [`parse_filter_request`]
//! tries them in a fixed order and returns the first match, so the same text
//! always resolves through the same grammar. Text that matches neither is not
//! an error; it simply carries no structured intent. Both clauses must be
//! present: a connector with nothing after it (`about scala like`) or before
//! the topic (`such as about scala`) does not match.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::messages::FilterRequest;

/// Clauses captured by a grammar, borrowed from the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterClauses<'a> {
    /// The topic word, `#` already stripped.
    pub topic: &'a str,
    /// The example clause, up to the end of the text (or up to `about`).
    pub examples: &'a str,
}

/// A grammar recognises one word order.
pub type Grammar = for<'a> fn(&'a str) -> Option<FilterClauses<'a>>;

/// Grammars in priority order.
pub const GRAMMARS: &[(&str, Grammar)] = &[
    ("topic-first", grammar_topic_first as Grammar),
    ("example-first", grammar_example_first as Grammar),
];

// `... about <topic> (such as|like) <examples>`
static TOPIC_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?:.*?\s)?about\s+#?([^\s#]+)\s+(?:such\s+as|like)\s+(\S.*?)\s*$")
        .expect("topic-first grammar is a valid regex")
});

// `... (such as|like) <examples> about <topic>`
static EXAMPLE_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?:.*?\s)?(?:such\s+as|like)\s+(\S.*?)\s+about\s+#?([^\s#]+)\s*$")
        .expect("example-first grammar is a valid regex")
});

/// Topic clause before the example clause.
pub fn grammar_topic_first(text: &str) -> Option<FilterClauses<'_>> {
    let caps = TOPIC_FIRST.captures(text.trim())?;
    let topic = clean_topic(caps.get(1)?.as_str())?;
    Some(FilterClauses {
        topic,
        examples: caps.get(2)?.as_str(),
    })
}

/// Example clause before the topic clause.
pub fn grammar_example_first(text: &str) -> Option<FilterClauses<'_>> {
    let caps = EXAMPLE_FIRST.captures(text.trim())?;
    let topic = clean_topic(caps.get(2)?.as_str())?;
    Some(FilterClauses {
        topic,
        examples: caps.get(1)?.as_str(),
    })
}

/// Parse `text` into a filter request on behalf of `requester`.
pub fn parse_filter_request(text: &str, requester: &str) -> Option<FilterRequest> {
    let (name, clauses) = GRAMMARS
        .iter()
        .find_map(|(name, grammar)| grammar(text).map(|clauses| (*name, clauses)))?;

    tracing::trace!(grammar = name, topic = clauses.topic, "Matched filter grammar");

    Some(FilterRequest {
        about: BTreeSet::from([clauses.topic.to_string()]),
        from: clauses
            .examples
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        by: requester.to_string(),
    })
}

/// Drop sentence punctuation trailing the topic word; an empty topic is no topic.
fn clean_topic(raw: &str) -> Option<&str> {
    let topic = raw.trim_end_matches(['.', ',', '!', '?', ';', ':']);
    (!topic.is_empty()).then_some(topic)
}
