//! `flockbot parse`: run the filter-request parser without a network.

use crate::intent::parse_filter_request;

/// Parse `text` as if `by` had sent it, returning what should be printed.
pub fn run_parse_command(text: &str, by: &str) -> anyhow::Result<String> {
    match parse_filter_request(text, by) {
        Some(request) => Ok(serde_json::to_string_pretty(&request)?),
        None => Ok(format!("No filter request found in {:?}", text)),
    }
}
