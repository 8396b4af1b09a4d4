//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Semantic alternative search prompt
pub const ALTERNATIVES: &str = include_str!("../../prompts/alternatives.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "alternatives" => Some(ALTERNATIVES),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
