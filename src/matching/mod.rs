//! Transcript-to-command matching
//!
//! Fuzzy similarity scoring, phrase matching over the configured command set,
//! and `{name}` parameter extraction from matched templates.

mod extract;
mod matcher;
pub mod similarity;

pub use extract::{extract, has_placeholders, placeholder_names, strip_placeholders, substitute};
pub use matcher::{MatchResult, find_match};
