//! Parameter extraction from matched phrase templates
//!
//! A template like `"set a timer for {duration}"` compiles into an
//! unanchored capturing pattern: literal words must appear in order, interior
//! placeholders capture lazily up to the next literal, the final placeholder
//! captures greedily. Searching (not matching from the start) means filler
//! words before or after the phrase do not prevent extraction.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// `{name}` placeholder marker inside a phrase or command template
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid regex"));

/// Placeholder names appearing in a template, in order of appearance
#[must_use]
pub fn placeholder_names(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Whether a template contains any `{name}` placeholder
#[must_use]
pub fn has_placeholders(template: &str) -> bool {
    PLACEHOLDER.is_match(template)
}

/// Remove placeholders from a template, leaving the literal words
///
/// Used to score placeholder templates when extraction does not apply.
#[must_use]
pub fn strip_placeholders(template: &str) -> String {
    let stripped = PLACEHOLDER.replace_all(template, " ");
    super::similarity::normalize(&stripped)
}

/// Substitute `{name}` references in a template with bound parameter values
///
/// Unbound placeholders become the empty string (degraded extraction leaves
/// params empty; the command still runs).
#[must_use]
pub fn substitute(template: &str, params: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            params.get(&caps[1]).map_or("", String::as_str).to_string()
        })
        .into_owned()
}

/// Extract named parameters from a transcript using a phrase template
///
/// Returns the bound parameters and the span of the transcript the template
/// matched, or `None` when the template has no placeholders or its literal
/// words do not appear in order in the transcript.
#[must_use]
pub fn extract(template: &str, transcript: &str) -> Option<(HashMap<String, String>, Range<usize>)> {
    let names = placeholder_names(template);
    if names.is_empty() {
        return None;
    }

    let pattern = build_pattern(template, names.len());
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!(template, error = %e, "template did not compile");
            return None;
        }
    };

    let caps = re.captures(transcript)?;
    let span = caps.get(0)?.range();

    let params = names
        .into_iter()
        .zip(caps.iter().skip(1))
        .filter_map(|(name, m)| m.map(|m| (name, m.as_str().trim().to_string())))
        .collect();

    Some((params, span))
}

/// Compile a template into an unanchored case-insensitive capture pattern
fn build_pattern(template: &str, placeholder_count: usize) -> String {
    let mut pattern = String::from("(?i)");
    let mut last = 0;

    for (i, m) in PLACEHOLDER.find_iter(template).enumerate() {
        pattern.push_str(&regex::escape(&template[last..m.start()]));
        // Interior captures stop at the next literal; the last one is greedy
        if i + 1 == placeholder_count {
            pattern.push_str("(.+)");
        } else {
            pattern.push_str("(.+?)");
        }
        last = m.end();
    }
    pattern.push_str(&regex::escape(&template[last..]));

    pattern
}
