//! Scrubs API keys and bearer tokens from strings prior to logging.

use once_cell::sync::Lazy;
use regex::Regex;

static API_KEY_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(sk-[A-Za-z0-9_\-]{20,})|(Bearer\s+[A-Za-z0-9\-\._~+/]+=*)").ok()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    match API_KEY_RE.as_ref() {
        Some(re) => re.replace_all(input, "[REDACTED_TOKEN]").into_owned(),
        None => input.to_string(),
    }
}
