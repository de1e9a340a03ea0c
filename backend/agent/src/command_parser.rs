//! Extraction of structured commands from free-form model output.
//!
//! Commands arrive in ```` ```json ```` fences, optionally preceded by a
//! `<think>` reasoning block. Each fenced block goes through a small, fixed set
//! of textual repairs before decoding.

use devclaw_core::Command;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static COMMAND_BLOCK_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?s)```json\s*\n(.*?)\n```"));
static THINK_BLOCK_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?s)<think>(.*?)</think>"));
static CODE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?s)```(\w*)\s*\n(.*?)\n```"));
static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| compile(r",\s*([}\]])"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parse command array: {single} (original: {array})")]
    Array {
        single: serde_json::Error,
        array: serde_json::Error,
    },
    #[error("parse single command: {0}")]
    Single(serde_json::Error),
}

/// Result of parsing one model response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    pub commands: Vec<Command>,
    /// Trimmed `<think>` content, empty when absent.
    pub reasoning: String,
}

/// Parse every fenced JSON command block in `text`, in order.
///
/// No blocks yields no commands. A block that still fails to decode after
/// repair fails the whole response.
pub fn parse_commands(text: &str) -> Result<ParsedOutput, ParseError> {
    let reasoning = THINK_BLOCK_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let mut commands = Vec::new();
    for caps in COMMAND_BLOCK_RE.captures_iter(text) {
        let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let repaired = repair_json(raw);

        if repaired.starts_with('[') {
            match serde_json::from_str::<Vec<Command>>(&repaired) {
                Ok(batch) => commands.extend(batch),
                Err(array) => {
                    let single = serde_json::from_str::<Command>(&repaired)
                        .map_err(|single| ParseError::Array { single, array })?;
                    commands.push(single);
                }
            }
        } else {
            let cmd = serde_json::from_str::<Command>(&repaired).map_err(ParseError::Single)?;
            commands.push(cmd);
        }
    }

    Ok(ParsedOutput { commands, reasoning })
}

/// Apply the known repairs for common model mistakes:
/// one trailing comma, commas before a closer, missing closers, raw tabs.
pub fn repair_json(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(stripped) = s.strip_suffix(',') {
        s = stripped;
    }
    let mut out = TRAILING_COMMA_RE.replace_all(s, "$1").into_owned();

    let missing_braces = out.matches('{').count().saturating_sub(out.matches('}').count());
    out.push_str(&"}".repeat(missing_braces));
    let missing_brackets = out.matches('[').count().saturating_sub(out.matches(']').count());
    out.push_str(&"]".repeat(missing_brackets));

    out.replace('\t', "\\t")
}

/// First fenced code block tagged `lang`; otherwise the first untagged block
/// (or any block when `lang` is empty). `None` when nothing matches.
pub fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    if !lang.is_empty() {
        let pattern = format!(r"(?s)```{}\s*\n(.*?)\n```", regex::escape(lang));
        if let Some(body) = Regex::new(&pattern)
            .ok()
            .and_then(|re| re.captures(text))
            .and_then(|c| c.get(1))
        {
            return Some(body.as_str().trim().to_string());
        }
    }

    CODE_BLOCK_RE.captures_iter(text).find_map(|caps| {
        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if lang.is_empty() || tag == lang || tag.is_empty() {
            caps.get(2).map(|m| m.as_str().trim().to_string())
        } else {
            None
        }
    })
}
