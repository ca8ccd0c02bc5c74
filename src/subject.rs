//! Subject construction and matching.
//!
//! Subjects are dot-separated token lists: `ari.channels.get.<id>`. Patterns may use
//! NATS wildcards: `*` matches exactly one token, `>` matches one or more trailing tokens.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::constants::{EVENTS_TOKEN, WILDCARD_TAIL, WILDCARD_TOKEN};
use crate::error::{AriError, AriResult};
use crate::event::EventType;

/// Characters that would split a token or turn it into a wildcard.
const TOKEN_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'.')
    .add(b'*')
    .add(b'>')
    .add(b'%');

/// Escape a resource id so it occupies exactly one subject token.
pub fn escape_token(id: &str) -> String {
    utf8_percent_encode(id, TOKEN_ESCAPE).to_string()
}

/// Build `<prefix>.<resource>.<action>[.<id>]`.
pub fn resource(prefix: &str, resource: &str, action: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{}.{}.{}.{}", prefix, resource, action, escape_token(id)),
        None => format!("{}.{}.{}", prefix, resource, action),
    }
}

/// Subject pattern the gateway publishes `event_type` on.
pub fn events(prefix: &str, event_type: EventType) -> String {
    match event_type {
        EventType::All => format!("{}.{}.{}", prefix, EVENTS_TOKEN, WILDCARD_TAIL),
        other => format!("{}.{}.{}", prefix, EVENTS_TOKEN, other),
    }
}

/// Reject empty subjects, empty tokens, and `>` anywhere but last.
pub fn validate_pattern(pattern: &str) -> AriResult<()> {
    if pattern.is_empty() {
        return Err(AriError::InvalidSubject("empty subject".to_string()));
    }
    let tokens: Vec<&str> = pattern
        .split('.')
        .collect();
    for (i, token) in tokens
        .iter()
        .enumerate()
    {
        if token.is_empty() || token.contains(char::is_whitespace) {
            return Err(AriError::InvalidSubject(pattern.to_string()));
        }
        if *token == WILDCARD_TAIL && i + 1 != tokens.len() {
            return Err(AriError::InvalidSubject(pattern.to_string()));
        }
    }
    Ok(())
}

/// Like [`validate_pattern`] but wildcards are not allowed.
pub fn validate_subject(subject: &str) -> AriResult<()> {
    validate_pattern(subject)?;
    if subject
        .split('.')
        .any(|t| t == WILDCARD_TOKEN || t == WILDCARD_TAIL)
    {
        return Err(AriError::InvalidSubject(subject.to_string()));
    }
    Ok(())
}

/// Whether a concrete `subject` is matched by `pattern`.
pub fn matches(pattern: &str, subject: &str) -> bool {
    let mut pat = pattern.split('.');
    let mut sub = subject.split('.');
    loop {
        match (pat.next(), sub.next()) {
            (Some(WILDCARD_TAIL), Some(_)) => return true,
            (Some(WILDCARD_TOKEN), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
