// LogHarvest - core/timestamp.rs
//
// Best-effort timestamp for one message. Never fails: every parse problem
// is logged and downgraded to the `Unknown` sentinel.
//
// Precedence:
//   1. `Date` header, parsed as an RFC 2822 date-time.
//   2. The `Received` header at the configured hop, first embedded
//      `YYYY-MM-DD HH:MM:SS` substring.
//   3. `MessageTimestamp::Unknown`.

use crate::core::model::{Message, MessageTimestamp};
use crate::util::constants;
use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// Configuration for timestamp resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampConfig {
    /// 1-based position of the `Received` header consulted when `Date` is
    /// missing or unparseable. 0 disables the fallback.
    ///
    /// The default (3) reflects one specific relay topology; see
    /// `constants::DEFAULT_RECEIVED_HOP`.
    pub received_hop: usize,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            received_hop: constants::DEFAULT_RECEIVED_HOP,
        }
    }
}

/// Resolve the timestamp of `message`.
pub fn resolve_timestamp(message: &Message, config: &TimestampConfig) -> MessageTimestamp {
    if let Some(raw) = message.date.as_deref() {
        match parse_date_header(raw) {
            Some(ts) => return MessageTimestamp::Resolved(ts),
            None => tracing::warn!(
                message = %message.id,
                date = %raw,
                "Failed to parse Date header; trying Received chain"
            ),
        }
    }

    if let Some(ts) = timestamp_from_received(&message.received, config.received_hop) {
        tracing::debug!(
            message = %message.id,
            hop = config.received_hop,
            "Timestamp taken from Received header"
        );
        return MessageTimestamp::Resolved(ts);
    }

    tracing::debug!(message = %message.id, "No usable timestamp; using sentinel");
    MessageTimestamp::Unknown
}

/// Parse a `Date` header value, keeping the wall-clock time as written in the
/// header's own offset.
fn parse_date_header(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.naive_local());
    }

    // Trailing zone comments such as "+0000 (UTC)" are common in the wild.
    let without_comment = match trimmed.rfind('(') {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim_end(),
        _ => return None,
    };
    DateTime::parse_from_rfc2822(without_comment)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Pull the first `YYYY-MM-DD HH:MM:SS` substring out of the `hop`-th
/// (1-based) `Received` header.
fn timestamp_from_received(received: &[String], hop: usize) -> Option<NaiveDateTime> {
    static EMBEDDED: OnceLock<Regex> = OnceLock::new();
    let re = EMBEDDED.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}")
            .expect("timestamp_from_received: invalid regex")
    });

    if hop == 0 {
        return None;
    }
    let header = received.get(hop - 1)?;
    let found = re.find(header)?;
    match NaiveDateTime::parse_from_str(found.as_str(), constants::TIMESTAMP_FORMAT) {
        Ok(ts) => Some(ts),
        Err(e) => {
            tracing::warn!(
                raw = found.as_str(),
                error = %e,
                "Received header timestamp is not a valid date-time"
            );
            None
        }
    }
}
