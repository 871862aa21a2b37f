use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    messaging::types::{EventKind, InboundEvent},
    Result,
};

// ============== Timestamp Helpers ==============

/// ISO-8601 timestamp in UTC with second precision and a `Z` suffix.
pub fn iso_timestamp_utc() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============== Audit Logging ==============

/// Free-text payloads are cut to this many characters before logging.
pub const AUDIT_MAX_TEXT: usize = 120;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present: Option<bool>,

    /// Human-readable line body, as written in plain mode.
    pub message: String,
}

impl AuditEvent {
    /// Audit record for an inbound update. Built before any authorization decision.
    pub fn inbound(ev: &InboundEvent) -> Self {
        let user_id = ev.sender.user_id.map(|u| u.0);
        let uid = display_opt(user_id);

        let mut out = Self {
            timestamp: iso_timestamp_utc(),
            event: ev.kind.name().to_string(),
            user_id,
            username: None,
            content: None,
            present: None,
            message: String::new(),
        };

        match &ev.kind {
            EventKind::Start => {
                out.username = ev.sender.username.clone();
                out.message = format!(
                    "/start from user_id={uid} username={}",
                    display_opt(ev.sender.username.as_deref())
                );
            }
            EventKind::Help => {
                out.message = format!("/help from user_id={uid}");
            }
            EventKind::Text(text) => {
                let content = truncate_chars(text, AUDIT_MAX_TEXT);
                out.message = format!("text from user_id={uid}: {}", quote_text(content));
                out.content = Some(content.to_string());
            }
            EventKind::Voice(voice) => {
                out.present = Some(voice.is_some());
                out.message = format!("voice from user_id={uid}: present={}", voice.is_some());
            }
        }

        out
    }

    /// Free-form operational line (startup etc).
    pub fn note(message: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: "note".to_string(),
            user_id: None,
            username: None,
            content: None,
            present: None,
            message: message.to_string(),
        }
    }

    /// The line written for this event in plain mode (without trailing newline).
    pub fn plain_line(&self) -> String {
        format!("[{}] {}", self.timestamp, self.message)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditSink {
    Stderr,
    File(PathBuf),
}

/// Append-only audit trail, one line per call.
///
/// Writes never fail to the caller: a broken sink is reported through `tracing`
/// and the event is dropped. Concurrent callers never interleave within a line.
#[derive(Debug)]
pub struct AuditLogger {
    sink: AuditSink,
    json: bool,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(sink: AuditSink, json: bool) -> Self {
        Self {
            sink,
            json,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            AuditSink::File(p) => Some(p),
            AuditSink::Stderr => None,
        }
    }

    pub fn record(&self, event: &AuditEvent) {
        if let Err(e) = self.write(event) {
            tracing::warn!(error = %e, event = %event.event, "audit write failed");
        }
    }

    pub fn note(&self, message: &str) {
        self.record(&AuditEvent::note(message));
    }

    fn write(&self, event: &AuditEvent) -> Result<()> {
        let mut line = if self.json {
            serde_json::to_string(event)?
        } else {
            event.plain_line()
        };
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match &self.sink {
            AuditSink::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(line.as_bytes())?;
                err.flush()?;
            }
            AuditSink::File(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(line.as_bytes())?;
                file.flush()?;
            }
        }
        Ok(())
    }
}

/// First `max_chars` characters of `s` (no ellipsis).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Single-quoted rendering that keeps the audit record on one line.
fn quote_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.extend(c.escape_default()),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn display_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}
