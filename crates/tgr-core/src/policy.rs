//! Per-event message policy.
//!
//! Every inbound event is audited first, then passes one authorization guard
//! before any branch can reply or download. Unauthorized senders never observe
//! anything beyond the process being up.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    audit::{AuditEvent, AuditLogger},
    domain::UserId,
    messaging::{
        port::MessagingPort,
        types::{EventKind, InboundEvent},
    },
    security::is_allowed,
    storage::VoiceStore,
    Result,
};

pub const START_REPLY: &str = "✅ Bot ist online. Text & Voice sind aktiv.";
pub const HELP_REPLY: &str = "Befehle: /start, /help\nSende Text oder eine Voice-Message.";
pub const TEXT_REPLY: &str = "✅ Text empfangen.";

pub fn voice_saved_reply(path: &Path) -> String {
    format!("✅ Voice gespeichert: {}", path.display())
}

/// What the policy did with an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Authorized start/help/text: fixed acknowledgment sent.
    Replied,
    /// Authorized voice: payload stored at `path` and acknowledged.
    VoiceSaved { path: PathBuf },
    /// Sender is not the allowed identity. Nothing was sent or written.
    Dropped,
    /// Voice update without payload. Nothing was sent or written.
    Ignored,
}

pub struct MessagePolicy {
    allowed: Option<UserId>,
    audit: Arc<AuditLogger>,
    store: VoiceStore,
    messenger: Arc<dyn MessagingPort>,
}

impl MessagePolicy {
    pub fn new(
        allowed: Option<UserId>,
        audit: Arc<AuditLogger>,
        store: VoiceStore,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            allowed,
            audit,
            store,
            messenger,
        }
    }

    pub async fn handle(&self, event: InboundEvent) -> Result<Outcome> {
        self.audit.record(&AuditEvent::inbound(&event));

        // A voice update without payload is a no-op before authorization is considered.
        if matches!(event.kind, EventKind::Voice(None)) {
            return Ok(Outcome::Ignored);
        }

        if !is_allowed(event.sender.user_id, self.allowed) {
            // Do not communicate with unknown users.
            return Ok(Outcome::Dropped);
        }

        self.act(event).await
    }

    /// Audit an event without acting on it (edited messages).
    pub fn observe(&self, event: &InboundEvent) {
        self.audit.record(&AuditEvent::inbound(event));
    }

    async fn act(&self, event: InboundEvent) -> Result<Outcome> {
        let chat_id = event.chat_id;

        let reply = match event.kind {
            EventKind::Start => START_REPLY.to_string(),
            EventKind::Help => HELP_REPLY.to_string(),
            EventKind::Text(_) => TEXT_REPLY.to_string(),
            EventKind::Voice(None) => return Ok(Outcome::Ignored),
            EventKind::Voice(Some(voice)) => {
                let saved = self
                    .store
                    .persist(self.messenger.as_ref(), &voice.file_id)
                    .await?;
                self.messenger
                    .send_text(chat_id, &voice_saved_reply(&saved.path))
                    .await?;
                return Ok(Outcome::VoiceSaved { path: saved.path });
            }
        };

        self.messenger.send_text(chat_id, &reply).await?;
        Ok(Outcome::Replied)
    }
}
