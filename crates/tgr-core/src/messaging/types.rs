use crate::domain::{ChatId, UserId};

/// One inbound unit of work, created by the adapter per received update.
///
/// Telegram-specific fields stay in the adapter.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub sender: Sender,
    pub kind: EventKind,
}

/// Who sent an update. Telegram may omit the sender (channel posts).
#[derive(Clone, Debug, Default)]
pub struct Sender {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Help,
    Text(String),
    /// `None` when the update claimed to be a voice message but carried no payload.
    Voice(Option<VoiceRef>),
}

/// Downloadable voice payload handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceRef {
    /// Platform-assigned file identifier, used both to fetch and to name the file.
    pub file_id: String,
}

impl EventKind {
    /// Short name used in audit records.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Help => "help",
            EventKind::Text(_) => "text",
            EventKind::Voice(_) => "voice",
        }
    }
}
