//! Telegram update handlers.
//!
//! Each update is translated into a framework-agnostic [`InboundEvent`] and
//! handed to the core message policy. Updates the relay has no handler for
//! (other commands, stickers, photos, ...) are dropped without an audit line.

use std::sync::Arc;

use teloxide::types::{Message, MessageEntity, MessageEntityKind};

use tgr_core::{
    domain::{ChatId, UserId},
    messaging::types::{EventKind, InboundEvent, Sender, VoiceRef},
    policy::Outcome,
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> tgr_core::Result<()> {
    let Some(event) = inbound_event(&msg, state.bot_username.as_deref()) else {
        return Ok(());
    };
    let kind = event.kind.name();

    match state.policy.handle(event).await {
        Ok(outcome) => {
            if let Outcome::VoiceSaved { path } = &outcome {
                tracing::info!(path = %path.display(), "voice saved");
            }
            tracing::debug!(kind, ?outcome, "update handled");
            Ok(())
        }
        Err(e) => {
            tracing::error!(kind, error = %e, "update handling failed");
            Err(e)
        }
    }
}

/// Edited messages reach the audit trail like new ones but are never answered.
pub async fn handle_edited_message(msg: Message, state: Arc<AppState>) -> tgr_core::Result<()> {
    if let Some(event) = inbound_event(&msg, state.bot_username.as_deref()) {
        state.policy.observe(&event);
    }
    Ok(())
}

fn inbound_event(msg: &Message, bot_username: Option<&str>) -> Option<InboundEvent> {
    let kind = if let Some(text) = msg.text() {
        let command_len = leading_bot_command_len(msg.entities().unwrap_or_default());
        classify_text(text, command_len, bot_username)?
    } else if let Some(voice) = msg.voice() {
        EventKind::Voice(Some(VoiceRef {
            file_id: voice.file.id.clone(),
        }))
    } else {
        return None;
    };

    let sender = msg
        .from()
        .map(|u| Sender {
            user_id: Some(UserId(u.id.0 as i64)),
            username: u.username.clone(),
        })
        .unwrap_or_default();

    Some(InboundEvent {
        chat_id: ChatId(msg.chat.id.0),
        sender,
        kind,
    })
}

/// Length (UTF-16 units) of a `bot_command` entity starting at offset 0, if any.
fn leading_bot_command_len(entities: &[MessageEntity]) -> Option<usize> {
    entities
        .iter()
        .find(|e| e.offset == 0 && matches!(e.kind, MessageEntityKind::BotCommand))
        .map(|e| e.length)
}

/// Map message text to an event kind; `None` for commands the relay does not handle.
///
/// Only text that Telegram marked with a leading `bot_command` entity is a command;
/// anything else (including `/ hallo` or `//`) is plain text.
fn classify_text(
    text: &str,
    command_len: Option<usize>,
    bot_username: Option<&str>,
) -> Option<EventKind> {
    let Some(command_len) = command_len else {
        return Some(EventKind::Text(text.to_string()));
    };

    let (cmd, target) = parse_command(utf16_prefix(text, command_len));
    match (target.as_deref(), bot_username) {
        (Some(""), _) => return None,
        (Some(target), Some(me)) if !target.eq_ignore_ascii_case(me) => return None,
        _ => {}
    }

    match cmd.as_str() {
        "start" => Some(EventKind::Start),
        "help" => Some(EventKind::Help),
        _ => None,
    }
}

/// Split `/cmd@botname` into the lowercased command and the bot name (possibly empty).
fn parse_command(command: &str) -> (String, Option<String>) {
    let mut parts = command.trim_start_matches('/').splitn(2, '@');

    let cmd = parts.next().unwrap_or("").to_lowercase();
    let target = parts.next().map(|s| s.to_string());

    (cmd, target)
}

/// Longest prefix of `s` spanning at most `units` UTF-16 code units.
fn utf16_prefix(s: &str, units: usize) -> &str {
    let mut seen = 0usize;
    for (idx, c) in s.char_indices() {
        if seen + c.len_utf16() > units {
            return &s[..idx];
        }
        seen += c.len_utf16();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: MessageEntityKind, offset: usize, length: usize) -> MessageEntity {
        MessageEntity {
            kind,
            offset,
            length,
        }
    }

    /// Command length as Telegram reports it: the first whitespace-separated token.
    fn cmd_len(text: &str) -> Option<usize> {
        let token = text.split_whitespace().next().unwrap_or("");
        Some(token.encode_utf16().count())
    }

    #[test]
    fn parses_command_with_bot_suffix() {
        assert_eq!(parse_command("/start"), ("start".to_string(), None));
        assert_eq!(
            parse_command("/Help@relay_bot"),
            ("help".to_string(), Some("relay_bot".to_string()))
        );
        assert_eq!(
            parse_command("/start@"),
            ("start".to_string(), Some(String::new()))
        );
    }

    #[test]
    fn finds_only_leading_bot_command_entity() {
        let entities = vec![
            entity(MessageEntityKind::Bold, 0, 3),
            entity(MessageEntityKind::BotCommand, 0, 6),
        ];
        assert_eq!(leading_bot_command_len(&entities), Some(6));

        let later = vec![entity(MessageEntityKind::BotCommand, 4, 6)];
        assert_eq!(leading_bot_command_len(&later), None);
        assert_eq!(leading_bot_command_len(&[]), None);
    }

    #[test]
    fn utf16_prefix_handles_surrogate_pairs() {
        assert_eq!(utf16_prefix("/start now", 6), "/start");
        assert_eq!(utf16_prefix("/ä x", 2), "/ä");
        assert_eq!(utf16_prefix("😀x", 1), "");
        assert_eq!(utf16_prefix("😀x", 2), "😀");
        assert_eq!(utf16_prefix("ab", 10), "ab");
    }

    #[test]
    fn plain_text_becomes_text_event() {
        assert_eq!(
            classify_text("hello", None, None),
            Some(EventKind::Text("hello".to_string()))
        );
    }

    #[test]
    fn slash_prefixed_text_without_command_entity_is_text() {
        for text in ["/ hallo", "//", "/ä", " /start"] {
            assert_eq!(
                classify_text(text, None, Some("relay_bot")),
                Some(EventKind::Text(text.to_string())),
                "text={text:?}"
            );
        }
    }

    #[test]
    fn recognizes_start_and_help() {
        assert_eq!(
            classify_text("/start", cmd_len("/start"), None),
            Some(EventKind::Start)
        );
        assert_eq!(
            classify_text("/START now", cmd_len("/START now"), None),
            Some(EventKind::Start)
        );
        assert_eq!(
            classify_text("/help", cmd_len("/help"), Some("relay_bot")),
            Some(EventKind::Help)
        );
        assert_eq!(
            classify_text("/help@Relay_Bot", cmd_len("/help@Relay_Bot"), Some("relay_bot")),
            Some(EventKind::Help)
        );
    }

    #[test]
    fn other_commands_and_other_bots_are_ignored() {
        assert_eq!(classify_text("/settings", cmd_len("/settings"), None), None);
        assert_eq!(
            classify_text("/start@other_bot", cmd_len("/start@other_bot"), Some("relay_bot")),
            None
        );
    }

    #[test]
    fn empty_bot_suffix_is_a_mismatch() {
        assert_eq!(
            classify_text("/start@", cmd_len("/start@"), Some("relay_bot")),
            None
        );
        assert_eq!(classify_text("/help@", cmd_len("/help@"), None), None);
    }
}
