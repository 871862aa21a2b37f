use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::ChatId,
    Result,
};

/// Outbound side of the polling adapter.
///
/// Telegram is the only implementation; tests plug in a fake so the policy
/// runs without network access.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a plain-text reply to `chat_id`.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Download the file referenced by `file_id` into `dst`.
    async fn download_file(&self, file_id: &str, dst: &Path) -> Result<()>;
}
