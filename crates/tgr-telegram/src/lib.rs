//! Telegram adapter (teloxide).
//!
//! This crate implements the `tgr-core` MessagingPort over the Telegram Bot API
//! and drives the message policy from a long-polling dispatcher.

use std::path::Path;

use async_trait::async_trait;

use teloxide::{net::Download, prelude::*};

pub mod handlers;
pub mod router;

use tgr_core::{
    domain::ChatId,
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    fn map_download_err(e: teloxide::DownloadError) -> Error {
        Error::External(format!("telegram download error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dst: &Path) -> Result<()> {
        let file = self
            .bot
            .get_file(file_id.to_string())
            .await
            .map_err(Self::map_err)?;

        let mut out = tokio::fs::File::create(dst).await?;
        self.bot
            .download_file(&file.path, &mut out)
            .await
            .map_err(Self::map_download_err)?;
        Ok(())
    }
}
