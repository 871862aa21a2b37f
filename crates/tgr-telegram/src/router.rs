use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tgr_core::{
    audit::AuditLogger, config::Config, messaging::port::MessagingPort, policy::MessagePolicy,
    storage::VoiceStore,
};

use crate::handlers;
use crate::TelegramMessenger;

pub struct AppState {
    pub policy: MessagePolicy,
    /// Used to ignore commands addressed to other bots (`/start@other_bot`).
    pub bot_username: Option<String>,
}

pub async fn run_polling(cfg: Arc<Config>, audit: Arc<AuditLogger>) -> anyhow::Result<()> {
    let store = VoiceStore::open(&cfg.voice_dir)?;
    tracing::info!(dir = %store.dir().display(), "voice directory ready");

    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    let bot_username = match bot.get_me().await {
        Ok(me) => {
            tracing::info!(username = %me.username(), "tgr started");
            me.user.username.clone()
        }
        Err(e) => {
            tracing::warn!(error = %e, "getMe failed; accepting commands for any bot name");
            None
        }
    };
    match cfg.allowed_user_id {
        Some(id) => tracing::info!(allowed_user_id = id.0, "authorization enabled"),
        None => tracing::warn!("ALLOWED_TELEGRAM_USER_ID not set; all senders will be ignored"),
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let policy = MessagePolicy::new(cfg.allowed_user_id, audit.clone(), store, messenger);

    let state = Arc::new(AppState {
        policy,
        bot_username,
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_edited_message().endpoint(handlers::handle_edited_message));

    audit.note("Bot startet (Polling)...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        // Callbacks, channel posts etc. have no handler; drop them quietly.
        .default_handler(|_| async {})
        .build()
        .dispatch()
        .await;

    Ok(())
}
