use std::{process::ExitCode, sync::Arc};

use tgr_core::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), tgr_core::Error> {
    tgr_core::logging::init("tgr")?;

    let cfg = Arc::new(Config::load()?);

    let audit = Arc::new(cfg.audit_logger());
    tracing::debug!(json = cfg.audit_log_json, "audit logger ready");

    tgr_telegram::router::run_polling(cfg, audit)
        .await
        .map_err(|e| tgr_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
