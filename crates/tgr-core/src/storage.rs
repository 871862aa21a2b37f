use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};

use crate::{messaging::port::MessagingPort, Result};

pub const VOICE_EXTENSION: &str = "ogg";

/// A voice payload written to local storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedVoiceFile {
    pub timestamp: DateTime<Local>,
    pub file_id: String,
    pub path: PathBuf,
}

/// Append-only directory of received voice messages.
#[derive(Clone, Debug)]
pub struct VoiceStore {
    dir: PathBuf,
}

impl VoiceStore {
    /// Open the store, creating `dir` (and parents) if missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download `file_id` through `messenger` and store it under a timestamped name.
    ///
    /// Failures are returned as-is; nothing is retried or cleaned up.
    pub async fn persist(
        &self,
        messenger: &dyn MessagingPort,
        file_id: &str,
    ) -> Result<PersistedVoiceFile> {
        self.persist_at(messenger, file_id, Local::now()).await
    }

    pub async fn persist_at(
        &self,
        messenger: &dyn MessagingPort,
        file_id: &str,
        now: DateTime<Local>,
    ) -> Result<PersistedVoiceFile> {
        let path = self.dir.join(voice_file_name(now, file_id));
        messenger.download_file(file_id, &path).await?;

        Ok(PersistedVoiceFile {
            timestamp: now,
            file_id: file_id.to_string(),
            path,
        })
    }
}

/// `YYYYMMDD_HHMMSS_<file_id>.ogg`, local wall-clock time.
pub fn voice_file_name(now: DateTime<Local>, file_id: &str) -> String {
    format!(
        "{}_{file_id}.{VOICE_EXTENSION}",
        now.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn file_name_uses_local_timestamp_and_verbatim_file_id() {
        let now = Local.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap();
        assert_eq!(
            voice_file_name(now, "ABC123"),
            "20240301_140509_ABC123.ogg"
        );
        assert_eq!(
            voice_file_name(now, "AwACAgIAAxkBAAM-x_y"),
            "20240301_140509_AwACAgIAAxkBAAM-x_y.ogg"
        );
    }

    #[test]
    fn open_creates_nested_directory() {
        let root = PathBuf::from(format!("/tmp/tgr-store-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);

        let store = VoiceStore::open(root.join("data/voice")).unwrap();
        assert!(store.dir().is_dir());

        // Idempotent on an existing directory.
        VoiceStore::open(root.join("data/voice")).unwrap();

        let _ = fs::remove_dir_all(&root);
    }
}
