use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use crate::{
    audit::{AuditLogger, AuditSink},
    domain::UserId,
    errors::Error,
    Result,
};

/// Relative directory that receives voice messages.
pub const DEFAULT_VOICE_DIR: &str = "data/voice";

/// Typed configuration, loaded once at startup and immutable afterwards.
#[derive(Clone)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    /// `None` when unset or not an integer; authorization then always fails.
    pub allowed_user_id: Option<UserId>,

    // Storage
    pub voice_dir: PathBuf,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if telegram_bot_token.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN fehlt in .env".to_string(),
            ));
        }

        let allowed_user_id = parse_user_id(lookup("ALLOWED_TELEGRAM_USER_ID"));

        let audit_log_path = lookup("AUDIT_LOG_PATH")
            .and_then(non_empty)
            .map(PathBuf::from);
        let audit_log_json = parse_bool(lookup("AUDIT_LOG_JSON")).unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            allowed_user_id,
            voice_dir: PathBuf::from(DEFAULT_VOICE_DIR),
            audit_log_path,
            audit_log_json,
        })
    }

    pub fn audit_logger(&self) -> AuditLogger {
        let sink = match &self.audit_log_path {
            Some(p) => AuditSink::File(p.clone()),
            None => AuditSink::Stderr,
        };
        AuditLogger::new(sink, self.audit_log_json)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("allowed_user_id", &self.allowed_user_id)
            .field("voice_dir", &self.voice_dir)
            .field("audit_log_path", &self.audit_log_path)
            .field("audit_log_json", &self.audit_log_json)
            .finish()
    }
}

fn parse_user_id(v: Option<String>) -> Option<UserId> {
    v?.trim().parse::<i64>().ok().map(UserId)
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

/// Parse `KEY=VALUE` lines; `#` comments and blank lines are skipped.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));

        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "   ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn parses_allowed_user_id() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", " 123:abc "),
            ("ALLOWED_TELEGRAM_USER_ID", " 42 "),
        ]))
        .unwrap();
        assert_eq!(cfg.telegram_bot_token, "123:abc");
        assert_eq!(cfg.allowed_user_id, Some(UserId(42)));
        assert_eq!(cfg.voice_dir, PathBuf::from("data/voice"));
    }

    #[test]
    fn invalid_or_missing_allowed_user_id_is_unset() {
        for raw in ["", "abc", "42.0", "0x2a"] {
            let cfg = Config::from_lookup(lookup(&[
                ("TELEGRAM_BOT_TOKEN", "t"),
                ("ALLOWED_TELEGRAM_USER_ID", raw),
            ]))
            .unwrap();
            assert_eq!(cfg.allowed_user_id, None, "raw={raw:?}");
        }

        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t")])).unwrap();
        assert_eq!(cfg.allowed_user_id, None);
    }

    #[test]
    fn audit_defaults_to_stderr_plain() {
        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t")])).unwrap();
        assert_eq!(cfg.audit_log_path, None);
        assert!(!cfg.audit_log_json);
        assert!(cfg.audit_logger().path().is_none());

        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("AUDIT_LOG_PATH", "/tmp/tgr-audit.log"),
            ("AUDIT_LOG_JSON", "yes"),
        ]))
        .unwrap();
        assert!(cfg.audit_log_json);
        assert_eq!(
            cfg.audit_logger().path(),
            Some(Path::new("/tmp/tgr-audit.log"))
        );
    }

    #[test]
    fn debug_output_redacts_token() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123456:SECRET-token"),
            ("ALLOWED_TELEGRAM_USER_ID", "42"),
        ]))
        .unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("SECRET"));
        assert!(dbg.contains("<redacted>"));
        assert!(dbg.contains("UserId(42)"));
    }

    #[test]
    fn dotenv_parsing() {
        let parsed = parse_dotenv(
            "# comment\n\nTELEGRAM_BOT_TOKEN=\"123:abc\"\nexport ALLOWED_TELEGRAM_USER_ID = 42\nbroken line\n=novalue\nEMPTY=\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "123:abc".to_string()),
                ("ALLOWED_TELEGRAM_USER_ID".to_string(), "42".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]
        );
    }
}
