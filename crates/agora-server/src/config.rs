use std::path::PathBuf;

use anyhow::{Context, bail};

/// Log filter used when `RUST_LOG` is unset: every workspace crate at debug.
pub const DEFAULT_LOG_FILTER: &str =
    "agora=debug,agora_api=debug,agora_db=debug,agora_wiki=debug,tower_http=debug";

/// Session secrets shipped in sample files that must never sign real cookies.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub entries_dir: PathBuf,
    pub session_secret: String,
    pub session_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let session_secret = lookup("AGORA_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("AGORA_SESSION_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port = get("AGORA_PORT", "8000")
            .parse()
            .context("AGORA_PORT must be a port number")?;
        let session_days: i64 = get("AGORA_SESSION_DAYS", "14")
            .parse()
            .context("AGORA_SESSION_DAYS must be a whole number of days")?;
        if session_days <= 0 {
            bail!("AGORA_SESSION_DAYS must be positive");
        }

        Ok(Self {
            host: get("AGORA_HOST", "0.0.0.0"),
            port,
            db_path: get("AGORA_DB_PATH", "agora.db").into(),
            entries_dir: get("AGORA_ENTRIES_DIR", "./entries").into(),
            session_secret,
            session_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("AGORA_SESSION_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.db_path, PathBuf::from("agora.db"));
        assert_eq!(cfg.entries_dir, PathBuf::from("./entries"));
        assert_eq!(cfg.session_days, 14);
    }

    #[test]
    fn placeholder_secret_refused() {
        assert!(config(&[]).is_err());
        assert!(config(&[("AGORA_SESSION_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn default_log_filter_covers_library_crates() {
        for target in ["agora=", "agora_api=", "agora_db=", "agora_wiki=", "tower_http="] {
            assert!(DEFAULT_LOG_FILTER.contains(target), "missing {}", target);
        }
    }

    #[test]
    fn bad_numbers_refused() {
        assert!(config(&[("AGORA_SESSION_SECRET", "x"), ("AGORA_PORT", "http")]).is_err());
        assert!(config(&[("AGORA_SESSION_SECRET", "x"), ("AGORA_SESSION_DAYS", "0")]).is_err());
    }
}
