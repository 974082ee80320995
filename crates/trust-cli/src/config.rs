use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use trust_desk::DeskConfig;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "trust.toml";

/// Load the desk configuration.
///
/// An explicit path must exist. Without one, `./trust.toml` is used when
/// present and the built-in defaults otherwise.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<DeskConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                tracing::debug!("no {DEFAULT_CONFIG_FILE}; using defaults");
                return Ok(DeskConfig::default());
            }
            fallback
        }
    };

    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: DeskConfig =
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ledger = %config.ledger.path.display(), "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use trust_ledger::IntegrityPolicy;

    use super::*;

    #[test]
    fn explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desk.toml");
        fs::write(
            &path,
            r#"
state_path = "state/desk.json"
history_limit = 5

[ledger]
path = "state/ledger.jsonl"
integrity_policy = "read_only"

[site]
steward = "J. Steward"
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.state_path, PathBuf::from("state/desk.json"));
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.ledger.path, PathBuf::from("state/ledger.jsonl"));
        assert_eq!(config.ledger.integrity_policy, IntegrityPolicy::ReadOnly);
        assert_eq!(config.site.steward, "J. Steward");
        assert_eq!(config.news_limit, 3);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desk.toml");
        fs::write(&path, "history_limit = \"ten\"").unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
