use anyhow::Context;
use pinq_core::HttpBackend;
use pinq_store::FsPendingStore;
use std::path::{Path, PathBuf};

/// On-disk CLI configuration. Every field is optional; the credential is
/// deliberately not part of the file and only ever read from the
/// environment.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PinqConfig {
    pub api_url: Option<String>,
    pub pending_dir: Option<PathBuf>,
}

impl PinqConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        toml::from_str(&content).with_context(|| format!("invalid config at {}", path.display()))
    }

    /// Pin service base URL: `PINQ_API_URL`, then the config file, then
    /// the service default.
    pub fn api_url(&self) -> String {
        env_var("PINQ_API_URL")
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| HttpBackend::DEFAULT_API_URL.to_owned())
    }

    /// Pending queue directory: CLI flag (handled by the caller), then
    /// `PINQ_PENDING_DIR`, then the config file, then the temp-dir default.
    pub fn pending_dir(&self) -> PathBuf {
        env_var("PINQ_PENDING_DIR")
            .map(PathBuf::from)
            .or_else(|| self.pending_dir.clone())
            .unwrap_or_else(FsPendingStore::default_location)
    }
}

/// Bearer credential for the pin service, if configured.
pub fn credential() -> Option<String> {
    env_var("PINQ_API_KEY")
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: PinqConfig = toml::from_str(
            r#"
api_url = "https://pin.example.com"
pending_dir = "/var/lib/pinq/pending"
"#,
        )
        .unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://pin.example.com"));
        assert_eq!(
            config.pending_dir.as_deref(),
            Some(Path::new("/var/lib/pinq/pending"))
        );
    }

    #[test]
    fn empty_config_falls_back_to_defaults() {
        let config: PinqConfig = toml::from_str("").unwrap();
        assert!(config.api_url.is_none());
        assert!(config.pending_dir.is_none());
    }
}
