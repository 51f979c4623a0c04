// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

const ENV_PATH: &str = "AI_CONFIG_PATH";

fn default_provider() -> String {
    "openai".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// Only "openai" (any OpenAI-compatible endpoint) is supported.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Override for OpenAI-compatible gateways.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl AiConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: String::new(),
            model: None,
            base_url: None,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        cfg.provider = cfg.provider.trim().to_lowercase();

        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        cfg.validated()
    }

    /// Environment-only configuration. AI is on when a key is present unless
    /// `AI_ENABLED` says otherwise. Enabling AI without a key is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let enabled = match env::var("AI_ENABLED") {
            Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            Err(_) => !api_key.trim().is_empty(),
        };
        let non_empty = |k: &str| env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            enabled,
            provider: default_provider(),
            api_key,
            model: non_empty("AI_MODEL"),
            base_url: non_empty("AI_BASE_URL"),
        }
        .validated()
    }

    /// 1) $AI_CONFIG_PATH  2) config/ai.json  3) environment
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("AI_CONFIG_PATH points to non-existent path");
            }
            return Self::load_from_file(&pb);
        }
        let json_p = PathBuf::from("config/ai.json");
        if json_p.exists() {
            return Self::load_from_file(&json_p);
        }
        Self::from_env()
    }

    fn validated(mut self) -> anyhow::Result<Self> {
        self.api_key = self.api_key.trim().to_string();
        if self.enabled && self.api_key.is_empty() {
            anyhow::bail!("AI is enabled but no API key is configured (set OPENAI_API_KEY or disable AI)");
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[serial_test::serial]
    #[test]
    fn env_placeholder_resolves_key() {
        env::set_var("OPENAI_API_KEY", "sk-test");
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"enabled": true, "provider": "OpenAI", "api_key": "ENV"}}"#).unwrap();
        let cfg = AiConfig::load_from_file(f.path()).unwrap();
        env::remove_var("OPENAI_API_KEY");

        assert!(cfg.enabled);
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.api_key, "sk-test");
        assert!(cfg.model.is_none());
    }

    #[serial_test::serial]
    #[test]
    fn env_placeholder_without_key_errors() {
        env::remove_var("OPENAI_API_KEY");
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"enabled": true, "api_key": "env"}}"#).unwrap();
        assert!(AiConfig::load_from_file(f.path()).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn enabled_without_key_errors_from_env() {
        env::remove_var("OPENAI_API_KEY");
        env::set_var("AI_ENABLED", "true");
        let res = AiConfig::from_env();
        env::remove_var("AI_ENABLED");
        assert!(res.is_err());
    }

    #[test]
    fn enabled_with_empty_key_in_file_errors() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"enabled": true, "api_key": "  "}}"#).unwrap();
        let err = AiConfig::load_from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("no API key"), "{err}");
    }

    #[serial_test::serial]
    #[test]
    fn env_without_key_or_flag_is_disabled() {
        env::remove_var("OPENAI_API_KEY");
        env::remove_var("AI_ENABLED");
        let cfg = AiConfig::from_env().unwrap();
        assert!(!cfg.enabled);
    }

    #[test]
    fn disabled_file_without_key_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"enabled": false}}"#).unwrap();
        let cfg = AiConfig::load_from_file(f.path()).unwrap();
        assert!(!cfg.enabled);
    }
}
