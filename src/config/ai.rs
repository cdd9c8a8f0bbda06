// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_api_key() -> String {
    "ENV".to_string()
}

/// Classifier configuration, read from `config/ai.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub enabled: bool,
    /// "gemini" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override; each provider has a sensible default.
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            api_key: default_api_key(),
        }
    }
}

impl ClassifierConfig {
    /// Load from `config/ai.json` (or `$AI_CONFIG_PATH`). Missing or
    /// malformed config disables classification rather than failing startup;
    /// the pipeline then runs on fallback metadata.
    pub fn load() -> Self {
        let path = env::var("AI_CONFIG_PATH").unwrap_or_else(|_| "config/ai.json".to_string());
        match Self::load_from_file(Path::new(&path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, path, "classifier config unavailable, disabling");
                Self::default()
            }
        }
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: ClassifierConfig = serde_json::from_str(&data)?;
        cfg.provider = cfg.provider.to_lowercase();
        Ok(cfg)
    }

    /// Resolve the API key, honoring the "ENV" indirection. None when no key
    /// can be found — the caller should degrade, not fail.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.trim().eq_ignore_ascii_case("env") {
            return Some(self.api_key.clone());
        }
        let var = match self.provider.as_str() {
            "gemini" => "GEMINI_API_KEY",
            "openai" => "OPENAI_API_KEY",
            _ => return None,
        };
        env::var(var).ok().filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_is_normalized_to_lowercase() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ai.json");
        fs::write(&path, r#"{ "enabled": true, "provider": "Gemini" }"#).unwrap();
        let cfg = ClassifierConfig::load_from_file(&path).unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.provider, "gemini");
        assert_eq!(cfg.api_key, "ENV");
    }

    #[serial_test::serial]
    #[test]
    fn env_key_resolution_by_provider() {
        let cfg = ClassifierConfig {
            enabled: true,
            provider: "gemini".to_string(),
            model: None,
            api_key: "ENV".to_string(),
        };
        env::remove_var("GEMINI_API_KEY");
        assert!(cfg.resolve_api_key().is_none());
        env::set_var("GEMINI_API_KEY", "test-key");
        assert_eq!(cfg.resolve_api_key().as_deref(), Some("test-key"));
        env::remove_var("GEMINI_API_KEY");

        let literal = ClassifierConfig {
            api_key: "sk-literal".to_string(),
            ..cfg
        };
        assert_eq!(literal.resolve_api_key().as_deref(), Some("sk-literal"));
    }
}
