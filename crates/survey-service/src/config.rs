//! Service configuration
//!
//! Loaded from TOML; every section and key is optional.
//!
//! ```toml
//! [auth]
//! token_ttl_secs = 2592000
//! password_hash_rounds = 10000
//! signing_seed = "<64 hex chars>"
//!
//! [research]
//! access_code_len = 10
//!
//! [logging]
//! filter = "info,survey_service=debug"
//! format = "json"
//!
//! [storage]
//! snapshot_path = "/var/lib/survey/store.json"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use survey_core::{SurveyError, SurveyResult};

/// Thirty days
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Ten years
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;
pub const DEFAULT_HASH_ROUNDS: u32 = 10_000;
pub const DEFAULT_ACCESS_CODE_LEN: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub auth: AuthConfig,
    pub research: ResearchConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_ttl_secs: u64,
    pub password_hash_rounds: u32,
    /// Hex-encoded 32-byte Ed25519 seed; a fresh key is generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_seed: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            password_hash_rounds: DEFAULT_HASH_ROUNDS,
            signing_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub access_code_len: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            access_code_len: DEFAULT_ACCESS_CODE_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Parse TOML text and validate the result.
    pub fn parse(content: &str) -> SurveyResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SurveyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> SurveyResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SurveyError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    pub fn validate(&self) -> SurveyResult<()> {
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.auth.token_ttl_secs) {
            return Err(SurveyError::Config(format!(
                "auth.token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }
        if self.auth.password_hash_rounds == 0 {
            return Err(SurveyError::Config(
                "auth.password_hash_rounds must be positive".into(),
            ));
        }
        if !(4..=64).contains(&self.research.access_code_len) {
            return Err(SurveyError::Config(
                "research.access_code_len must be between 4 and 64".into(),
            ));
        }
        if let Some(seed) = &self.auth.signing_seed {
            if seed.len() != 64 || hex::decode(seed).is_err() {
                return Err(SurveyError::Config(
                    "auth.signing_seed must be 64 hex characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Effective configuration as TOML, with the signing seed redacted
    pub fn to_toml_redacted(&self) -> SurveyResult<String> {
        let mut shown = self.clone();
        if shown.auth.signing_seed.is_some() {
            shown.auth.signing_seed = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| SurveyError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_gives_defaults() {
        let config = ServiceConfig::parse("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.auth.token_ttl_secs, 2_592_000);
        assert_eq!(config.research.access_code_len, 10);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ServiceConfig::parse(
            r#"
            [logging]
            format = "json"

            [auth]
            token_ttl_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.auth.token_ttl_secs, 60);
        assert_eq!(config.auth.password_hash_rounds, DEFAULT_HASH_ROUNDS);
    }

    #[test]
    fn bad_values_are_config_errors() {
        for raw in [
            "[auth]\ntoken_ttl_secs = 0",
            "[auth]\ntoken_ttl_secs = 10000000000000",
            "[research]\naccess_code_len = 2",
            "[auth]\nsigning_seed = \"zz\"",
            "[logging]\nformat = \"xml\"",
        ] {
            assert!(matches!(ServiceConfig::parse(raw), Err(SurveyError::Config(_))), "{raw}");
        }
    }

    #[test]
    fn redacted_output_hides_seed() {
        let mut config = ServiceConfig::default();
        config.auth.signing_seed = Some("ab".repeat(32));
        let shown = config.to_toml_redacted().unwrap();
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains(&"ab".repeat(32)));
    }
}
