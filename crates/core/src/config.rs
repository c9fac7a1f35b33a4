//! TOML-based configuration for idproxy.
//!
//! A config file declares the attribute map to use and the ordered list of
//! response stages. Stage options are kept as a raw TOML table until the
//! stage is built, so each stage module validates its own options and a
//! missing option is reported against the stage that declared it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attribute_map::AttributeMap;
use crate::errors::ConfigError;
use crate::identity::NormalizerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level proxy configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub proxy: ProxySettings,

    /// Attribute map selection.
    #[serde(default)]
    pub attribute_map: AttributeMapConfig,

    /// Response stages, run in declaration order.
    #[serde(default)]
    pub response_stages: Vec<StageConfig>,
}

// ---------------------------------------------------------------------------
// Proxy
// ---------------------------------------------------------------------------

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute map
// ---------------------------------------------------------------------------

/// Which attribute map to load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeMapConfig {
    /// Path to a TOML attribute map. The built-in AWS map is used when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Response stages
// ---------------------------------------------------------------------------

/// Stage implementations that can be declared in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageModule {
    /// Rewrite `user@domain` subjects into `DOMAIN\user`.
    ConvertUpnToSam,
}

impl StageModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConvertUpnToSam => "convert_upn_to_sam",
        }
    }
}

/// One `[[response_stages]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique stage name, used in logs and errors.
    pub name: String,

    /// Which implementation to build.
    pub module: StageModule,

    /// Module-specific options.
    #[serde(default)]
    pub config: toml::Table,
}

impl StageConfig {
    /// Interpret `config` as [`NormalizerConfig`].
    ///
    /// Fails when `domain_to_upper` is missing, is not a boolean, or when
    /// unknown options are present.
    pub fn normalizer_config(&self) -> Result<NormalizerConfig, ConfigError> {
        toml::Value::Table(self.config.clone())
            .try_into::<NormalizerConfig>()
            .map_err(|e| ConfigError::InvalidValue {
                field: format!("response_stages.{}.config", self.name),
                detail: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl ProxyConfig {
    /// Load a [`ProxyConfig`] from a TOML file at the given path.
    ///
    /// This does **not** validate stage options -- call
    /// [`validate`](Self::validate) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;

        debug!(
            stages = config.response_stages.len(),
            "configuration parsed successfully"
        );
        Ok(config)
    }

    /// Parse a [`ProxyConfig`] from TOML text without validating it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate settings and every stage's options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.proxy.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "proxy.log_level".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.proxy.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        let mut seen = HashSet::new();
        for (index, stage) in self.response_stages.iter().enumerate() {
            if stage.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("response_stages[{}].name", index),
                    detail: "stage name must not be empty".into(),
                });
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("response_stages[{}].name", index),
                    detail: format!("duplicate stage name '{}'", stage.name),
                });
            }
            match stage.module {
                StageModule::ConvertUpnToSam => {
                    stage.normalizer_config()?;
                }
            }
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configured attribute map, or the built-in AWS map.
    pub fn attribute_map(&self) -> Result<AttributeMap, ConfigError> {
        match &self.attribute_map.file {
            Some(path) => Ok(AttributeMap::load(path)?),
            None => {
                debug!("no attribute map file configured, using built-in AWS map");
                Ok(AttributeMap::aws())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AttributeMapError;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[proxy]
log_level = "debug"

[[response_stages]]
name = "upn_to_sam"
module = "convert_upn_to_sam"

[response_stages.config]
domain_to_upper = true
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config = ProxyConfig::from_toml_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.proxy.log_level, "debug");
        assert!(config.attribute_map.file.is_none());
        assert_eq!(config.response_stages.len(), 1);
        assert_eq!(config.response_stages[0].module, StageModule::ConvertUpnToSam);

        let normalizer = config.response_stages[0].normalizer_config().unwrap();
        assert!(normalizer.domain_to_upper);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = ProxyConfig::load_and_validate(&path).expect("load_and_validate failed");
        assert_eq!(config.response_stages[0].name, "upn_to_sam");
    }

    #[test]
    fn test_file_not_found() {
        let result = ProxyConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::from_toml_str("").unwrap();
        assert_eq!(config.proxy.log_level, "info");
        assert!(config.response_stages.is_empty());
        config.validate().unwrap();
        assert_eq!(config.attribute_map().unwrap(), AttributeMap::aws());
    }

    #[test]
    fn test_missing_domain_to_upper_fails_validation() {
        let toml_str = r#"
[[response_stages]]
name = "upn_to_sam"
module = "convert_upn_to_sam"
"#;
        let config = ProxyConfig::from_toml_str(toml_str).unwrap();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, ref detail })
                if field == "response_stages.upn_to_sam.config" && detail.contains("domain_to_upper")
        ));
    }

    #[test]
    fn test_wrong_type_domain_to_upper_fails_validation() {
        let toml_str = r#"
[[response_stages]]
name = "upn_to_sam"
module = "convert_upn_to_sam"
config = { domain_to_upper = "yes" }
"#;
        let config = ProxyConfig::from_toml_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_module_is_parse_error() {
        let toml_str = r#"
[[response_stages]]
name = "x"
module = "load_python_plugin"
"#;
        let result = ProxyConfig::from_toml_str(toml_str);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_stage_names() {
        let toml_str = r#"
[[response_stages]]
name = "upn"
module = "convert_upn_to_sam"
config = { domain_to_upper = true }

[[response_stages]]
name = "upn"
module = "convert_upn_to_sam"
config = { domain_to_upper = false }
"#;
        let config = ProxyConfig::from_toml_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "response_stages[1].name"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_stage_name() {
        let toml_str = r#"
[[response_stages]]
name = " "
module = "convert_upn_to_sam"
config = { domain_to_upper = true }
"#;
        let config = ProxyConfig::from_toml_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = ProxyConfig::from_toml_str(sample_toml()).unwrap();
        config.proxy.log_level = "loud".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "proxy.log_level"
        ));

        config.proxy.log_level = "WARN".into();
        config.validate().unwrap();
    }

    #[test]
    fn test_attribute_map_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let map_path = dir.path().join("aws.toml");
        AttributeMap::aws().save(&map_path).unwrap();

        let mut config = ProxyConfig::default();
        config.attribute_map.file = Some(map_path);
        assert!(config.attribute_map().unwrap().carries_subject_attribute());

        config.attribute_map.file = Some(dir.path().join("missing.toml"));
        assert!(matches!(
            config.attribute_map(),
            Err(ConfigError::AttributeMap(AttributeMapError::MapFileError { .. }))
        ));
    }
}
