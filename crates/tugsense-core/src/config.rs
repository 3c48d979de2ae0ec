//! Completion configuration and precedence resolution.
//!
//! Settings are layered: built-in defaults, then a JSON config file, then
//! environment variables, then CLI flags. Each host-overridable value keeps
//! the [`ConfigSource`] it came from so `tugsense` can report why a value
//! is in effect.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the snippet file.
pub const ENV_SNIPPETS: &str = "TUGSENSE_SNIPPETS";

/// Environment variable holding the QML import path list (`:`-separated).
pub const ENV_IMPORT_PATHS: &str = "TUGSENSE_IMPORT_PATHS";

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`CompletionConfig`].
    #[error("invalid config file {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From the JSON config file.
    ConfigFile = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

// ============================================================================
// Completion Config
// ============================================================================

/// Tunables of the completion engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Minimum identifier length that opens completion without an operator.
    pub identifier_trigger_length: usize,
    /// Maximum nesting of macro expansions before expansion stops.
    pub max_macro_expansion_depth: usize,
    /// Class-name suffix whose generated slots are always enumerated
    /// (`Keys` for QML key handler companions). Empty disables the policy.
    pub keys_companion_suffix: String,
    /// Append `()` when committing a function item.
    pub auto_insert_parens: bool,
    /// Ordered QML import search path.
    pub import_paths: Vec<String>,
    /// Snippet definition file (JSON).
    pub snippets_path: Option<PathBuf>,
    /// Minimum parameter count for a function hint to be shown.
    pub min_hint_parameters: usize,
    /// Offer enumerator constants in unqualified C++ completion.
    pub enumerators_in_global: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            identifier_trigger_length: 3,
            max_macro_expansion_depth: 32,
            keys_companion_suffix: "Keys".to_string(),
            auto_insert_parens: true,
            import_paths: Vec::new(),
            snippets_path: None,
            min_hint_parameters: 1,
            enumerators_in_global: false,
        }
    }
}

impl CompletionConfig {
    /// Load a config file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: CompletionConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Invalid {
                path: display,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identifier_trigger_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "identifier_trigger_length".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_macro_expansion_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_macro_expansion_depth".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Precedence Resolution
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --snippets flag.
    pub snippets: Option<PathBuf>,
    /// --import-path flags, in order.
    pub import_paths: Vec<String>,
}

/// Configuration after applying every layer.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Effective configuration.
    pub config: CompletionConfig,
    /// Where the snippet path came from.
    pub snippets_path: ConfigValue<Option<PathBuf>>,
    /// Where the import path list came from.
    pub import_paths: ConfigValue<Vec<String>>,
}

impl ResolvedConfig {
    /// Resolve configuration from all sources, reading the process environment.
    pub fn resolve(
        config_file: Option<&Path>,
        cli_overrides: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with_env(config_file, cli_overrides, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env(
        config_file: Option<&Path>,
        cli_overrides: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut resolved = ResolvedConfig::defaults();

        if let Some(path) = config_file {
            resolved.apply_config_file(CompletionConfig::from_file(path)?);
        }
        resolved.apply_env_vars(env);
        resolved.apply_cli_overrides(cli_overrides);

        resolved.config.snippets_path = resolved.snippets_path.value.clone();
        resolved.config.import_paths = resolved.import_paths.value.clone();
        debug!(
            snippets_source = ?resolved.snippets_path.source,
            import_paths = resolved.import_paths.value.len(),
            "configuration resolved"
        );
        Ok(resolved)
    }

    fn defaults() -> Self {
        let config = CompletionConfig::default();
        ResolvedConfig {
            snippets_path: ConfigValue::new(config.snippets_path.clone(), ConfigSource::Default),
            import_paths: ConfigValue::new(config.import_paths.clone(), ConfigSource::Default),
            config,
        }
    }

    fn apply_config_file(&mut self, file: CompletionConfig) {
        if file.snippets_path.is_some() {
            self.snippets_path = self.snippets_path.clone().merge(ConfigValue::new(
                file.snippets_path.clone(),
                ConfigSource::ConfigFile,
            ));
        }
        if !file.import_paths.is_empty() {
            self.import_paths = self.import_paths.clone().merge(ConfigValue::new(
                file.import_paths.clone(),
                ConfigSource::ConfigFile,
            ));
        }
        self.config = file;
    }

    fn apply_env_vars(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(snippets) = env(ENV_SNIPPETS).filter(|s| !s.is_empty()) {
            self.snippets_path =
                ConfigValue::new(Some(PathBuf::from(snippets)), ConfigSource::EnvVar);
        }

        if let Some(paths) = env(ENV_IMPORT_PATHS) {
            let paths: Vec<String> = paths
                .split(':')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if !paths.is_empty() {
                self.import_paths = ConfigValue::new(paths, ConfigSource::EnvVar);
            }
        }
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(ref snippets) = overrides.snippets {
            self.snippets_path = ConfigValue::new(Some(snippets.clone()), ConfigSource::CliFlag);
        }

        if !overrides.import_paths.is_empty() {
            self.import_paths =
                ConfigValue::new(overrides.import_paths.clone(), ConfigSource::CliFlag);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
