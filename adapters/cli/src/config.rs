//! Engine configuration loaded from an optional TOML file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use sokobots_protocol::{DispatcherSettings, DEFAULT_MAX_FRAME_LEN};

const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_STEP_BUDGET: u64 = 1000;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("failed to parse config TOML: {source}")]
    Toml {
        /// Underlying parse failure.
        #[from]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid config value for `{key}`: {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Why the value was refused.
        reason: String,
    },
}

/// Settings for a running engine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct EngineConfig {
    /// Socket address the stream binding listens on.
    pub(crate) listen: String,
    /// Default tracing filter, overridden by `RUST_LOG`.
    pub(crate) log_filter: String,
    /// Directory relative level paths resolve against.
    pub(crate) levels_dir: Option<PathBuf>,
    /// Step budget for levels without `max_steps`; `0` disables it.
    pub(crate) default_step_budget: u64,
    /// Largest accepted frame or line on either binding, in bytes.
    pub(crate) max_frame_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_owned(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            levels_dir: None,
            default_step_budget: DEFAULT_STEP_BUDGET,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parses configuration from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_len == 0 {
            return Err(ConfigError::Invalid {
                key: "max_frame_len",
                reason: "must be positive".into(),
            });
        }
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "listen",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Settings handed to the request dispatcher.
    pub(crate) fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            levels_dir: self.levels_dir.clone(),
            default_step_budget: (self.default_step_budget > 0).then_some(self.default_step_budget),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = EngineConfig::parse("").expect("empty config parses");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.listen, "127.0.0.1:5000");
        assert_eq!(config.max_frame_len, 16 * 1024 * 1024);
        assert_eq!(
            config.dispatcher_settings().default_step_budget,
            Some(1000)
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let config = EngineConfig::parse(
            r#"
listen = "0.0.0.0:7000"
log_filter = "sokobots_protocol=debug"
levels_dir = "levels"
default_step_budget = 0
"#,
        )
        .expect("config parses");

        assert_eq!(config.listen, "0.0.0.0:7000");
        assert_eq!(config.log_filter, "sokobots_protocol=debug");
        let settings = config.dispatcher_settings();
        assert_eq!(settings.levels_dir, Some(PathBuf::from("levels")));
        assert_eq!(settings.default_step_budget, None, "zero disables the budget");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = EngineConfig::parse("listen_addr = \"x\"").expect_err("unknown key");
        assert!(matches!(error, ConfigError::Toml { .. }));
    }

    #[test]
    fn zero_frame_limit_is_invalid() {
        let error = EngineConfig::parse("max_frame_len = 0").expect_err("zero limit");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                key: "max_frame_len",
                ..
            }
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let error = EngineConfig::from_file(Path::new("/nonexistent/sokobots.toml"))
            .expect_err("missing file");
        assert!(error.to_string().contains("/nonexistent/sokobots.toml"));
    }
}
