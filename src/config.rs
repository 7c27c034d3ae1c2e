use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "NODESHADOW_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub output: OutputFormat,
    pub view: ViewConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_format: LogFormat::Text,
            output: OutputFormat::Table,
            view: ViewConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Age after which a node report is considered stale.
    pub timeout_secs: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl ViewConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("nodeshadow").join("config.yaml"))
    }
}

/// Load defaults, then the YAML file, then `NODESHADOW_*` environment
/// variables (`__` separates nested keys).
///
/// An explicit `path` must exist; the default path is optional.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    match path {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        None => {
            if let Ok(path) = Config::path() {
                if path.exists() {
                    figment = figment.merge(Yaml::file(path));
                }
            }
        }
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("loading configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = Figment::from(Serialized::defaults(Config::default()))
                .extract::<Config>()?;
            assert_eq!(config, Config::default());
            assert_eq!(config.view.timeout(), Duration::from_secs(60));
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                "log_level: debug\noutput: json\nview:\n  timeout_secs: 15\n",
            )?;
            jail.set_env("NODESHADOW_VIEW__TIMEOUT_SECS", "90");

            let config = load(Some(Path::new("config.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.output, OutputFormat::Json);
            assert_eq!(config.log_format, LogFormat::Text);
            assert_eq!(config.view.timeout_secs, 90);
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = load(Some(Path::new("absent.yaml"))).unwrap_err();
            assert!(err.to_string().contains("absent.yaml"));
            Ok(())
        });
    }
}
