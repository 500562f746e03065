use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::CallMode;
use crate::proof_system::ProverSettings;

pub mod environment;

pub use environment::{ConfigOverrides, EnvironmentConfig, SecretKey};

/// The default service home directory.
pub const APP_HOME: &str = ".verifier-pipeline";
/// The default configuration directory.
pub const CONFIG_DIR: &str = "config";
/// The default configuration file in YAML format.
pub const CONFIG_FILE: &str = "config.yaml";

pub const RPC_URL_ENV: &str = "RPC_URL";
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
pub const VERIFIER_ADDRESS_ENV: &str = "VERIFIER_ADDRESS";
pub const CALL_TIMEOUT_ENV: &str = "CALL_TIMEOUT_SECS";

/// Config is the on-disk YAML configuration.
///
/// Values here have the lowest priority: explicit command line arguments win, then environment
/// variables, then this file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RPC endpoint of the chain hosting the verifier contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,

    /// Address of the deployed verifier contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_address: Option<String>,

    /// Signing key. Read from the file if present, never written back.
    #[serde(skip_serializing)]
    pub private_key: Option<SecretKey>,

    /// Upper bound for each external call, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,

    /// Whether `verify` is evaluated with `eth_call` or broadcast as a transaction.
    pub call_mode: CallMode,

    /// Maximum number of pipeline runs executed at once in batch mode.
    pub concurrency: usize,

    /// Prover backend selection and its artifact locations.
    pub prover: ProverSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            verifier_address: None,
            private_key: None,
            call_timeout_secs: None,
            call_mode: CallMode::default(),
            concurrency: 4,
            prover: ProverSettings::default(),
        }
    }
}

impl Config {
    /// Returns the default application config path.
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow!("cannot find home directory"))?
            .join(APP_HOME)
            .join(CONFIG_DIR)
            .join(CONFIG_FILE))
    }

    /// Writes a default config file to `path` unless one already exists.
    pub fn init(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        if path.exists() {
            info!("config file already exists at {path:?}");
            return Ok(());
        }

        info!("creating default config at {path:?}");
        let yaml = serde_yaml::to_string(&Config::default())?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Loads the config from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("config file not found at {}", path.display()));
        }

        info!("reading config file at {}", path.display());
        let yaml = fs::read_to_string(path).context("Failed to read config file from path")?;
        let config = serde_yaml::from_str(&yaml).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Loads the config from `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::proof_system::BackendKind;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_DIR).join(CONFIG_FILE);

        Config::init(&path).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.call_mode, CallMode::Call);
        assert_eq!(config.prover.backend, BackendKind::Noir);
        assert!(config.rpc_url.is_none());
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "rpc_url: http://10.0.0.1:8545\n").unwrap();

        Config::init(&path).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.rpc_url.as_deref(), Some("http://10.0.0.1:8545"));
    }

    #[test]
    fn test_private_key_is_never_written() {
        let config = Config {
            private_key: Some(SecretKey::new("0x01")),
            ..Config::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("private_key"));
        assert!(!yaml.contains("0x01"));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(Config::load(&tmp.path().join("nope.yaml")).is_err());
        assert!(Config::load_or_default(&tmp.path().join("nope.yaml")).is_ok());
    }
}
