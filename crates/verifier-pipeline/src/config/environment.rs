use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::{Config, CALL_TIMEOUT_ENV, PRIVATE_KEY_ENV, RPC_URL_ENV, VERIFIER_ADDRESS_ENV};
use crate::client::CallMode;
use crate::error::{PipelineError, Result};

/// Timeout applied to each external call when none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// SecretKey holds the hex-encoded signing key.
///
/// Its `Debug` and `Display` output is always redacted, and it has no `Serialize` impl.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(hex_key: impl Into<String>) -> Self {
        Self(hex_key.into())
    }

    /// Parses the key into a local signer.
    ///
    /// The parse error is not forwarded since it may echo key material.
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        self.0
            .trim()
            .trim_start_matches("0x")
            .parse()
            .map_err(|_| PipelineError::InvalidConfig {
                field: "private_key",
                reason: "not a valid secp256k1 private key".to_string(),
            })
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Values given explicitly on the command line. These take priority over every other source.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub verifier_address: Option<String>,
    pub call_timeout_secs: Option<u64>,
    pub call_mode: Option<CallMode>,
}

/// EnvironmentConfig is the validated set of external parameters a pipeline run needs.
///
/// It is built once at startup and passed by reference; nothing in the pipeline reads process
/// environment after construction.
#[derive(Clone, Debug)]
pub struct EnvironmentConfig {
    pub rpc_url: Url,
    pub verifier_address: Address,
    pub private_key: SecretKey,
    /// Address derived from the signing key, safe to log.
    pub signer_address: Address,
    pub call_timeout: Duration,
    pub call_mode: CallMode,
}

impl EnvironmentConfig {
    /// Resolves the config from command line overrides, process environment and the config file.
    pub fn from_env(overrides: &ConfigOverrides, file: &Config) -> Result<Self> {
        Self::resolve(overrides, file, |key| std::env::var(key).ok())
    }

    /// Resolves the config with an explicit environment lookup.
    ///
    /// # Errors
    /// - [`PipelineError::MissingConfig`] naming the first absent required field.
    /// - [`PipelineError::InvalidConfig`] if a value is present but unusable.
    pub fn resolve<F>(overrides: &ConfigOverrides, file: &Config, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let rpc_url = overrides
            .rpc_url
            .clone()
            .or_else(|| lookup(RPC_URL_ENV))
            .or_else(|| file.rpc_url.clone())
            .ok_or(PipelineError::MissingConfig("rpc_url"))?;
        let rpc_url = parse_rpc_url(&rpc_url)?;

        let verifier_address = overrides
            .verifier_address
            .clone()
            .or_else(|| lookup(VERIFIER_ADDRESS_ENV))
            .or_else(|| file.verifier_address.clone())
            .ok_or(PipelineError::MissingConfig("verifier_address"))?;
        let verifier_address =
            Address::from_str(verifier_address.trim()).map_err(|e| PipelineError::InvalidConfig {
                field: "verifier_address",
                reason: e.to_string(),
            })?;

        let private_key = lookup(PRIVATE_KEY_ENV)
            .map(SecretKey::new)
            .or_else(|| file.private_key.clone())
            .ok_or(PipelineError::MissingConfig("private_key"))?;
        let signer_address = private_key.signer()?.address();

        let call_timeout_secs = match overrides.call_timeout_secs {
            Some(secs) => Some(secs),
            None => match lookup(CALL_TIMEOUT_ENV) {
                Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| PipelineError::InvalidConfig {
                    field: "call_timeout",
                    reason: format!("{raw:?}: {e}"),
                })?),
                None => file.call_timeout_secs,
            },
        };
        let call_timeout = match call_timeout_secs {
            Some(0) => {
                return Err(PipelineError::InvalidConfig {
                    field: "call_timeout",
                    reason: "must be greater than zero".to_string(),
                })
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_CALL_TIMEOUT,
        };

        let call_mode = overrides.call_mode.unwrap_or(file.call_mode);

        debug!(
            rpc_host = rpc_url.host_str().unwrap_or_default(),
            verifier = %verifier_address,
            signer = %signer_address,
            ?call_timeout,
            ?call_mode,
            "resolved environment config"
        );

        Ok(Self {
            rpc_url,
            verifier_address,
            private_key,
            signer_address,
            call_timeout,
            call_mode,
        })
    }
}

fn parse_rpc_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| PipelineError::InvalidConfig {
        field: "rpc_url",
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PipelineError::InvalidConfig {
            field: "rpc_url",
            reason: format!("unsupported scheme {other:?}, expected http or https"),
        }),
    }
}
