//! EVM client for calling a deployed verifier contract
//!
//! A verifier exposes `verify(bytes, bytes32[]) -> bool`. The call is either evaluated with
//! `eth_call`, which has no on-chain effect, or broadcast as a signed transaction.

use std::fmt;
use std::str::FromStr;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{Panic, Revert, SolCall, SolError};
use alloy::transports::TransportError;
use async_trait::async_trait;
use clap::ValueEnum;
use proof_codec::{IVerifier, VerifierCalldata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EnvironmentConfig;
use crate::error::{PipelineError, Result};

/// CallMode selects how `verify` is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Read-only `eth_call`
    #[default]
    Call,
    /// Signed transaction, waits for the receipt
    Send,
}

impl FromStr for CallMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "send" => Ok(Self::Send),
            other => Err(PipelineError::InvalidConfig {
                field: "call_mode",
                reason: format!("unknown call mode {other:?}, available options: call, send"),
            }),
        }
    }
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Send => write!(f, "send"),
        }
    }
}

/// VerifierClient submits encoded proofs to a verifier contract.
///
/// Implementations hold no per-run state and may be shared between concurrent runs.
#[async_trait]
pub trait VerifierClient: Send + Sync {
    fn call_mode(&self) -> CallMode;

    /// Calls `verify` and returns its boolean result.
    ///
    /// # Errors
    /// - [`PipelineError::Revert`] if the call reverted, with the decoded reason.
    /// - [`PipelineError::Network`] for transport failures.
    async fn verify(&self, calldata: &VerifierCalldata) -> Result<bool>;
}

/// AlloyVerifierClient talks to the verifier over JSON-RPC with an alloy provider.
pub struct AlloyVerifierClient {
    provider: DynProvider,
    verifier: Address,
    from: Address,
    mode: CallMode,
}

impl AlloyVerifierClient {
    /// Create a new client from the resolved environment config.
    pub fn new(config: &EnvironmentConfig) -> Result<Self> {
        let signer = config.private_key.signer()?;
        let from = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(config.rpc_url.clone())
            .erased();

        debug!(
            "created verifier client for {} on {}",
            config.verifier_address,
            config.rpc_url.host_str().unwrap_or_default()
        );

        Ok(Self::from_provider(provider, config.verifier_address, from, config.call_mode))
    }

    pub(crate) fn from_provider(provider: DynProvider, verifier: Address, from: Address, mode: CallMode) -> Self {
        Self {
            provider,
            verifier,
            from,
            mode,
        }
    }

    /// Get the verifier contract address
    pub fn verifier_address(&self) -> Address {
        self.verifier
    }

    fn request(&self, input: Bytes) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.verifier)
            .with_input(input)
    }

    async fn eth_call(&self, input: Bytes) -> Result<bool> {
        let output = self.provider.call(self.request(input)).await.map_err(classify_rpc_error)?;
        decode_verify_output(&output, self.verifier)
    }

    /// Broadcasts `verify` only once an `eth_call` of the same request returned `true`.
    ///
    /// A verifier answering `false` does not revert, so a mined transaction alone says nothing
    /// about the verdict.
    async fn send_transaction(&self, input: Bytes) -> Result<bool> {
        if !self.eth_call(input.clone()).await? {
            info!("verify returned false on {}, transaction not broadcast", self.verifier);
            return Ok(false);
        }

        let pending = self
            .provider
            .send_transaction(self.request(input))
            .await
            .map_err(classify_rpc_error)?;

        let tx_hash = *pending.tx_hash();
        info!("verify transaction broadcast: {tx_hash}");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| PipelineError::Network(format!("failed to get receipt for {tx_hash}: {e}")))?;

        if !receipt.status() {
            return Err(PipelineError::Revert(format!("transaction {tx_hash} reverted")));
        }
        Ok(true)
    }
}

#[async_trait]
impl VerifierClient for AlloyVerifierClient {
    fn call_mode(&self) -> CallMode {
        self.mode
    }

    async fn verify(&self, calldata: &VerifierCalldata) -> Result<bool> {
        let input = calldata.abi_encode();
        debug!(
            "calling verify on {} ({} proof bytes, {} public inputs, mode {})",
            self.verifier,
            calldata.proof_bytes().len(),
            calldata.public_inputs().len(),
            self.mode
        );

        match self.mode {
            CallMode::Call => self.eth_call(input).await,
            CallMode::Send => self.send_transaction(input).await,
        }
    }
}

/// Decodes the return data of `verify`.
///
/// Empty or short return data usually means there is no contract at the address; it is reported
/// as a revert since the call produced no verification result.
pub(crate) fn decode_verify_output(output: &[u8], verifier: Address) -> Result<bool> {
    IVerifier::verifyCall::abi_decode_returns(output).map_err(|e| {
        PipelineError::Revert(format!(
            "verify() on {verifier} returned {} undecodable bytes: {e}",
            output.len()
        ))
    })
}

/// Maps a JSON-RPC failure onto the pipeline error taxonomy.
///
/// Node responses that carry revert data or an `execution reverted` message are reverts;
/// anything else the transport or node reports is a network error.
pub(crate) fn classify_rpc_error(err: TransportError) -> PipelineError {
    if let Some(payload) = err.as_error_resp() {
        if let Some(data) = payload.as_revert_data() {
            return PipelineError::Revert(describe_revert(&data));
        }
        if payload.message.to_lowercase().contains("revert") {
            return PipelineError::Revert(payload.message.to_string());
        }
        warn!("rpc error {}: {}", payload.code, payload.message);
        return PipelineError::Network(format!("rpc error {}: {}", payload.code, payload.message));
    }
    PipelineError::Network(err.to_string())
}

fn describe_revert(data: &[u8]) -> String {
    if data.is_empty() {
        return "reverted without reason".to_string();
    }
    if let Ok(revert) = Revert::abi_decode(data) {
        return revert.reason;
    }
    if let Ok(panic) = Panic::abi_decode(data) {
        return format!("panic code {:#x}", panic.code);
    }
    format!("custom error 0x{}", hex::encode(data))
}
