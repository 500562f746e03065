//! Prove, encode and verify pipeline for EVM verifier contracts
//!
//! Drives an external prover, encodes its output with [`proof_codec`] and submits the result to
//! an on-chain verifier, attributing every failure to the stage it happened in.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod proof_system;
#[cfg(test)]
mod tests;

pub use client::{AlloyVerifierClient, CallMode, VerifierClient};
pub use config::{Config, ConfigOverrides, EnvironmentConfig, SecretKey};
pub use error::{ErrorKind, PipelineError, Result};
pub use pipeline::{CancelHandle, PipelineRunResult, ProofPipelineRunner, RunOutcome, RunState, Stage};
pub use proof_system::{BackendFactory, BackendKind, CircuitInputs, ProofBackend, ProverOutput};
