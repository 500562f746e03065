use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::CallMode;
use crate::proof_system::BackendKind;

pub const VERSION: &str = "v0.1.0";

#[derive(Parser)]
#[command(name = "verifier-pipeline", version = VERSION, about = "Prove, encode and verify zk proofs against an EVM verifier", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize configuration and home directory
    Init {
        /// Config file to create (defaults to ~/.verifier-pipeline/config/config.yaml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run the prove, encode and verify pipeline
    Run(RunArgs),

    /// Encode a proof and its public inputs for the verifier contract
    Encode(EncodeArgs),

    /// Show the service version
    Version {},
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Config file (defaults to ~/.verifier-pipeline/config/config.yaml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint of the chain hosting the verifier
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Address of the deployed verifier contract
    #[arg(long)]
    pub verifier_address: Option<String>,

    /// Upper bound for each external call, in seconds
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,

    /// Evaluate verify() with eth_call, or broadcast it as a transaction
    #[arg(long, value_enum)]
    pub mode: Option<CallMode>,

    /// Proof backend (noir or artifacts)
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Circuit input as name=value, repeatable
    #[arg(long = "input", short = 'i')]
    pub inputs: Vec<String>,

    /// JSON file holding an array of input maps; runs them as a batch
    #[arg(long, conflicts_with = "inputs")]
    pub batch: Option<PathBuf>,

    /// Maximum number of batch runs executed at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Noir project directory
    #[arg(long)]
    pub circuit_dir: Option<PathBuf>,

    /// Pre-generated proof file
    #[arg(long)]
    pub proof: Option<PathBuf>,

    /// Pre-generated public inputs file
    #[arg(long)]
    pub public_inputs: Option<PathBuf>,

    /// Number of public inputs inlined at the front of the proof
    #[arg(long)]
    pub inlined_public_inputs: Option<usize>,
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Proof file written by the prover
    #[arg(long)]
    pub proof: PathBuf,

    /// Public inputs file, binary 32-byte words or a JSON array
    #[arg(long, required_unless_present = "inlined_public_inputs")]
    pub public_inputs: Option<PathBuf>,

    /// Number of public inputs inlined at the front of the proof
    #[arg(long)]
    pub inlined_public_inputs: Option<usize>,

    /// Print ABI calldata for verify(bytes,bytes32[]) instead of cast arguments
    #[arg(long, default_value = "false")]
    pub calldata: bool,
}
