use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use proof_codec::VerifierCalldata;
use tracing::{info, warn};

use crate::client::{AlloyVerifierClient, VerifierClient};
use crate::commands::cli::{EncodeArgs, RunArgs, VERSION};
use crate::config::{Config, ConfigOverrides, EnvironmentConfig};
use crate::pipeline::{CancelHandle, ProofPipelineRunner};
use crate::proof_system::{BackendFactory, BackendKind, CircuitInputs, ProofBackend, ProverSettings};

pub fn init(config: Option<PathBuf>) -> Result<()> {
    let path = match config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    Config::init(&path)
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load_or_default(&config_path)?;
    apply_prover_args(&mut config.prover, &args);

    let overrides = ConfigOverrides {
        rpc_url: args.rpc_url.clone(),
        verifier_address: args.verifier_address.clone(),
        call_timeout_secs: args.timeout_secs,
        call_mode: args.mode,
    };
    let env = EnvironmentConfig::from_env(&overrides, &config)?;

    let backend: Arc<dyn ProofBackend> = Arc::from(BackendFactory::create(&config.prover)?);
    let client: Arc<dyn VerifierClient> = Arc::new(AlloyVerifierClient::new(&env)?);
    let runner = Arc::new(ProofPipelineRunner::from_config(backend, &env));

    info!(
        "running pipeline with {} backend against {} as {}",
        config.prover.backend, env.verifier_address, env.signer_address
    );

    let cancel = CancelHandle::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling runs that have not reached the verifier");
                cancel.cancel();
            }
        });
    }

    let results = match &args.batch {
        Some(path) => {
            let jobs = read_batch(path)?;
            let concurrency = args.concurrency.unwrap_or(config.concurrency);
            let results = runner.run_batch(jobs, client, concurrency, cancel).await;
            println!("{}", serde_json::to_string_pretty(&results)?);
            results
        }
        None => {
            let inputs = CircuitInputs::from_pairs(&args.inputs)?;
            let result = runner.run_with_cancel(&inputs, client.as_ref(), &cancel).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            vec![result]
        }
    };

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        bail!("{failed} of {} pipeline runs failed", results.len());
    }
    Ok(())
}

pub async fn encode(args: EncodeArgs) -> Result<()> {
    let settings = ProverSettings {
        backend: BackendKind::Artifacts,
        proof_path: Some(args.proof),
        public_inputs_path: args.public_inputs,
        inlined_public_inputs: args.inlined_public_inputs,
        ..ProverSettings::default()
    };
    let backend = BackendFactory::create(&settings)?;
    let (proof, public_inputs) = backend.prove(&CircuitInputs::new()).await?.into_parts()?;
    let calldata = VerifierCalldata::new(&proof, &public_inputs)?;

    if args.calldata {
        println!("0x{}", hex::encode(calldata.abi_encode()));
    } else {
        for arg in calldata.cast_args() {
            println!("{arg}");
        }
    }
    Ok(())
}

pub fn version() {
    println!("version: {VERSION}");
}

/// Command line prover arguments take priority over `PROVER_BACKEND`, which beats the file.
fn apply_prover_args(settings: &mut ProverSettings, args: &RunArgs) {
    if let Some(backend) = args.backend.or_else(BackendKind::from_env) {
        settings.backend = backend;
    }
    if let Some(dir) = &args.circuit_dir {
        settings.circuit_dir = Some(dir.clone());
    }
    if let Some(path) = &args.proof {
        settings.proof_path = Some(path.clone());
    }
    if let Some(path) = &args.public_inputs {
        settings.public_inputs_path = Some(path.clone());
    }
    if args.inlined_public_inputs.is_some() {
        settings.inlined_public_inputs = args.inlined_public_inputs;
    }
}

fn read_batch(path: &Path) -> Result<Vec<CircuitInputs>> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read batch file {}", path.display()))?;
    serde_json::from_str(&json).context("Failed to parse batch file")
}
