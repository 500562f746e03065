//! Noir toolchain backend: `nargo execute` followed by `bb prove`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use proof_codec::ProofBlob;
use tokio::process::Command;
use tracing::{debug, info};

use super::{BackendKind, CircuitInputs, ProofBackend, ProverOutput, PublicInputsArtifact};
use crate::error::{PipelineError, Result};

const PROVER_TOML: &str = "Prover.toml";
const TARGET_DIR: &str = "target";
const PROOF_FILE: &str = "proof";
const PUBLIC_INPUTS_FILE: &str = "public_inputs";

/// NoirBackend proves a Noir circuit project with `nargo` and Barretenberg.
///
/// Proofs are generated with the keccak oracle hash, which is what Solidity verifiers generated
/// by `bb write_solidity_verifier` check against.
pub struct NoirBackend {
    circuit_dir: PathBuf,
    nargo_bin: String,
    bb_bin: String,
}

impl NoirBackend {
    pub fn new(circuit_dir: PathBuf, nargo_bin: String, bb_bin: String) -> Self {
        Self {
            circuit_dir,
            nargo_bin,
            bb_bin,
        }
    }

    pub fn circuit_dir(&self) -> &Path {
        &self.circuit_dir
    }

    fn target_dir(&self) -> PathBuf {
        self.circuit_dir.join(TARGET_DIR)
    }

    /// Finds the compiled circuit in `target/`: the `<name>.json` bytecode with a `<name>.gz` witness.
    async fn find_compiled_circuit(&self) -> Result<(PathBuf, PathBuf)> {
        let target = self.target_dir();
        let mut entries = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| PipelineError::Prover(format!("cannot read {}: {e}", target.display())))?;

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PipelineError::Prover(format!("cannot read {}: {e}", target.display())))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let witness = path.with_extension("gz");
                if tokio::fs::try_exists(&witness).await.unwrap_or(false) {
                    found.push((path, witness));
                }
            }
        }

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(PipelineError::Prover(format!(
                "no compiled circuit with a witness found in {}",
                target.display()
            ))),
            n => Err(PipelineError::Prover(format!(
                "found {n} compiled circuits in {}, expected one",
                target.display()
            ))),
        }
    }
}

#[async_trait]
impl ProofBackend for NoirBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Noir
    }

    async fn prove(&self, inputs: &CircuitInputs) -> Result<ProverOutput> {
        if !inputs.is_empty() {
            let prover_toml = self.circuit_dir.join(PROVER_TOML);
            debug!("writing {} circuit inputs to {}", inputs.len(), prover_toml.display());
            tokio::fs::write(&prover_toml, inputs.to_prover_toml())
                .await
                .map_err(|e| PipelineError::Prover(format!("cannot write {}: {e}", prover_toml.display())))?;
        }

        info!("executing circuit in {}", self.circuit_dir.display());
        run_tool(&self.nargo_bin, &["execute"], &self.circuit_dir).await?;

        let (bytecode, witness) = self.find_compiled_circuit().await?;
        let target = self.target_dir();

        info!("proving {}", bytecode.display());
        let args = [
            OsStr::new("prove"),
            OsStr::new("-b"),
            bytecode.as_os_str(),
            OsStr::new("-w"),
            witness.as_os_str(),
            OsStr::new("-o"),
            target.as_os_str(),
            OsStr::new("--oracle_hash"),
            OsStr::new("keccak"),
        ];
        run_tool(&self.bb_bin, &args, &self.circuit_dir).await?;

        let proof = read_artifact(&target.join(PROOF_FILE)).await?;
        let public_inputs = read_artifact(&target.join(PUBLIC_INPUTS_FILE)).await?;

        Ok(ProverOutput {
            proof: ProofBlob::from(proof),
            public_inputs: PublicInputsArtifact::Raw(public_inputs),
        })
    }
}

/// Runs an external tool to completion, returning its stderr verbatim on failure.
///
/// The child is killed if the returned future is dropped, so timeouts and cancellation do not
/// leave it running.
pub(crate) async fn run_tool<S: AsRef<OsStr>>(program: &str, args: &[S], cwd: &Path) -> Result<String> {
    debug!("running {program} in {}", cwd.display());
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| PipelineError::Prover(format!("failed to start {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        return Err(PipelineError::Prover(format!("{program} exited with {}: {detail}", output.status)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub(crate) async fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::Prover(format!("failed to read artifact {}: {e}", path.display())))
}
