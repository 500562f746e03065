use std::path::PathBuf;

use async_trait::async_trait;
use proof_codec::ProofBlob;
use tracing::{debug, info};

use super::noir::read_artifact;
use super::{BackendKind, CircuitInputs, ProofBackend, ProverOutput, PublicInputsArtifact};
use crate::error::Result;

enum PublicInputsSource {
    File(PathBuf),
    Inlined(usize),
}

/// ArtifactBackend serves a proof generated outside this process, e.g. by running `bb prove` by hand.
///
/// Circuit inputs are ignored; the files are read fresh on every call.
pub struct ArtifactBackend {
    proof_path: PathBuf,
    public_inputs: PublicInputsSource,
}

impl ArtifactBackend {
    pub fn new(proof_path: PathBuf, public_inputs_path: PathBuf) -> Self {
        Self {
            proof_path,
            public_inputs: PublicInputsSource::File(public_inputs_path),
        }
    }

    /// For proofs that carry `count` public inputs inlined at their front.
    pub fn with_inlined_inputs(proof_path: PathBuf, count: usize) -> Self {
        Self {
            proof_path,
            public_inputs: PublicInputsSource::Inlined(count),
        }
    }
}

#[async_trait]
impl ProofBackend for ArtifactBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Artifacts
    }

    async fn prove(&self, inputs: &CircuitInputs) -> Result<ProverOutput> {
        if !inputs.is_empty() {
            debug!("artifact backend ignores {} circuit inputs", inputs.len());
        }

        info!("reading proof from {}", self.proof_path.display());
        let proof = ProofBlob::from(read_artifact(&self.proof_path).await?);

        let public_inputs = match &self.public_inputs {
            PublicInputsSource::File(path) => PublicInputsArtifact::Raw(read_artifact(path).await?),
            PublicInputsSource::Inlined(count) => PublicInputsArtifact::Inlined(*count),
        };

        Ok(ProverOutput { proof, public_inputs })
    }
}
