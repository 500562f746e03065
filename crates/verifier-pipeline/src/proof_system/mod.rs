//! Proof backend abstraction layer for the external proving tools.
//!
//! The pipeline treats the prover as a black box returning a proof and its ordered public
//! inputs. Backends either drive the Noir toolchain or read artifacts generated beforehand.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use proof_codec::{parse_public_inputs, ProofBlob, PublicInput};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub mod artifacts;
pub mod noir;

pub use artifacts::ArtifactBackend;
pub use noir::NoirBackend;

/// Environment variable overriding the configured backend.
pub const PROVER_BACKEND_ENV: &str = "PROVER_BACKEND";

/// BackendKind identifies which proof backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Run `nargo execute` and `bb prove` in a circuit project
    #[default]
    Noir,
    /// Read a proof and public inputs generated beforehand
    Artifacts,
}

impl BackendKind {
    /// Returns the backend named by `PROVER_BACKEND`, if set and valid.
    pub fn from_env() -> Option<Self> {
        std::env::var(PROVER_BACKEND_ENV).ok().and_then(|s| s.parse().ok())
    }
}

impl FromStr for BackendKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "noir" => Ok(Self::Noir),
            "artifacts" => Ok(Self::Artifacts),
            other => Err(PipelineError::InvalidConfig {
                field: "prover.backend",
                reason: format!("unknown backend {other:?}, available options: noir, artifacts"),
            }),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Noir => write!(f, "noir"),
            Self::Artifacts => write!(f, "artifacts"),
        }
    }
}

/// ProverSettings selects the backend and tells it where to find its inputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverSettings {
    pub backend: BackendKind,

    /// Noir project directory containing `Nargo.toml`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_dir: Option<PathBuf>,

    pub nargo_bin: String,

    pub bb_bin: String,

    /// Pre-generated proof file, for the artifacts backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_path: Option<PathBuf>,

    /// Pre-generated public inputs file (binary words or JSON), for the artifacts backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_inputs_path: Option<PathBuf>,

    /// Number of public inputs inlined at the front of the proof, for older `bb` output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inlined_public_inputs: Option<usize>,
}

impl Default for ProverSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            circuit_dir: None,
            nargo_bin: "nargo".into(),
            bb_bin: "bb".into(),
            proof_path: None,
            public_inputs_path: None,
            inlined_public_inputs: None,
        }
    }
}

/// CircuitInputs maps circuit parameter names to their values, as written to `Prover.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct CircuitInputs(BTreeMap<String, String>);

impl TryFrom<BTreeMap<String, String>> for CircuitInputs {
    type Error = PipelineError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self> {
        let mut inputs = Self::new();
        for (name, value) in &map {
            inputs.insert(name, value)?;
        }
        Ok(inputs)
    }
}

impl From<CircuitInputs> for BTreeMap<String, String> {
    fn from(inputs: CircuitInputs) -> Self {
        inputs.0
    }
}

fn invalid_input(reason: String) -> PipelineError {
    PipelineError::InvalidConfig {
        field: "circuit_inputs",
        reason,
    }
}

impl CircuitInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `name=value` pairs such as those given on the command line.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inputs = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid_input(format!("circuit input {pair:?} is not of the form name=value")))?;
            inputs.insert(name.trim(), value.trim())?;
        }
        Ok(inputs)
    }

    /// Adds an input. Array values are given as a TOML array literal, e.g. `["1", "2"]`.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<()> {
        let valid_name = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(invalid_input(format!("invalid circuit input name {name:?}")));
        }
        let is_array = value.starts_with('[') && value.ends_with(']');
        let unsafe_char = if is_array {
            value.contains(['\n', '\r'])
        } else {
            value.contains(['"', '\\', '\n', '\r'])
        };
        if unsafe_char {
            return Err(invalid_input(format!("invalid value for circuit input {name:?}")));
        }
        self.0.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the inputs in `Prover.toml` form, one `name = value` line per input.
    pub fn to_prover_toml(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| {
                if value.starts_with('[') {
                    format!("{name} = {value}\n")
                } else {
                    format!("{name} = \"{value}\"\n")
                }
            })
            .collect()
    }
}

/// PublicInputsArtifact is the public-input half of a prover's output, before parsing.
///
/// Parsing happens in the encoding stage, so a malformed artifact is attributed there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicInputsArtifact {
    /// Already parsed values.
    Parsed(Vec<PublicInput>),
    /// Raw file contents: concatenated 32-byte words, or a JSON array.
    Raw(Vec<u8>),
    /// This many 32-byte words are inlined at the front of the proof.
    Inlined(usize),
}

/// ProverOutput is the pair of artifacts one proving run produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProverOutput {
    pub proof: ProofBlob,
    pub public_inputs: PublicInputsArtifact,
}

impl ProverOutput {
    pub fn new(proof: ProofBlob, public_inputs: Vec<PublicInput>) -> Self {
        Self {
            proof,
            public_inputs: PublicInputsArtifact::Parsed(public_inputs),
        }
    }

    /// Resolves the artifacts into the proof bytes and the ordered public inputs.
    pub fn into_parts(self) -> proof_codec::Result<(ProofBlob, Vec<PublicInput>)> {
        match self.public_inputs {
            PublicInputsArtifact::Parsed(inputs) => Ok((self.proof, inputs)),
            PublicInputsArtifact::Raw(bytes) => Ok((self.proof, parse_public_inputs(&bytes)?)),
            PublicInputsArtifact::Inlined(count) => {
                let (inputs, proof) = self.proof.split_inlined_public_inputs(count)?;
                Ok((proof, inputs))
            }
        }
    }
}

/// ProofBackend is the trait the external proving tools are wrapped in.
#[async_trait]
pub trait ProofBackend: Send + Sync {
    /// Get the kind of this backend
    fn kind(&self) -> BackendKind;

    /// Produce a proof and its public inputs for the given circuit inputs.
    ///
    /// Failures of the external tool are returned as [`PipelineError::Prover`] with the tool's
    /// own output.
    async fn prove(&self, inputs: &CircuitInputs) -> Result<ProverOutput>;
}

/// BackendFactory creates the configured proof backend
pub struct BackendFactory;

impl BackendFactory {
    /// Create a proof backend from the prover settings.
    ///
    /// # Errors
    /// - [`PipelineError::MissingConfig`] if the selected backend lacks a required path.
    pub fn create(settings: &ProverSettings) -> Result<Box<dyn ProofBackend>> {
        match settings.backend {
            BackendKind::Noir => {
                let circuit_dir = settings
                    .circuit_dir
                    .clone()
                    .ok_or(PipelineError::MissingConfig("prover.circuit_dir"))?;
                Ok(Box::new(NoirBackend::new(
                    circuit_dir,
                    settings.nargo_bin.clone(),
                    settings.bb_bin.clone(),
                )))
            }
            BackendKind::Artifacts => {
                let proof_path = settings
                    .proof_path
                    .clone()
                    .ok_or(PipelineError::MissingConfig("prover.proof_path"))?;
                let backend = match (settings.inlined_public_inputs, settings.public_inputs_path.clone()) {
                    (Some(count), _) => ArtifactBackend::with_inlined_inputs(proof_path, count),
                    (None, Some(path)) => ArtifactBackend::new(proof_path, path),
                    (None, None) => return Err(PipelineError::MissingConfig("prover.public_inputs_path")),
                };
                Ok(Box::new(backend))
            }
        }
    }
}
