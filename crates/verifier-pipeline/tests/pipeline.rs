use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proof_codec::{decode_proof, decode_public_input, VerifierCalldata};
use tempfile::TempDir;
use verifier_pipeline::config::Config;
use verifier_pipeline::{
    BackendFactory, BackendKind, CallMode, CircuitInputs, ErrorKind, ProofBackend, ProofPipelineRunner, Stage,
    VerifierClient,
};

/// Checks the calldata the way the on-chain verifier would see it, then accepts.
struct DecodingVerifier;

#[async_trait]
impl VerifierClient for DecodingVerifier {
    fn call_mode(&self) -> CallMode {
        CallMode::Call
    }

    async fn verify(&self, calldata: &VerifierCalldata) -> verifier_pipeline::Result<bool> {
        let proof = decode_proof(calldata.proof().as_str())?;
        let first = decode_public_input(calldata.public_inputs()[0].as_str())?;
        Ok(proof.as_bytes() == [0xde, 0xad] && first.to::<u64>() == 13)
    }
}

fn write_artifacts(dir: &TempDir, public_inputs: &[u8]) -> Config {
    let proof_path = dir.path().join("proof");
    let public_inputs_path = dir.path().join("public_inputs");
    fs::write(&proof_path, [0xde, 0xad]).unwrap();
    fs::write(&public_inputs_path, public_inputs).unwrap();

    let yaml = format!(
        "prover:\n  backend: artifacts\n  proof_path: {}\n  public_inputs_path: {}\n",
        proof_path.display(),
        public_inputs_path.display()
    );
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, yaml).unwrap();
    Config::load(&config_path).unwrap()
}

#[tokio::test]
async fn test_artifacts_run_end_to_end() {
    let tmp = TempDir::new().expect("cannot create temp directory");
    let mut words = vec![0u8; 64];
    words[31] = 13;
    words[63] = 14;
    let config = write_artifacts(&tmp, &words);
    assert_eq!(config.prover.backend, BackendKind::Artifacts);

    let backend: Arc<dyn ProofBackend> = Arc::from(BackendFactory::create(&config.prover).unwrap());
    let runner = ProofPipelineRunner::new(backend, Duration::from_secs(5));
    let result = runner.run(&CircuitInputs::new(), &DecodingVerifier).await;

    assert!(result.is_success(), "{result}");
    assert_eq!(result.verified_result(), Some(true));
}

#[tokio::test]
async fn test_json_public_inputs_are_accepted() {
    let tmp = TempDir::new().expect("cannot create temp directory");
    let config = write_artifacts(&tmp, br#"["13", "0x0e"]"#);

    let backend: Arc<dyn ProofBackend> = Arc::from(BackendFactory::create(&config.prover).unwrap());
    let runner = ProofPipelineRunner::new(backend, Duration::from_secs(5));
    let result = runner.run(&CircuitInputs::new(), &DecodingVerifier).await;

    assert_eq!(result.verified_result(), Some(true));
}

#[tokio::test]
async fn test_missing_proof_file_fails_proving() {
    let tmp = TempDir::new().expect("cannot create temp directory");
    let config = write_artifacts(&tmp, &[0u8; 32]);
    fs::remove_file(tmp.path().join("proof")).unwrap();

    let backend: Arc<dyn ProofBackend> = Arc::from(BackendFactory::create(&config.prover).unwrap());
    let runner = ProofPipelineRunner::new(backend, Duration::from_secs(5));
    let result = runner.run(&CircuitInputs::new(), &DecodingVerifier).await;

    assert_eq!(result.stage(), Stage::Proving);
    assert_eq!(result.error_kind(), Some(ErrorKind::Prover));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["stage"], "proving");
    assert_eq!(json["outcome"]["kind"], "prover");
}
