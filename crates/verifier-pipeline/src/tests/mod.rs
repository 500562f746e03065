//! Pipeline scenario tests
//!
//! These drive the runner with in-process prover and verifier doubles, so no toolchain or chain
//! is needed.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use proof_codec::{ProofBlob, PublicInput, VerifierCalldata};
    use tokio::sync::Notify;

    use crate::client::{CallMode, VerifierClient};
    use crate::error::{ErrorKind, PipelineError, Result};
    use crate::pipeline::{CancelHandle, ProofPipelineRunner, RunOutcome, Stage};
    use crate::proof_system::{BackendKind, CircuitInputs, ProofBackend, ProverOutput, PublicInputsArtifact};

    const LONG: Duration = Duration::from_secs(60);

    enum Prover {
        Output { proof: Vec<u8>, inputs: Vec<PublicInput> },
        Raw(Vec<u8>),
        /// Proves `x` as the single public input after a delay that shrinks as `x` grows.
        EchoX,
        Fail(&'static str),
        Hang,
    }

    struct MockBackend {
        behaviour: Prover,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockBackend {
        fn new(behaviour: Prover) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProofBackend for MockBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Artifacts
        }

        async fn prove(&self, inputs: &CircuitInputs) -> Result<ProverOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Prover::Output { proof, inputs } => Ok(ProverOutput::new(ProofBlob::from(proof.clone()), inputs.clone())),
                Prover::Raw(bytes) => Ok(ProverOutput {
                    proof: ProofBlob::from(vec![0x0d]),
                    public_inputs: PublicInputsArtifact::Raw(bytes.clone()),
                }),
                Prover::EchoX => {
                    let x: u64 = inputs.get("x").and_then(|v| v.parse().ok()).unwrap_or_default();
                    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(60u64.saturating_sub(x * 10))).await;
                    self.in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(ProverOutput::new(ProofBlob::from(vec![0x0d]), vec![PublicInput::from(x)]))
                }
                Prover::Fail(stderr) => Err(PipelineError::Prover(stderr.to_string())),
                Prover::Hang => {
                    tokio::time::sleep(LONG).await;
                    Err(PipelineError::Prover("woke up".into()))
                }
            }
        }
    }

    enum Verifier {
        Answer(bool),
        Revert(&'static str),
        Unreachable,
        Slow(Duration),
        /// Accepts proofs whose first public input is even.
        Parity,
    }

    struct MockVerifier {
        behaviour: Verifier,
        calls: AtomicUsize,
        entered: Notify,
        seen: Mutex<Vec<[String; 2]>>,
    }

    impl MockVerifier {
        fn new(behaviour: Verifier) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
                entered: Notify::new(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VerifierClient for MockVerifier {
        fn call_mode(&self) -> CallMode {
            CallMode::Call
        }

        async fn verify(&self, calldata: &VerifierCalldata) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(calldata.cast_args());
            self.entered.notify_one();
            match &self.behaviour {
                Verifier::Answer(valid) => Ok(*valid),
                Verifier::Revert(reason) => Err(PipelineError::Revert(reason.to_string())),
                Verifier::Unreachable => Err(PipelineError::Network("connection refused".into())),
                Verifier::Slow(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(true)
                }
                Verifier::Parity => {
                    let words = calldata.public_input_words();
                    Ok(words.first().is_some_and(|w| w[31] % 2 == 0))
                }
            }
        }
    }

    fn thirteen() -> Prover {
        Prover::Output {
            proof: vec![0x0d],
            inputs: vec![PublicInput::from(13u64)],
        }
    }

    fn runner(backend: Arc<MockBackend>, timeout: Duration) -> ProofPipelineRunner {
        ProofPipelineRunner::new(backend, timeout)
    }

    #[tokio::test]
    async fn test_run_reaches_verifier_with_encoded_arguments() {
        let verifier = MockVerifier::new(Verifier::Answer(true));
        let result = runner(MockBackend::new(thirteen()), LONG)
            .run(&CircuitInputs::new(), verifier.as_ref())
            .await;

        assert!(result.is_success());
        assert_eq!(result.verified_result(), Some(true));
        assert_eq!(result.stage(), Stage::Calling);

        let seen = verifier.seen.lock().unwrap();
        assert_eq!(seen[0][0], "0x0d");
        assert_eq!(seen[0][1], format!("[0x{}0d]", "0".repeat(62)));
    }

    #[tokio::test]
    async fn test_rejected_proof_is_a_successful_run() {
        let verifier = MockVerifier::new(Verifier::Answer(false));
        let result = runner(MockBackend::new(thirteen()), LONG)
            .run(&CircuitInputs::new(), verifier.as_ref())
            .await;

        assert!(result.is_success());
        assert_eq!(result.outcome(), &RunOutcome::Verified { valid: false });
    }

    #[tokio::test]
    async fn test_prover_failure_halts_before_verifier() {
        let stderr = "nargo exited with exit status: 1: error: Failed constraint";
        let verifier = MockVerifier::new(Verifier::Answer(true));
        let result = runner(MockBackend::new(Prover::Fail(stderr)), LONG)
            .run(&CircuitInputs::new(), verifier.as_ref())
            .await;

        assert_eq!(result.stage(), Stage::Proving);
        assert_eq!(result.error_kind(), Some(ErrorKind::Prover));
        assert!(result.error_message().unwrap().contains(stderr));
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_revert_is_attributed_to_calling() {
        let verifier = MockVerifier::new(Verifier::Revert("SumcheckFailed"));
        let result = runner(MockBackend::new(thirteen()), LONG)
            .run(&CircuitInputs::new(), verifier.as_ref())
            .await;

        assert!(!result.is_success());
        assert_eq!(result.stage(), Stage::Calling);
        assert_eq!(result.error_kind(), Some(ErrorKind::Revert));
        assert_eq!(result.error_kind().unwrap().to_string(), "RevertError");
        assert!(result.error_message().unwrap().contains("SumcheckFailed"));
        assert_eq!(result.verified_result(), None);
    }

    #[tokio::test]
    async fn test_oversized_public_input_fails_encoding() {
        let backend = MockBackend::new(Prover::Output {
            proof: vec![0x0d],
            inputs: vec![PublicInput::from(1u64), PublicInput::from_be_slice(&[1; 33])],
        });
        let verifier = MockVerifier::new(Verifier::Answer(true));
        let result = runner(backend, LONG).run(&CircuitInputs::new(), verifier.as_ref()).await;

        assert_eq!(result.stage(), Stage::Encoding);
        assert_eq!(result.error_kind(), Some(ErrorKind::OutOfRange));
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_truncated_public_inputs_fail_encoding() {
        let verifier = MockVerifier::new(Verifier::Answer(true));
        let result = runner(MockBackend::new(Prover::Raw(vec![0; 31])), LONG)
            .run(&CircuitInputs::new(), verifier.as_ref())
            .await;

        assert_eq!(result.stage(), Stage::Encoding);
        assert_eq!(result.error_kind(), Some(ErrorKind::MalformedEncoding));
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let verifier = MockVerifier::new(Verifier::Unreachable);
        let result = runner(MockBackend::new(thirteen()), LONG)
            .run(&CircuitInputs::new(), verifier.as_ref())
            .await;

        assert_eq!(result.stage(), Stage::Calling);
        assert_eq!(result.error_kind(), Some(ErrorKind::Network));
    }

    #[tokio::test]
    async fn test_verifier_timeout_is_network_not_revert() {
        let verifier = MockVerifier::new(Verifier::Slow(LONG));
        let result = runner(MockBackend::new(thirteen()), Duration::from_millis(50))
            .run(&CircuitInputs::new(), verifier.as_ref())
            .await;

        assert_eq!(result.stage(), Stage::Calling);
        assert_eq!(result.error_kind(), Some(ErrorKind::Network));
    }

    #[tokio::test]
    async fn test_prover_timeout_is_network() {
        let verifier = MockVerifier::new(Verifier::Answer(true));
        let result = runner(MockBackend::new(Prover::Hang), Duration::from_millis(50))
            .run(&CircuitInputs::new(), verifier.as_ref())
            .await;

        assert_eq!(result.stage(), Stage::Proving);
        assert_eq!(result.error_kind(), Some(ErrorKind::Network));
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_while_proving() {
        let verifier = MockVerifier::new(Verifier::Answer(true));
        let runner = runner(MockBackend::new(Prover::Hang), LONG);
        let cancel = CancelHandle::new();
        let inputs = CircuitInputs::new();

        let trigger = {
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            }
        };
        let (result, ()) = tokio::join!(
            runner.run_with_cancel(&inputs, verifier.as_ref(), &cancel),
            trigger
        );

        assert_eq!(result.stage(), Stage::Proving);
        assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_proves() {
        let backend = MockBackend::new(thirteen());
        let verifier = MockVerifier::new(Verifier::Answer(true));
        let cancel = CancelHandle::new();
        cancel.cancel();

        let result = runner(backend.clone(), LONG)
            .run_with_cancel(&CircuitInputs::new(), verifier.as_ref(), &cancel)
            .await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_call_is_ignored() {
        let verifier = MockVerifier::new(Verifier::Slow(Duration::from_millis(100)));
        let runner = runner(MockBackend::new(thirteen()), LONG);
        let cancel = CancelHandle::new();
        let inputs = CircuitInputs::new();

        let trigger = {
            let verifier = verifier.clone();
            let cancel = cancel.clone();
            async move {
                verifier.entered.notified().await;
                cancel.cancel();
            }
        };
        let (result, ()) = tokio::join!(
            runner.run_with_cancel(&inputs, verifier.as_ref(), &cancel),
            trigger
        );

        assert!(cancel.is_cancelled());
        assert!(result.is_success());
        assert_eq!(result.verified_result(), Some(true));
    }

    #[tokio::test]
    async fn test_batch_keeps_job_order_and_bounds_concurrency() {
        let backend = MockBackend::new(Prover::EchoX);
        let verifier = MockVerifier::new(Verifier::Parity);
        let runner = Arc::new(runner(backend.clone(), LONG));

        let jobs = (1..=6)
            .map(|x| CircuitInputs::from_pairs([format!("x={x}")]).unwrap())
            .collect::<Vec<_>>();
        let results = runner.run_batch(jobs, verifier.clone(), 2, CancelHandle::new()).await;

        let verdicts = results.iter().map(|r| r.verified_result()).collect::<Vec<_>>();
        assert_eq!(
            verdicts,
            vec![Some(false), Some(true), Some(false), Some(true), Some(false), Some(true)]
        );
        assert!(backend.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(verifier.calls(), 6);

        let ids = results.iter().map(|r| r.run_id()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn test_batch_failures_stay_independent() {
        let backend = MockBackend::new(Prover::Output {
            proof: vec![0x0d],
            inputs: vec![PublicInput::from(2u64)],
        });
        let verifier = MockVerifier::new(Verifier::Revert("InvalidProof"));
        let runner = Arc::new(runner(backend, LONG));

        let jobs = vec![CircuitInputs::new(), CircuitInputs::new()];
        let results = runner.run_batch(jobs, verifier.clone(), 4, CancelHandle::new()).await;

        assert!(results.iter().all(|r| r.error_kind() == Some(ErrorKind::Revert)));
        assert_eq!(verifier.calls(), 2);
    }
}
