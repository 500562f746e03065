use alloy_primitives::{Bytes, B256};
use alloy_sol_types::{sol, SolCall};
use serde::Serialize;

use crate::codec::{encode_proof, encode_public_inputs};
use crate::error::Result;
use crate::types::{EncodedProof, EncodedPublicInput, ProofBlob, PublicInput};

// Interface implemented by generated Honk/UltraPlonk verifier contracts.
sol! {
    interface IVerifier {
        function verify(bytes calldata proof, bytes32[] calldata publicInputs) external view returns (bool);
    }
}

/// VerifierCalldata holds a proof and its public inputs in the shape a `verify(bytes, bytes32[])`
/// call expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifierCalldata {
    proof: EncodedProof,
    public_inputs: Vec<EncodedPublicInput>,
    #[serde(skip)]
    proof_bytes: Bytes,
}

impl VerifierCalldata {
    /// Encodes a proof and its ordered public inputs.
    ///
    /// # Errors
    /// - Returns [`crate::CodecError::OutOfRange`] if any public input exceeds 256 bits.
    pub fn new(proof: &ProofBlob, public_inputs: &[PublicInput]) -> Result<Self> {
        Ok(Self {
            proof: encode_proof(proof),
            public_inputs: encode_public_inputs(public_inputs)?,
            proof_bytes: proof.clone().into_bytes(),
        })
    }

    pub fn proof(&self) -> &EncodedProof {
        &self.proof
    }

    pub fn public_inputs(&self) -> &[EncodedPublicInput] {
        &self.public_inputs
    }

    pub fn proof_bytes(&self) -> &Bytes {
        &self.proof_bytes
    }

    pub fn public_input_words(&self) -> Vec<B256> {
        self.public_inputs.iter().map(EncodedPublicInput::to_b256).collect()
    }

    /// Builds the typed `verify` call.
    pub fn to_call(&self) -> IVerifier::verifyCall {
        IVerifier::verifyCall {
            proof: self.proof_bytes.clone(),
            publicInputs: self.public_input_words(),
        }
    }

    /// ABI-encoded calldata, selector included.
    pub fn abi_encode(&self) -> Bytes {
        self.to_call().abi_encode().into()
    }

    /// Arguments for `cast call <verifier> "verify(bytes,bytes32[])(bool)" <proof> <inputs>`.
    pub fn cast_args(&self) -> [String; 2] {
        let words: Vec<&str> = self.public_inputs.iter().map(EncodedPublicInput::as_str).collect();
        [self.proof.to_string(), format!("[{}]", words.join(","))]
    }
}
