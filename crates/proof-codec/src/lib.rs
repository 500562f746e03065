//! Proof codec for EVM verifier contracts
//!
//! Converts the binary proof and public inputs produced by a zero-knowledge prover into the
//! exact layout consumed by a `verify(bytes, bytes32[]) -> bool` verifier contract: the proof as
//! `0x`-prefixed lowercase hex and each public input as a 32-byte big-endian word.

pub mod artifacts;
pub mod calldata;
pub mod codec;
pub mod error;
pub mod types;

pub use artifacts::{parse_public_inputs, parse_public_inputs_bin, parse_public_inputs_json};
pub use calldata::{IVerifier, VerifierCalldata};
pub use codec::{decode_proof, decode_public_input, encode_proof, encode_public_input, encode_public_inputs};
pub use error::{CodecError, Result};
pub use types::{EncodedProof, EncodedPublicInput, ProofBlob, PublicInput, HEX_PREFIX, WORD_SIZE};
