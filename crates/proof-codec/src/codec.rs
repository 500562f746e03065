use alloy_primitives::U256;

use crate::error::{CodecError, Result};
use crate::types::{EncodedProof, EncodedPublicInput, ProofBlob, PublicInput, HEX_PREFIX, WORD_SIZE};

/// Renders a proof as `0x`-prefixed lowercase hex.
///
/// Total over its input: the result always has `2 + 2 * blob.len()` characters, and an empty
/// blob encodes to exactly `"0x"`.
pub fn encode_proof(blob: &ProofBlob) -> EncodedProof {
    EncodedProof::new(format!("{HEX_PREFIX}{}", hex::encode(blob.as_bytes())))
}

/// Renders a public input as a left-zero-padded 32-byte big-endian hex word.
///
/// # Errors
/// - [`CodecError::OutOfRange`] if the value needs more than 256 bits. The value is never
///   truncated: a masked word would produce a call that looks valid but proves nothing.
pub fn encode_public_input(value: &PublicInput) -> Result<EncodedPublicInput> {
    value.to_word().map(EncodedPublicInput::new)
}

/// Encodes a sequence of public inputs, preserving order.
///
/// The verifier binds each slot to a circuit output by position, so the output order is exactly
/// the input order. The first out-of-range value fails the whole sequence and the error carries
/// its index.
pub fn encode_public_inputs(values: &[PublicInput]) -> Result<Vec<EncodedPublicInput>> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| encode_public_input(value).map_err(|e| e.at_index(i)))
        .collect()
}

/// Decodes a `0x`-prefixed hex proof back into its bytes.
///
/// Uppercase digits are accepted.
///
/// # Errors
/// - [`CodecError::MalformedEncoding`] if the prefix is missing, a character is not a hex digit,
///   or the digit count is odd.
pub fn decode_proof(encoded: &str) -> Result<ProofBlob> {
    decode_hex(encoded).map(ProofBlob::from)
}

/// Decodes a 32-byte public input word back into its value.
pub fn decode_public_input(encoded: &str) -> Result<U256> {
    let bytes = decode_hex(encoded)?;
    if bytes.len() != WORD_SIZE {
        return Err(CodecError::malformed(format!(
            "public input word must be {WORD_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(U256::from_be_slice(&bytes))
}

fn decode_hex(encoded: &str) -> Result<Vec<u8>> {
    let digits = encoded
        .strip_prefix(HEX_PREFIX)
        .ok_or_else(|| CodecError::malformed("missing 0x prefix"))?;
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CodecError::malformed(format!("non-hex character {c:?}")));
    }
    if digits.len() % 2 != 0 {
        return Err(CodecError::malformed(format!("odd number of hex digits ({})", digits.len())));
    }
    hex::decode(digits).map_err(|e| CodecError::malformed(e.to_string()))
}
