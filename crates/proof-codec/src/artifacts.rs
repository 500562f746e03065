//! Parsers for the public-input artifacts written next to a proof by proving tools.

use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::types::{ProofBlob, PublicInput, WORD_SIZE};

/// Parses a binary public-inputs file: a concatenation of 32-byte big-endian field elements,
/// as written by Barretenberg.
pub fn parse_public_inputs_bin(bytes: &[u8]) -> Result<Vec<PublicInput>> {
    if bytes.len() % WORD_SIZE != 0 {
        return Err(CodecError::malformed(format!(
            "public inputs file length {} is not a multiple of {WORD_SIZE}",
            bytes.len()
        )));
    }
    Ok(bytes.chunks_exact(WORD_SIZE).map(PublicInput::from_be_slice).collect())
}

/// Parses a JSON array of public inputs. Elements may be decimal or `0x`-hex strings, or
/// non-negative JSON integers.
pub fn parse_public_inputs_json(text: &str) -> Result<Vec<PublicInput>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| CodecError::malformed(format!("invalid public inputs JSON: {e}")))?;
    let items = value
        .as_array()
        .ok_or_else(|| CodecError::malformed("public inputs JSON must be an array"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => s.parse(),
            Value::Number(n) => n
                .as_u64()
                .map(PublicInput::from)
                .ok_or_else(|| {
                    CodecError::malformed(format!(
                        "public input {i} is the JSON number {n}; numbers must be integers in 0..=u64::MAX, \
                         give larger values as decimal or hex strings"
                    ))
                }),
            other => Err(CodecError::malformed(format!("public input {i} has unsupported JSON type: {other}"))),
        })
        .collect()
}

/// Parses a public-inputs artifact, detecting JSON by a leading `[`, binary otherwise.
pub fn parse_public_inputs(bytes: &[u8]) -> Result<Vec<PublicInput>> {
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'[') {
        let text =
            std::str::from_utf8(bytes).map_err(|e| CodecError::malformed(format!("public inputs JSON is not UTF-8: {e}")))?;
        return parse_public_inputs_json(text);
    }
    parse_public_inputs_bin(bytes)
}

impl ProofBlob {
    /// Splits public inputs that a prover inlined at the front of the proof.
    ///
    /// Older Barretenberg releases prefix the proof with its public inputs as 32-byte words.
    /// Returns the first `count` words as public inputs and the remaining bytes as the proof.
    pub fn split_inlined_public_inputs(&self, count: usize) -> Result<(Vec<PublicInput>, ProofBlob)> {
        let prefix_len = count
            .checked_mul(WORD_SIZE)
            .ok_or_else(|| CodecError::malformed("inlined public input count overflows"))?;
        if prefix_len > self.len() {
            return Err(CodecError::malformed(format!(
                "proof of {} bytes cannot hold {count} inlined public inputs",
                self.len()
            )));
        }
        let (head, tail) = self.as_bytes().split_at(prefix_len);
        let inputs = parse_public_inputs_bin(head)?;
        Ok((inputs, ProofBlob::from(tail)))
    }
}
