use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Bytes, B256, U256, U512};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CodecError, Result};

/// Width in bytes of an EVM word and of every encoded public input.
pub const WORD_SIZE: usize = 32;

/// Prefix carried by every hex encoding produced by this crate.
pub const HEX_PREFIX: &str = "0x";

/// ProofBlob is the opaque proof emitted by an external prover.
///
/// No internal structure is assumed; the bytes are carried as-is into the verifier call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofBlob(Bytes);

impl ProofBlob {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Vec<u8>> for ProofBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for ProofBlob {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

/// PublicInput is a non-negative scalar bound positionally to a proof.
///
/// The value is kept as the big-endian magnitude the prover produced, without a width limit,
/// so that oversized values survive until encoding and are rejected there instead of being
/// truncated on the way in.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PublicInput {
    // big-endian, leading zero bytes stripped; zero is the empty vector
    magnitude: Vec<u8>,
}

impl PublicInput {
    /// Builds a public input from a big-endian byte string of any length.
    pub fn from_be_slice(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        Self {
            magnitude: bytes[start..].to_vec(),
        }
    }

    /// Big-endian magnitude without leading zeros.
    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }

    /// Number of significant bits in the value.
    pub fn bits(&self) -> usize {
        match self.magnitude.first() {
            Some(first) => (self.magnitude.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
            None => 0,
        }
    }

    /// Returns the value as a left-zero-padded 32-byte big-endian word.
    ///
    /// # Errors
    /// - [`CodecError::OutOfRange`] if the value needs more than 256 bits.
    pub fn to_word(&self) -> Result<[u8; WORD_SIZE]> {
        if self.magnitude.len() > WORD_SIZE {
            return Err(CodecError::OutOfRange {
                index: None,
                bits: self.bits(),
            });
        }
        let mut word = [0u8; WORD_SIZE];
        word[WORD_SIZE - self.magnitude.len()..].copy_from_slice(&self.magnitude);
        Ok(word)
    }

    pub fn to_u256(&self) -> Result<U256> {
        self.to_word().map(U256::from_be_bytes)
    }
}

impl From<U256> for PublicInput {
    fn from(value: U256) -> Self {
        Self::from_be_slice(&value.to_be_bytes::<WORD_SIZE>())
    }
}

impl From<B256> for PublicInput {
    fn from(value: B256) -> Self {
        Self::from_be_slice(value.as_slice())
    }
}

impl From<u64> for PublicInput {
    fn from(value: u64) -> Self {
        Self::from_be_slice(&value.to_be_bytes())
    }
}

impl FromStr for PublicInput {
    type Err = CodecError;

    /// Parses a decimal or `0x`-prefixed hex literal of any length.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(digits) = s.strip_prefix(HEX_PREFIX).or_else(|| s.strip_prefix("0X")) {
            return parse_hex_magnitude(digits).map(|bytes| Self::from_be_slice(&bytes));
        }
        parse_decimal_magnitude(s).map(|bytes| Self::from_be_slice(&bytes))
    }
}

impl fmt::Display for PublicInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u256() {
            Ok(value) => write!(f, "{value}"),
            Err(_) => write!(f, "{HEX_PREFIX}{}", hex::encode(&self.magnitude)),
        }
    }
}

impl fmt::Debug for PublicInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicInput({self})")
    }
}

impl From<PublicInput> for String {
    fn from(value: PublicInput) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for PublicInput {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

fn parse_hex_magnitude(digits: &str) -> Result<Vec<u8>> {
    if digits.is_empty() {
        return Err(CodecError::malformed("hex literal has no digits"));
    }
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CodecError::malformed(format!("non-hex character {c:?} in public input")));
    }
    // odd-length literals are padded with a leading zero nibble
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{digits}");
        padded.as_str()
    } else {
        digits
    };
    hex::decode(digits).map_err(|e| CodecError::malformed(e.to_string()))
}

/// Decimal literals go through `U512`, twice the word width, so every value that can still be
/// reported with its exact bit count survives until encoding.
fn parse_decimal_magnitude(digits: &str) -> Result<Vec<u8>> {
    if digits.is_empty() {
        return Err(CodecError::malformed("public input literal is empty"));
    }
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_digit()) {
        return Err(CodecError::malformed(format!("non-decimal character {c:?} in public input")));
    }
    let value = U512::from_str_radix(digits, 10).map_err(|_| {
        // n significant decimal digits need at least (n - 1) * log2(10) + 1 bits
        let significant = digits.trim_start_matches('0').len();
        CodecError::OutOfRange {
            index: None,
            bits: (significant.saturating_sub(1) * 3_321_928 / 1_000_000 + 1).max(U512::BITS + 1),
        }
    })?;
    Ok(value.to_be_bytes::<64>().to_vec())
}

/// EncodedProof is the `0x`-prefixed lowercase hex rendering of a [`ProofBlob`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EncodedProof(String);

impl EncodedProof {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the encoded proof carries no bytes, i.e. it is exactly `0x`.
    pub fn is_empty(&self) -> bool {
        self.0.len() == HEX_PREFIX.len()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncodedProof {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// EncodedPublicInput is one public input rendered as a `0x`-prefixed 32-byte big-endian word.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EncodedPublicInput {
    text: String,
    word: B256,
}

impl EncodedPublicInput {
    pub(crate) fn new(word: [u8; WORD_SIZE]) -> Self {
        Self {
            text: format!("{HEX_PREFIX}{}", hex::encode(word)),
            word: B256::from(word),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The word as passed in a `bytes32[]` argument.
    pub fn to_b256(&self) -> B256 {
        self.word
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for EncodedPublicInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for EncodedPublicInput {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl Serialize for EncodedPublicInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}
