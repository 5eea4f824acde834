// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # BLS Signatures over BN254
//!
//! Keys live on G2, signatures and hashed messages on G1. That split keeps
//! signatures at two words each and puts the expensive group on the side
//! that is registered once and then only read.
//!
//! ```text
//! sk ∈ Fr            pk = sk · G2          σ = sk · H(m)
//! verify:            e(σ, G2) == e(H(m), pk)
//! aggregate verify:  e(Σσᵢ, G2) == Π e(H(mᵢ), pkᵢ)
//! ```
//!
//! ## Two ways to fail
//!
//! Every verification returns `Result<bool, BlsError>`. An `Err` means the
//! check never ran: a word was not a canonical field element, a point was
//! off the curve or outside the subgroup, the inputs were mismatched. An
//! `Ok(false)` means it ran and the pairing equation does not hold. Callers
//! accept only `Ok(true)`.
//!
//! ## Rogue keys
//!
//! Aggregate verification only checks a *sum* of public keys. Anyone may
//! publish `pk_a = s·G2 − pk_b` and then "sign" for both `a` and `b` with
//! `s` alone. The settlement contract blocks this by demanding a
//! proof-of-possession at registration; this module just does the math.
//!
//! Pairings, field arithmetic and point validation come from arkworks. We
//! don't roll our own.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInt, BigInteger, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::UniformRand;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use super::hash::{sha256, sha256_parts};
use crate::config::{
    HASH_TO_CURVE_MAX_ATTEMPTS, PUBLIC_KEY_WORDS, SIGNATURE_LENGTH, SIGNATURE_WORDS, WORD_LENGTH,
};

/// A 32-byte big-endian word, the unit of every on-wire curve coordinate.
pub type Word = [u8; WORD_LENGTH];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a BLS operation could not complete.
///
/// None of these say anything about whether a signature is *valid*; they
/// mean the inputs were not even well-formed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlsError {
    #[error("coordinate is not a canonical field element")]
    NonCanonicalField,

    #[error("point is not on the curve")]
    NotOnCurve,

    #[error("point is not in the prime-order subgroup")]
    NotInSubgroup,

    #[error("public key is the identity element")]
    IdentityPublicKey,

    #[error("invalid encoding length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid hex encoding")]
    InvalidHex,

    #[error("mismatched inputs: {keys} keys for {messages} messages")]
    MismatchedInputs { keys: usize, messages: usize },

    #[error("aggregate verification needs at least one message")]
    EmptyAggregate,

    #[error("hash-to-curve exhausted its attempts")]
    HashToCurveExhausted,

    #[error("invalid secret key encoding")]
    InvalidSecretKey,
}

// ---------------------------------------------------------------------------
// Field element <-> word
// ---------------------------------------------------------------------------

fn fq_from_word(word: &Word) -> Result<Fq, BlsError> {
    let mut limbs = [0u64; 4];
    for (i, limb) in limbs.iter_mut().enumerate() {
        let end = WORD_LENGTH - 8 * i;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&word[end - 8..end]);
        *limb = u64::from_be_bytes(buf);
    }
    Fq::from_bigint(BigInt::new(limbs)).ok_or(BlsError::NonCanonicalField)
}

fn fq_to_word(value: &Fq) -> Word {
    let bytes = value.into_bigint().to_bytes_be();
    let mut word = [0u8; WORD_LENGTH];
    word.copy_from_slice(&bytes);
    word
}

fn words_from_bytes<const N: usize>(bytes: &[u8]) -> Result<[Word; N], BlsError> {
    if bytes.len() != N * WORD_LENGTH {
        return Err(BlsError::InvalidLength {
            expected: N * WORD_LENGTH,
            got: bytes.len(),
        });
    }
    let mut words = [[0u8; WORD_LENGTH]; N];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD_LENGTH)) {
        word.copy_from_slice(chunk);
    }
    Ok(words)
}

fn words_to_bytes(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|w| w.iter().copied()).collect()
}

// ---------------------------------------------------------------------------
// Hash to curve
// ---------------------------------------------------------------------------

/// A message already mapped onto G1. This is what keys sign and what
/// verification pairs against public keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessagePoint(G1Affine);

impl MessagePoint {
    /// The underlying curve point.
    pub fn as_affine(&self) -> &G1Affine {
        &self.0
    }
}

/// Map `message` onto G1 under a domain separation tag.
///
/// Try-and-increment: `x = SHA-256(len(dst) ‖ dst ‖ ctr ‖ msg) mod q`,
/// accept the first `x` with `x³ + 3` a square. G1 on BN254 has cofactor
/// one, so every curve point is already in the right subgroup.
pub fn hash_to_point(domain: &[u8], message: &[u8]) -> Result<MessagePoint, BlsError> {
    let dst_len = [domain.len().min(u8::MAX as usize) as u8];
    for counter in 0..HASH_TO_CURVE_MAX_ATTEMPTS {
        let digest = sha256_parts(&[&dst_len, domain, &counter.to_be_bytes(), message]);
        let x = Fq::from_be_bytes_mod_order(&digest);
        let greatest = sha256(&digest)[0] & 1 == 1;
        if let Some(point) = G1Affine::get_point_from_x_unchecked(x, greatest) {
            return Ok(MessagePoint(point.clear_cofactor()));
        }
    }
    Err(BlsError::HashToCurveExhausted)
}

// ---------------------------------------------------------------------------
// Secret key
// ---------------------------------------------------------------------------

/// A BLS secret scalar.
///
/// Deliberately not `Serialize`. Exporting key material goes through
/// [`to_bytes`](Self::to_bytes) so it is always a conscious act.
#[derive(Clone)]
pub struct SecretKey(Fr);

impl SecretKey {
    /// Generate a fresh secret key from the OS RNG.
    pub fn generate() -> Self {
        loop {
            let scalar = Fr::rand(&mut OsRng);
            if !scalar.is_zero() {
                return Self(scalar);
            }
        }
    }

    /// Derive a secret key deterministically from seed bytes.
    ///
    /// Handy for tests and devnet fixtures. A weak seed gives a weak key.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut scalar = Fr::from_be_bytes_mod_order(&sha256(seed));
        if scalar.is_zero() {
            scalar = Fr::from(1u64);
        }
        Self(scalar)
    }

    /// Compressed 32-byte encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        // Writing a field element into a Vec cannot fail.
        let _ = self.0.serialize_compressed(&mut buf);
        buf
    }

    /// Decode a key produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlsError> {
        let scalar = Fr::deserialize_compressed(bytes).map_err(|_| BlsError::InvalidSecretKey)?;
        if scalar.is_zero() {
            return Err(BlsError::InvalidSecretKey);
        }
        Ok(Self(scalar))
    }

    /// The matching public key `sk · G2`.
    pub fn public_key(&self) -> PublicKey {
        PublicKey((G2Affine::generator() * self.0).into_affine())
    }

    /// Sign a message that has already been hashed to the curve.
    pub fn sign_point(&self, message: &MessagePoint) -> Signature {
        Signature((message.0 * self.0).into_affine())
    }

    /// Hash `message` under `domain` and sign it.
    pub fn sign(&self, domain: &[u8], message: &[u8]) -> Result<Signature, BlsError> {
        Ok(self.sign_point(&hash_to_point(domain, message)?))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Public key
// ---------------------------------------------------------------------------

/// A registered BLS public key: a non-identity point in G2.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(G2Affine);

impl PublicKey {
    /// Wrap a G2 point, rejecting the identity and anything outside the
    /// prime-order subgroup.
    pub fn from_affine(point: G2Affine) -> Result<Self, BlsError> {
        if point.is_zero() {
            return Err(BlsError::IdentityPublicKey);
        }
        if !point.is_on_curve() {
            return Err(BlsError::NotOnCurve);
        }
        if !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(BlsError::NotInSubgroup);
        }
        Ok(Self(point))
    }

    /// The underlying curve point.
    pub fn as_affine(&self) -> &G2Affine {
        &self.0
    }

    /// Decode from four words: `x.c1, x.c0, y.c1, y.c0`.
    pub fn from_words(words: &[Word; PUBLIC_KEY_WORDS]) -> Result<Self, BlsError> {
        let x = Fq2::new(fq_from_word(&words[1])?, fq_from_word(&words[0])?);
        let y = Fq2::new(fq_from_word(&words[3])?, fq_from_word(&words[2])?);
        if x.is_zero() && y.is_zero() {
            return Err(BlsError::IdentityPublicKey);
        }
        Self::from_affine(G2Affine::new_unchecked(x, y))
    }

    /// Encode as four words: `x.c1, x.c0, y.c1, y.c0`.
    pub fn to_words(&self) -> [Word; PUBLIC_KEY_WORDS] {
        [
            fq_to_word(&self.0.x.c1),
            fq_to_word(&self.0.x.c0),
            fq_to_word(&self.0.y.c1),
            fq_to_word(&self.0.y.c0),
        ]
    }

    /// Decode from the 128-byte concatenation of the four words.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlsError> {
        Self::from_words(&words_from_bytes::<PUBLIC_KEY_WORDS>(bytes)?)
    }

    /// 128-byte concatenation of the four words.
    pub fn to_bytes(&self) -> Vec<u8> {
        words_to_bytes(&self.to_words())
    }

    /// Hex form of [`to_bytes`](Self::to_bytes), `0x`-prefixed.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Parse the hex form, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, BlsError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|_| BlsError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "PublicKey({}…)", &hex[..18])
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A BLS signature (single or aggregate): a point in G1.
///
/// The identity is a legal encoding (`(0, 0)`); it simply never verifies
/// against a real message.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(G1Affine);

impl Signature {
    /// Decode from two words: `x, y`.
    pub fn from_words(words: &[Word; SIGNATURE_WORDS]) -> Result<Self, BlsError> {
        let x = fq_from_word(&words[0])?;
        let y = fq_from_word(&words[1])?;
        if x.is_zero() && y.is_zero() {
            return Ok(Self(G1Affine::zero()));
        }
        let point = G1Affine::new_unchecked(x, y);
        if !point.is_on_curve() {
            return Err(BlsError::NotOnCurve);
        }
        if !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(BlsError::NotInSubgroup);
        }
        Ok(Self(point))
    }

    /// Encode as two words: `x, y`. The identity encodes as two zero words.
    pub fn to_words(&self) -> [Word; SIGNATURE_WORDS] {
        if self.0.is_zero() {
            return [[0u8; WORD_LENGTH]; SIGNATURE_WORDS];
        }
        [fq_to_word(&self.0.x), fq_to_word(&self.0.y)]
    }

    /// Decode from the 64-byte concatenation of the two words.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlsError> {
        Self::from_words(&words_from_bytes::<SIGNATURE_WORDS>(bytes)?)
    }

    /// 64-byte concatenation of the two words.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut out = [0u8; SIGNATURE_LENGTH];
        out.copy_from_slice(&words_to_bytes(&self.to_words()));
        out
    }

    /// Hex form of [`to_bytes`](Self::to_bytes), `0x`-prefixed.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Parse the hex form, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, BlsError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|_| BlsError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    /// Sum signatures into one aggregate. The empty aggregate is the identity.
    pub fn aggregate(signatures: &[Signature]) -> Signature {
        let sum: G1Projective = signatures.iter().map(|s| s.0.into_group()).sum();
        Signature(sum.into_affine())
    }

    /// Returns `true` for the identity signature.
    pub fn is_identity(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Signature({}…)", &hex[..18])
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a single signature: `e(σ, G2) == e(H(m), pk)`.
pub fn verify_single(
    signature: &Signature,
    public_key: &PublicKey,
    message: &MessagePoint,
) -> Result<bool, BlsError> {
    let lhs = Bn254::pairing(signature.0, G2Affine::generator());
    let rhs = Bn254::pairing(message.0, public_key.0);
    Ok(lhs == rhs)
}

/// Verify one aggregate signature over many (message, key) pairs:
/// `e(σ, G2) == Π e(H(mᵢ), pkᵢ)`.
///
/// Messages need not be distinct; rogue-key safety comes from
/// proof-of-possession at registration, not from this check.
pub fn verify_multiple(
    signature: &Signature,
    public_keys: &[PublicKey],
    messages: &[MessagePoint],
) -> Result<bool, BlsError> {
    if public_keys.len() != messages.len() {
        return Err(BlsError::MismatchedInputs {
            keys: public_keys.len(),
            messages: messages.len(),
        });
    }
    if messages.is_empty() {
        return Err(BlsError::EmptyAggregate);
    }

    let lhs = Bn254::pairing(signature.0, G2Affine::generator());
    let rhs = Bn254::multi_pairing(
        messages.iter().map(|m| m.0),
        public_keys.iter().map(|k| k.0),
    );
    Ok(lhs == rhs)
}
