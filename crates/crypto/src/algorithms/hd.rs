// Path: crates/crypto/src/algorithms/hd.rs
//! Non-hardened hierarchical-deterministic (BIP32-style) key derivation over
//! secp256k1, used to derive the per-contract child key named by a
//! descriptor's `renter_hd_index` / `farmer_hd_index` from the long-term
//! `renter_hd_key` / `farmer_hd_key` extended public key.
//!
//! `k256` + `hmac` + `sha2` are used here, matching their legitimate
//! use for the same purpose elsewhere in the broader example corpus.

use crate::error::CryptoError;
use hmac::{Hmac, Mac};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, PublicKey, Scalar, SecretKey};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Parses the left 32 bytes of an HMAC-SHA512 output as a scalar, rejecting
/// the vanishingly unlikely case it does not reduce to a valid field element.
fn scalar_from_il(il: &[u8]) -> Result<Scalar, CryptoError> {
    let bytes = FieldBytes::clone_from_slice(il);
    Option::<Scalar>::from(Scalar::from_repr(bytes))
        .ok_or_else(|| CryptoError::OperationFailed("invalid IL scalar".into()))
}

/// An extended public key: a compressed secp256k1 point plus a 32-byte chain
/// code, matching the BIP32 public-derivation material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    /// The 33-byte SEC1-compressed public key.
    pub public_key: PublicKey,
    /// The 32-byte chain code mixed into child derivation.
    pub chain_code: [u8; 32],
}

impl ExtendedPublicKey {
    /// Parses an extended public key from its wire form: 33 bytes of
    /// compressed point followed by 32 bytes of chain code.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 65 {
            return Err(CryptoError::InvalidKey(format!(
                "extended public key must be 65 bytes (33 + 32), got {}",
                bytes.len()
            )));
        }
        let public_key = PublicKey::from_sec1_bytes(&bytes[..33])
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&bytes[33..]);
        Ok(Self {
            public_key,
            chain_code,
        })
    }

    /// Serializes back to the 65-byte wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let point = self.public_key.to_encoded_point(true);
        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(point.as_bytes());
        out.extend_from_slice(&self.chain_code);
        out
    }

    /// Derives the *non-hardened* child public key at `index`.
    ///
    /// Non-hardened derivation only ever needs the parent's public key and
    /// chain code (never a private key), which is exactly what a contract's
    /// `*_hd_key` + `*_hd_index` pair carries — this is why the
    /// a counterparty can validate a counterparty's per-contract signing key
    /// without ever seeing a private key.
    pub fn derive_child(&self, index: u32) -> Result<ExtendedPublicKey, CryptoError> {
        if index & 0x8000_0000 != 0 {
            return Err(CryptoError::Unsupported(
                "hardened derivation indices are not supported for public-key derivation".into(),
            ));
        }
        let point = self.public_key.to_encoded_point(true);
        let mut mac = <HmacSha512 as Mac>::new_from_slice(&self.chain_code)
            .map_err(|e| CryptoError::OperationFailed(e.to_string()))?;
        mac.update(point.as_bytes());
        mac.update(&index.to_be_bytes());
        let result = mac.finalize().into_bytes();

        let (il, ir) = result.split_at(32);
        let il_scalar = scalar_from_il(il)?;

        let child_point: ProjectivePoint =
            ProjectivePoint::from(AffinePoint::from(self.public_key.as_affine()))
                + ProjectivePoint::GENERATOR * il_scalar;
        let child_encoded: EncodedPoint = child_point.to_affine().to_encoded_point(true);
        let child_public = PublicKey::from_sec1_bytes(child_encoded.as_bytes())
            .map_err(|e| CryptoError::OperationFailed(e.to_string()))?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(ExtendedPublicKey {
            public_key: child_public,
            chain_code,
        })
    }

    /// Verifies a detached ECDSA signature against the non-hardened child
    /// key at `index`, without ever materializing a private key. This is
    /// the verification half of the Contract invariant "every populated
    /// signature verifies against its key".
    pub fn verify_child_signature(
        &self,
        index: u32,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        let child = self.derive_child(index)?;
        let verifying_key = VerifyingKey::from(&child.public_key);
        let sig = EcdsaSignature::from_slice(signature)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        Ok(verifying_key.verify(message, &sig).is_ok())
    }
}

/// An extended private key: a secp256k1 scalar plus chain code, able to
/// derive both child private and public keys. This is the signer-side
/// counterpart the farmer/renter wallet holds; it never crosses the wire.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    /// The parent's secret scalar.
    pub secret_key: SecretKey,
    /// The 32-byte chain code mixed into child derivation.
    pub chain_code: [u8; 32],
}

impl ExtendedPrivateKey {
    /// Derives a new master extended key from a 32-byte seed, HMAC-SHA512
    /// keyed by the fixed BIP32 personalization string, matching the
    /// standard master-key generation algorithm.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let mut mac = <HmacSha512 as Mac>::new_from_slice(b"Bitcoin seed")
            .map_err(|e| CryptoError::OperationFailed(e.to_string()))?;
        mac.update(seed);
        let result = mac.finalize().into_bytes();
        let (il, ir) = result.split_at(32);
        let secret_key =
            SecretKey::from_slice(il).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);
        Ok(Self {
            secret_key,
            chain_code,
        })
    }

    /// The extended public key corresponding to this extended private key.
    pub fn public_key(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            public_key: self.secret_key.public_key(),
            chain_code: self.chain_code,
        }
    }

    /// Derives the non-hardened child private key at `index`.
    pub fn derive_child(&self, index: u32) -> Result<ExtendedPrivateKey, CryptoError> {
        if index & 0x8000_0000 != 0 {
            return Err(CryptoError::Unsupported(
                "hardened derivation indices are not supported".into(),
            ));
        }
        let point = self.secret_key.public_key().to_encoded_point(true);
        let mut mac = <HmacSha512 as Mac>::new_from_slice(&self.chain_code)
            .map_err(|e| CryptoError::OperationFailed(e.to_string()))?;
        mac.update(point.as_bytes());
        mac.update(&index.to_be_bytes());
        let result = mac.finalize().into_bytes();
        let (il, ir) = result.split_at(32);

        let il_scalar = scalar_from_il(il)?;
        let parent_scalar = self.secret_key.to_nonzero_scalar();
        let child_scalar = il_scalar + *parent_scalar.as_ref();
        let child_secret = SecretKey::new(child_scalar.into());

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(ExtendedPrivateKey {
            secret_key: child_secret,
            chain_code,
        })
    }

    /// Signs `message` with this key's ECDSA secret scalar, producing the
    /// detached signature a Contract's `*_signature` field holds.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signing_key = SigningKey::from(self.secret_key.clone());
        let sig: EcdsaSignature = signing_key.sign(message);
        sig.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::SecretKey;

    fn sample_xpub() -> ExtendedPublicKey {
        let sk = SecretKey::from_slice(&[7u8; 32]).unwrap();
        ExtendedPublicKey {
            public_key: sk.public_key(),
            chain_code: [3u8; 32],
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let parent = sample_xpub();
        let a = parent.derive_child(5).unwrap();
        let b = parent.derive_child(5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_indices_diverge() {
        let parent = sample_xpub();
        let a = parent.derive_child(0).unwrap();
        let b = parent.derive_child(1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_hardened_index() {
        let parent = sample_xpub();
        assert!(parent.derive_child(0x8000_0000).is_err());
    }

    #[test]
    fn bytes_roundtrip() {
        let parent = sample_xpub();
        let bytes = parent.to_bytes();
        let reparsed = ExtendedPublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(parent, reparsed);
    }

    #[test]
    fn child_signature_verifies_against_public_derivation() {
        let master = ExtendedPrivateKey::from_seed(b"contract test seed material").unwrap();
        let xpub = master.public_key();
        let child_priv = master.derive_child(12).unwrap();
        let message = b"canonical contract preimage";
        let sig = child_priv.sign(message);
        assert!(xpub.verify_child_signature(12, message, &sig).unwrap());
    }

    #[test]
    fn child_signature_rejects_wrong_index() {
        let master = ExtendedPrivateKey::from_seed(b"contract test seed material").unwrap();
        let xpub = master.public_key();
        let child_priv = master.derive_child(12).unwrap();
        let message = b"canonical contract preimage";
        let sig = child_priv.sign(message);
        assert!(!xpub.verify_child_signature(13, message, &sig).unwrap());
    }
}
