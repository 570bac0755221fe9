//! Private and public key material.
//!
//! Keys are a tagged union over the algorithms a certificate bundle may use.
//! Equality is cryptographic: two keys are equal when they have the same
//! algorithm and the same private (or public) value, whatever encoding they
//! were decoded from.

use std::fmt;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::codec::CodecError;

/// Key algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    EcP256,
    EcP384,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::EcP256 => "EC P-256",
            KeyAlgorithm::EcP384 => "EC P-384",
        })
    }
}

/// A private key of one of the supported algorithms.
#[derive(Clone)]
pub enum PrivateKeyMaterial {
    Rsa(RsaPrivateKey),
    P256(p256::SecretKey),
    P384(p384::SecretKey),
}

impl PrivateKeyMaterial {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PrivateKeyMaterial::Rsa(_) => KeyAlgorithm::Rsa,
            PrivateKeyMaterial::P256(_) => KeyAlgorithm::EcP256,
            PrivateKeyMaterial::P384(_) => KeyAlgorithm::EcP384,
        }
    }

    /// Modulus size for RSA keys, `None` for EC keys.
    pub fn rsa_bits(&self) -> Option<usize> {
        match self {
            PrivateKeyMaterial::Rsa(key) => Some(key.size() * 8),
            _ => None,
        }
    }

    pub fn public_key(&self) -> PublicKeyMaterial {
        match self {
            PrivateKeyMaterial::Rsa(key) => PublicKeyMaterial::Rsa(key.to_public_key()),
            PrivateKeyMaterial::P256(key) => PublicKeyMaterial::P256(key.public_key()),
            PrivateKeyMaterial::P384(key) => PublicKeyMaterial::P384(key.public_key()),
        }
    }

    /// Decode a PKCS#8 `PrivateKeyInfo`, trying RSA, then P-256, then P-384.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CodecError> {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(PrivateKeyMaterial::Rsa(key));
        }
        if let Ok(key) = p256::SecretKey::from_pkcs8_der(der) {
            return Ok(PrivateKeyMaterial::P256(key));
        }
        p384::SecretKey::from_pkcs8_der(der)
            .map(PrivateKeyMaterial::P384)
            .map_err(|e| CodecError::PrivateKey {
                format: "PKCS#8",
                reason: e.to_string(),
            })
    }

    /// Decode a PKCS#1 `RSAPrivateKey`.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self, CodecError> {
        RsaPrivateKey::from_pkcs1_der(der)
            .map(PrivateKeyMaterial::Rsa)
            .map_err(|e| CodecError::PrivateKey {
                format: "PKCS#1",
                reason: e.to_string(),
            })
    }

    /// Decode a SEC1 `ECPrivateKey`, trying P-256 then P-384.
    pub fn from_sec1_der(der: &[u8]) -> Result<Self, CodecError> {
        if let Ok(key) = p256::SecretKey::from_sec1_der(der) {
            return Ok(PrivateKeyMaterial::P256(key));
        }
        p384::SecretKey::from_sec1_der(der)
            .map(PrivateKeyMaterial::P384)
            .map_err(|e| CodecError::PrivateKey {
                format: "SEC1",
                reason: e.to_string(),
            })
    }

    /// Encode as PKCS#8 DER, the only format written back to disk.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, CodecError> {
        let document = match self {
            PrivateKeyMaterial::Rsa(key) => key.to_pkcs8_der(),
            PrivateKeyMaterial::P256(key) => key.to_pkcs8_der(),
            PrivateKeyMaterial::P384(key) => key.to_pkcs8_der(),
        }
        .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(document.as_bytes().to_vec())
    }
}

impl PartialEq for PrivateKeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PrivateKeyMaterial::Rsa(a), PrivateKeyMaterial::Rsa(b)) => a == b,
            (PrivateKeyMaterial::P256(a), PrivateKeyMaterial::P256(b)) => a.to_bytes() == b.to_bytes(),
            (PrivateKeyMaterial::P384(a), PrivateKeyMaterial::P384(b)) => a.to_bytes() == b.to_bytes(),
            _ => false,
        }
    }
}

impl Eq for PrivateKeyMaterial {}

// Never print key material.
impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyMaterial")
            .field("algorithm", &self.algorithm())
            .field("rsa_bits", &self.rsa_bits())
            .finish_non_exhaustive()
    }
}

/// Public half of a key, as found in a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyMaterial {
    Rsa(RsaPublicKey),
    P256(p256::PublicKey),
    P384(p384::PublicKey),
}

impl PublicKeyMaterial {
    /// Decode a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, CodecError> {
        if let Ok(key) = RsaPublicKey::from_public_key_der(der) {
            return Ok(PublicKeyMaterial::Rsa(key));
        }
        if let Ok(key) = p256::PublicKey::from_public_key_der(der) {
            return Ok(PublicKeyMaterial::P256(key));
        }
        p384::PublicKey::from_public_key_der(der)
            .map(PublicKeyMaterial::P384)
            .map_err(|e| CodecError::UnsupportedPublicKey(e.to_string()))
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKeyMaterial::Rsa(_) => KeyAlgorithm::Rsa,
            PublicKeyMaterial::P256(_) => KeyAlgorithm::EcP256,
            PublicKeyMaterial::P384(_) => KeyAlgorithm::EcP384,
        }
    }
}
