//! PEM codec
//!
//! Maps between raw bytes, PEM blocks and typed values. Keys are always
//! written as PKCS#8 (`PRIVATE KEY`); on read the legacy `RSA PRIVATE KEY`
//! (PKCS#1) and `EC PRIVATE KEY` (SEC1) labels are accepted as well.
//!
//! Batch decoding is best-effort: a block that fails to decode is skipped
//! and recorded, the others keep their order.

use pem::{EncodeConfig, LineEnding, Pem};
use thiserror::Error;
use tracing::{debug, trace};

use crate::certificate::Certificate;
use crate::key::PrivateKeyMaterial;

pub const CERTIFICATE_TAG: &str = "CERTIFICATE";
pub const PRIVATE_KEY_TAG: &str = "PRIVATE KEY";
pub const RSA_PRIVATE_KEY_TAG: &str = "RSA PRIVATE KEY";
pub const EC_PRIVATE_KEY_TAG: &str = "EC PRIVATE KEY";

const BEGIN_MARKER: &str = "-----BEGIN ";

/// Errors raised while encoding or decoding PEM material.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid PEM data: {0}")]
    Pem(#[from] pem::PemError),

    #[error("expected a {expected} block, found {found}")]
    UnexpectedBlock {
        expected: &'static str,
        found: String,
    },

    #[error("invalid certificate: {0}")]
    Certificate(String),

    #[error("invalid {format} private key: {reason}")]
    PrivateKey {
        format: &'static str,
        reason: String,
    },

    #[error("unsupported public key: {0}")]
    UnsupportedPublicKey(String),

    #[error("failed to encode private key: {0}")]
    Encode(String),
}

/// Result of decoding a list of elements one by one.
#[derive(Debug)]
pub struct Decoded<T> {
    /// Successfully decoded values, in input order
    pub values: Vec<T>,
    /// Failures, with the index of the element that failed
    pub errors: Vec<(usize, CodecError)>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> Decoded<T> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.values.first()
    }

    /// Keep the values, failing with the first error if there was one.
    pub fn into_result(self) -> Result<Vec<T>, CodecError> {
        match self.errors.into_iter().next() {
            Some((_, error)) => Err(error),
            None => Ok(self.values),
        }
    }
}

impl<T> FromIterator<Result<T, CodecError>> for Decoded<T> {
    fn from_iter<I: IntoIterator<Item = Result<T, CodecError>>>(iter: I) -> Self {
        let mut decoded = Decoded::default();
        for (index, result) in iter.into_iter().enumerate() {
            match result {
                Ok(value) => decoded.values.push(value),
                Err(error) => decoded.errors.push((index, error)),
            }
        }
        decoded
    }
}

// ============================================================================
// Bytes <-> blocks
// ============================================================================

/// Parse every PEM block in `data`, ignoring text between blocks.
///
/// A damaged block does not hide the blocks around it: when the buffer as a
/// whole fails to parse, each `-----BEGIN` section is parsed on its own.
pub fn blocks_from_bytes(data: &[u8]) -> Decoded<Pem> {
    match pem::parse_many(data) {
        Ok(blocks) => Decoded {
            values: blocks,
            errors: Vec::new(),
        },
        Err(e) => {
            debug!(error = %e, "PEM buffer failed to parse, decoding block by block");
            let text = String::from_utf8_lossy(data);
            text.split(BEGIN_MARKER)
                .skip(1)
                .map(|section| {
                    let section = format!("{}{}", BEGIN_MARKER, section);
                    pem::parse(section.as_bytes()).map_err(CodecError::from)
                })
                .collect()
        }
    }
}

/// Encode each block separately, with LF line endings.
pub fn blocks_to_bytes(blocks: &[Pem]) -> Vec<Vec<u8>> {
    blocks
        .iter()
        .map(|block| {
            pem::encode_config(block, EncodeConfig::new().set_line_ending(LineEnding::LF))
                .into_bytes()
        })
        .collect()
}

// ============================================================================
// Blocks <-> values
// ============================================================================

pub fn is_private_key_tag(tag: &str) -> bool {
    matches!(
        tag,
        PRIVATE_KEY_TAG | RSA_PRIVATE_KEY_TAG | EC_PRIVATE_KEY_TAG
    )
}

pub fn certificate_to_block(certificate: &Certificate) -> Pem {
    Pem::new(CERTIFICATE_TAG, certificate.der().to_vec())
}

pub fn certificates_to_blocks(certificates: &[Certificate]) -> Vec<Pem> {
    certificates.iter().map(certificate_to_block).collect()
}

pub fn private_key_to_block(key: &PrivateKeyMaterial) -> Result<Pem, CodecError> {
    Ok(Pem::new(PRIVATE_KEY_TAG, key.to_pkcs8_der()?))
}

/// Decode a `CERTIFICATE` block. Any other label is a type mismatch.
pub fn certificate_from_block(block: &Pem) -> Result<Certificate, CodecError> {
    if block.tag() != CERTIFICATE_TAG {
        return Err(CodecError::UnexpectedBlock {
            expected: CERTIFICATE_TAG,
            found: block.tag().to_string(),
        });
    }
    Certificate::from_der(block.contents())
}

/// Decode a private key block, dispatching on its label.
///
/// Unknown labels are attempted as PKCS#8.
pub fn private_key_from_block(block: &Pem) -> Result<PrivateKeyMaterial, CodecError> {
    match block.tag() {
        PRIVATE_KEY_TAG => PrivateKeyMaterial::from_pkcs8_der(block.contents()),
        RSA_PRIVATE_KEY_TAG => PrivateKeyMaterial::from_pkcs1_der(block.contents()),
        EC_PRIVATE_KEY_TAG => PrivateKeyMaterial::from_sec1_der(block.contents()),
        other => {
            trace!(tag = %other, "Unknown key block label, trying PKCS#8");
            PrivateKeyMaterial::from_pkcs8_der(block.contents())
        }
    }
}

pub fn certificates_from_blocks(blocks: &[Pem]) -> Decoded<Certificate> {
    blocks.iter().map(certificate_from_block).collect()
}

pub fn private_keys_from_blocks(blocks: &[Pem]) -> Decoded<PrivateKeyMaterial> {
    blocks.iter().map(private_key_from_block).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use proptest::prelude::*;

    #[test]
    fn test_certificate_round_trip_keeps_der() {
        let material = testutil::chain(&["example.com"]);
        for cert in &material.chain {
            let decoded = certificate_from_block(&certificate_to_block(cert)).unwrap();
            assert_eq!(decoded.der(), cert.der());
        }
    }

    #[test]
    fn test_key_round_trip() {
        let material = testutil::chain(&["example.com"]);
        let block = private_key_to_block(&material.key).unwrap();

        assert_eq!(block.tag(), PRIVATE_KEY_TAG);
        assert_eq!(private_key_from_block(&block).unwrap(), material.key);
    }

    #[test]
    fn test_legacy_key_labels() {
        use rsa::pkcs1::EncodeRsaPrivateKey;

        let rsa_key = rsa::RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 2048).unwrap();
        let pkcs1 = Pem::new(
            RSA_PRIVATE_KEY_TAG,
            rsa_key.to_pkcs1_der().unwrap().as_bytes().to_vec(),
        );
        assert_eq!(
            private_key_from_block(&pkcs1).unwrap(),
            PrivateKeyMaterial::Rsa(rsa_key)
        );

        let ec = p256::SecretKey::random(&mut rsa::rand_core::OsRng);
        let sec1 = Pem::new(EC_PRIVATE_KEY_TAG, ec.to_sec1_der().unwrap().to_vec());
        assert_eq!(
            private_key_from_block(&sec1).unwrap(),
            PrivateKeyMaterial::P256(ec)
        );
    }

    #[test]
    fn test_unknown_key_label_falls_back_to_pkcs8() {
        let material = testutil::chain(&["example.com"]);
        let der = material.key.to_pkcs8_der().unwrap();
        let block = Pem::new("ENCRYPTED-LOOKING KEY", der);

        assert_eq!(private_key_from_block(&block).unwrap(), material.key);
    }

    #[test]
    fn test_certificate_type_mismatch() {
        let material = testutil::chain(&["example.com"]);
        let block = private_key_to_block(&material.key).unwrap();

        assert!(matches!(
            certificate_from_block(&block),
            Err(CodecError::UnexpectedBlock { found, .. }) if found == PRIVATE_KEY_TAG
        ));
    }

    #[test]
    fn test_batch_decode_skips_failures_in_order() {
        let material = testutil::chain(&["example.com"]);
        let blocks = vec![
            certificate_to_block(&material.chain[0]),
            Pem::new(CERTIFICATE_TAG, vec![0x30, 0x01, 0x00]),
            certificate_to_block(&material.chain[1]),
        ];

        let decoded = certificates_from_blocks(&blocks);

        assert_eq!(decoded.values, vec![material.chain[0].clone(), material.chain[1].clone()]);
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].0, 1);
        assert!(!decoded.is_clean());
    }

    #[test]
    fn test_blocks_from_bytes_ignores_surrounding_text() {
        let material = testutil::chain(&["example.com"]);
        let mut data = b"subject=CN = example.com\n".to_vec();
        for bytes in blocks_to_bytes(&certificates_to_blocks(&material.chain)) {
            data.extend_from_slice(&bytes);
            data.extend_from_slice(b"# comment between blocks\n");
        }

        let decoded = blocks_from_bytes(&data);

        assert!(decoded.is_clean());
        assert_eq!(decoded.values.len(), 3);
    }

    #[test]
    fn test_blocks_from_bytes_survives_damaged_block() {
        let good = Pem::new(CERTIFICATE_TAG, vec![1, 2, 3]);
        let mut data = pem::encode(&good).into_bytes();
        data.extend_from_slice(b"-----BEGIN CERTIFICATE-----\n!!!not base64!!!\n-----END CERTIFICATE-----\n");
        data.extend_from_slice(pem::encode(&good).as_bytes());

        let decoded = blocks_from_bytes(&data);

        assert_eq!(decoded.values.len(), 2);
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].0, 1);
    }

    #[test]
    fn test_encoded_blocks_use_lf() {
        let bytes = blocks_to_bytes(&[Pem::new(CERTIFICATE_TAG, vec![7; 100])]);
        assert!(!bytes[0].contains(&b'\r'));
    }

    #[test]
    fn test_into_result_returns_first_error() {
        let decoded: Decoded<u8> = vec![
            Ok(1),
            Err(CodecError::Certificate("first".to_string())),
            Err(CodecError::Certificate("second".to_string())),
        ]
        .into_iter()
        .collect();

        let err = decoded.into_result().unwrap_err();
        assert!(err.to_string().contains("first"));
    }

    proptest! {
        #[test]
        fn prop_block_framing_round_trips(
            payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..256), 1..6)
        ) {
            let blocks: Vec<Pem> = payloads
                .iter()
                .map(|payload| Pem::new(CERTIFICATE_TAG, payload.clone()))
                .collect();

            let data: Vec<u8> = blocks_to_bytes(&blocks).concat();
            let decoded = blocks_from_bytes(&data);

            prop_assert!(decoded.is_clean());
            let contents: Vec<Vec<u8>> = decoded.values.iter().map(|b| b.contents().to_vec()).collect();
            prop_assert_eq!(contents, payloads);
        }
    }
}
