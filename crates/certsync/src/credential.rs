//! A private key together with its certificate chain.

use pem::Pem;

use crate::bundle::BundleError;
use crate::certificate::Certificate;
use crate::codec::{self, CodecError, CERTIFICATE_TAG};
use crate::key::PrivateKeyMaterial;

/// Private key plus ordered certificate chain, leaf first.
///
/// The chain order is not enforced here so that misordered chains read from
/// disk can still be inspected and reported by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub key: PrivateKeyMaterial,
    pub chain: Vec<Certificate>,
}

impl Credential {
    pub fn new(key: PrivateKeyMaterial, chain: Vec<Certificate>) -> Self {
        Self { key, chain }
    }

    pub fn leaf(&self) -> Option<&Certificate> {
        self.chain.first()
    }

    /// Everything after the leaf.
    pub fn intermediates(&self) -> &[Certificate] {
        self.chain.get(1..).unwrap_or_default()
    }

    /// Decode a credential from PEM text, such as the output of a CA.
    ///
    /// The key is the first key in `key_pem`; the chain is every certificate
    /// in `chain_pem`, in order. Both may be the same buffer. Unlike reading
    /// a slot, any block that fails to decode fails the whole credential.
    pub fn from_pem(key_pem: &[u8], chain_pem: &[u8]) -> Result<Self, BundleError> {
        let key_blocks = strict_blocks(key_pem, |tag| tag != CERTIFICATE_TAG)?;
        let key = codec::private_keys_from_blocks(&key_blocks)
            .into_result()?
            .into_iter()
            .next()
            .ok_or_else(|| BundleError::KeyNotFound {
                format: "PEM input".to_string(),
            })?;

        let chain_blocks = strict_blocks(chain_pem, |tag| !codec::is_private_key_tag(tag))?;
        let chain = codec::certificates_from_blocks(&chain_blocks).into_result()?;
        if chain.is_empty() {
            return Err(BundleError::CertificateNotFound {
                format: "PEM input".to_string(),
            });
        }

        Ok(Self { key, chain })
    }
}

fn strict_blocks(data: &[u8], keep: impl Fn(&str) -> bool) -> Result<Vec<Pem>, CodecError> {
    Ok(codec::blocks_from_bytes(data)
        .into_result()?
        .into_iter()
        .filter(|block| keep(block.tag()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{blocks_to_bytes, certificates_to_blocks, private_key_to_block};
    use crate::testutil;

    #[test]
    fn test_from_pem_combined_buffer() {
        let material = testutil::chain(&["example.com"]);
        let mut blocks = vec![private_key_to_block(&material.key).unwrap()];
        blocks.extend(certificates_to_blocks(&material.chain));
        let pem = blocks_to_bytes(&blocks).concat();

        let credential = Credential::from_pem(&pem, &pem).unwrap();

        assert_eq!(credential, material);
        assert_eq!(credential.leaf(), Some(&material.chain[0]));
        assert_eq!(credential.intermediates(), &material.chain[1..]);
    }

    #[test]
    fn test_from_pem_requires_key_and_certificate() {
        let material = testutil::chain(&["example.com"]);
        let certs = blocks_to_bytes(&certificates_to_blocks(&material.chain)).concat();
        let key = blocks_to_bytes(&[private_key_to_block(&material.key).unwrap()]).concat();

        assert!(matches!(
            Credential::from_pem(&certs, &certs),
            Err(BundleError::KeyNotFound { .. })
        ));
        assert!(matches!(
            Credential::from_pem(&key, &key),
            Err(BundleError::CertificateNotFound { .. })
        ));
    }

    #[test]
    fn test_from_pem_rejects_undecodable_intermediate() {
        let material = testutil::chain(&["example.com"]);
        let key = blocks_to_bytes(&[private_key_to_block(&material.key).unwrap()]).concat();
        let mut blocks = certificates_to_blocks(&material.chain);
        blocks[1] = Pem::new(CERTIFICATE_TAG, vec![0x30, 0x03, 0x01, 0x02, 0x03]);
        let chain = blocks_to_bytes(&blocks).concat();

        assert!(matches!(
            Credential::from_pem(&key, &chain),
            Err(BundleError::Codec(CodecError::Certificate(_)))
        ));
    }

    #[test]
    fn test_from_pem_rejects_damaged_pem_block() {
        let material = testutil::chain(&["example.com"]);
        let key = blocks_to_bytes(&[private_key_to_block(&material.key).unwrap()]).concat();
        let mut sections: Vec<String> = blocks_to_bytes(&certificates_to_blocks(&material.chain))
            .into_iter()
            .map(|bytes| String::from_utf8(bytes).unwrap())
            .collect();
        sections[1] = sections[1].replacen("MII", "M!I", 1);
        let chain = sections.concat();

        assert!(matches!(
            Credential::from_pem(&key, chain.as_bytes()),
            Err(BundleError::Codec(CodecError::Pem(_)))
        ));
    }

    #[test]
    fn test_from_pem_rejects_undecodable_key() {
        let material = testutil::chain(&["example.com"]);
        let key = blocks_to_bytes(&[Pem::new(codec::PRIVATE_KEY_TAG, vec![0x30, 0x00])]).concat();
        let chain = blocks_to_bytes(&certificates_to_blocks(&material.chain)).concat();

        assert!(matches!(
            Credential::from_pem(&key, &chain),
            Err(BundleError::Codec(CodecError::PrivateKey { .. }))
        ));
    }

    #[test]
    fn test_intermediates_of_leaf_only_chain() {
        let material = testutil::chain(&["example.com"]);
        let credential = Credential::new(material.key, vec![material.chain[0].clone()]);
        assert!(credential.intermediates().is_empty());
    }
}
