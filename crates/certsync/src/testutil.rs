//! Certificate fixtures for unit tests.

use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use time::{Duration, OffsetDateTime};

use crate::certificate::Certificate;
use crate::credential::Credential;
use crate::key::PrivateKeyMaterial;

/// A fresh P-256 credential `[leaf, intermediate, root]` valid from one day
/// ago for ninety days. Every call generates new keys.
pub(crate) fn chain(domains: &[&str]) -> Credential {
    let now = OffsetDateTime::now_utc();
    chain_with_validity(domains, now - Duration::days(1), now + Duration::days(90))
}

/// Like [`chain`], with the leaf valid over `not_before..not_after`. The CA
/// certificates are valid for ten years around now.
pub(crate) fn chain_with_validity(
    domains: &[&str],
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
) -> Credential {
    build_chain(domains, not_before, not_after, || KeyPair::generate().unwrap())
}

/// Like [`chain`], with 2048-bit RSA keys for every certificate.
pub(crate) fn rsa_chain(domains: &[&str]) -> Credential {
    let now = OffsetDateTime::now_utc();
    build_chain(domains, now - Duration::days(1), now + Duration::days(90), || {
        rsa_key_pair(2048)
    })
}

/// An rcgen key pair over a fresh RSA key of `bits`.
pub(crate) fn rsa_key_pair(bits: usize) -> KeyPair {
    let key = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, bits).unwrap();
    let der = key.to_pkcs8_der().unwrap();
    KeyPair::try_from(der.as_bytes()).unwrap()
}

/// A leaf for `domain` and the self-signed end-entity certificate that
/// signed it, `[leaf, issuer]`.
pub(crate) fn signed_by_end_entity(domain: &str) -> (Certificate, Certificate) {
    let now = OffsetDateTime::now_utc();

    let issuer_key = KeyPair::generate().unwrap();
    let mut issuer_params = ca_params("Not A CA", now);
    issuer_params.is_ca = IsCa::ExplicitNoCa;
    let issuer_cert = issuer_params.self_signed(&issuer_key).unwrap();
    let issuer = Issuer::new(issuer_params, issuer_key);

    let leaf_key = KeyPair::generate().unwrap();
    let mut leaf_params = CertificateParams::new(vec![domain.to_string()]).unwrap();
    leaf_params.not_before = now - Duration::days(1);
    leaf_params.not_after = now + Duration::days(90);
    let leaf_cert = leaf_params.signed_by(&leaf_key, &issuer).unwrap();

    (
        Certificate::from_der(leaf_cert.der().to_vec()).unwrap(),
        Certificate::from_der(issuer_cert.der().to_vec()).unwrap(),
    )
}

fn build_chain(
    domains: &[&str],
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    generate: impl Fn() -> KeyPair,
) -> Credential {
    let now = OffsetDateTime::now_utc();

    let root_key = generate();
    let root_params = ca_params("Test Root", now);
    let root_cert = root_params.self_signed(&root_key).unwrap();
    let root = Issuer::new(root_params, root_key);

    let intermediate_key = generate();
    let intermediate_params = ca_params("Test Intermediate", now);
    let intermediate_cert = intermediate_params
        .signed_by(&intermediate_key, &root)
        .unwrap();
    let intermediate = Issuer::new(intermediate_params, intermediate_key);

    let leaf_key = generate();
    let names: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
    let mut leaf_params = CertificateParams::new(names).unwrap();
    if let Some(first) = domains.first() {
        leaf_params.distinguished_name.push(DnType::CommonName, *first);
    }
    leaf_params.not_before = not_before;
    leaf_params.not_after = not_after;
    let leaf_cert = leaf_params.signed_by(&leaf_key, &intermediate).unwrap();

    let key = PrivateKeyMaterial::from_pkcs8_der(&leaf_key.serialize_der()).unwrap();
    let chain = [leaf_cert.der(), intermediate_cert.der(), root_cert.der()]
        .into_iter()
        .map(|der| Certificate::from_der(der.to_vec()).unwrap())
        .collect();

    Credential::new(key, chain)
}

fn ca_params(common_name: &str, now: OffsetDateTime) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::default()).unwrap();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.not_before = now - Duration::days(365);
    params.not_after = now + Duration::days(3650);
    params
}
