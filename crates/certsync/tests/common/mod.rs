//! Shared fixtures for integration tests.

use std::path::Path;

use certsync::Credential;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::RsaPrivateKey;
use time::{Duration, OffsetDateTime};

/// PEM text of a fresh key and its `[leaf, intermediate, root]` chain.
pub struct PemCredential {
    pub key: String,
    pub chain: String,
}

impl PemCredential {
    pub fn generate(domains: &[&str]) -> Self {
        Self::build(domains, || KeyPair::generate().unwrap())
    }

    /// RSA keys throughout, with the leaf key written as PKCS#1
    /// (`RSA PRIVATE KEY`).
    pub fn generate_rsa(domains: &[&str]) -> Self {
        let mut issued = Self::build(domains, rsa_key_pair);
        let key = RsaPrivateKey::from_pkcs8_pem(&issued.key).unwrap();
        issued.key = key.to_pkcs1_pem(LineEnding::LF).unwrap().to_string();
        issued
    }

    fn build(domains: &[&str], generate: impl Fn() -> KeyPair) -> Self {
        let now = OffsetDateTime::now_utc();

        let root_key = generate();
        let root_params = ca_params("Integration Root", now);
        let root_cert = root_params.self_signed(&root_key).unwrap();
        let root = Issuer::new(root_params, root_key);

        let intermediate_key = generate();
        let intermediate_params = ca_params("Integration Intermediate", now);
        let intermediate_cert = intermediate_params
            .signed_by(&intermediate_key, &root)
            .unwrap();
        let intermediate = Issuer::new(intermediate_params, intermediate_key);

        let leaf_key = generate();
        let names: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
        let mut leaf_params = CertificateParams::new(names).unwrap();
        leaf_params.not_before = now - Duration::days(1);
        leaf_params.not_after = now + Duration::days(90);
        let leaf_cert = leaf_params.signed_by(&leaf_key, &intermediate).unwrap();

        Self {
            key: leaf_key.serialize_pem(),
            chain: [leaf_cert.pem(), intermediate_cert.pem(), root_cert.pem()].concat(),
        }
    }

    pub fn credential(&self) -> Credential {
        Credential::from_pem(self.key.as_bytes(), self.chain.as_bytes()).unwrap()
    }

    pub fn write_to(&self, dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let key = dir.join("issued-key.pem");
        let chain = dir.join("issued-chain.pem");
        std::fs::write(&key, &self.key).unwrap();
        std::fs::write(&chain, &self.chain).unwrap();
        (key, chain)
    }
}

fn rsa_key_pair() -> KeyPair {
    let key = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 2048).unwrap();
    let der = key.to_pkcs8_der().unwrap();
    KeyPair::try_from(der.as_bytes()).unwrap()
}

fn ca_params(common_name: &str, now: OffsetDateTime) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::default()).unwrap();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.not_before = now - Duration::days(30);
    params.not_after = now + Duration::days(3650);
    params
}

/// A config file with three save formats under `dir`.
pub fn write_config(dir: &Path) -> std::path::PathBuf {
    for folder in ["nginx", "haproxy", "split"] {
        std::fs::create_dir_all(dir.join("ssl").join(folder)).unwrap();
    }

    let path = dir.join("certsync.kdl");
    std::fs::write(
        &path,
        r#"
domains "example.com" "www.example.com"
email "admin@example.com"
cert-days-left-min 30
root "ssl"

save-format "nginx" {
    folder "nginx"
    certificate-chain "fullchain.pem" mode=0o644
    private-key "privkey.pem" mode=0o600
}
save-format "haproxy" {
    folder "haproxy"
    all-in-one "haproxy.pem"
}
save-format "split" {
    folder "split"
    certificate "cert.pem"
    intermediate-pattern "chain{n}.pem"
}
"#,
    )
    .unwrap();
    path
}
