//! Parsed X.509 certificates.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;
use x509_parser::time::ASN1Time;
use x509_parser::x509::X509Version;

use crate::codec::CodecError;
use crate::key::PublicKeyMaterial;

/// An X.509 certificate with the fields certsync inspects already extracted.
///
/// Equality is DER byte equality.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    spki: Vec<u8>,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
    can_issue: bool,
}

impl Certificate {
    /// Parse a DER encoded certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, CodecError> {
        let der = der.into();
        let fields = Fields::parse(&der)?;

        Ok(Self {
            der,
            subject: fields.subject,
            issuer: fields.issuer,
            not_before: fields.not_before,
            not_after: fields.not_after,
            spki: fields.spki,
            dns_names: fields.dns_names,
            ip_addresses: fields.ip_addresses,
            can_issue: fields.can_issue,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// DNS names from the subject alternative name extension.
    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    /// IP addresses from the subject alternative name extension.
    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }

    /// DER `SubjectPublicKeyInfo` of the certificate.
    pub fn public_key_der(&self) -> &[u8] {
        &self.spki
    }

    pub fn public_key(&self) -> Result<PublicKeyMaterial, CodecError> {
        PublicKeyMaterial::from_spki_der(&self.spki)
    }

    /// Whether this certificate may sign other certificates: a v1
    /// certificate, or a CA whose key usage, if present, allows it.
    pub fn can_issue(&self) -> bool {
        self.can_issue
    }

    /// Whether `issuer` may issue certificates and this certificate's
    /// signature verifies against its key.
    pub fn is_signed_by(&self, issuer: &Certificate) -> bool {
        if !issuer.can_issue {
            return false;
        }
        let (Ok((_, child)), Ok((_, parent))) = (
            X509Certificate::from_der(&self.der),
            X509Certificate::from_der(&issuer.der),
        ) else {
            return false;
        };
        child.verify_signature(Some(parent.public_key())).is_ok()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("dns_names", &self.dns_names)
            .finish_non_exhaustive()
    }
}

/// Owned copies of the parsed fields.
struct Fields {
    subject: String,
    issuer: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    spki: Vec<u8>,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
    can_issue: bool,
}

impl Fields {
    fn parse(der: &[u8]) -> Result<Self, CodecError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| CodecError::Certificate(e.to_string()))?;

        let validity = cert.validity();
        let not_before = to_datetime(&validity.not_before)?;
        let not_after = to_datetime(&validity.not_after)?;

        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();
        let san = cert
            .subject_alternative_name()
            .map_err(|e| CodecError::Certificate(e.to_string()))?;
        if let Some(san) = san {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                    GeneralName::IPAddress(bytes) => {
                        if let Some(ip) = ip_from_bytes(bytes) {
                            ip_addresses.push(ip);
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_before,
            not_after,
            spki: cert.public_key().raw.to_vec(),
            dns_names,
            ip_addresses,
            can_issue: can_issue(&cert),
        })
    }
}

fn can_issue(cert: &X509Certificate<'_>) -> bool {
    if cert.version() != X509Version::V3 {
        return true;
    }
    let is_ca = matches!(cert.basic_constraints(), Ok(Some(constraints)) if constraints.value.ca);
    let may_sign = match cert.key_usage() {
        Ok(Some(usage)) => usage.value.key_cert_sign(),
        Ok(None) => true,
        Err(_) => false,
    };
    is_ca && may_sign
}

fn to_datetime(time: &ASN1Time) -> Result<DateTime<Utc>, CodecError> {
    DateTime::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| CodecError::Certificate(format!("timestamp out of range: {}", time)))
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}
