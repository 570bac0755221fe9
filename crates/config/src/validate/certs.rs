//! Certificate file inspection
//!
//! Looks at certificates already present in the configured slots and warns
//! about files that cannot be read or that are close to expiry. Nothing here
//! is an error: a sync or renewal rewrites these files.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{ValidationResult, ValidationWarning};
use crate::{Config, SlotKind};

const SECONDS_PER_DAY: i64 = 86_400;

/// Slots whose first certificate block is the leaf.
const LEAF_SLOTS: [SlotKind; 4] = [
    SlotKind::AllInOne,
    SlotKind::Certificate,
    SlotKind::CertificateChain,
    SlotKind::PrivateKeyAndCertificate,
];

/// Warn about unreadable or expiring certificates on disk
pub fn validate_existing_certificates(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();
    let now = unix_now();
    let margin = i64::from(config.cert_days_left_min) * SECONDS_PER_DAY;

    for format in &config.save_formats {
        for kind in LEAF_SLOTS {
            let Some(path) = format.slot_path(kind) else {
                continue;
            };
            if !path.exists() {
                continue;
            }

            if let Some(warning) = inspect_leaf(&path, now, margin) {
                result.add_warning(warning);
            }
        }
    }

    result
}

fn inspect_leaf(path: &Path, now: i64, margin: i64) -> Option<ValidationWarning> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            return Some(ValidationWarning::new(format!(
                "Failed to read certificate {}: {}",
                path.display(),
                e
            )))
        }
    };

    let blocks = match pem::parse_many(&data) {
        Ok(blocks) => blocks,
        Err(e) => {
            return Some(ValidationWarning::new(format!(
                "Failed to parse PEM in {}: {}",
                path.display(),
                e
            )))
        }
    };

    // Empty files are simply not populated yet.
    let block = blocks.iter().find(|b| b.tag() == "CERTIFICATE")?;

    let cert = match x509_parser::parse_x509_certificate(block.contents()) {
        Ok((_, cert)) => cert,
        Err(e) => {
            return Some(ValidationWarning::new(format!(
                "Invalid X509 certificate in {}: {}",
                path.display(),
                e
            )))
        }
    };

    let not_after = cert.validity().not_after;
    if not_after.timestamp() < now {
        return Some(ValidationWarning::new(format!(
            "Certificate expired: {} (expired at {})",
            path.display(),
            not_after
        )));
    }

    if not_after.timestamp() < now + margin {
        return Some(ValidationWarning::new(format!(
            "Certificate expires soon: {} (expires at {})",
            path.display(),
            not_after
        )));
    }

    None
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SaveFormat, SlotConfig};
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> Config {
        Config {
            domains: vec!["example.com".to_string()],
            save_formats: vec![SaveFormat::new("main")
                .with_folder(dir.path())
                .with_slot(SlotKind::CertificateChain, SlotConfig::new("chain.pem"))],
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_file_is_fine() {
        let dir = TempDir::new().unwrap();
        let result = validate_existing_certificates(&config_for(&dir));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_garbage_certificate_warns() {
        let dir = TempDir::new().unwrap();
        let garbage = pem::encode(&pem::Pem::new("CERTIFICATE", vec![1, 2, 3]));
        std::fs::write(dir.path().join("chain.pem"), garbage).unwrap();

        let result = validate_existing_certificates(&config_for(&dir));

        assert!(result.is_ok());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("Invalid X509"));
    }

    #[test]
    fn test_file_without_certificate_is_fine() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("chain.pem"), b"").unwrap();

        let result = validate_existing_certificates(&config_for(&dir));
        assert!(result.warnings.is_empty());
    }
}
