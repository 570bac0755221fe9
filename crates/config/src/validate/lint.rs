//! Configuration linting for best practices
//!
//! Checks configuration for settings that work but are probably not intended.

use super::{ValidationResult, ValidationWarning};
use crate::{Config, SlotKind};

/// Lint configuration for best practices
pub fn lint_config(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.email.is_none() {
        result.add_warning(ValidationWarning::new(
            "No contact email configured (recommended so the CA can send expiry notices)",
        ));
    }

    if config.cert_days_left_min == 0 {
        result.add_warning(ValidationWarning::new(
            "cert-days-left-min is 0; certificates are only renewed once expired",
        ));
    }

    for format in &config.save_formats {
        for kind in format.configured_slots() {
            let Some(mode) = format.slot_mode(kind) else {
                continue;
            };

            // Private keys readable by others
            if kind.holds_private_key() && mode.is_group_or_world_accessible() {
                result.add_warning(ValidationWarning::new(format!(
                    "Slot '{}' of save format '{}' holds the private key but has mode {}",
                    kind, format.name, mode
                )));
            }
        }

        let holds_leaf = [
            SlotKind::AllInOne,
            SlotKind::Certificate,
            SlotKind::CertificateChain,
            SlotKind::PrivateKeyAndCertificate,
        ]
        .into_iter()
        .any(|kind| format.slot(kind).is_some());
        let holds_intermediates = [
            SlotKind::Intermediate,
            SlotKind::IntermediatePattern,
        ]
        .into_iter()
        .any(|kind| format.slot(kind).is_some());

        if holds_intermediates && !holds_leaf {
            result.add_warning(ValidationWarning::new(format!(
                "Save format '{}' stores intermediates but no leaf certificate",
                format.name
            )));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SaveFormat, SlotConfig};
    use certsync_common::FileMode;

    fn base_config() -> Config {
        Config {
            domains: vec!["example.com".to_string()],
            email: Some("admin@example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_lint_missing_email() {
        let config = Config {
            email: None,
            ..base_config()
        };

        let result = lint_config(&config);

        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("No contact email")));
    }

    #[test]
    fn test_lint_world_readable_key() {
        let mut config = base_config();
        config.save_formats = vec![SaveFormat::new("loose").with_slot(
            SlotKind::PrivateKey,
            SlotConfig::new("key.pem").with_mode(FileMode::new(0o644)),
        )];

        let result = lint_config(&config);

        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("holds the private key")));
    }

    #[test]
    fn test_lint_default_modes_are_quiet() {
        let mut config = base_config();
        config.save_formats = vec![SaveFormat::new("strict")
            .with_slot(SlotKind::AllInOne, SlotConfig::new("all.pem"))
            .with_slot(SlotKind::Certificate, SlotConfig::new("cert.pem"))];

        assert!(lint_config(&config).warnings.is_empty());
    }

    #[test]
    fn test_lint_intermediates_without_leaf() {
        let mut config = base_config();
        config.save_formats = vec![SaveFormat::new("chain-only")
            .with_slot(SlotKind::IntermediatePattern, SlotConfig::new("ca{n}.pem"))];

        let result = lint_config(&config);

        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("no leaf certificate")));
    }
}
