//! Save format structure validation

use std::collections::HashSet;

use certsync_common::NUMBER_PLACEHOLDER;

use super::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};
use crate::{Config, SlotKind};

/// Validate save format names, slots and file patterns
pub fn validate_formats(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.save_formats.is_empty() {
        result.add_error(ValidationError::new(
            ErrorCategory::Format,
            "At least one save format is required",
        ));
        return result;
    }

    let mut seen = HashSet::new();
    for format in &config.save_formats {
        if format.name.trim().is_empty() {
            result.add_error(ValidationError::new(
                ErrorCategory::Format,
                "Save format name may not be empty",
            ));
        } else if !seen.insert(format.name.as_str()) {
            result.add_error(ValidationError::new(
                ErrorCategory::Format,
                format!("Save format '{}' is declared more than once", format.name),
            ));
        }

        if format.slots.is_empty() {
            result.add_error(ValidationError::new(
                ErrorCategory::Format,
                format!("Save format '{}' declares no slots", format.name),
            ));
            continue;
        }

        for (kind, slot) in &format.slots {
            let path = slot.path.to_string_lossy();
            let file_name = slot
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            if file_name.is_empty() {
                result.add_error(ValidationError::new(
                    ErrorCategory::Format,
                    format!(
                        "Slot '{}' in save format '{}' has no file name",
                        kind, format.name
                    ),
                ));
                continue;
            }

            let placeholders = path.matches(NUMBER_PLACEHOLDER).count();
            if kind.is_pattern() {
                if placeholders != 1 || !file_name.contains(NUMBER_PLACEHOLDER) {
                    result.add_error(ValidationError::new(
                        ErrorCategory::Pattern,
                        format!(
                            "Pattern '{}' in save format '{}' must contain exactly one {} in its file name",
                            path, format.name, NUMBER_PLACEHOLDER
                        ),
                    ));
                }
            } else if placeholders > 0 {
                result.add_warning(ValidationWarning::new(format!(
                    "Slot '{}' in save format '{}' is not a pattern; {} in '{}' is used literally",
                    kind, format.name, NUMBER_PLACEHOLDER, path
                )));
            }
        }

        if format.slot(SlotKind::Intermediate).is_some()
            && format.slot(SlotKind::IntermediatePattern).is_some()
        {
            result.add_warning(ValidationWarning::new(format!(
                "Save format '{}' stores intermediates both in a single file and a pattern",
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

    fn config_with(formats: Vec<SaveFormat>) -> Config {
        Config {
            domains: vec!["example.com".to_string()],
            save_formats: formats,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_formats() {
        let result = validate_formats(&config_with(vec![]));
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("save format"));
    }

    #[test]
    fn test_duplicate_names() {
        let format = SaveFormat::new("dup").with_slot(SlotKind::Certificate, SlotConfig::new("c.pem"));
        let result = validate_formats(&config_with(vec![format.clone(), format]));
        assert!(result
            .errors
            .iter()
            .any(|e| e.message.contains("more than once")));
    }

    #[test]
    fn test_format_without_slots() {
        let result = validate_formats(&config_with(vec![SaveFormat::new("bare")]));
        assert!(result.errors[0].message.contains("declares no slots"));
    }

    #[test]
    fn test_pattern_placeholder_count() {
        let missing = SaveFormat::new("missing")
            .with_slot(SlotKind::IntermediatePattern, SlotConfig::new("chain.pem"));
        let doubled = SaveFormat::new("doubled")
            .with_slot(SlotKind::IntermediatePattern, SlotConfig::new("c{n}-{n}.pem"));
        let good = SaveFormat::new("good")
            .with_slot(SlotKind::IntermediatePattern, SlotConfig::new("chain{n}.pem"));

        let result = validate_formats(&config_with(vec![missing, doubled, good]));

        let patterns: Vec<_> = result
            .errors
            .iter()
            .filter(|e| e.category == ErrorCategory::Pattern)
            .collect();
        assert_eq!(patterns.len(), 2);
        assert!(patterns[0].message.contains("'missing'"));
        assert!(patterns[1].message.contains("'doubled'"));
    }

    #[test]
    fn test_placeholder_in_folder_rejected() {
        let format = SaveFormat::new("nested")
            .with_slot(SlotKind::IntermediatePattern, SlotConfig::new("dir{n}/chain.pem"));
        let result = validate_formats(&config_with(vec![format]));
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_literal_placeholder_warns() {
        let format = SaveFormat::new("odd")
            .with_slot(SlotKind::Certificate, SlotConfig::new("cert{n}.pem"));
        let result = validate_formats(&config_with(vec![format]));
        assert!(result.is_ok());
        assert!(result.warnings[0].message.contains("used literally"));
    }
}
