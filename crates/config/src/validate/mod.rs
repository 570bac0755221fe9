//! Configuration validation
//!
//! Every check appends to a [`ValidationResult`] instead of stopping at the
//! first problem, so a single run reports everything that is wrong.

use std::fmt;

use serde::Serialize;

use crate::Config;

#[cfg(feature = "validation")]
mod certs;
mod formats;
mod lint;
mod paths;

#[cfg(feature = "validation")]
pub use certs::validate_existing_certificates;
pub use formats::validate_formats;
pub use lint::lint_config;
pub use paths::validate_paths;

/// Longest renewal margin accepted, in days.
pub const MAX_CERT_DAYS_LEFT_MIN: u32 = 365;

/// Smallest RSA key size accepted, in bits.
pub const MIN_KEY_LENGTH: u32 = 2048;

/// Area of the configuration a problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Domain,
    Format,
    Pattern,
    Path,
    Limits,
    Certificate,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Domain => "domain",
            ErrorCategory::Format => "format",
            ErrorCategory::Pattern => "pattern",
            ErrorCategory::Path => "path",
            ErrorCategory::Limits => "limits",
            ErrorCategory::Certificate => "certificate",
        };
        f.write_str(name)
    }
}

/// A problem that makes the configuration unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ValidationError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Something worth fixing that does not block operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub message: String,
}

impl ValidationWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Accumulated errors and warnings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Append everything found by another check.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run every configuration check.
pub fn validate_config(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.domains.is_empty() {
        result.add_error(ValidationError::new(
            ErrorCategory::Domain,
            "At least one domain is required",
        ));
    }
    for domain in &config.domains {
        if domain.trim().is_empty() {
            result.add_error(ValidationError::new(
                ErrorCategory::Domain,
                "Empty domain name",
            ));
        }
    }

    if config.cert_days_left_min > MAX_CERT_DAYS_LEFT_MIN {
        result.add_error(ValidationError::new(
            ErrorCategory::Limits,
            format!(
                "cert-days-left-min is {} but may not exceed {}",
                config.cert_days_left_min, MAX_CERT_DAYS_LEFT_MIN
            ),
        ));
    }

    if config.key_length < MIN_KEY_LENGTH {
        result.add_error(ValidationError::new(
            ErrorCategory::Limits,
            format!(
                "key-length is {} but must be at least {}",
                config.key_length, MIN_KEY_LENGTH
            ),
        ));
    }

    result.merge(validate_formats(config));
    result.merge(validate_paths(config));
    result.merge(lint_config(config));

    #[cfg(feature = "validation")]
    result.merge(validate_existing_certificates(config));

    result
}
