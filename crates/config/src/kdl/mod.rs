//! KDL configuration parsing.

use anyhow::{anyhow, Result};
use tracing::trace;

use crate::{Config, DEFAULT_CERT_DAYS_LEFT_MIN, DEFAULT_KEY_LENGTH};

mod helpers;
mod save_format;

pub use save_format::parse_save_format;

use helpers::{find_node, get_int_entry, get_string_args, get_string_entry};

/// Top-level node names this parser understands.
const KNOWN_NODES: &[&str] = &[
    "domains",
    "email",
    "cert-days-left-min",
    "key-length",
    "root",
    "save-format",
];

/// Parse a KDL document into a [`Config`].
pub fn parse_config(content: &str) -> Result<Config> {
    let doc: kdl::KdlDocument = content
        .parse()
        .map_err(|e: kdl::KdlError| anyhow!("{:?}", miette::Report::new(e)))?;

    for node in doc.nodes() {
        let name = node.name().value();
        if !KNOWN_NODES.contains(&name) {
            return Err(anyhow!(
                "Unknown configuration node '{}'. Valid nodes: {}",
                name,
                KNOWN_NODES.join(", ")
            ));
        }
    }

    let domains = find_node(&doc, "domains")
        .map(get_string_args)
        .unwrap_or_default();

    let cert_days_left_min = match get_int_entry(&doc, "cert-days-left-min") {
        Some(days) => u32::try_from(days)
            .map_err(|_| anyhow!("'cert-days-left-min' must be a non-negative integer, got {}", days))?,
        None => DEFAULT_CERT_DAYS_LEFT_MIN,
    };

    let key_length = match get_int_entry(&doc, "key-length") {
        Some(bits) => u32::try_from(bits)
            .map_err(|_| anyhow!("'key-length' must be a non-negative integer, got {}", bits))?,
        None => DEFAULT_KEY_LENGTH,
    };

    let mut save_formats = Vec::new();
    for node in doc.nodes() {
        if node.name().value() == "save-format" {
            save_formats.push(parse_save_format(node)?);
        }
    }

    let config = Config {
        domains,
        email: get_string_entry(&doc, "email"),
        cert_days_left_min,
        key_length,
        root: get_string_entry(&doc, "root").map(Into::into),
        save_formats,
    };

    trace!(
        domains = config.domains.len(),
        save_formats = config.save_formats.len(),
        "Parsed configuration"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotKind;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
domains "example.com" "www.example.com"
email "admin@example.com"
cert-days-left-min 14
key-length 4096

save-format "split" {
    certificate "cert.pem"
    intermediate-pattern "chain{n}.pem"
}
"#,
        )
        .unwrap();

        assert_eq!(config.domains, vec!["example.com", "www.example.com"]);
        assert_eq!(config.email.as_deref(), Some("admin@example.com"));
        assert_eq!(config.cert_days_left_min, 14);
        assert_eq!(config.key_length, 4096);
        assert_eq!(config.save_formats.len(), 1);
        assert!(config.save_formats[0]
            .slot(SlotKind::IntermediatePattern)
            .is_some());
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(r#"domains "a.example""#).unwrap();
        assert_eq!(config.cert_days_left_min, DEFAULT_CERT_DAYS_LEFT_MIN);
        assert_eq!(config.key_length, DEFAULT_KEY_LENGTH);
        assert!(config.save_formats.is_empty());
    }

    #[test]
    fn test_unknown_node_rejected() {
        let err = parse_config(r#"listener "http""#).unwrap_err();
        assert!(err.to_string().contains("Unknown configuration node"));
    }

    #[test]
    fn test_negative_days_rejected() {
        let err = parse_config("cert-days-left-min -3").unwrap_err();
        assert!(err.to_string().contains("cert-days-left-min"));
    }

    #[test]
    fn test_syntax_error_reported() {
        assert!(parse_config("save-format \"x\" {").is_err());
    }
}
