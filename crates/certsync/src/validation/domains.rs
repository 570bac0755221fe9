//! Host name matching against subject alternative names.

use std::net::IpAddr;

use crate::certificate::Certificate;

/// Whether `certificate` is valid for `domain`.
///
/// IP literals match IP SANs only. Host names match DNS SANs exactly or
/// through a wildcard covering the left-most label. Comparison ignores case
/// and a trailing dot.
pub fn covers(certificate: &Certificate, domain: &str) -> bool {
    if let Ok(ip) = domain.parse::<IpAddr>() {
        return certificate.ip_addresses().contains(&ip);
    }

    let host = normalize(domain);
    if host.is_empty() {
        return false;
    }
    certificate
        .dns_names()
        .iter()
        .any(|name| name_matches(&normalize(name), &host))
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

fn name_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(suffix) => match host.split_once('.') {
            Some((label, rest)) => !label.is_empty() && rest == suffix,
            None => false,
        },
        None => pattern == host,
    }
}
