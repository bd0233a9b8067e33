//! Primary-domain extraction
//!
//! The primary domain of a host is the label right before its public suffix
//! plus the suffix itself: `cn.bing.com` becomes `bing.com`, `www.bbc.co.uk`
//! becomes `bbc.co.uk`. The suffix table below is a small approximation of
//! the public suffix list.

use std::net::IpAddr;
use thiserror::Error;

/// Errors raised while extracting a primary domain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("empty host")]
    EmptyHost,

    #[error("unrecognized host: {0}")]
    UnrecognizedHost(String),
}

/// Roots that may carry a two-letter country code after them (`com.cn`)
const COUNTRY_QUALIFIED_ROOTS: &[&str] = &["com", "gov", "net", "org", "co"];

/// Roots that only ever appear as the last label
const PLAIN_ROOTS: &[&str] = &[
    "me", "biz", "info", "name", "mobi", "so", "asia", "tel", "tv", "cc",
];

/// Returns the primary domain of `host`
///
/// IP literals (with or without IPv6 brackets) are returned unchanged.
///
/// # Example
///
/// ```
/// use webcrawler::scheduler::get_primary_domain;
///
/// assert_eq!(get_primary_domain("cn.bing.com").unwrap(), "bing.com");
/// assert_eq!(get_primary_domain("127.0.0.1").unwrap(), "127.0.0.1");
/// ```
pub fn get_primary_domain(host: &str) -> Result<String, DomainError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(DomainError::EmptyHost);
    }
    let unbracketed = host.trim_start_matches('[').trim_end_matches(']');
    if unbracketed.parse::<IpAddr>().is_ok() {
        return Ok(host.to_string());
    }

    let suffix_len = public_suffix_len(host)
        .ok_or_else(|| DomainError::UnrecognizedHost(host.to_string()))?;
    // The suffix must be preceded by a dot and at least one label character
    let suffix_start = host.len() - suffix_len;
    if suffix_start <= 1 {
        return Err(DomainError::UnrecognizedHost(host.to_string()));
    }

    let first_part = &host[..suffix_start - 1];
    let label_start = first_part.rfind('.').map_or(0, |i| i + 1);
    Ok(host[label_start..].to_string())
}

/// Length of the recognised suffix of `host`, without its leading dot
fn public_suffix_len(host: &str) -> Option<usize> {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    let last = labels[labels.len() - 1];
    let second_last = labels[labels.len() - 2];

    for root in COUNTRY_QUALIFIED_ROOTS {
        if last == *root {
            return Some(last.len());
        }
        if second_last == *root && is_country_code(last) && labels.len() > 2 {
            return Some(second_last.len() + 1 + last.len());
        }
    }
    if PLAIN_ROOTS.contains(&last) || is_country_code(last) {
        return Some(last.len());
    }
    None
}

fn is_country_code(label: &str) -> bool {
    label.len() == 2 && label.chars().all(|c| c.is_alphanumeric() || c == '_')
}
