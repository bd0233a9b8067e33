//! Crawl frontier policy
//!
//! Decides which requests may enter the request pool:
//! - only `http`/`https` URLs
//! - each distinct URL at most once
//! - only hosts whose primary domain was accepted
//! - only up to the maximum crawl depth

use super::domain::get_primary_domain;
use crate::component::Request;
use dashmap::DashSet;
use std::fmt;

/// Why a request was kept out of the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    InvalidRequest,
    UnsupportedScheme(String),
    Duplicate,
    UnacceptedDomain(String),
    TooDeep { depth: u32, max_depth: u32 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InvalidRequest => f.write_str("invalid request"),
            Rejection::UnsupportedScheme(scheme) => write!(f, "unsupported scheme {:?}", scheme),
            Rejection::Duplicate => f.write_str("repeated URL"),
            Rejection::UnacceptedDomain(domain) => write!(f, "unaccepted domain {:?}", domain),
            Rejection::TooDeep { depth, max_depth } => {
                write!(f, "depth {} exceeds the maximum of {}", depth, max_depth)
            }
        }
    }
}

/// Accepted domains, maximum depth and the set of URLs already admitted
#[derive(Debug)]
pub(crate) struct Frontier {
    max_depth: u32,
    accepted_domains: DashSet<String>,
    urls: DashSet<String>,
}

impl Frontier {
    pub(crate) fn new(accepted_domains: &[String], max_depth: u32) -> Self {
        let frontier = Self {
            max_depth,
            accepted_domains: DashSet::new(),
            urls: DashSet::new(),
        };
        for domain in accepted_domains {
            frontier.accept_domain(domain);
        }
        frontier
    }

    pub(crate) fn accept_domain(&self, domain: &str) {
        self.accepted_domains.insert(domain.to_lowercase());
    }

    /// Number of distinct URLs admitted so far
    pub(crate) fn url_count(&self) -> u64 {
        self.urls.len() as u64
    }

    /// Applies the frontier rules, recording the URL on admission
    ///
    /// Concurrent callers racing with the same URL see exactly one admission.
    pub(crate) fn admit(&self, req: &Request) -> Result<(), Rejection> {
        if !req.valid() {
            return Err(Rejection::InvalidRequest);
        }
        let url = req.url();
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Rejection::UnsupportedScheme(scheme.to_string()));
        }
        if self.urls.contains(url.as_str()) {
            return Err(Rejection::Duplicate);
        }

        let host = url.host_str().unwrap_or_default();
        let primary_domain = get_primary_domain(host)
            .map_err(|_| Rejection::UnacceptedDomain(host.to_string()))?;
        if !self.accepted_domains.contains(&primary_domain.to_lowercase()) {
            return Err(Rejection::UnacceptedDomain(primary_domain));
        }

        if req.depth() > self.max_depth {
            return Err(Rejection::TooDeep {
                depth: req.depth(),
                max_depth: self.max_depth,
            });
        }

        if !self.urls.insert(url.as_str().to_string()) {
            return Err(Rejection::Duplicate);
        }
        Ok(())
    }
}
