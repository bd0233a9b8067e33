//! Parameter groups accepted by [`Scheduler::init`](super::Scheduler::init)

use crate::component::{Analyzer, Downloader, Pipeline};
use crate::{CrawlerError, ErrorType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn illegal(message: &str) -> CrawlerError {
    CrawlerError::illegal_parameter(ErrorType::Scheduler, message)
}

/// Frontier parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArgs {
    /// Primary domains the crawl may enter
    ///
    /// `None` is rejected; an empty list is fine since the first request's
    /// own primary domain is always accepted.
    #[serde(rename = "accepted-domains")]
    pub accepted_domains: Option<Vec<String>>,

    /// Deepest crawl depth admitted; the first request has depth 0
    #[serde(rename = "max-depth")]
    pub max_depth: u32,
}

impl RequestArgs {
    pub fn check(&self) -> Result<(), CrawlerError> {
        if self.accepted_domains.is_none() {
            return Err(illegal("nil accepted primary domain list"));
        }
        Ok(())
    }
}

/// Data-volume parameters: buffer capacity and maximum buffer count per pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataArgs {
    #[serde(rename = "req-buffer-cap")]
    pub req_buffer_cap: u32,
    #[serde(rename = "req-max-buffer-number")]
    pub req_max_buffer_number: u32,
    #[serde(rename = "resp-buffer-cap")]
    pub resp_buffer_cap: u32,
    #[serde(rename = "resp-max-buffer-number")]
    pub resp_max_buffer_number: u32,
    #[serde(rename = "item-buffer-cap")]
    pub item_buffer_cap: u32,
    #[serde(rename = "item-max-buffer-number")]
    pub item_max_buffer_number: u32,
    #[serde(rename = "error-buffer-cap")]
    pub error_buffer_cap: u32,
    #[serde(rename = "error-max-buffer-number")]
    pub error_max_buffer_number: u32,
}

impl DataArgs {
    /// Uses the same capacity and buffer count for all four pools
    pub fn uniform(buffer_cap: u32, max_buffer_number: u32) -> Self {
        Self {
            req_buffer_cap: buffer_cap,
            req_max_buffer_number: max_buffer_number,
            resp_buffer_cap: buffer_cap,
            resp_max_buffer_number: max_buffer_number,
            item_buffer_cap: buffer_cap,
            item_max_buffer_number: max_buffer_number,
            error_buffer_cap: buffer_cap,
            error_max_buffer_number: max_buffer_number,
        }
    }

    pub fn check(&self) -> Result<(), CrawlerError> {
        let fields = [
            (self.req_buffer_cap, "zero request buffer capacity"),
            (self.req_max_buffer_number, "zero max request buffer number"),
            (self.resp_buffer_cap, "zero response buffer capacity"),
            (self.resp_max_buffer_number, "zero max response buffer number"),
            (self.item_buffer_cap, "zero item buffer capacity"),
            (self.item_max_buffer_number, "zero max item buffer number"),
            (self.error_buffer_cap, "zero error buffer capacity"),
            (self.error_max_buffer_number, "zero max error buffer number"),
        ];
        match fields.iter().find(|(value, _)| *value == 0) {
            Some((_, message)) => Err(illegal(message)),
            None => Ok(()),
        }
    }
}

/// The workers a crawl runs with
#[derive(Clone, Default)]
pub struct ModuleArgs {
    pub downloaders: Vec<Arc<dyn Downloader>>,
    pub analyzers: Vec<Arc<dyn Analyzer>>,
    pub pipelines: Vec<Arc<dyn Pipeline>>,
}

impl ModuleArgs {
    pub fn check(&self) -> Result<(), CrawlerError> {
        if self.downloaders.is_empty() {
            return Err(illegal("empty downloader list"));
        }
        if self.analyzers.is_empty() {
            return Err(illegal("empty analyzer list"));
        }
        if self.pipelines.is_empty() {
            return Err(illegal("empty pipeline list"));
        }
        Ok(())
    }

    pub fn summary(&self) -> ModuleArgsSummary {
        ModuleArgsSummary {
            downloader_list_size: self.downloaders.len(),
            analyzer_list_size: self.analyzers.len(),
            pipeline_list_size: self.pipelines.len(),
        }
    }
}

/// Sizes of the worker lists in a [`ModuleArgs`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModuleArgsSummary {
    pub downloader_list_size: usize,
    pub analyzer_list_size: usize,
    pub pipeline_list_size: usize,
}
