//! Webcrawler: a concurrent crawl-scheduling engine
//!
//! This crate coordinates pluggable download, analyze and pipeline workers
//! through elastic buffer pools, enforces a crawl frontier (accepted domains,
//! depth limit, URL de-duplication) and supervises the whole run through a
//! small lifecycle state machine.
//!
//! The engine lives in [`scheduler`]; workers implement the role traits from
//! [`component`] and are registered through a [`component::Registry`]. The
//! [`local`], [`finder`] and [`monitor`] modules ship ready-made workers and
//! supervision for the `finder` image crawler binary.

pub mod buffer;
pub mod component;
pub mod config;
pub mod finder;
pub mod local;
pub mod monitor;
pub mod scheduler;

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The layer a [`CrawlerError`] originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Downloader,
    Analyzer,
    Pipeline,
    Scheduler,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorType::Downloader => "downloader error",
            ErrorType::Analyzer => "analyzer error",
            ErrorType::Pipeline => "pipeline error",
            ErrorType::Scheduler => "scheduler error",
        };
        f.write_str(name)
    }
}

/// What went wrong, independent of the layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorDetail {
    #[error("illegal parameter: {0}")]
    IllegalParameter(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("{0}")]
    Message(String),
}

/// Main error type of the crawl engine, tagged with its originating layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("crawler error: {error_type}: {detail}")]
pub struct CrawlerError {
    error_type: ErrorType,
    detail: ErrorDetail,
}

impl CrawlerError {
    /// Creates a plain error of the given layer
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            detail: ErrorDetail::Message(message.into()),
        }
    }

    /// Creates an illegal-parameter error of the given layer
    pub fn illegal_parameter(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            detail: ErrorDetail::IllegalParameter(message.into()),
        }
    }

    /// Creates a scheduler error
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Scheduler, message)
    }

    /// Creates a scheduler error for a rejected status transition
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Scheduler,
            detail: ErrorDetail::IllegalState(message.into()),
        }
    }

    /// Returns the layer this error was raised in
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// Returns the detail carried by this error
    pub fn detail(&self) -> &ErrorDetail {
        &self.detail
    }

    pub fn is_illegal_parameter(&self) -> bool {
        matches!(self.detail, ErrorDetail::IllegalParameter(_))
    }

    pub fn is_illegal_state(&self) -> bool {
        matches!(self.detail, ErrorDetail::IllegalState(_))
    }

    /// Tags an arbitrary worker error with a layer
    ///
    /// Errors that already are a [`CrawlerError`] keep their own tag; anything
    /// else is wrapped as a plain error of `fallback`.
    pub fn tag(error: anyhow::Error, fallback: ErrorType) -> Self {
        match error.downcast::<CrawlerError>() {
            Ok(tagged) => tagged,
            Err(other) => Self::new(fallback, format!("{:#}", other)),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawl engine operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use component::{ComponentId, ComponentType, Data, Item, Registry, Request, Response};
pub use config::Config;
pub use scheduler::{DataArgs, ModuleArgs, RequestArgs, Scheduler, SchedulerSummary, Status};
