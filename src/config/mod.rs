//! Configuration of the finder
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use webcrawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("finder.toml")).unwrap();
//! println!("Crawl starts at {} (max depth: {})", config.first_url, config.request.max_depth);
//! ```

mod parser;
mod types;
pub mod validation;

// Re-export types
pub use types::{ComponentsConfig, Config, MonitorConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
