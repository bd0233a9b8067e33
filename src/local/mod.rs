//! Ready-made components
//!
//! - [`HttpDownloader`] fetches requests with a shared `reqwest` client
//! - [`ResponseAnalyzer`] runs a list of response parsers over each response
//! - [`ItemPipeline`] pushes each item through a chain of item processors
//!
//! What gets parsed and how items are processed is supplied by the caller, see
//! [`crate::finder`] for one set of parsers and processors.

mod analyzer;
mod downloader;
mod pipeline;

pub use analyzer::{ParseResponse, ResponseAnalyzer};
pub use downloader::{build_http_client, HttpDownloader};
pub use pipeline::{ItemPipeline, ProcessItem};

use crate::component::{CalculateScore, ComponentBase, ComponentError, ComponentId, ComponentType};
use crate::{CrawlerError, ErrorType};

/// Builds the shared base of a local component of `role`
///
/// A bad ID or an ID of another role is reported as an illegal-parameter
/// error of the component's own layer.
fn new_base(
    id: ComponentId,
    score_calculator: Option<CalculateScore>,
    role: ComponentType,
) -> crate::Result<ComponentBase> {
    let error_type = ErrorType::from(role);
    let base = ComponentBase::new(id, score_calculator).map_err(|e| match e {
        ComponentError::IllegalParameter(msg) => CrawlerError::illegal_parameter(error_type, msg),
        other => CrawlerError::new(error_type, other.to_string()),
    })?;
    if base.component_type() != role {
        return Err(CrawlerError::illegal_parameter(
            error_type,
            format!("{} is not a {} ID", base.id(), role),
        ));
    }
    Ok(base)
}
