//! Crawl components: identity, counters, data model and registry
//!
//! Every worker the scheduler drives is a component. It is identified by a
//! [`ComponentId`], keeps its counters and score in a [`ComponentBase`], and
//! implements one of the three role traits: [`Downloader`], [`Analyzer`] or
//! [`Pipeline`]. Components are handed to the scheduler wrapped in a
//! [`ComponentInstance`] and stored in a [`Registry`].

mod base;
mod data;
mod error;
mod id;
mod registry;
mod score;
mod sn;

pub use base::{ComponentBase, HandlingGuard};
pub use data::{Data, HttpResponse, Item, ItemValue, Request, Response};
pub use error::ComponentError;
pub use id::{ComponentAddr, ComponentId, ComponentType, IdParts};
pub use registry::{ComponentInstance, Registry};
pub use score::{calculate_score_simple, set_score, CalculateScore};
pub use sn::SnGenerator;

use async_trait::async_trait;
use serde::Serialize;
use std::net::SocketAddr;

/// Snapshot of a component's four counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Number of times the component was called
    pub called_count: u64,
    /// Number of calls that passed input validation
    pub accepted_count: u64,
    /// Number of calls that finished successfully
    pub completed_count: u64,
    /// Number of calls in progress
    pub handling_number: u64,
}

/// Point-in-time summary of a component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub id: String,
    pub called: u64,
    pub accepted: u64,
    pub completed: u64,
    pub handling: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Introspection shared by every component role
///
/// Implementors only provide [`Component::base`]; everything else reads the
/// embedded [`ComponentBase`].
pub trait Component: Send + Sync {
    fn base(&self) -> &ComponentBase;

    fn id(&self) -> &ComponentId {
        self.base().id()
    }

    fn addr(&self) -> Option<SocketAddr> {
        self.base().addr()
    }

    fn score(&self) -> u64 {
        self.base().score()
    }

    fn set_score(&self, score: u64) {
        self.base().set_score(score)
    }

    fn score_calculator(&self) -> CalculateScore {
        self.base().score_calculator()
    }

    fn counts(&self) -> Counts {
        self.base().counts()
    }

    fn handling_number(&self) -> u64 {
        self.base().handling_number()
    }

    fn clear(&self) {
        self.base().clear()
    }

    fn summary(&self) -> ComponentSummary {
        self.base().summary(None)
    }
}

/// Fetches the resource a request points at
#[async_trait]
pub trait Downloader: Component {
    async fn download(&self, req: Request) -> anyhow::Result<Response>;
}

/// Turns a response into follow-up requests and items
///
/// Requests produced from a response of depth `n` carry depth `n + 1`.
#[async_trait]
pub trait Analyzer: Component {
    async fn analyze(&self, resp: Response) -> (Vec<Data>, Vec<anyhow::Error>);
}

/// Runs an item through a chain of processing steps
#[async_trait]
pub trait Pipeline: Component {
    async fn send(&self, item: Item) -> Vec<anyhow::Error>;

    /// Whether processing stops at the first failing step
    fn fail_fast(&self) -> bool;

    fn set_fail_fast(&self, fail_fast: bool);
}
