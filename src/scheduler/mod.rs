//! Crawl scheduler
//!
//! The [`Scheduler`] wires four buffer pools (requests, responses, items,
//! errors) to three concurrently running stages:
//!
//! - **download**: request pool → [`Downloader`](crate::component::Downloader) → response pool
//! - **analyze**: response pool → [`Analyzer`](crate::component::Analyzer) → request/item pools
//! - **pick**: item pool → [`Pipeline`](crate::component::Pipeline)
//!
//! Every request produced along the way passes the crawl frontier (scheme,
//! de-duplication, accepted primary domains, maximum depth) before it is
//! enqueued. Errors from any stage end up in the error pool and can be
//! consumed through [`Scheduler::error_chan`].
//!
//! # Example
//!
//! ```no_run
//! use webcrawler::scheduler::{DataArgs, ModuleArgs, RequestArgs, Scheduler};
//!
//! # async fn demo(modules: ModuleArgs) -> Result<(), webcrawler::CrawlerError> {
//! let scheduler = Scheduler::new();
//! let request_args = RequestArgs {
//!     accepted_domains: Some(vec!["example.com".to_string()]),
//!     max_depth: 1,
//! };
//! scheduler.init(request_args, DataArgs::uniform(10, 2), modules)?;
//!
//! let url = url::Url::parse("http://example.com/").unwrap();
//! scheduler.start(reqwest::Request::new(reqwest::Method::GET, url))?;
//! // ...
//! scheduler.stop()?;
//! # Ok(())
//! # }
//! ```

mod args;
mod domain;
mod engine;
mod frontier;
mod status;
mod summary;

pub use args::{DataArgs, ModuleArgs, ModuleArgsSummary, RequestArgs};
pub use domain::{get_primary_domain, DomainError};
pub use status::{check_status, Status};
pub use summary::{BufferPoolSummary, SchedulerSummary};

use crate::component::{ComponentInstance, ComponentSummary, ComponentType, Registry, Request};
use crate::{CrawlerError, ErrorType};
use engine::{Engine, Pools};
use frontier::Frontier;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Supervises one crawl at a time through `init`, `start` and `stop`
///
/// All methods take `&self`; share the scheduler through an `Arc` to drive it
/// from several tasks. The status lock is only held while checking and
/// setting the status, so slow `init`/`start` work never blocks readers.
#[derive(Debug, Default)]
pub struct Scheduler {
    status: RwLock<Status>,
    registry: Arc<Registry>,
    engine: RwLock<Option<Arc<Engine>>>,
}

impl Scheduler {
    /// Creates a scheduler with a registry of its own
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scheduler working with the caller's registry
    ///
    /// Every `init` clears the registry and fills it from the module
    /// arguments. In between, the caller may register and unregister
    /// components while a crawl runs.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            status: RwLock::default(),
            registry,
            engine: RwLock::default(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Validates the parameters, rebuilds all crawl state and registers the
    /// workers
    ///
    /// Allowed from `Uninitialized`, `Initialized` and `Stopped`. On failure
    /// the previous status and crawl state are left as they were.
    pub fn init(
        &self,
        request_args: RequestArgs,
        data_args: DataArgs,
        module_args: ModuleArgs,
    ) -> Result<(), CrawlerError> {
        info!("Initialize the scheduler...");
        let old_status = self.claim(Status::Initializing)?;
        let result = self.init_engine(request_args, data_args, module_args);
        match &result {
            Ok(()) => {
                self.set_status(Status::Initialized);
                info!("Scheduler has been initialized.");
            }
            Err(e) => {
                self.set_status(old_status);
                warn!("Scheduler initialization failed: {}", e);
            }
        }
        result
    }

    /// Starts crawling from `first_http_req`
    ///
    /// The first request's primary domain is accepted automatically. Must be
    /// called from within a Tokio runtime; the stages run as tasks on it.
    /// Allowed from `Initialized` and `Stopped`.
    pub fn start(&self, first_http_req: reqwest::Request) -> Result<(), CrawlerError> {
        info!("Start the scheduler...");
        let old_status = self.claim(Status::Starting)?;
        let result = catch_unwind(AssertUnwindSafe(|| self.start_engine(first_http_req)))
            .unwrap_or_else(|panic| {
                Err(CrawlerError::scheduler(format!(
                    "fatal scheduler error: {}",
                    panic_message(panic.as_ref())
                )))
            });
        match &result {
            Ok(()) => {
                self.set_status(Status::Started);
                info!("Scheduler has been started.");
            }
            Err(e) => {
                self.set_status(old_status);
                warn!("Scheduler start failed: {}", e);
            }
        }
        result
    }

    /// Cancels the stages and closes every pool
    ///
    /// Only allowed from `Started`.
    pub fn stop(&self) -> Result<(), CrawlerError> {
        info!("Stop the scheduler...");
        self.claim(Status::Stopping)?;
        if let Some(engine) = self.engine() {
            engine.shut_down();
        }
        self.set_status(Status::Stopped);
        info!("Scheduler has been stopped.");
        Ok(())
    }

    pub fn status(&self) -> Status {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a channel relaying errors from the error pool
    ///
    /// Each call gets its own forwarding task, so several receivers compete
    /// for the same errors. The channel closes once the scheduler stops. If
    /// the scheduler was never initialized, or no Tokio runtime is available,
    /// the returned channel is already closed.
    pub fn error_chan(&self) -> mpsc::Receiver<CrawlerError> {
        match (self.engine(), Handle::try_current()) {
            (Some(engine), Ok(_)) => engine.relay_errors(),
            (None, _) => closed_channel(),
            (Some(_), Err(_)) => {
                warn!("No Tokio runtime available. The error channel is closed.");
                closed_channel()
            }
        }
    }

    /// True when no component is handling anything and the request, response
    /// and item pools are empty
    pub fn idle(&self) -> bool {
        self.engine().map_or(true, |engine| engine.idle())
    }

    /// Builds a fresh snapshot of parameters, status, components and pools
    pub fn summary(&self) -> SchedulerSummary {
        let status = self.status();
        let Some(engine) = self.engine() else {
            return SchedulerSummary {
                status,
                ..Default::default()
            };
        };
        SchedulerSummary {
            request_args: engine.request_args.clone(),
            data_args: engine.data_args,
            module_args: engine.module_args,
            status,
            downloaders: component_summaries(&engine.registry, ComponentType::Downloader),
            analyzers: component_summaries(&engine.registry, ComponentType::Analyzer),
            pipelines: component_summaries(&engine.registry, ComponentType::Pipeline),
            request_buffer_pool: BufferPoolSummary::of(&engine.pools.request),
            response_buffer_pool: BufferPoolSummary::of(&engine.pools.response),
            item_buffer_pool: BufferPoolSummary::of(&engine.pools.item),
            error_buffer_pool: BufferPoolSummary::of(&engine.pools.error),
            url_number: engine.frontier.url_count(),
        }
    }

    fn init_engine(
        &self,
        request_args: RequestArgs,
        data_args: DataArgs,
        module_args: ModuleArgs,
    ) -> Result<(), CrawlerError> {
        debug!("Check request arguments...");
        request_args.check()?;
        debug!("Check data arguments...");
        data_args.check()?;
        debug!("Check module arguments...");
        module_args.check()?;

        // A rejected module set must not touch the current crawl state
        register_modules(&Registry::new(), &module_args)?;
        let pools = Pools::new(&data_args)?;
        let frontier = Frontier::new(
            request_args.accepted_domains.as_deref().unwrap_or_default(),
            request_args.max_depth,
        );

        if let Some(previous) = self.engine() {
            previous.pools.close_all();
        }
        self.registry.clear();
        if let Err(e) = register_modules(&self.registry, &module_args) {
            self.set_engine(None);
            return Err(e);
        }
        self.set_engine(Some(Arc::new(Engine {
            module_args: module_args.summary(),
            registry: Arc::clone(&self.registry),
            frontier: Arc::new(frontier),
            pools,
            cancel: CancellationToken::new(),
            request_args,
            data_args,
        })));
        Ok(())
    }

    fn start_engine(&self, first_http_req: reqwest::Request) -> Result<(), CrawlerError> {
        Handle::try_current()
            .map_err(|e| CrawlerError::scheduler(format!("no Tokio runtime available: {}", e)))?;

        let host = first_http_req
            .url()
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                CrawlerError::illegal_parameter(ErrorType::Scheduler, "first HTTP request has no host")
            })?
            .to_string();
        let primary_domain = get_primary_domain(&host)
            .map_err(|e| CrawlerError::illegal_parameter(ErrorType::Scheduler, e.to_string()))?;

        let current = self
            .engine()
            .ok_or_else(|| CrawlerError::scheduler("the scheduler has no buffer pools"))?;
        current.frontier.accept_domain(&primary_domain);
        debug!("Accepted primary domain {:?} of the first request", primary_domain);

        let engine = Arc::new(current.restarted()?);
        self.set_engine(Some(Arc::clone(&engine)));

        engine.launch();
        engine.send_request(Request::new(first_http_req, 0));
        Ok(())
    }

    /// Checks `wanted` against the current status and moves into it
    fn claim(&self, wanted: Status) -> Result<Status, CrawlerError> {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        let current = *status;
        check_status(current, wanted)?;
        *status = wanted;
        Ok(current)
    }

    fn set_status(&self, status: Status) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn engine(&self) -> Option<Arc<Engine>> {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_engine(&self, engine: Option<Arc<Engine>>) {
        *self.engine.write().unwrap_or_else(PoisonError::into_inner) = engine;
    }
}

fn register_modules(registry: &Registry, module_args: &ModuleArgs) -> Result<(), CrawlerError> {
    let instances = module_args
        .downloaders
        .iter()
        .map(|d| ComponentInstance::Downloader(Arc::clone(d)))
        .chain(
            module_args
                .analyzers
                .iter()
                .map(|a| ComponentInstance::Analyzer(Arc::clone(a))),
        )
        .chain(
            module_args
                .pipelines
                .iter()
                .map(|p| ComponentInstance::Pipeline(Arc::clone(p))),
        );

    for instance in instances {
        let component_type = instance.component_type();
        let id = instance.id().clone();
        let added = registry.register(instance).map_err(|e| {
            CrawlerError::scheduler(format!("couldn't register {} instance {}: {}", component_type, id, e))
        })?;
        if !added {
            return Err(CrawlerError::scheduler(format!(
                "couldn't register {} instance with ID {:?}",
                component_type,
                id.as_str()
            )));
        }
    }
    debug!(
        "Registered {} downloaders, {} analyzers and {} pipelines",
        module_args.downloaders.len(),
        module_args.analyzers.len(),
        module_args.pipelines.len()
    );
    Ok(())
}

fn component_summaries(registry: &Registry, component_type: ComponentType) -> Vec<ComponentSummary> {
    let mut instances: Vec<_> = registry.get_all_by_type(component_type).into_iter().collect();
    instances.sort_by(|(a, _), (b, _)| a.cmp(b));
    instances
        .into_iter()
        .map(|(_, instance)| instance.summary())
        .collect()
}

fn closed_channel() -> mpsc::Receiver<CrawlerError> {
    let (_, rx) = mpsc::channel(1);
    rx
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
