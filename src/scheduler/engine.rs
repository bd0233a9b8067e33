//! The running half of the scheduler: pools, stages and data routing

use super::args::{DataArgs, ModuleArgsSummary, RequestArgs};
use super::frontier::Frontier;
use crate::buffer::Pool;
use crate::component::{
    ComponentId, ComponentInstance, ComponentType, Data, Item, Registry, Request, Response,
};
use crate::{CrawlerError, ErrorType};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Pause before a stage retries after finding no component of its role
const NO_COMPONENT_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// The four buffer pools connecting the stages
#[derive(Debug, Clone)]
pub(crate) struct Pools {
    pub(crate) request: Arc<Pool<Request>>,
    pub(crate) response: Arc<Pool<Response>>,
    pub(crate) item: Arc<Pool<Item>>,
    pub(crate) error: Arc<Pool<CrawlerError>>,
}

impl Pools {
    pub(crate) fn new(args: &DataArgs) -> Result<Self, CrawlerError> {
        Ok(Self {
            request: new_pool("request", args.req_buffer_cap, args.req_max_buffer_number)?,
            response: new_pool("response", args.resp_buffer_cap, args.resp_max_buffer_number)?,
            item: new_pool("item", args.item_buffer_cap, args.item_max_buffer_number)?,
            error: new_pool("error", args.error_buffer_cap, args.error_max_buffer_number)?,
        })
    }

    /// Replaces closed pools with fresh ones of the same shape
    pub(crate) fn reopened(&self) -> Result<Self, CrawlerError> {
        Ok(Self {
            request: reopen("request", &self.request)?,
            response: reopen("response", &self.response)?,
            item: reopen("item", &self.item)?,
            error: reopen("error", &self.error)?,
        })
    }

    pub(crate) fn close_all(&self) {
        self.request.close();
        self.response.close();
        self.item.close();
        self.error.close();
    }
}

fn new_pool<T>(name: &str, buffer_cap: u32, max_buffer_number: u32) -> Result<Arc<Pool<T>>, CrawlerError> {
    debug!(
        "Create the {} buffer pool (buffer capacity: {}, max buffer number: {})",
        name, buffer_cap, max_buffer_number
    );
    Pool::new(buffer_cap, max_buffer_number)
        .map(Arc::new)
        .map_err(|e| CrawlerError::scheduler(format!("couldn't create the {} buffer pool: {}", name, e)))
}

fn reopen<T>(name: &str, pool: &Arc<Pool<T>>) -> Result<Arc<Pool<T>>, CrawlerError> {
    if !pool.closed() {
        return Ok(Arc::clone(pool));
    }
    new_pool(name, pool.buffer_cap(), pool.max_buffer_number())
}

/// Everything the stages share during one run
#[derive(Debug)]
pub(crate) struct Engine {
    pub(crate) request_args: RequestArgs,
    pub(crate) data_args: DataArgs,
    pub(crate) module_args: ModuleArgsSummary,
    pub(crate) registry: Arc<Registry>,
    pub(crate) frontier: Arc<Frontier>,
    pub(crate) pools: Pools,
    pub(crate) cancel: CancellationToken,
}

impl Engine {
    /// A copy ready for another start: closed pools reopened, fresh token if
    /// the previous one already fired
    pub(crate) fn restarted(&self) -> Result<Self, CrawlerError> {
        let cancel = if self.cancel.is_cancelled() {
            CancellationToken::new()
        } else {
            self.cancel.clone()
        };
        Ok(Self {
            request_args: self.request_args.clone(),
            data_args: self.data_args,
            module_args: self.module_args,
            registry: Arc::clone(&self.registry),
            frontier: Arc::clone(&self.frontier),
            pools: self.pools.reopened()?,
            cancel,
        })
    }

    /// Spawns the download, analyze and pick stages on the current runtime
    pub(crate) fn launch(self: &Arc<Self>) {
        tokio::spawn(Arc::clone(self).download());
        tokio::spawn(Arc::clone(self).analyze());
        tokio::spawn(Arc::clone(self).pick());
    }

    /// Fires the cancellation token and closes every pool
    pub(crate) fn shut_down(&self) {
        self.cancel.cancel();
        self.pools.close_all();
    }

    /// No component is busy and no request, response or item is waiting
    pub(crate) fn idle(&self) -> bool {
        let busy = self
            .registry
            .get_all()
            .values()
            .any(|instance| instance.handling_number() > 0);
        !busy
            && self.pools.request.total() == 0
            && self.pools.response.total() == 0
            && self.pools.item.total() == 0
    }

    /// Forwards errors from the error pool into a fresh channel until stop
    pub(crate) fn relay_errors(&self) -> mpsc::Receiver<CrawlerError> {
        let (tx, rx) = mpsc::channel(self.pools.error.buffer_cap().max(1) as usize);
        let pool = Arc::clone(&self.pools.error);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let error = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    error = pool.get() => match error {
                        Ok(error) => error,
                        Err(_) => {
                            warn!("The error buffer pool was closed. Break error reception.");
                            break;
                        }
                    },
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = tx.send(error) => {
                        if sent.is_err() {
                            debug!("Error receiver dropped. Stop forwarding errors.");
                            break;
                        }
                    }
                }
            }
        });
        rx
    }

    async fn download(self: Arc<Self>) {
        loop {
            let req = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                req = self.pools.request.get() => match req {
                    Ok(req) => req,
                    Err(_) => {
                        warn!("The request buffer pool was closed. Break request reception.");
                        break;
                    }
                },
            };
            self.download_one(req).await;
        }
    }

    async fn download_one(&self, req: Request) {
        let downloader = match self.select(ComponentType::Downloader, ComponentInstance::as_downloader) {
            Ok(downloader) => downloader,
            Err(e) => {
                self.send_error(e);
                self.resend_request(req);
                tokio::time::sleep(NO_COMPONENT_RETRY_INTERVAL).await;
                return;
            }
        };
        let id = downloader.id().clone();
        match downloader.download(req).await {
            Ok(resp) => self.send_response(resp),
            Err(e) => self.send_worker_error(e, &id),
        }
    }

    async fn analyze(self: Arc<Self>) {
        loop {
            let resp = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                resp = self.pools.response.get() => match resp {
                    Ok(resp) => resp,
                    Err(_) => {
                        warn!("The response buffer pool was closed. Break response reception.");
                        break;
                    }
                },
            };
            self.analyze_one(resp).await;
        }
    }

    async fn analyze_one(&self, resp: Response) {
        let analyzer = match self.select(ComponentType::Analyzer, ComponentInstance::as_analyzer) {
            Ok(analyzer) => analyzer,
            Err(e) => {
                self.send_error(e);
                self.send_response(resp);
                tokio::time::sleep(NO_COMPONENT_RETRY_INTERVAL).await;
                return;
            }
        };
        let id = analyzer.id().clone();
        let (data, errors) = analyzer.analyze(resp).await;
        for datum in data {
            match datum {
                Data::Request(req) => {
                    self.send_request(req);
                }
                Data::Item(item) => self.send_item(item),
            }
        }
        for error in errors {
            self.send_worker_error(error, &id);
        }
    }

    async fn pick(self: Arc<Self>) {
        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                item = self.pools.item.get() => match item {
                    Ok(item) => item,
                    Err(_) => {
                        warn!("The item buffer pool was closed. Break item reception.");
                        break;
                    }
                },
            };
            self.pick_one(item).await;
        }
    }

    async fn pick_one(&self, item: Item) {
        let pipeline = match self.select(ComponentType::Pipeline, ComponentInstance::as_pipeline) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                self.send_error(e);
                self.send_item(item);
                tokio::time::sleep(NO_COMPONENT_RETRY_INTERVAL).await;
                return;
            }
        };
        let id = pipeline.id().clone();
        for error in pipeline.send(item).await {
            self.send_worker_error(error, &id);
        }
    }

    /// Resolves the least busy component of a role
    fn select<T: ?Sized>(
        &self,
        component_type: ComponentType,
        cast: impl Fn(&ComponentInstance) -> Option<&Arc<T>>,
    ) -> Result<Arc<T>, CrawlerError> {
        let instance = self.registry.get(component_type).map_err(|e| {
            CrawlerError::scheduler(format!("couldn't get a {}: {}", component_type, e))
        })?;
        cast(&instance).cloned().ok_or_else(|| {
            CrawlerError::scheduler(format!(
                "incorrect {} type: ID: {}",
                component_type,
                instance.id()
            ))
        })
    }

    /// Runs a request through the frontier and enqueues it if admitted
    pub(crate) fn send_request(&self, req: Request) -> bool {
        if let Err(rejection) = self.frontier.admit(&req) {
            debug!("Ignore the request {}: {}", req.url(), rejection);
            return false;
        }
        enqueue(&self.pools.request, req, "request");
        true
    }

    /// Puts an already admitted request back into the request pool
    fn resend_request(&self, req: Request) {
        enqueue(&self.pools.request, req, "request");
    }

    fn send_response(&self, resp: Response) {
        enqueue(&self.pools.response, resp, "response");
    }

    fn send_item(&self, item: Item) {
        enqueue(&self.pools.item, item, "item");
    }

    /// Routes a worker error, tagging it with the worker's role if needed
    fn send_worker_error(&self, error: anyhow::Error, id: &ComponentId) {
        let fallback = id
            .component_type()
            .map(ErrorType::from)
            .unwrap_or(ErrorType::Scheduler);
        self.send_error(CrawlerError::tag(error, fallback));
    }

    /// Best-effort error routing; dropped silently once the pool is closed
    fn send_error(&self, error: CrawlerError) {
        let pool = &self.pools.error;
        if pool.closed() {
            return;
        }
        let pool = Arc::clone(pool);
        tokio::spawn(async move {
            let _ = pool.put(error).await;
        });
    }
}

/// Puts `datum` from a detached task; the caller never waits on a full pool
fn enqueue<T: Send + 'static>(pool: &Arc<Pool<T>>, datum: T, name: &'static str) {
    let pool = Arc::clone(pool);
    tokio::spawn(async move {
        if pool.put(datum).await.is_err() {
            warn!("The {} buffer pool was closed. Ignore {} sending.", name, name);
        }
    });
}
