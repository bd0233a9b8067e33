//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock HTTP servers and drive the
//! scheduler end-to-end with the finder's components, plus fake components
//! for runs that must not touch the network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;
use webcrawler::buffer::Pool;
use webcrawler::component::{
    Analyzer, Component, ComponentBase, ComponentId, Data, Downloader, Item, Pipeline, Request,
    Response,
};
use webcrawler::config::{ComponentsConfig, UserAgentConfig};
use webcrawler::finder::ComponentFactory;
use webcrawler::monitor::{spawn_monitor, MonitorSettings};
use webcrawler::{DataArgs, ErrorType, ModuleArgs, RequestArgs, Scheduler, Status};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";
const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0fake";

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn quick_monitor() -> MonitorSettings {
    MonitorSettings::unclamped(Duration::from_millis(10), Duration::from_millis(50), 20, true)
}

fn first_request(url: &str) -> reqwest::Request {
    reqwest::Request::new(reqwest::Method::GET, url.parse().unwrap())
}

/// Mounts a two-page site with one image per page
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><head><title>Home</title></head><body>
                    <a href="/page1">Page 1</a>
                    <a href="https://elsewhere.org/">Elsewhere</a>
                    <a href="mailto:admin@example.com">Mail</a>
                    <img src="/logo.png">
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body>
                    <a href="/">Home</a>
                    <img src="images/photo.jpg">
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(PNG_BYTES)
                .insert_header("content-type", "image/png"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/images/photo.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(JPEG_BYTES)
                .insert_header("content-type", "image/jpeg"),
        )
        .mount(server)
        .await;
}

/// Initialises a scheduler with the finder's components saving into `dir`
fn finder_scheduler(dir: &TempDir, max_depth: u32) -> Arc<Scheduler> {
    let factory = ComponentFactory::new(user_agent(), dir.path().join("pictures"));
    let module_args = factory
        .module_args(&ComponentsConfig {
            downloaders: 2,
            analyzers: 2,
            pipelines: 1,
            fail_fast: true,
        })
        .unwrap();

    let scheduler = Arc::new(Scheduler::new());
    scheduler
        .init(
            RequestArgs {
                accepted_domains: Some(Vec::new()),
                max_depth,
            },
            DataArgs::uniform(10, 4),
            module_args,
        )
        .unwrap();
    scheduler
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crawl_saves_every_image() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();

    let scheduler = finder_scheduler(&dir, 3);
    let monitor = spawn_monitor(Arc::clone(&scheduler), quick_monitor());
    scheduler.start(first_request(&format!("{}/", server.uri()))).unwrap();

    let checks = timeout(Duration::from_secs(20), monitor)
        .await
        .expect("crawl did not finish in time")
        .unwrap();
    assert!(checks > 0);
    assert_eq!(scheduler.status(), Status::Stopped);

    let pictures = dir.path().join("pictures");
    assert_eq!(std::fs::read(pictures.join("logo.png")).unwrap(), PNG_BYTES);
    assert_eq!(std::fs::read(pictures.join("photo.jpg")).unwrap(), JPEG_BYTES);

    let summary = scheduler.summary();
    // "/", "/page1", "/logo.png" and "/images/photo.jpg"; the external link never enters
    assert_eq!(summary.url_number, 4);
    let pipeline = &summary.pipelines[0];
    assert_eq!(pipeline.completed, 2);
    assert_eq!(
        pipeline.extra,
        Some(serde_json::json!({ "fail_fast": true, "processor_number": 2 }))
    );
    let downloaded: u64 = summary.downloaders.iter().map(|d| d.completed).sum();
    assert_eq!(downloaded, 4);

    // Every URL was fetched exactly once
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_max_depth_limits_crawl() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();

    // Depth 0 is the first page, depth 1 its direct links
    let scheduler = finder_scheduler(&dir, 1);
    let monitor = spawn_monitor(Arc::clone(&scheduler), quick_monitor());
    scheduler.start(first_request(&format!("{}/", server.uri()))).unwrap();

    timeout(Duration::from_secs(20), monitor)
        .await
        .expect("crawl did not finish in time")
        .unwrap();

    let pictures = dir.path().join("pictures");
    assert!(pictures.join("logo.png").exists());
    assert!(!pictures.join("photo.jpg").exists());
    assert_eq!(scheduler.summary().url_number, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_error_status_reaches_error_channel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let scheduler = finder_scheduler(&dir, 1);
    scheduler.start(first_request(&format!("{}/", server.uri()))).unwrap();

    let mut errors = scheduler.error_chan();
    let error = timeout(Duration::from_secs(10), errors.recv())
        .await
        .expect("no error received")
        .expect("error channel closed early");
    assert_eq!(error.error_type(), ErrorType::Analyzer);
    assert!(error.to_string().contains("unsupported status code 503"));

    scheduler.stop().unwrap();
}

/// Component that is never expected to succeed
struct Offline {
    base: ComponentBase,
}

impl Offline {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            base: ComponentBase::new(ComponentId::from(id), None).unwrap(),
        })
    }
}

impl Component for Offline {
    fn base(&self) -> &ComponentBase {
        &self.base
    }
}

#[async_trait]
impl Downloader for Offline {
    async fn download(&self, _req: Request) -> anyhow::Result<Response> {
        let _handling = self.base.start_handling();
        self.base.incr_called_count();
        anyhow::bail!("network is unreachable")
    }
}

#[async_trait]
impl Analyzer for Offline {
    async fn analyze(&self, _resp: Response) -> (Vec<Data>, Vec<anyhow::Error>) {
        (Vec::new(), Vec::new())
    }
}

#[async_trait]
impl Pipeline for Offline {
    async fn send(&self, _item: Item) -> Vec<anyhow::Error> {
        Vec::new()
    }

    fn fail_fast(&self) -> bool {
        false
    }

    fn set_fail_fast(&self, _fail_fast: bool) {}
}

#[tokio::test]
async fn test_run_with_fake_components() {
    let downloader: Arc<dyn Downloader> = Offline::new("D1");
    let analyzer: Arc<dyn Analyzer> = Offline::new("A2");
    let pipeline: Arc<dyn Pipeline> = Offline::new("P3");

    let scheduler = Scheduler::new();
    scheduler
        .init(
            RequestArgs {
                accepted_domains: Some(Vec::new()),
                max_depth: 0,
            },
            DataArgs::uniform(10, 2),
            ModuleArgs {
                downloaders: vec![downloader],
                analyzers: vec![analyzer],
                pipelines: vec![pipeline],
            },
        )
        .unwrap();
    scheduler.start(first_request("http://example.com/")).unwrap();
    assert_eq!(scheduler.status(), Status::Started);

    let mut errors = scheduler.error_chan();
    let error = timeout(Duration::from_secs(5), errors.recv())
        .await
        .expect("no error received")
        .expect("error channel closed early");
    assert_eq!(error.error_type(), ErrorType::Downloader);
    assert!(error.to_string().contains("network is unreachable"));

    let summary = scheduler.summary();
    assert_eq!(summary.url_number, 1);
    assert_eq!(summary.downloaders[0].called, 1);

    scheduler.stop().unwrap();
    assert_eq!(scheduler.status(), Status::Stopped);
    let closed = timeout(Duration::from_secs(5), errors.recv())
        .await
        .expect("error channel stayed open");
    assert!(closed.is_none());
    assert!(scheduler.idle());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_delivers_every_datum_exactly_once() {
    const N: u64 = 1_000_000;
    const PRODUCERS: u64 = 4;
    const CONSUMERS: usize = 4;

    let pool: Arc<Pool<u64>> = Arc::new(Pool::new(20, 10).unwrap());
    let seen: Arc<Vec<AtomicBool>> = Arc::new((0..N).map(|_| AtomicBool::new(false)).collect());
    let received = Arc::new(AtomicU64::new(0));
    let max_total = Arc::new(AtomicU64::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                for i in (p..N).step_by(PRODUCERS as usize) {
                    pool.put(i).await.unwrap();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let seen = Arc::clone(&seen);
            let received = Arc::clone(&received);
            let max_total = Arc::clone(&max_total);
            tokio::spawn(async move {
                while let Ok(i) = pool.get().await {
                    let repeated = seen[i as usize].swap(true, Ordering::AcqRel);
                    assert!(!repeated, "{} delivered twice", i);
                    max_total.fetch_max(pool.total(), Ordering::AcqRel);
                    if received.fetch_add(1, Ordering::AcqRel) + 1 == N {
                        pool.close();
                    }
                }
            })
        })
        .collect();

    let run = async {
        for producer in producers {
            producer.await.unwrap();
        }
        for consumer in consumers {
            consumer.await.unwrap();
        }
    };
    timeout(Duration::from_secs(120), run)
        .await
        .expect("pool stress run did not finish in time");

    assert_eq!(received.load(Ordering::Acquire), N);
    assert!(seen.iter().all(|s| s.load(Ordering::Acquire)));
    assert!(max_total.load(Ordering::Acquire) <= 20 * 10);
    assert!(pool.closed());
    assert_eq!(pool.buffer_number(), 0);
}
