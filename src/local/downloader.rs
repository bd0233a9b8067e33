//! HTTP downloader backed by `reqwest`

use super::new_base;
use crate::component::{
    CalculateScore, Component, ComponentBase, ComponentId, ComponentType, Downloader,
    HttpResponse, Request, Response,
};
use crate::config::UserAgentConfig;
use crate::{CrawlerError, ErrorType};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tracing::{info, warn};

/// Builds an HTTP client identifying itself with the configured user agent
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use webcrawler::config::UserAgentConfig;
/// use webcrawler::local::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Finder".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloader executing requests with a shared [`Client`]
#[derive(Debug)]
pub struct HttpDownloader {
    base: ComponentBase,
    client: Client,
}

impl HttpDownloader {
    /// Creates a downloader
    ///
    /// Fails with an illegal-parameter downloader error if `id` is not a
    /// legal downloader ID.
    pub fn new(
        id: ComponentId,
        client: Client,
        score_calculator: Option<CalculateScore>,
    ) -> crate::Result<Self> {
        let base = new_base(id, score_calculator, ComponentType::Downloader)?;
        Ok(Self { base, client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Component for HttpDownloader {
    fn base(&self) -> &ComponentBase {
        &self.base
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, req: Request) -> anyhow::Result<Response> {
        let _handling = self.base.start_handling();
        self.base.incr_called_count();
        if !req.valid() {
            return Err(CrawlerError::illegal_parameter(
                ErrorType::Downloader,
                format!("request without host: {}", req.url()),
            )
            .into());
        }
        self.base.incr_accepted_count();

        let depth = req.depth();
        let url = req.url().clone();
        info!("Do the request (URL: {}, depth: {})...", url, depth);
        let http_resp = self
            .client
            .execute(req.into_http_req())
            .await
            .with_context(|| format!("request to {} failed", url))?;
        self.base.incr_completed_count();

        let final_url = http_resp.url().clone();
        let status = http_resp.status();
        let headers = http_resp.headers().clone();
        let body = match http_resp.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                warn!("Couldn't read the response body of {}: {}", final_url, e);
                None
            }
        };

        Ok(Response::new(
            HttpResponse {
                url: final_url,
                status,
                headers,
                body,
            },
            depth,
        ))
    }
}
