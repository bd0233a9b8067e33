//! Image finder: crawls pages and saves every image it meets
//!
//! Builds [`crate::local`] components wired with the finder's own
//! [`parsers`] and [`processors`]. All components of one factory draw their
//! serial numbers from a single [`SnGenerator`], so their IDs never collide.

pub mod parsers;
pub mod processors;

pub use parsers::{parse_image, parse_links, response_parsers};
pub use processors::{item_processors, record_image, save_image};

use crate::component::{
    calculate_score_simple, Analyzer, ComponentId, ComponentType, Downloader, Pipeline,
    SnGenerator,
};
use crate::config::{ComponentsConfig, UserAgentConfig};
use crate::local::{build_http_client, HttpDownloader, ItemPipeline, ResponseAnalyzer};
use crate::scheduler::ModuleArgs;
use crate::{CrawlerError, ErrorType};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Creates the finder's downloaders, analyzers and pipelines
#[derive(Debug)]
pub struct ComponentFactory {
    sn: SnGenerator,
    user_agent: UserAgentConfig,
    output_dir: PathBuf,
}

impl ComponentFactory {
    /// # Arguments
    ///
    /// * `user_agent` - Identity used by every downloader's HTTP client
    /// * `output_dir` - Directory the pipelines save images into
    pub fn new(user_agent: UserAgentConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sn: SnGenerator::new(1, 0),
            user_agent,
            output_dir: output_dir.into(),
        }
    }

    fn next_id(&self, component_type: ComponentType) -> ComponentId {
        ComponentId::generate(component_type, self.sn.get(), None)
    }

    pub fn downloaders(&self, number: u32) -> crate::Result<Vec<Arc<dyn Downloader>>> {
        (0..number)
            .map(|_| {
                let client = build_http_client(&self.user_agent).map_err(|e| {
                    CrawlerError::new(
                        ErrorType::Downloader,
                        format!("couldn't build the HTTP client: {}", e),
                    )
                })?;
                let downloader = HttpDownloader::new(
                    self.next_id(ComponentType::Downloader),
                    client,
                    Some(calculate_score_simple),
                )?;
                Ok(Arc::new(downloader) as Arc<dyn Downloader>)
            })
            .collect()
    }

    pub fn analyzers(&self, number: u32) -> crate::Result<Vec<Arc<dyn Analyzer>>> {
        (0..number)
            .map(|_| {
                let analyzer = ResponseAnalyzer::new(
                    self.next_id(ComponentType::Analyzer),
                    response_parsers(),
                    Some(calculate_score_simple),
                )?;
                Ok(Arc::new(analyzer) as Arc<dyn Analyzer>)
            })
            .collect()
    }

    pub fn pipelines(
        &self,
        number: u32,
        fail_fast: bool,
    ) -> crate::Result<Vec<Arc<dyn Pipeline>>> {
        (0..number)
            .map(|_| {
                let pipeline = ItemPipeline::new(
                    self.next_id(ComponentType::Pipeline),
                    item_processors(self.output_dir.clone()),
                    Some(calculate_score_simple),
                )?;
                pipeline.set_fail_fast(fail_fast);
                Ok(Arc::new(pipeline) as Arc<dyn Pipeline>)
            })
            .collect()
    }

    /// Builds the complete worker set described by `components`
    pub fn module_args(&self, components: &ComponentsConfig) -> crate::Result<ModuleArgs> {
        let args = ModuleArgs {
            downloaders: self.downloaders(components.downloaders)?,
            analyzers: self.analyzers(components.analyzers)?,
            pipelines: self.pipelines(components.pipelines, components.fail_fast)?,
        };
        debug!("Created components: {:?}", args.summary());
        Ok(args)
    }
}
