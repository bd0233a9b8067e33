//! Item pipeline driven by a chain of item processors

use super::new_base;
use crate::component::{
    CalculateScore, Component, ComponentBase, ComponentId, ComponentSummary, ComponentType, Item,
    Pipeline,
};
use crate::{CrawlerError, ErrorType};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// One processing step
///
/// Steps run on Tokio's blocking thread pool, so they may do blocking I/O.
/// Returning `Ok(Some(item))` replaces the item handed to the next step,
/// `Ok(None)` passes the current item on unchanged.
pub type ProcessItem = Box<dyn Fn(&Item) -> anyhow::Result<Option<Item>> + Send + Sync>;

/// Pipeline running each item through its processors in order
pub struct ItemPipeline {
    base: ComponentBase,
    processors: Arc<[ProcessItem]>,
    fail_fast: AtomicBool,
}

impl ItemPipeline {
    /// Creates a pipeline
    ///
    /// Fails with an illegal-parameter pipeline error if `id` is not a legal
    /// pipeline ID or `processors` is empty.
    pub fn new(
        id: ComponentId,
        processors: Vec<ProcessItem>,
        score_calculator: Option<CalculateScore>,
    ) -> crate::Result<Self> {
        let base = new_base(id, score_calculator, ComponentType::Pipeline)?;
        if processors.is_empty() {
            return Err(CrawlerError::illegal_parameter(
                ErrorType::Pipeline,
                "empty item processor list",
            ));
        }
        Ok(Self {
            base,
            processors: Arc::from(processors),
            fail_fast: AtomicBool::new(false),
        })
    }

    pub fn processor_number(&self) -> usize {
        self.processors.len()
    }
}

impl std::fmt::Debug for ItemPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemPipeline")
            .field("base", &self.base)
            .field("processors", &self.processors.len())
            .field("fail_fast", &self.fail_fast())
            .finish()
    }
}

impl Component for ItemPipeline {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn summary(&self) -> ComponentSummary {
        self.base.summary(Some(json!({
            "fail_fast": self.fail_fast(),
            "processor_number": self.processors.len(),
        })))
    }
}

#[async_trait]
impl Pipeline for ItemPipeline {
    async fn send(&self, item: Item) -> Vec<anyhow::Error> {
        let _handling = self.base.start_handling();
        self.base.incr_called_count();
        self.base.incr_accepted_count();
        info!(
            "Process item (keys: {})...",
            item.keys().collect::<Vec<_>>().join(", ")
        );

        let fail_fast = self.fail_fast();
        let processors = Arc::clone(&self.processors);
        let errors = tokio::task::spawn_blocking(move || process(&processors, item, fail_fast))
            .await
            .unwrap_or_else(|e| vec![anyhow::anyhow!("item processing task failed: {}", e)]);

        if errors.is_empty() {
            self.base.incr_completed_count();
        }
        errors
    }

    fn fail_fast(&self) -> bool {
        self.fail_fast.load(Ordering::Acquire)
    }

    fn set_fail_fast(&self, fail_fast: bool) {
        self.fail_fast.store(fail_fast, Ordering::Release);
    }
}

fn process(processors: &[ProcessItem], item: Item, fail_fast: bool) -> Vec<anyhow::Error> {
    let mut errors = Vec::new();
    let mut current = item;
    for processor in processors {
        match processor(&current) {
            Ok(Some(processed)) => current = processed,
            Ok(None) => {}
            Err(e) => {
                errors.push(e);
                if fail_fast {
                    break;
                }
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Mutex};
    use std::time::Duration;

    fn tagging(key: &'static str) -> ProcessItem {
        Box::new(move |item| {
            let mut item = item.clone();
            item.insert(key, true);
            Ok(Some(item))
        })
    }

    fn failing() -> ProcessItem {
        Box::new(|_| Err(anyhow::anyhow!("processor failed")))
    }

    fn recording(seen: Arc<Mutex<Vec<Item>>>) -> ProcessItem {
        Box::new(move |item| {
            seen.lock().unwrap().push(item.clone());
            Ok(None)
        })
    }

    #[test]
    fn test_new_rejects_empty_processor_list() {
        let err = ItemPipeline::new(ComponentId::from("P1"), Vec::new(), None).unwrap_err();
        assert!(err.is_illegal_parameter());
        assert_eq!(err.error_type(), ErrorType::Pipeline);
    }

    #[tokio::test]
    async fn test_processors_see_previous_output() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = ItemPipeline::new(
            ComponentId::from("P1"),
            vec![tagging("first"), tagging("second"), recording(Arc::clone(&seen))],
            None,
        )
        .unwrap();

        let errors = pipeline.send(Item::new()).await;
        assert!(errors.is_empty());
        let seen = seen.lock().unwrap();
        assert!(seen[0].contains_key("first"));
        assert!(seen[0].contains_key("second"));
        assert_eq!(pipeline.counts().completed_count, 1);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_the_chain() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = ItemPipeline::new(
            ComponentId::from("P2"),
            vec![failing(), recording(Arc::clone(&seen))],
            None,
        )
        .unwrap();

        let errors = pipeline.send(Item::new()).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);

        pipeline.set_fail_fast(true);
        assert!(pipeline.fail_fast());
        let errors = pipeline.send(Item::new()).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);

        assert_eq!(pipeline.counts().accepted_count, 2);
        assert_eq!(pipeline.counts().completed_count, 0);
    }

    #[test]
    fn test_summary_extra() {
        let pipeline =
            ItemPipeline::new(ComponentId::from("P3"), vec![tagging("a"), failing()], None)
                .unwrap();
        pipeline.set_fail_fast(true);
        let summary = pipeline.summary();
        assert_eq!(
            summary.extra,
            Some(json!({ "fail_fast": true, "processor_number": 2 }))
        );
    }

    #[tokio::test]
    async fn test_blocking_processor_leaves_runtime_free() {
        let (release, released) = mpsc::channel::<()>();
        let released = Mutex::new(released);
        let waiting: ProcessItem = Box::new(move |_| {
            released
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5))
                .map(|()| None)
                .map_err(|e| anyhow::anyhow!("never released: {}", e))
        });
        let pipeline = Arc::new(ItemPipeline::new(ComponentId::from("P4"), vec![waiting], None).unwrap());

        let sending = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.send(Item::new()).await }
        });
        // The single runtime thread must still serve timers while the processor waits
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.send(()).unwrap();

        let errors = sending.await.unwrap();
        assert!(errors.is_empty());
        assert_eq!(pipeline.counts().completed_count, 1);
    }
}
