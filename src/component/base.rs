use super::{calculate_score_simple, CalculateScore, ComponentError, ComponentId, ComponentSummary, ComponentType, Counts};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared state every component embeds: identity, score and counters
///
/// Concrete workers hold a `ComponentBase` and return it from
/// [`Component::base`](super::Component::base); the role traits get all
/// introspection for free from it.
#[derive(Debug)]
pub struct ComponentBase {
    id: ComponentId,
    component_type: ComponentType,
    addr: Option<SocketAddr>,
    score: AtomicU64,
    score_calculator: CalculateScore,
    called_count: AtomicU64,
    accepted_count: AtomicU64,
    completed_count: AtomicU64,
    handling_number: AtomicU64,
}

impl ComponentBase {
    /// Creates the base for a component
    ///
    /// # Arguments
    ///
    /// * `id` - The component ID, which must be legal
    /// * `score_calculator` - Scoring function, [`calculate_score_simple`] if `None`
    pub fn new(
        id: ComponentId,
        score_calculator: Option<CalculateScore>,
    ) -> Result<Self, ComponentError> {
        let parts = id.split()?;
        Ok(Self {
            id,
            component_type: parts.component_type,
            addr: parts.addr,
            score: AtomicU64::new(0),
            score_calculator: score_calculator.unwrap_or(calculate_score_simple),
            called_count: AtomicU64::new(0),
            accepted_count: AtomicU64::new(0),
            completed_count: AtomicU64::new(0),
            handling_number: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    pub fn score(&self) -> u64 {
        self.score.load(Ordering::Acquire)
    }

    pub fn set_score(&self, score: u64) {
        self.score.store(score, Ordering::Release);
    }

    pub fn score_calculator(&self) -> CalculateScore {
        self.score_calculator
    }

    pub fn called_count(&self) -> u64 {
        self.called_count.load(Ordering::Acquire)
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted_count.load(Ordering::Acquire)
    }

    pub fn completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Acquire)
    }

    pub fn handling_number(&self) -> u64 {
        self.handling_number.load(Ordering::Acquire)
    }

    pub fn incr_called_count(&self) {
        self.called_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn incr_accepted_count(&self) {
        self.accepted_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn incr_completed_count(&self) {
        self.completed_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn incr_handling_number(&self) {
        self.handling_number.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the handling number, saturating at zero
    pub fn decr_handling_number(&self) {
        let _ = self
            .handling_number
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Marks one datum as being handled until the guard is dropped
    pub fn start_handling(&self) -> HandlingGuard<'_> {
        self.incr_handling_number();
        HandlingGuard { base: self }
    }

    pub fn counts(&self) -> Counts {
        Counts {
            called_count: self.called_count(),
            accepted_count: self.accepted_count(),
            completed_count: self.completed_count(),
            handling_number: self.handling_number(),
        }
    }

    /// Resets all four counters to zero
    pub fn clear(&self) {
        self.called_count.store(0, Ordering::Release);
        self.accepted_count.store(0, Ordering::Release);
        self.completed_count.store(0, Ordering::Release);
        self.handling_number.store(0, Ordering::Release);
    }

    /// Builds a summary, attaching role-specific `extra` data
    pub fn summary(&self, extra: Option<serde_json::Value>) -> ComponentSummary {
        let counts = self.counts();
        ComponentSummary {
            id: self.id.to_string(),
            called: counts.called_count,
            accepted: counts.accepted_count,
            completed: counts.completed_count,
            handling: counts.handling_number,
            extra,
        }
    }
}

/// Keeps a component's handling number raised while alive
#[derive(Debug)]
pub struct HandlingGuard<'a> {
    base: &'a ComponentBase,
}

impl Drop for HandlingGuard<'_> {
    fn drop(&mut self) {
        self.base.decr_handling_number();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_illegal_id() {
        let result = ComponentBase::new(ComponentId::from("Q9"), None);
        assert!(matches!(result, Err(ComponentError::IllegalParameter(_))));
    }

    #[test]
    fn test_counters_and_clear() {
        let base = ComponentBase::new(ComponentId::from("D3|127.0.0.1:80"), None).unwrap();
        assert_eq!(base.component_type(), ComponentType::Downloader);
        assert_eq!(base.addr(), Some("127.0.0.1:80".parse().unwrap()));

        base.incr_called_count();
        base.incr_called_count();
        base.incr_accepted_count();
        base.incr_completed_count();
        {
            let _guard = base.start_handling();
            assert_eq!(base.handling_number(), 1);
        }
        assert_eq!(
            base.counts(),
            Counts {
                called_count: 2,
                accepted_count: 1,
                completed_count: 1,
                handling_number: 0,
            }
        );

        base.decr_handling_number();
        assert_eq!(base.handling_number(), 0);

        base.clear();
        assert_eq!(base.counts(), Counts::default());
    }

    #[test]
    fn test_summary_carries_extra() {
        let base = ComponentBase::new(ComponentId::from("P1"), None).unwrap();
        base.incr_called_count();
        let summary = base.summary(Some(serde_json::json!({ "fail_fast": true })));
        assert_eq!(summary.id, "P1");
        assert_eq!(summary.called, 1);
        assert_eq!(summary.extra, Some(serde_json::json!({ "fail_fast": true })));
    }
}
