use super::{
    set_score, Analyzer, Component, ComponentError, ComponentId, ComponentSummary,
    ComponentType, Counts, Downloader, Pipeline,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A registered worker of any role
#[derive(Clone)]
pub enum ComponentInstance {
    Downloader(Arc<dyn Downloader>),
    Analyzer(Arc<dyn Analyzer>),
    Pipeline(Arc<dyn Pipeline>),
}

impl ComponentInstance {
    /// The role this instance was declared with
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentInstance::Downloader(_) => ComponentType::Downloader,
            ComponentInstance::Analyzer(_) => ComponentType::Analyzer,
            ComponentInstance::Pipeline(_) => ComponentType::Pipeline,
        }
    }

    pub fn id(&self) -> &ComponentId {
        match self {
            ComponentInstance::Downloader(c) => c.id(),
            ComponentInstance::Analyzer(c) => c.id(),
            ComponentInstance::Pipeline(c) => c.id(),
        }
    }

    pub fn score(&self) -> u64 {
        match self {
            ComponentInstance::Downloader(c) => c.score(),
            ComponentInstance::Analyzer(c) => c.score(),
            ComponentInstance::Pipeline(c) => c.score(),
        }
    }

    /// Recomputes the score, returning whether it changed
    pub fn rescore(&self) -> bool {
        match self {
            ComponentInstance::Downloader(c) => set_score(c.as_ref()),
            ComponentInstance::Analyzer(c) => set_score(c.as_ref()),
            ComponentInstance::Pipeline(c) => set_score(c.as_ref()),
        }
    }

    pub fn counts(&self) -> Counts {
        match self {
            ComponentInstance::Downloader(c) => c.counts(),
            ComponentInstance::Analyzer(c) => c.counts(),
            ComponentInstance::Pipeline(c) => c.counts(),
        }
    }

    pub fn handling_number(&self) -> u64 {
        match self {
            ComponentInstance::Downloader(c) => c.handling_number(),
            ComponentInstance::Analyzer(c) => c.handling_number(),
            ComponentInstance::Pipeline(c) => c.handling_number(),
        }
    }

    pub fn summary(&self) -> ComponentSummary {
        match self {
            ComponentInstance::Downloader(c) => c.summary(),
            ComponentInstance::Analyzer(c) => c.summary(),
            ComponentInstance::Pipeline(c) => c.summary(),
        }
    }

    pub fn as_downloader(&self) -> Option<&Arc<dyn Downloader>> {
        match self {
            ComponentInstance::Downloader(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_analyzer(&self) -> Option<&Arc<dyn Analyzer>> {
        match self {
            ComponentInstance::Analyzer(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_pipeline(&self) -> Option<&Arc<dyn Pipeline>> {
        match self {
            ComponentInstance::Pipeline(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("type", &self.component_type())
            .field("id", self.id())
            .finish()
    }
}

impl From<Arc<dyn Downloader>> for ComponentInstance {
    fn from(c: Arc<dyn Downloader>) -> Self {
        ComponentInstance::Downloader(c)
    }
}

impl From<Arc<dyn Analyzer>> for ComponentInstance {
    fn from(c: Arc<dyn Analyzer>) -> Self {
        ComponentInstance::Analyzer(c)
    }
}

impl From<Arc<dyn Pipeline>> for ComponentInstance {
    fn from(c: Arc<dyn Pipeline>) -> Self {
        ComponentInstance::Pipeline(c)
    }
}

type InstanceMap = HashMap<ComponentId, ComponentInstance>;

/// Concurrency-safe store of component instances, keyed by role and ID
#[derive(Debug, Default)]
pub struct Registry {
    instances: RwLock<HashMap<ComponentType, InstanceMap>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The instance was added
    /// * `Ok(false)` - Another instance already holds this ID; nothing changed
    /// * `Err(ComponentError::IllegalParameter)` - The ID is malformed, or its
    ///   role letter disagrees with the instance's role
    pub fn register(&self, instance: ComponentInstance) -> Result<bool, ComponentError> {
        let id = instance.id().clone();
        let parts = id.split()?;
        let declared = instance.component_type();
        if parts.component_type != declared {
            return Err(ComponentError::IllegalParameter(format!(
                "incorrect component type: {} (component ID: {})",
                declared, id
            )));
        }

        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        let by_id = instances.entry(declared).or_default();
        if by_id.contains_key(&id) {
            return Ok(false);
        }
        by_id.insert(id, instance);
        Ok(true)
    }

    /// Removes the instance with the given ID, returning whether one existed
    pub fn unregister(&self, id: &ComponentId) -> Result<bool, ComponentError> {
        let parts = id.split()?;
        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        Ok(instances
            .get_mut(&parts.component_type)
            .is_some_and(|by_id| by_id.remove(id).is_some()))
    }

    /// Picks an instance of the given role
    ///
    /// Every candidate is re-scored first; the one with the lowest score wins.
    pub fn get(&self, component_type: ComponentType) -> Result<ComponentInstance, ComponentError> {
        let instances = self.instances.read().unwrap_or_else(PoisonError::into_inner);
        let by_id = instances
            .get(&component_type)
            .ok_or(ComponentError::NotFound)?;

        let mut selected: Option<&ComponentInstance> = None;
        for instance in by_id.values() {
            instance.rescore();
            match selected {
                Some(current) if current.score() <= instance.score() => {}
                _ => selected = Some(instance),
            }
        }
        selected.cloned().ok_or(ComponentError::NotFound)
    }

    /// Returns a snapshot of all instances of one role
    pub fn get_all_by_type(&self, component_type: ComponentType) -> HashMap<ComponentId, ComponentInstance> {
        let instances = self.instances.read().unwrap_or_else(PoisonError::into_inner);
        instances.get(&component_type).cloned().unwrap_or_default()
    }

    /// Returns a snapshot of all instances
    pub fn get_all(&self) -> HashMap<ComponentId, ComponentInstance> {
        let instances = self.instances.read().unwrap_or_else(PoisonError::into_inner);
        instances
            .values()
            .flat_map(|by_id| by_id.iter().map(|(id, c)| (id.clone(), c.clone())))
            .collect()
    }

    /// Removes every instance
    pub fn clear(&self) {
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
