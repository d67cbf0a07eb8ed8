use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ComponentError, Result};

/// A point in a component's lifecycle.
///
/// Stages advance monotonically within a phase: `Null -> CreateComponentCalled
/// -> Running -> ReadyForClearing -> Null`. The final `Null` is reached by
/// `clear_components`, not by re-entering construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Null,
    CreateComponentCalled,
    Running,
    ReadyForClearing,
}

/// The object a factory hands back to the container. Lifecycle hooks are
/// optional: a component that only needs construction can leave all four
/// default implementations in place.
#[async_trait::async_trait]
pub trait Component: Send + Sync {
    async fn on_loading_cancelled(&self) {}

    async fn on_all_components_loaded(&self) -> Result<()> {
        Ok(())
    }

    async fn on_all_components_are_stopping(&self) -> Result<()> {
        Ok(())
    }

    async fn clear_component(&self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

/// Per-component coordination point: a name, an instance slot, a lifecycle
/// stage, and the dependency edges discovered while the component (or its
/// dependents) were under construction.
///
/// All mutable fields here are only ever touched while the container mutex
/// in [`crate::ComponentContext`] is held — this type carries no lock of its
/// own, matching the spec's "one mutex guards all container-level and
/// per-info state" invariant. The two `Notify` handles are the exception:
/// they are cloned out from under the lock and awaited lock-free so that a
/// suspended task holds no lock.
pub struct ComponentInfo {
    name: String,
    instance: Option<Arc<dyn Component>>,
    stage: LifecycleStage,
    it_depends_on: HashSet<String>,
    depends_on_it: HashSet<String>,
    stage_switching_cancelled: bool,
    ready_notify: Arc<tokio::sync::Notify>,
    stage_notify: Arc<tokio::sync::Notify>,
}

impl ComponentInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
            stage: LifecycleStage::Null,
            it_depends_on: HashSet::new(),
            depends_on_it: HashSet::new(),
            stage_switching_cancelled: false,
            ready_notify: Arc::new(tokio::sync::Notify::new()),
            stage_notify: Arc::new(tokio::sync::Notify::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> LifecycleStage {
        self.stage
    }

    pub fn is_cancelled(&self) -> bool {
        self.stage_switching_cancelled
    }

    pub fn ready_notify(&self) -> Arc<tokio::sync::Notify> {
        self.ready_notify.clone()
    }

    pub fn stage_notify(&self) -> Arc<tokio::sync::Notify> {
        self.stage_notify.clone()
    }

    /// Stores the built instance. Must be called at most once; a second call
    /// is a programming error, not a race that should be silently ignored.
    pub fn set_component(&mut self, instance: Arc<dyn Component>) -> Result<()> {
        if self.instance.is_some() {
            return Err(ComponentError::DuplicateComponent(self.name.clone()));
        }
        self.instance = Some(instance);
        self.stage = LifecycleStage::CreateComponentCalled;
        self.ready_notify.notify_waiters();
        Ok(())
    }

    pub fn get_component(&self) -> Option<Arc<dyn Component>> {
        self.instance.clone()
    }

    /// Must be called under the container mutex; broadcasts to both the
    /// stage waiters and (defensively) the readiness waiters, since a
    /// cancellation can unblock a waiter parked on either notification.
    pub fn set_stage(&mut self, stage: LifecycleStage) {
        self.stage = stage;
        self.stage_notify.notify_waiters();
    }

    pub fn set_cancelled(&mut self) {
        if !self.stage_switching_cancelled {
            self.stage_switching_cancelled = true;
            self.stage_notify.notify_waiters();
            self.ready_notify.notify_waiters();
        }
    }

    pub fn clear_cancelled(&mut self) {
        self.stage_switching_cancelled = false;
    }

    pub fn add_it_depends_on(&mut self, name: &str) {
        self.it_depends_on.insert(name.to_string());
    }

    pub fn add_depends_on_it(&mut self, name: &str) {
        self.depends_on_it.insert(name.to_string());
    }

    pub fn check_it_depends_on(&self, name: &str) -> bool {
        self.it_depends_on.contains(name)
    }

    pub fn it_depends_on(&self) -> impl Iterator<Item = &String> {
        self.it_depends_on.iter()
    }

    pub fn depends_on_it(&self) -> impl Iterator<Item = &String> {
        self.depends_on_it.iter()
    }

    /// Resets a component back to its pre-construction state, called by
    /// `clear_components` after `clear_component()` has run. Edges are
    /// intentionally preserved — the dependency graph describes a single
    /// construction episode and the context is not reused after clearing.
    pub fn reset_for_clear(&mut self) {
        debug!(component = %self.name, "resetting component to Null stage");
        self.instance = None;
        self.stage = LifecycleStage::Null;
    }
}
