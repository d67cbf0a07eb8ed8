use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::component_info::{Component, ComponentInfo, LifecycleStage};
use crate::config::ComponentContextConfig;
use crate::dependency::find_cycle_path;
use crate::error::{ComponentError, Result};
use crate::factory::ComponentFactory;
use crate::manager::{Manager, TaskProcessor};
use crate::progress::ProgressReporter;

/// Which edge set a lifecycle phase walks before running its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyDirection {
    /// Wait for the things this component depends on.
    Normal,
    /// Wait for the things that depend on this component.
    Inverted,
}

/// The three fixed context-wide phases, in the order the owner is expected
/// to drive them. Each carries its own target stage, wait direction, and
/// whether a handler failure aborts the whole phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loaded,
    Stopping,
    Clearing,
}

struct PhaseParams {
    next_stage: LifecycleStage,
    direction: DependencyDirection,
    allow_cancelling: bool,
    display_name: &'static str,
}

impl Phase {
    fn params(self) -> PhaseParams {
        match self {
            Phase::Loaded => PhaseParams {
                next_stage: LifecycleStage::Running,
                direction: DependencyDirection::Normal,
                allow_cancelling: true,
                display_name: "on_all_components_loaded",
            },
            Phase::Stopping => PhaseParams {
                next_stage: LifecycleStage::ReadyForClearing,
                direction: DependencyDirection::Inverted,
                allow_cancelling: false,
                display_name: "on_all_components_are_stopping",
            },
            Phase::Clearing => PhaseParams {
                next_stage: LifecycleStage::Null,
                direction: DependencyDirection::Inverted,
                allow_cancelling: false,
                display_name: "clear_components",
            },
        }
    }

    async fn invoke(self, component: &Arc<dyn Component>) -> Result<()> {
        match self {
            Phase::Loaded => component.on_all_components_loaded().await,
            Phase::Stopping => component.on_all_components_are_stopping().await,
            Phase::Clearing => component.clear_component().await,
        }
    }
}

struct Inner {
    components: HashMap<String, ComponentInfo>,
    task_to_component: HashMap<tokio::task::Id, String>,
}

/// The container and lifecycle orchestrator described in the module's
/// design notes: a fixed set of named components, an implicitly-discovered
/// dependency graph, and the three lifecycle phases that drive every
/// component from construction to teardown.
pub struct ComponentContext {
    manager: Arc<dyn Manager>,
    task_processors: HashMap<String, Arc<dyn TaskProcessor>>,
    inner: Mutex<Inner>,
    load_cancelled: AtomicBool,
    progress: ProgressReporter,
    phase_join_timeout: Duration,
}

impl ComponentContext {
    /// Declares the fixed set of component names this context will manage.
    /// The key set of the internal map never changes after this call.
    pub fn new<I, S>(
        names: I,
        manager: Arc<dyn Manager>,
        task_processors: HashMap<String, Arc<dyn TaskProcessor>>,
        config: ComponentContextConfig,
    ) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components = names
            .into_iter()
            .map(|n| {
                let name = n.into();
                (name.clone(), ComponentInfo::new(name))
            })
            .collect();

        let inner = Mutex::new(Inner {
            components,
            task_to_component: HashMap::new(),
        });
        let phase_join_timeout = config.phase_join_timeout;

        Arc::new_cyclic(|weak: &std::sync::Weak<ComponentContext>| {
            let weak = weak.clone();
            let progress = ProgressReporter::spawn(config.progress_interval, move || {
                let weak = weak.clone();
                async move {
                    let Some(ctx) = weak.upgrade() else {
                        return Vec::new();
                    };
                    let inner = ctx.inner.lock().await;
                    let mut building: Vec<String> = inner.task_to_component.values().cloned().collect();
                    building.sort();
                    building
                }
            });

            Self {
                manager,
                task_processors,
                inner,
                load_cancelled: AtomicBool::new(false),
                progress,
                phase_join_timeout,
            }
        })
    }

    pub fn get_manager(&self) -> Arc<dyn Manager> {
        Arc::clone(&self.manager)
    }

    pub fn get_task_processor(&self, name: &str) -> Result<Arc<dyn TaskProcessor>> {
        self.task_processors
            .get(name)
            .cloned()
            .ok_or_else(|| ComponentError::UnknownTaskProcessor(name.to_string()))
    }

    pub fn task_processors(&self) -> HashMap<String, Arc<dyn TaskProcessor>> {
        self.task_processors.clone()
    }

    /// Constructs one component. Must be called from a distinct task per
    /// component (the owner is expected to spawn one task per declared
    /// name); the factory runs on that same task and may call
    /// `find_component` to pull in its dependencies.
    pub async fn add_component(
        &self,
        name: &str,
        factory: Arc<dyn ComponentFactory>,
    ) -> Result<Arc<dyn Component>> {
        {
            let inner = self.inner.lock().await;
            if !inner.components.contains_key(name) {
                return Err(ComponentError::UnknownComponent(name.to_string()));
            }
        }

        let task_id = current_task_id();
        {
            let mut inner = self.inner.lock().await;
            if inner.task_to_component.contains_key(&task_id) {
                return Err(ComponentError::NestedComponentConstruction(name.to_string()));
            }
            inner.task_to_component.insert(task_id, name.to_string());
        }

        debug!(component = name, "constructing component");
        let result = factory.create(self).await;

        {
            let mut inner = self.inner.lock().await;
            inner.task_to_component.remove(&task_id);
        }

        let component = result.map_err(|e| ComponentError::ComponentConstructionFailed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        let mut inner = self.inner.lock().await;
        let info = inner
            .components
            .get_mut(name)
            .ok_or_else(|| ComponentError::UnknownComponent(name.to_string()))?;
        info.set_component(Arc::clone(&component))?;
        info!(component = name, "component constructed");
        Ok(component)
    }

    /// Looks up another component by name. Legal only from within a
    /// currently-running factory on this context; suspends until the
    /// target is constructed, unless doing so would close a dependency
    /// cycle or the load is cancelled first.
    pub async fn find_component(&self, name: &str) -> Result<Arc<dyn Component>> {
        let task_id = current_task_id();
        let from = {
            let inner = self.inner.lock().await;
            inner
                .task_to_component
                .get(&task_id)
                .cloned()
                .ok_or_else(|| ComponentError::LookupOutsideConstruction(name.to_string()))?
        };

        {
            let mut inner = self.inner.lock().await;
            if !inner.components.contains_key(name) {
                return Err(ComponentError::UnknownComponent(name.to_string()));
            }

            let has_edge = inner
                .components
                .get(&from)
                .map(|i| i.check_it_depends_on(name))
                .unwrap_or(false);

            if !has_edge {
                if let Some(cycle) = find_cycle_path(&inner.components, &from, name) {
                    warn!(cycle = ?cycle, "rejecting circular dependency");
                    return Err(ComponentError::CircularDependency { path: cycle });
                }
                inner.components.get_mut(&from).unwrap().add_it_depends_on(name);
                inner.components.get_mut(name).unwrap().add_depends_on_it(&from);
                debug!(from = %from, to = %name, "dependency edge discovered");
            }
        }

        let notify = {
            let inner = self.inner.lock().await;
            inner.components.get(name).unwrap().ready_notify()
        };

        let mut announced = false;
        loop {
            let notified = notify.notified();
            let (component, cancelled) = {
                let inner = self.inner.lock().await;
                let info = inner.components.get(name).unwrap();
                (info.get_component(), info.is_cancelled())
            };
            if let Some(component) = component {
                return Ok(component);
            }
            if cancelled {
                return Err(ComponentError::StageSwitchingCancelled(name.to_string()));
            }
            if !announced {
                info!(from = %from, waiting_on = %name, "blocking until dependency is constructed");
                announced = true;
            }
            notified.await;
        }
    }

    /// External kill switch: wakes every task currently blocked in
    /// `find_component` with `StageSwitchingCancelled`, and notifies every
    /// already-constructed component via `on_loading_cancelled` so it can
    /// abort any in-flight work of its own. Idempotent — a second call
    /// observes the flag already set and does nothing further.
    pub async fn cancel_components_load(&self) {
        if self.load_cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        warn!("cancelling component load");
        let instances: Vec<Arc<dyn Component>> = {
            let mut inner = self.inner.lock().await;
            let instances = inner
                .components
                .values()
                .filter_map(|info| info.get_component())
                .collect();
            for info in inner.components.values_mut() {
                info.set_cancelled();
            }
            instances
        };
        for instance in instances {
            instance.on_loading_cancelled().await;
        }
    }

    pub fn is_load_cancelled(&self) -> bool {
        self.load_cancelled.load(Ordering::Acquire)
    }

    pub async fn on_all_components_loaded(self: &Arc<Self>) -> Result<()> {
        self.progress.stop_and_join().await;
        self.run_phase(Phase::Loaded).await
    }

    pub async fn on_all_components_are_stopping(self: &Arc<Self>) -> Result<()> {
        self.run_phase(Phase::Stopping).await
    }

    pub async fn clear_components(self: &Arc<Self>) -> Result<()> {
        self.progress.stop_and_join().await;
        let result = self.run_phase(Phase::Clearing).await;

        let mut inner = self.inner.lock().await;
        for info in inner.components.values_mut() {
            info.reset_for_clear();
        }

        result
    }

    async fn run_phase(self: &Arc<Self>, phase: Phase) -> Result<()> {
        let params = phase.params();
        info!(phase = params.display_name, "starting lifecycle phase");

        let names: Vec<String> = {
            let mut inner = self.inner.lock().await;
            for info in inner.components.values_mut() {
                info.clear_cancelled();
            }
            inner.components.keys().cloned().collect()
        };

        let phase_cancelled = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(names.len());
        for name in names {
            let ctx = Arc::clone(self);
            let cancelled_flag = Arc::clone(&phase_cancelled);
            handles.push(tokio::spawn(async move {
                process_single_component(&ctx, &name, phase, &cancelled_flag).await
            }));
        }

        let mut first_error: Option<ComponentError> = None;
        for mut handle in handles {
            let result = loop {
                match tokio::time::timeout(self.phase_join_timeout, &mut handle).await {
                    Ok(result) => break result,
                    Err(_) => {
                        warn!(
                            phase = params.display_name,
                            timeout_secs = self.phase_join_timeout.as_secs(),
                            "lifecycle task still running past the diagnostic join timeout"
                        );
                    }
                }
            };
            match result {
                Ok(Ok(())) => {}
                Ok(Err(ComponentError::StageSwitchingCancelled(_))) => {}
                Ok(Err(other)) => {
                    if first_error.is_none() {
                        first_error = Some(other);
                    }
                }
                Err(join_err) => {
                    error!(error = %join_err, "lifecycle task panicked");
                    if first_error.is_none() {
                        first_error = Some(ComponentError::ComponentConstructionFailed {
                            name: "<unknown>".to_string(),
                            reason: join_err.to_string(),
                        });
                    }
                }
            }
        }

        if phase_cancelled.load(Ordering::Acquire) {
            return match first_error {
                Some(err) => {
                    error!(phase = params.display_name, error = %err, "lifecycle phase cancelled");
                    Err(err)
                }
                None => Err(ComponentError::ProtocolViolation {
                    phase: params.display_name.to_string(),
                }),
            };
        }

        info!(phase = params.display_name, "lifecycle phase complete");
        Ok(())
    }
}

async fn process_single_component(
    ctx: &Arc<ComponentContext>,
    name: &str,
    phase: Phase,
    phase_cancelled: &Arc<AtomicBool>,
) -> Result<()> {
    let params = phase.params();

    let neighbors: Vec<String> = {
        let inner = ctx.inner.lock().await;
        let info = inner
            .components
            .get(name)
            .expect("name came from the declared component set");
        match params.direction {
            DependencyDirection::Normal => info.it_depends_on().cloned().collect(),
            DependencyDirection::Inverted => info.depends_on_it().cloned().collect(),
        }
    };

    for neighbor in neighbors {
        ctx.wait_stage(&neighbor, params.next_stage).await?;
    }

    let component = {
        let inner = ctx.inner.lock().await;
        inner.components.get(name).and_then(|i| i.get_component())
    };

    let outcome = match component {
        Some(component) => phase.invoke(&component).await,
        None => {
            warn!(component = name, phase = params.display_name, "no instance to drive through phase");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => {
            advance_stage(ctx, name, params.next_stage).await;
            Ok(())
        }
        Err(ComponentError::StageSwitchingCancelled(_)) => {
            advance_stage(ctx, name, params.next_stage).await;
            Err(ComponentError::StageSwitchingCancelled(name.to_string()))
        }
        Err(other) => {
            if params.allow_cancelling {
                if !phase_cancelled.swap(true, Ordering::AcqRel) {
                    let mut inner = ctx.inner.lock().await;
                    for info in inner.components.values_mut() {
                        info.set_cancelled();
                    }
                }
                advance_stage(ctx, name, params.next_stage).await;
                Err(other)
            } else {
                error!(component = name, phase = params.display_name, error = %other, "phase handler failed; continuing");
                advance_stage(ctx, name, params.next_stage).await;
                Ok(())
            }
        }
    }
}

async fn advance_stage(ctx: &Arc<ComponentContext>, name: &str, stage: LifecycleStage) {
    let mut inner = ctx.inner.lock().await;
    if let Some(info) = inner.components.get_mut(name) {
        info.set_stage(stage);
    }
}

impl ComponentContext {
    async fn wait_stage(&self, name: &str, target: LifecycleStage) -> Result<()> {
        let notify = {
            let inner = self.inner.lock().await;
            let info = inner
                .components
                .get(name)
                .ok_or_else(|| ComponentError::UnknownComponent(name.to_string()))?;
            info.stage_notify()
        };

        loop {
            // Construct the notification *before* reading the condition, so a
            // stage change that lands between our check and the await below
            // is still observed instead of producing a lost wakeup.
            let notified = notify.notified();
            let (reached, cancelled) = {
                let inner = self.inner.lock().await;
                let info = inner
                    .components
                    .get(name)
                    .ok_or_else(|| ComponentError::UnknownComponent(name.to_string()))?;
                (info.stage() == target, info.is_cancelled())
            };
            if cancelled {
                return Err(ComponentError::StageSwitchingCancelled(name.to_string()));
            }
            if reached {
                return Ok(());
            }
            notified.await;
        }
    }
}

fn current_task_id() -> tokio::task::Id {
    tokio::task::try_id()
        .expect("ComponentContext methods must run inside a tokio task")
}

/// Drains a progress-reporter-free timing knob for callers that want to
/// tune how quickly periodic reports fire without constructing a full
/// `ComponentContextConfig`.
pub fn default_progress_interval() -> Duration {
    ComponentContextConfig::default().progress_interval
}
