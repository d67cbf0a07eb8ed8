use std::sync::Arc;

use crate::component_info::Component;
use crate::context::ComponentContext;
use crate::error::Result;

/// A callable that constructs one component. It runs on the same task that
/// called `add_component`, and may call back into the context (typically
/// via `find_component`) to obtain its dependencies before returning.
#[async_trait::async_trait]
pub trait ComponentFactory: Send + Sync {
    async fn create(&self, ctx: &ComponentContext) -> Result<Arc<dyn Component>>;
}

/// Adapts a plain async closure into a [`ComponentFactory`], so callers
/// don't have to hand-write a trait impl for the common case.
pub struct FnFactory<F>(F);

impl<F> FnFactory<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait::async_trait]
impl<F, Fut> ComponentFactory for FnFactory<F>
where
    F: Fn(&ComponentContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Arc<dyn Component>>> + Send,
{
    async fn create(&self, ctx: &ComponentContext) -> Result<Arc<dyn Component>> {
        (self.0)(ctx).await
    }
}
