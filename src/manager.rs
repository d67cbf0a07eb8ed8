/// Opaque external collaborator, owned by the process that constructs the
/// [`crate::ComponentContext`]. The container never inspects it — it only
/// stores and hands back a handle via `get_manager()`, per the spec's
/// "external collaborator" boundary.
pub trait Manager: Send + Sync {}

impl<T: Send + Sync> Manager for T {}

/// A named external task pool. The container stores these read-only after
/// construction and only ever returns handles to callers; it never submits
/// work to one itself.
pub trait TaskProcessor: Send + Sync {
    fn name(&self) -> &str;
}
