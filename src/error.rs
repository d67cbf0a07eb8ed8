use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    #[error("component '{0}' is not in the declared component set")]
    UnknownComponent(String),

    #[error("component '{0}' was already constructed once")]
    DuplicateComponent(String),

    #[error("task is already constructing component '{0}'; nested add_component is not allowed")]
    NestedComponentConstruction(String),

    #[error("find_component('{0}') called from a task that is not currently constructing a component")]
    LookupOutsideConstruction(String),

    #[error("circular dependency detected: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("stage switching was cancelled before component '{0}' was ready")]
    StageSwitchingCancelled(String),

    #[error("factory for component '{name}' failed: {reason}")]
    ComponentConstructionFailed { name: String, reason: String },

    #[error("task processor '{0}' is not registered")]
    UnknownTaskProcessor(String),

    #[error("lifecycle phase '{phase}' ended cancelled without a surfaced error")]
    ProtocolViolation { phase: String },
}

pub type Result<T> = std::result::Result<T, ComponentError>;
