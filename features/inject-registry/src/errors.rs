use std::sync::Arc;

use inject_graph::DynError;

/// Errors when trying to get a service from the registry
#[derive(thiserror::Error, Debug, Clone)]
pub enum RegistryError {
    /// No service is registered under the name
    #[error("Tried to get unregistered service '{0}'")]
    NotRegistered(String),

    /// The service is registered with a different type
    #[error("Service '{name}' is registered as '{actual}', not '{required}'")]
    TypeMismatch {
        name: String,
        required: &'static str,
        actual: &'static str,
    },

    /// The service constructor returned an error
    #[error("Constructor for service '{name}' failed - error: {error}")]
    ConstructorFailed { name: String, error: Arc<DynError> },

    /// The default registry is already in use, no more services can be registered
    #[error("Tried to register service '{0}' after the default registry was sealed")]
    Sealed(String),
}

impl RegistryError {
    /// Returns true for errors caused by asking for the wrong name or type
    pub fn is_contract_violation(&self) -> bool {
        !matches!(self, RegistryError::ConstructorFailed { .. })
    }
}
