//! Process wide default registry
//!
//! Services are registered with [register] until the first call to [registry], [get] or
//! [init]. From then on the registry is sealed: it is shared by every caller and
//! [register] fails with [RegistryError::Sealed].
//!
//! The default registry is never torn down.

use std::sync::{Arc, Mutex, PoisonError};

use inject_graph::{DynError, Injectable};

use crate::{errors::RegistryError, registry::Registry};

enum DefaultRegistry {
    Registering(Registry),
    Sealed(Arc<Registry>),
}

static DEFAULT: Mutex<Option<DefaultRegistry>> = Mutex::new(None);

/// Registers a service on the default registry, see [Registry::register]
pub fn register<S, E>(
    name: impl Into<String>,
    constructor: impl Fn(&Registry) -> Result<S, E> + Send + Sync + 'static,
) -> Result<(), RegistryError>
where
    S: Injectable,
    E: Into<DynError>,
{
    let name = name.into();
    let mut default = DEFAULT.lock().unwrap_or_else(PoisonError::into_inner);
    match default.get_or_insert_with(|| DefaultRegistry::Registering(Registry::new())) {
        DefaultRegistry::Registering(registry) => {
            registry.register(name, constructor);
            Ok(())
        }
        DefaultRegistry::Sealed(_) => {
            tracing::warn!("Service '{name}' registered after the default registry was sealed");
            Err(RegistryError::Sealed(name))
        }
    }
}

/// Returns the default registry, sealing it on first access
pub fn registry() -> Arc<Registry> {
    let mut default = DEFAULT.lock().unwrap_or_else(PoisonError::into_inner);
    let sealed = match default.take() {
        Some(DefaultRegistry::Sealed(registry)) => registry,
        Some(DefaultRegistry::Registering(registry)) => {
            tracing::debug!("Sealed the default registry");
            Arc::new(registry)
        }
        None => Arc::new(Registry::new()),
    };
    *default = Some(DefaultRegistry::Sealed(sealed.clone()));
    sealed
}

/// Gets a service from the default registry, see [Registry::get]
pub fn get<S: Injectable>(name: &str) -> Result<Arc<S>, RegistryError> {
    registry().get(name)
}

/// Constructs every service of the default registry, see [Registry::init_all]
pub fn init() -> Result<(), RegistryError> {
    registry().init_all()
}
