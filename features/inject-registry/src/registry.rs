use std::{
    any::{type_name, Any},
    collections::HashMap,
    fmt::Debug,
    panic::resume_unwind,
    sync::{Arc, Mutex, OnceLock, PoisonError},
    thread,
};

use inject_graph::{DynError, Injectable, TypeInfo};

use crate::errors::RegistryError;

type ServiceConstructor<S> = dyn Fn(&Registry) -> Result<S, DynError> + Send + Sync;

/// A registry of named services.
///
/// Services are constructed on first access and memoized by name. Constructors receive the
/// registry, so they can get the services they depend on.
///
/// A constructor must not get its own service, directly or through other services - the
/// construction would wait on itself forever.
#[derive(Default)]
pub struct Registry {
    services: HashMap<String, Box<dyn ServiceEntry>>,
}
impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Registry");
        for (name, entry) in &self.services {
            let state = if entry.is_initialized() {
                "initialized"
            } else {
                "pending"
            };
            map.field(name, &format_args!("{} ({})", entry.info(), state));
        }
        map.finish()
    }
}

impl Registry {
    /// Initializes an empty Registry
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Add a service constructor to the registry.
    ///
    /// Registering a name a second time replaces the earlier registration.
    pub fn register<S, E>(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn(&Registry) -> Result<S, E> + Send + Sync + 'static,
    ) -> &mut Self
    where
        S: Injectable,
        E: Into<DynError>,
    {
        let name = name.into();
        let entry = ServiceDef::<S> {
            constructor: Box::new(move |registry: &Registry| -> Result<S, DynError> {
                constructor(registry).map_err(Into::into)
            }),
            lock: Mutex::new(()),
            once: OnceLock::new(),
        };

        match self.services.insert(name.clone(), Box::new(entry)) {
            Some(_) => {
                tracing::warn!("Service '{name}' registered again, the earlier one is replaced")
            }
            None => tracing::debug!("Registered service '{name}' as {}", type_name::<S>()),
        }
        self
    }

    /// Retrieve a service, constructing it on first access.
    ///
    /// If the name is not registered, or registered with another type, a
    /// [`RegistryError`] is returned without constructing anything.
    pub fn get<S: Injectable>(&self, name: &str) -> Result<Arc<S>, RegistryError> {
        let entry = self
            .services
            .get(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;

        let def = entry
            .as_any()
            .downcast_ref::<ServiceDef<S>>()
            .ok_or_else(|| RegistryError::TypeMismatch {
                name: name.to_string(),
                required: type_name::<S>(),
                actual: entry.info().type_name,
            })?;

        def.service(name, self)
    }

    /// Constructs every registered service concurrently
    ///
    /// Waits for all services and returns the first error.
    pub fn init_all(&self) -> Result<(), RegistryError> {
        tracing::debug!("Initializing {} services", self.services.len());

        thread::scope(|scope| {
            let handles = self
                .services
                .iter()
                .map(|(name, entry)| scope.spawn(move || entry.init(name, self)))
                .collect::<Vec<_>>();

            let mut first_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        first_error.get_or_insert(e);
                    }
                    Err(panic) => resume_unwind(panic),
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Returns true once the service has been constructed
    pub fn is_initialized(&self, name: &str) -> bool {
        self.services
            .get(name)
            .is_some_and(|entry| entry.is_initialized())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

/// Type erased service registration
trait ServiceEntry: Send + Sync {
    fn info(&self) -> TypeInfo;
    fn is_initialized(&self) -> bool;
    fn init(&self, name: &str, registry: &Registry) -> Result<(), RegistryError>;
    fn as_any(&self) -> &dyn Any;
}

struct ServiceDef<S> {
    constructor: Box<ServiceConstructor<S>>,
    lock: Mutex<()>,
    once: OnceLock<Arc<S>>,
}
impl<S: Injectable> ServiceDef<S> {
    fn service(&self, name: &str, registry: &Registry) -> Result<Arc<S>, RegistryError> {
        if let Some(service) = self.once.get() {
            return Ok(service.clone());
        }

        // Lock constructor, so the service is only constructed once
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Double check once - it might have been set while we waited for the lock
        if let Some(service) = self.once.get() {
            return Ok(service.clone());
        }

        let service = (self.constructor)(registry).map_err(|error| {
            tracing::debug!("Constructor for service '{name}' failed: {error}");
            RegistryError::ConstructorFailed {
                name: name.to_string(),
                error: Arc::new(error),
            }
        })?;

        tracing::debug!("Constructed service '{name}'");
        Ok(self.once.get_or_init(|| Arc::new(service)).clone())
    }
}
impl<S: Injectable> ServiceEntry for ServiceDef<S> {
    fn info(&self) -> TypeInfo {
        TypeInfo::of::<S>()
    }

    fn is_initialized(&self) -> bool {
        self.once.get().is_some()
    }

    fn init(&self, name: &str, registry: &Registry) -> Result<(), RegistryError> {
        self.service(name, registry).map(|_| ())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
