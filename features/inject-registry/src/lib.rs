//! Inject Registry provides a registry of named services, constructed lazily on first access.
//!
//! It is the simple sibling of `inject_graph`: there are no declared dependencies, a service
//! constructor simply gets the services it needs from the registry by name.
//!
//! # Examples
//!
//! ```rust
//! use std::convert::Infallible;
//! use inject_registry::{Registry, RegistryError};
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .register("name", |_| Ok::<_, Infallible>("World".to_string()))
//!     .register("greeter", |registry| {
//!         let name = registry.get::<String>("name")?;
//!         Ok::<_, RegistryError>(Greeter {
//!             greeting: format!("Hello, {name}!"),
//!         })
//!     });
//!
//! let greeter = registry.get::<Greeter>("greeter").unwrap();
//! assert_eq!(greeter.greeting, "Hello, World!");
//!
//! // Asking for the wrong type is an error, not a panic
//! assert!(matches!(
//!     registry.get::<u32>("name"),
//!     Err(RegistryError::TypeMismatch { .. })
//! ));
//! ```
//!
//! Inject Registry consists of the following components:
//!
//! 1. Registry - for registering, retrieving and initializing services
//! 2. Global - a process wide default registry
//! 3. Errors - for registry errors

pub mod errors;
pub mod global;
pub mod registry;

pub use errors::RegistryError;
pub use registry::Registry;
