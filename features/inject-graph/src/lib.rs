//! Inject Graph is a dependency graph where every node is constructed at most once, lazily or all
//! at once, with independent parts of the graph constructed concurrently.
//!
//! Inject Graph is split into two phases:
//! 1. GraphBuilder: declare nodes - a slot, a constructor, and the slots it depends on
//! 2. Graph: resolve a single node (and whatever it depends on), or every node at once
//!
//! # Examples
//!
//! ```rust
//! use std::{convert::Infallible, sync::Arc};
//! use inject_graph::{GraphBuilder, ResolveError, Slot};
//!
//! struct Database {
//!     url: String,
//! }
//! struct Users {
//!     db: Arc<Database>,
//! }
//!
//! let db = Slot::<Database>::new();
//! let users = Slot::<Users>::new();
//!
//! let graph = GraphBuilder::new()
//!     .declare(
//!         users,
//!         move |resolver| async move {
//!             let db = resolver.require(db).await?;
//!             Ok::<_, ResolveError>(Users { db })
//!         },
//!         [db.id()],
//!     )
//!     .declare(
//!         db,
//!         |_| async {
//!             Ok::<_, Infallible>(Database {
//!                 url: "postgres://localhost".to_string(),
//!             })
//!         },
//!         [],
//!     )
//!     .build()
//!     .unwrap();
//!
//! // Constructs the database first, then the users
//! graph.init().unwrap();
//!
//! let users = graph.get(users).unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! Inject Graph consists of the following components:
//!
//! 1. Builder - declaring nodes and checking the declared graph for cycles
//! 2. Graph - the node store and the resolution entry points
//! 3. Resolver - the recursive at-most-once resolution, also handed to constructors
//! 4. Deferred - handles resolving a node on first use
//! 5. Global - a process wide default graph

pub mod builder;
pub mod deferred;
pub mod dependency_graph;
pub mod errors;
pub mod factories;
pub mod global;
pub mod graph;
mod initiator;
pub mod resolver;
pub mod types;

pub use builder::GraphBuilder;
pub use deferred::Deferred;
pub use errors::ResolveError;
pub use factories::NodeFactory;
pub use graph::Graph;
pub use resolver::Resolver;
pub use types::{DynError, Injectable, Instance, NodeId, NodeInfo, Produced, Slot, TypeInfo};
