//! Process wide default graph
//!
//! A convenience wrapper for programs which only need one graph. The default graph has a one way
//! lifecycle:
//! 1. Declaring: [declare] and [provide] add nodes.
//! 2. Sealed: the first call to [graph], [init], [load] or [deferred] builds the graph.
//!    Further declarations fail with [ResolveError::Sealed].
//!
//! The default graph is never torn down.

use std::{
    future::Future,
    mem,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    builder::GraphBuilder,
    deferred::Deferred,
    errors::ResolveError,
    graph::Graph,
    resolver::Resolver,
    types::{DynError, Injectable, NodeId, Produced, Slot},
};

enum DefaultGraph {
    Declaring(GraphBuilder),
    Sealed(Graph),
    /// Building failed, every later access reports the same error
    Failed(ResolveError),
}

static DEFAULT: Mutex<Option<DefaultGraph>> = Mutex::new(None);

fn with_builder(
    declare: impl FnOnce(GraphBuilder) -> GraphBuilder,
) -> Result<(), ResolveError> {
    let mut default = DEFAULT.lock().unwrap_or_else(PoisonError::into_inner);
    match default.take() {
        None => *default = Some(DefaultGraph::Declaring(declare(GraphBuilder::new()))),
        Some(DefaultGraph::Declaring(builder)) => {
            *default = Some(DefaultGraph::Declaring(declare(builder)))
        }
        Some(sealed) => {
            *default = Some(sealed);
            return Err(ResolveError::Sealed);
        }
    }
    Ok(())
}

/// Declares a node on the default graph, see [GraphBuilder::declare]
pub fn declare<T, F, Fut, P, E>(
    slot: Slot<T>,
    constructor: F,
    dependencies: impl IntoIterator<Item = NodeId>,
) -> Result<(), ResolveError>
where
    T: Injectable,
    F: Fn(Resolver) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<P, E>> + Send + 'static,
    P: Produced<T>,
    E: Into<DynError>,
{
    with_builder(|builder| builder.declare(slot, constructor, dependencies))
}

/// Declares a node with an existing value on the default graph, see [GraphBuilder::provide]
pub fn provide<T: Injectable>(slot: Slot<T>, value: T) -> Result<(), ResolveError> {
    with_builder(|builder| builder.provide(slot, value))
}

/// Returns the default graph, sealing it on first access
pub fn graph() -> Result<Graph, ResolveError> {
    let mut default = DEFAULT.lock().unwrap_or_else(PoisonError::into_inner);
    let sealed = match mem::take(&mut *default) {
        Some(DefaultGraph::Sealed(graph)) => Ok(graph),
        Some(DefaultGraph::Failed(error)) => Err(error),
        Some(DefaultGraph::Declaring(builder)) => builder.build(),
        None => GraphBuilder::new().build(),
    };

    *default = Some(match &sealed {
        Ok(graph) => DefaultGraph::Sealed(graph.clone()),
        Err(error) => DefaultGraph::Failed(error.clone()),
    });
    sealed
}

/// Resolves every node of the default graph, see [Graph::init]
pub fn init() -> Result<(), ResolveError> {
    graph()?.init()
}

/// Resolves one node of the default graph, see [Graph::load]
pub fn load<T: Injectable>(slot: Slot<T>) -> Result<Arc<T>, ResolveError> {
    graph()?.load(slot)
}

/// Creates a lazy handle on the default graph, see [Graph::deferred]
pub fn deferred<T, C>(
    id: impl Into<NodeId>,
    view: impl Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
) -> Result<Deferred<C>, ResolveError>
where
    T: Injectable,
    C: ?Sized + Send + Sync + 'static,
{
    graph()?.deferred(id, view)
}
