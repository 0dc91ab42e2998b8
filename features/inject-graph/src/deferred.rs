use std::{
    any::type_name,
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use futures::executor::block_on;

use crate::{
    errors::ResolveError,
    graph::Graph,
    resolver,
    types::{Injectable, Instance, NodeInfo},
};

type View<C> = dyn Fn(Instance) -> Result<Arc<C>, ResolveError> + Send + Sync;

/// Lazily resolved node, seen through a capability `C`
///
/// Nothing is constructed until the first call to [Deferred::resolve] or [Deferred::get].
/// The first successful result is memoized, later calls return it without touching the graph.
/// A failed resolution is not memoized and can be retried by calling again.
///
/// Created with [Graph::deferred].
pub struct Deferred<C: ?Sized>(Arc<DeferredInner<C>>);
struct DeferredInner<C: ?Sized> {
    graph: Graph,
    node: NodeInfo,
    view: Box<View<C>>,
    once: OnceLock<Arc<C>>,
}
impl<C: ?Sized> Clone for Deferred<C> {
    fn clone(&self) -> Self {
        Deferred(self.0.clone())
    }
}
impl<C: ?Sized + Debug> Debug for Deferred<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.once.get() {
            Some(resolved) => f.debug_tuple("Deferred").field(resolved).finish(),
            None => f
                .debug_tuple("Deferred")
                .field(&format_args!("{} (unresolved)", self.0.node))
                .finish(),
        }
    }
}

impl<C: ?Sized + Send + Sync + 'static> Deferred<C> {
    pub(crate) fn new<T: Injectable>(
        graph: Graph,
        node: NodeInfo,
        view: impl Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    ) -> Self {
        let view = move |instance: Instance| -> Result<Arc<C>, ResolveError> {
            let value = instance.downcast::<T>()?;
            Ok(view(value))
        };

        Deferred(Arc::new(DeferredInner {
            graph,
            node,
            view: Box::new(view),
            once: OnceLock::new(),
        }))
    }

    /// Resolves the node and its dependencies on first use
    pub async fn resolve(&self) -> Result<Arc<C>, ResolveError> {
        if let Some(resolved) = self.0.once.get() {
            return Ok(resolved.clone());
        }

        let instance = resolver::ensure_ready(&self.0.graph, self.0.node.id, Vec::new()).await?;
        let resolved = (self.0.view)(instance)?;

        // Concurrent callers resolved the same node, whichever is stored first is equal
        Ok(self.0.once.get_or_init(|| resolved).clone())
    }

    /// Blocking version of [Deferred::resolve]
    ///
    /// Must not be called from within a constructor.
    pub fn get(&self) -> Result<Arc<C>, ResolveError> {
        block_on(self.resolve())
    }

    /// Converts the handle into a zero argument callback resolving the node
    pub fn into_fn(self) -> impl Fn() -> Result<Arc<C>, ResolveError> + Send + Sync + Clone {
        move || self.get()
    }

    /// Returns true once a call resolved the node
    pub fn is_resolved(&self) -> bool {
        self.0.once.get().is_some()
    }

    /// The node this handle resolves
    pub fn node(&self) -> NodeInfo {
        self.0.node
    }

    /// Name of the capability the node is seen through
    pub fn capability(&self) -> &'static str {
        type_name::<C>()
    }
}
