use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::{
    errors::ResolveError,
    graph::Graph,
    types::{Injectable, Instance, NodeId, NodeInfo, Slot},
};

/// Makes sure the node is ready, constructing it and its dependencies if needed
///
/// `chain` holds the nodes the calling resolution is currently constructing. Each node's
/// constructor runs at most once, no matter how many resolutions ask for it concurrently:
/// the readiness check and the construction both happen under the node's lock.
pub(crate) fn ensure_ready(
    graph: &Graph,
    id: NodeId,
    chain: Vec<NodeInfo>,
) -> BoxFuture<'static, Result<Instance, ResolveError>> {
    let graph = graph.clone();
    async move {
        let node = graph.node(id)?;

        // The lock is not re-entrant, asking for a node on our own chain would never return
        if chain.iter().any(|info| info.id == id) {
            let mut chain = chain;
            chain.push(node.info);
            tracing::error!("Dependency cycle detected while resolving {}", node.info);
            return Err(ResolveError::CycleDetected { chain });
        }

        let _guard = node.lock.lock().await;
        if let Some(instance) = node.value.get() {
            tracing::trace!("{} is already ready", node.info);
            return Ok(instance.clone());
        }

        let mut chain = chain;
        chain.push(node.info);

        for dependency in &node.dependencies {
            ensure_ready(&graph, *dependency, chain.clone()).await?;
        }

        tracing::debug!("Constructing {}", node.info);
        let produced = node
            .factory
            .construct(Resolver::new(graph.clone(), chain))
            .await
            .map_err(|error| {
                tracing::debug!("Constructor for {} failed: {}", node.info, error);
                ResolveError::ConstructorFailed {
                    node: node.info,
                    error: Arc::new(error),
                }
            })?;

        let Some(instance) = produced else {
            tracing::error!("Constructor for {} returned no value", node.info);
            return Err(ResolveError::InvalidConstructor(node.info));
        };

        // We hold the lock and the value was unset, so this is the only write
        let _ = node.value.set(instance.clone());
        tracing::debug!("Constructed {}", node.info);

        Ok(instance)
    }
    .boxed()
}

/// Handle for resolving further nodes from within a constructor
///
/// Declared dependencies are always ready when the constructor runs and can be read with
/// [Resolver::get]. Nodes which were not declared as dependencies can still be required,
/// they are constructed on demand with the same at-most-once guarantee.
#[derive(Clone)]
pub struct Resolver {
    graph: Graph,
    chain: Vec<NodeInfo>,
}
impl Resolver {
    pub(crate) fn new(graph: Graph, chain: Vec<NodeInfo>) -> Self {
        Resolver { graph, chain }
    }

    /// Resolves the node, constructing it if needed
    pub async fn require<T: Injectable>(&self, slot: Slot<T>) -> Result<Arc<T>, ResolveError> {
        ensure_ready(&self.graph, slot.id(), self.chain.clone())
            .await?
            .downcast()
    }

    /// Like [Resolver::require], but returns None if the node was never declared
    pub async fn optional<T: Injectable>(
        &self,
        slot: Slot<T>,
    ) -> Result<Option<Arc<T>>, ResolveError> {
        if !self.graph.contains(slot) {
            return Ok(None);
        }
        self.require(slot).await.map(Some)
    }

    /// Returns the node's value if it is ready
    pub fn get<T: Injectable>(&self, slot: Slot<T>) -> Option<Arc<T>> {
        self.graph.get(slot)
    }

    /// The nodes currently being constructed by this resolution, outermost first
    pub fn chain(&self) -> &[NodeInfo] {
        &self.chain
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}
