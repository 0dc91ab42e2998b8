use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, OnceLock},
    time::Duration,
};

use futures::{executor::block_on, lock::Mutex, task::Spawn};

use crate::{
    deferred::Deferred,
    dependency_graph::DependencyGraph,
    errors::ResolveError,
    factories::DynFactory,
    initiator, resolver,
    types::{Injectable, Instance, NodeId, NodeInfo, Slot},
};

/// A declared node
///
/// The node is ready once `value` is set. It is only ever set while holding `lock`,
/// and never unset again.
pub(crate) struct Node {
    pub(crate) info: NodeInfo,
    pub(crate) dependencies: Vec<NodeId>,
    pub(crate) factory: Box<dyn DynFactory>,
    pub(crate) lock: Mutex<()>,
    pub(crate) value: OnceLock<Instance>,
}
impl Node {
    pub(crate) fn new(id: NodeId, factory: Box<dyn DynFactory>) -> Self {
        Node {
            info: NodeInfo {
                id,
                type_info: factory.supplies(),
            },
            dependencies: factory.dependencies(),
            factory,
            lock: Mutex::new(()),
            value: OnceLock::new(),
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.value.get().is_some()
    }
}

/// Graph of declared nodes
///
/// Created by [GraphBuilder::build](crate::GraphBuilder::build). Cloning is cheap, all clones
/// share the same nodes.
#[derive(Clone)]
pub struct Graph(Arc<GraphInner>);
struct GraphInner {
    nodes: HashMap<NodeId, Node>,
    dependency_graph: DependencyGraph,
}
impl Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for info in self.0.dependency_graph.nodes() {
            let state = if self.is_ready(info.id) {
                "ready"
            } else {
                "pending"
            };
            map.entry(&info.to_string(), &state);
        }
        map.finish()
    }
}

impl Graph {
    pub(crate) fn new(nodes: HashMap<NodeId, Node>, dependency_graph: DependencyGraph) -> Self {
        Self(Arc::new(GraphInner {
            nodes,
            dependency_graph,
        }))
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, ResolveError> {
        self.0.nodes.get(&id).ok_or(ResolveError::NodeNotFound(id))
    }

    pub(crate) fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.nodes.keys().copied()
    }

    pub fn contains(&self, id: impl Into<NodeId>) -> bool {
        self.0.nodes.contains_key(&id.into())
    }

    pub fn len(&self) -> usize {
        self.0.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.nodes.is_empty()
    }

    /// Returns true once the node has been constructed
    pub fn is_ready(&self, id: impl Into<NodeId>) -> bool {
        self.node(id.into()).is_ok_and(Node::is_ready)
    }

    /// Returns the node's value if it is ready, without resolving anything
    pub fn get<T: Injectable>(&self, slot: Slot<T>) -> Option<Arc<T>> {
        let instance = self.node(slot.id()).ok()?.value.get()?;
        instance.downcast().ok()
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.0.dependency_graph
    }
}

// Resolution entry points
impl Graph {
    /// Resolves one node and its transitive dependencies
    ///
    /// Nodes outside of the slot's dependency closure are left untouched.
    pub async fn resolve<T: Injectable>(&self, slot: Slot<T>) -> Result<Arc<T>, ResolveError> {
        resolver::ensure_ready(self, slot.id(), Vec::new())
            .await?
            .downcast()
    }

    /// Blocking version of [Graph::resolve]
    ///
    /// Must not be called from within a constructor, use the [Resolver](crate::Resolver) there.
    pub fn load<T: Injectable>(&self, slot: Slot<T>) -> Result<Arc<T>, ResolveError> {
        block_on(self.resolve(slot))
    }

    /// Resolves every declared node, driving all resolutions concurrently on the current task
    ///
    /// Waits for every node and returns the first error observed. Constructors overlap only
    /// while they are awaiting, use [Graph::init] or [Graph::resolve_all_with] for constructors
    /// which block.
    pub async fn resolve_all(&self) -> Result<(), ResolveError> {
        initiator::resolve_all(self, None).await
    }

    /// Like [Graph::resolve_all], but stops waiting once the timeout passed
    ///
    /// Only the waiting stops: resolutions which did not finish in time keep running on a
    /// detached thread, and their nodes become ready once their constructors return.
    pub async fn resolve_all_timeout(&self, timeout: Duration) -> Result<(), ResolveError> {
        initiator::resolve_all(self, Some(timeout)).await
    }

    /// Resolves every declared node, spawning one task per node on the given executor
    pub async fn resolve_all_with(&self, spawner: &impl Spawn) -> Result<(), ResolveError> {
        initiator::resolve_all_spawned(self, spawner, None).await
    }

    /// Like [Graph::resolve_all_with], but stops waiting once the timeout passed
    ///
    /// Spawned tasks keep running after the timeout, the nodes they finish still become ready.
    pub async fn resolve_all_with_timeout(
        &self,
        spawner: &impl Spawn,
        timeout: Duration,
    ) -> Result<(), ResolveError> {
        initiator::resolve_all_spawned(self, spawner, Some(timeout)).await
    }

    /// Resolves every declared node on one worker thread per node, blocking until all are done
    ///
    /// Waits for every node and returns the first error observed.
    pub fn init(&self) -> Result<(), ResolveError> {
        block_on(initiator::resolve_all_threaded(self, None))
    }

    /// Like [Graph::init], but stops waiting once the timeout passed
    ///
    /// The workers are not interrupted, nodes they finish after the timeout still become ready.
    pub fn init_timeout(&self, timeout: Duration) -> Result<(), ResolveError> {
        block_on(initiator::resolve_all_threaded(self, Some(timeout)))
    }

    /// Creates a handle resolving the node on first use
    ///
    /// `view` converts the node's value into the capability the caller wants to see, typically
    /// an `Arc<dyn Trait>`. The node must be declared on this graph and produce a `T`, otherwise
    /// this fails right away instead of on first use.
    pub fn deferred<T, C>(
        &self,
        id: impl Into<NodeId>,
        view: impl Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    ) -> Result<Deferred<C>, ResolveError>
    where
        T: Injectable,
        C: ?Sized + Send + Sync + 'static,
    {
        let node = self.node(id.into())?;
        if node.info.type_info.type_id != TypeId::of::<T>() {
            return Err(ResolveError::TypeMismatch {
                required: type_name::<T>(),
                actual: node.info.type_info.type_name,
            });
        }

        Ok(Deferred::new(self.clone(), node.info, view))
    }
}
