use std::{collections::HashMap, future::Future};

use crate::{
    dependency_graph::DependencyGraph,
    errors::ResolveError,
    factories::{DynFactory, FnFactory, NodeFactory, ProvidedFactory},
    graph::{Graph, Node},
    resolver::Resolver,
    types::{DynError, Injectable, Instance, NodeId, Produced, Slot},
};

//////////////////////////////////////////////////////////////////////
///
/// The Graph consists of two phases.
/// 1. The GraphBuilder where one declares all nodes
/// 2. The built Graph, where nodes are resolved - no more declarations are possible

pub struct GraphBuilder {
    /// Declared factories, by the node they construct
    pub(crate) declared: HashMap<NodeId, Box<dyn DynFactory>>,
}
impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            declared: HashMap::new(),
        }
    }
}
impl GraphBuilder {
    /// Declares the node constructing the slot's value
    ///
    /// `dependencies` are made ready, in order, before the constructor runs.
    /// Declaring a slot a second time replaces the earlier declaration.
    ///
    /// ```
    /// use std::convert::Infallible;
    /// use inject_graph::{GraphBuilder, Slot};
    ///
    /// let port = Slot::<u16>::new();
    /// let url = Slot::<String>::new();
    ///
    /// let graph = GraphBuilder::new()
    ///     .declare(port, |_| async { Ok::<_, Infallible>(8080_u16) }, [])
    ///     .declare(
    ///         url,
    ///         move |resolver| async move {
    ///             let port = resolver.require(port).await?;
    ///             Ok::<_, inject_graph::ResolveError>(format!("http://localhost:{port}"))
    ///         },
    ///         [port.id()],
    ///     )
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(*graph.load(url).unwrap(), "http://localhost:8080");
    /// ```
    pub fn declare<T, F, Fut, P, E>(
        self,
        slot: Slot<T>,
        constructor: F,
        dependencies: impl IntoIterator<Item = NodeId>,
    ) -> Self
    where
        T: Injectable,
        F: Fn(Resolver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<P, E>> + Send + 'static,
        P: Produced<T>,
        E: Into<DynError>,
    {
        let factory = FnFactory::<T, F>::new(constructor, dependencies.into_iter().collect());
        self.insert(slot.id(), Box::new(factory))
    }

    /// Declares the node constructing the slot's value using a [NodeFactory]
    pub fn declare_factory<Factory: NodeFactory>(
        self,
        slot: Slot<Factory::Provides>,
        factory: Factory,
    ) -> Self {
        self.insert(slot.id(), Box::new(factory))
    }

    /// Declares a node whose constructor hands out an existing value
    pub fn provide<T: Injectable>(self, slot: Slot<T>, value: T) -> Self {
        self.insert(slot.id(), Box::new(ProvidedFactory(Instance::new(value))))
    }

    pub fn is_declared(&self, id: impl Into<NodeId>) -> bool {
        self.declared.contains_key(&id.into())
    }

    fn insert(mut self, id: NodeId, factory: Box<dyn DynFactory>) -> Self {
        let supplies = factory.supplies();
        match self.declared.insert(id, factory) {
            Some(_) => {
                tracing::warn!("Redeclared {supplies} ({id}), the earlier declaration is replaced")
            }
            None => tracing::debug!("Declared {supplies} ({id})"),
        }
        self
    }

    /// Freezes the declarations into a [Graph]
    ///
    /// Fails if the declared dependencies contain a cycle.
    pub fn build(self) -> Result<Graph, ResolveError> {
        let nodes = self
            .declared
            .into_iter()
            .map(|(id, factory)| (id, Node::new(id, factory)))
            .collect::<HashMap<_, _>>();

        let dependency_graph = DependencyGraph::new(
            nodes
                .values()
                .map(|node| (node.info, node.dependencies.as_slice())),
        );

        for (required_by, dependency) in dependency_graph.undeclared_dependencies() {
            tracing::warn!("{required_by} depends on {dependency} which is not declared");
        }

        dependency_graph.check()?;

        tracing::debug!("Built graph with {} nodes", nodes.len());
        Ok(Graph::new(nodes, dependency_graph))
    }
}
