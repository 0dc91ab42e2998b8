use std::{future::Future, marker::PhantomData};

use futures::future::{BoxFuture, FutureExt};

use crate::{
    resolver::Resolver,
    types::{DynError, Injectable, Instance, NodeId, Produced, TypeInfo},
};

/// A Factory constructing the value of a node
pub trait NodeFactory: Send + Sync + 'static {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Returns the nodes which must be ready before [NodeFactory::construct] is called
    fn dependencies(&self) -> Vec<NodeId>;

    /// Constructs the node's value
    ///
    /// Returns the constructed value, or an error if the construction failed.
    /// The resolver can be used to require further nodes which were not declared as dependencies.
    fn construct(
        &self,
        resolver: Resolver,
    ) -> impl Future<Output = Result<impl Produced<Self::Provides>, impl Into<DynError>>>
           + Send
           + '_;
}

/// Factory built from a constructor closure and its dependency list
pub(crate) struct FnFactory<T, F> {
    constructor: F,
    dependencies: Vec<NodeId>,
    _marker: PhantomData<fn() -> T>,
}
impl<T, F> FnFactory<T, F> {
    pub(crate) fn new(constructor: F, dependencies: Vec<NodeId>) -> Self {
        FnFactory {
            constructor,
            dependencies,
            _marker: PhantomData,
        }
    }
}
impl<T, F, Fut, P, E> NodeFactory for FnFactory<T, F>
where
    T: Injectable,
    F: Fn(Resolver) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<P, E>> + Send + 'static,
    P: Produced<T>,
    E: Into<DynError>,
{
    type Provides = T;

    fn dependencies(&self) -> Vec<NodeId> {
        self.dependencies.clone()
    }

    fn construct(
        &self,
        resolver: Resolver,
    ) -> impl Future<Output = Result<impl Produced<T>, impl Into<DynError>>> + Send + '_ {
        (self.constructor)(resolver)
    }
}

/// Wrapper Trait for factories, providing type erased instances
pub(crate) trait DynFactory: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    /// Returns a list of dependencies for the factory
    fn dependencies(&self) -> Vec<NodeId>;

    /// Constructs the node's value
    ///
    /// `Ok(None)` means the constructor returned successfully without a value
    fn construct(&self, resolver: Resolver) -> BoxFuture<'_, Result<Option<Instance>, DynError>>;
}
// Impl DynFactory for any NodeFactory
impl<T: Injectable, SpecificFactory: NodeFactory<Provides = T>> DynFactory for SpecificFactory {
    fn supplies(&self) -> TypeInfo {
        SpecificFactory::supplies()
    }

    fn dependencies(&self) -> Vec<NodeId> {
        NodeFactory::dependencies(self)
    }

    fn construct(&self, resolver: Resolver) -> BoxFuture<'_, Result<Option<Instance>, DynError>> {
        async move {
            // Forward the call to the specific implementation
            let produced = NodeFactory::construct(self, resolver)
                .await
                .map_err(Into::<DynError>::into)?;

            Ok::<_, DynError>(produced.into_product().map(Instance::new))
        }
        .boxed()
    }
}

/// Factory handing out an already existing instance
pub(crate) struct ProvidedFactory(pub(crate) Instance);
impl DynFactory for ProvidedFactory {
    fn supplies(&self) -> TypeInfo {
        self.0.info
    }

    fn dependencies(&self) -> Vec<NodeId> {
        vec![]
    }

    fn construct(&self, _resolver: Resolver) -> BoxFuture<'_, Result<Option<Instance>, DynError>> {
        futures::future::ready(Ok(Some(self.0.clone()))).boxed()
    }
}
