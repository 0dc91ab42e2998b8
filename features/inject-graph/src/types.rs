use std::{
    any::{type_name, Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::errors::ResolveError;

/// All errors must be Send + Sync so they can cross resolution tasks
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume that we are using a multithreaded async runtime
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Type erased value produced by a node
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub fn new<ProducedValue: Injectable>(instance: ProducedValue) -> Self {
        Instance {
            info: TypeInfo::of::<ProducedValue>(),
            instance: Arc::new(instance),
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        Arc::downcast::<T>(self.instance.clone()).map_err(|_| ResolveError::TypeMismatch {
            required: type_name::<T>(),
            actual: self.info.type_name,
        })
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Opaque identity of a node
///
/// Ids are unique for the whole process, so an id never matches a node of a graph it was not
/// declared on.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(u64);
impl NodeId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity and produced type of a declared node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub type_info: TypeInfo,
}
impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.type_info, self.id)
    }
}

/// Typed handle to the value of a node
///
/// A slot is the identity a node is declared under. It can be created (and used as a dependency)
/// before the node itself is declared. Once the node is ready, every copy of the slot observes
/// the same value through [`Graph::get`](crate::Graph::get).
pub struct Slot<T> {
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}
impl<T: Injectable> Slot<T> {
    pub fn new() -> Self {
        Slot {
            id: NodeId::next(),
            _marker: PhantomData,
        }
    }
}
impl<T> Slot<T> {
    pub fn id(&self) -> NodeId {
        self.id
    }
}
impl<T: Injectable> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Slot<T> {}
impl<T> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T> Eq for Slot<T> {}
impl<T> Hash for Slot<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot")
            .field(&type_name::<T>())
            .field(&self.id)
            .finish()
    }
}
impl<T> From<Slot<T>> for NodeId {
    fn from(slot: Slot<T>) -> Self {
        slot.id
    }
}

/// Successful output of a constructor
///
/// Constructors either return the value itself, or an `Option` of it.
/// Returning `None` without an error breaks the constructor contract and fails the node with
/// [`ResolveError::InvalidConstructor`].
pub trait Produced<T> {
    fn into_product(self) -> Option<T>;
}
impl<T> Produced<T> for T {
    fn into_product(self) -> Option<T> {
        Some(self)
    }
}
impl<T> Produced<T> for Option<T> {
    fn into_product(self) -> Option<T> {
        self
    }
}
