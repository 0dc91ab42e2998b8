use std::sync::Arc;

use thiserror::Error;

use crate::{
    dependency_graph::DependencyGraphErrors,
    types::{DynError, NodeId, NodeInfo},
};

/// Errors while resolving nodes
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// No node was declared under the requested identity
    #[error("No node is declared for {0}")]
    NodeNotFound(NodeId),

    /// The constructor reported success but produced nothing
    #[error("Constructor for '{0}' reported success without producing a value")]
    InvalidConstructor(NodeInfo),

    /// The constructor returned an error
    #[error("Constructor for '{node}' failed - error: {error}")]
    ConstructorFailed {
        node: NodeInfo,
        error: Arc<DynError>,
    },

    #[error("Failed to downcast, required: '{required}' actual: '{actual}'")]
    TypeMismatch {
        required: &'static str,
        actual: &'static str,
    },

    /// A resolution chain requested a node it is already constructing
    #[error("A dependency cycle was entered through {}", display_chain(chain))]
    CycleDetected { chain: Vec<NodeInfo> },

    /// There are issues with the declared dependency graph
    #[error(transparent)]
    Graph(#[from] DependencyGraphErrors),

    /// Waiting for the whole graph timed out
    #[error("Resolution timed out")]
    Timeout,

    /// A resolution task could not be handed to the executor
    #[error("Failed to spawn resolution task: {0}")]
    Spawn(String),

    /// The default graph no longer accepts declarations
    #[error("The default graph is sealed, declarations must happen before the first resolution")]
    Sealed,
}

impl ResolveError {
    /// Returns true for errors caused by misuse of the graph rather than by a failing constructor
    ///
    /// These are programmer errors: retrying the same call will fail the same way.
    pub fn is_contract_violation(&self) -> bool {
        match self {
            ResolveError::NodeNotFound(_)
            | ResolveError::InvalidConstructor(_)
            | ResolveError::TypeMismatch { .. }
            | ResolveError::CycleDetected { .. }
            | ResolveError::Graph(_)
            | ResolveError::Sealed => true,
            ResolveError::ConstructorFailed { .. }
            | ResolveError::Timeout
            | ResolveError::Spawn(_) => false,
        }
    }

    /// The error returned by a failing constructor, as it was returned
    pub fn constructor_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ResolveError::ConstructorFailed { error, .. } => Some(&***error),
            _ => None,
        }
    }
}

fn display_chain(chain: &[NodeInfo]) -> String {
    chain
        .iter()
        .map(NodeInfo::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
