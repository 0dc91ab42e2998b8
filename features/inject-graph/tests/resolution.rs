mod common;

use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use common::{declare_abcd, Abcd, Cost, TestError, A, B, C, D};
use inject_graph::{GraphBuilder, NodeFactory, NodeId, ResolveError, Resolver, Slot};

#[test]
fn init_constructs_every_node() {
    let (builder, nodes) = declare_abcd(GraphBuilder::new(), Cost::Free);
    let graph = builder.build().unwrap();

    graph.init().unwrap();

    let Abcd { a, b, c, d, .. } = nodes;
    assert_eq!(graph.get(a).unwrap().x, 90);
    assert_eq!(graph.get(b).unwrap().x, 60);
    assert_eq!(graph.get(c).unwrap().x, 30);
    assert_eq!(graph.get(d).unwrap().x, 30);

    let mut constructed = nodes.constructed();
    constructed.sort();
    assert_eq!(constructed, vec!["A", "B", "C", "D"]);
}

#[test]
fn load_only_touches_the_dependency_closure() {
    let (builder, nodes) = declare_abcd(GraphBuilder::new(), Cost::Free);
    let graph = builder.build().unwrap();

    let b = graph.load(nodes.b).unwrap();

    assert_eq!(b.x, 60);
    assert_eq!(nodes.constructed(), vec!["C", "B"]);
    assert!(graph.is_ready(nodes.c));
    assert!(!graph.is_ready(nodes.a));
    assert!(!graph.is_ready(nodes.d));
    assert!(graph.get(nodes.a).is_none());
}

#[test]
fn ready_node_is_not_constructed_again() {
    let calls = Arc::new(AtomicUsize::new(0));
    let slot = Slot::<C>::new();
    let counter = calls.clone();
    let graph = GraphBuilder::new()
        .declare(
            slot,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Infallible>(C { x: 1 }) }
            },
            [],
        )
        .build()
        .unwrap();

    let first = graph.load(slot).unwrap();
    let second = graph.load(slot).unwrap();
    graph.init().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &graph.get(slot).unwrap()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_constructor_aborts_its_dependents() {
    let (builder, nodes) = declare_abcd(GraphBuilder::new(), Cost::Free);
    let graph = builder
        .declare(
            nodes.d,
            |_| async { Err::<D, _>(TestError("test error")) },
            [],
        )
        .build()
        .unwrap();

    let error = graph.load(nodes.a).unwrap_err();

    match &error {
        ResolveError::ConstructorFailed { node, .. } => assert_eq!(node.id, nodes.d.id()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!error.is_contract_violation());
    assert_eq!(
        error.constructor_error().unwrap().downcast_ref::<TestError>(),
        Some(&TestError("test error"))
    );

    // B was resolved before D failed and stays ready
    assert_eq!(nodes.constructed(), vec!["C", "B"]);
    assert!(graph.is_ready(nodes.b));
    assert!(!graph.is_ready(nodes.d));
    assert!(!graph.is_ready(nodes.a));
}

#[test]
fn empty_payload_is_an_invalid_constructor() {
    let (builder, nodes) = declare_abcd(GraphBuilder::new(), Cost::Free);
    let graph = builder
        .declare(
            nodes.d,
            |_| async { Ok::<Option<D>, Infallible>(None) },
            [],
        )
        .build()
        .unwrap();

    let error = graph.init().unwrap_err();

    match error {
        ResolveError::InvalidConstructor(node) => assert_eq!(node.id, nodes.d.id()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!graph.is_ready(nodes.d));
    assert!(!graph.is_ready(nodes.a));
    assert!(!nodes.constructed().contains(&"A"));
}

#[test]
fn some_payload_is_a_value() {
    let slot = Slot::<C>::new();
    let graph = GraphBuilder::new()
        .declare(slot, |_| async { Ok::<_, Infallible>(Some(C { x: 7 })) }, [])
        .build()
        .unwrap();

    assert_eq!(graph.load(slot).unwrap().x, 7);
}

#[test]
fn failed_node_can_be_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let slot = Slot::<C>::new();
    let counter = attempts.clone();
    let graph = GraphBuilder::new()
        .declare(
            slot,
            move |_| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    match attempt {
                        0 => Err(TestError("not yet")),
                        _ => Ok(C { x: 3 }),
                    }
                }
            },
            [],
        )
        .build()
        .unwrap();

    assert!(graph.load(slot).is_err());
    assert!(!graph.is_ready(slot));

    assert_eq!(graph.load(slot).unwrap().x, 3);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn redeclaring_replaces_the_constructor() {
    let slot = Slot::<C>::new();
    let graph = GraphBuilder::new()
        .declare(slot, |_| async { Ok::<_, Infallible>(C { x: 1 }) }, [])
        .declare(slot, |_| async { Ok::<_, Infallible>(C { x: 2 }) }, [])
        .build()
        .unwrap();

    assert_eq!(graph.len(), 1);
    assert_eq!(graph.load(slot).unwrap().x, 2);
}

#[test]
fn undeclared_node_is_not_found() {
    let declared = Slot::<C>::new();
    let missing = Slot::<C>::new();
    let dependent = Slot::<B>::new();
    let graph = GraphBuilder::new()
        .declare(declared, |_| async { Ok::<_, Infallible>(C { x: 1 }) }, [])
        .declare(
            dependent,
            |_| async { Ok::<_, Infallible>(B { x: 1 }) },
            [missing.id()],
        )
        .build()
        .unwrap();

    match graph.load(missing) {
        Err(ResolveError::NodeNotFound(id)) => assert_eq!(id, missing.id()),
        other => panic!("unexpected result: {other:?}"),
    }

    let error = graph.load(dependent).unwrap_err();
    assert!(matches!(error, ResolveError::NodeNotFound(id) if id == missing.id()));
    assert!(error.is_contract_violation());
    assert!(!graph.is_ready(dependent));
}

#[test]
fn slots_of_other_graphs_are_not_found() {
    let slot = Slot::<C>::new();
    let first = GraphBuilder::new()
        .declare(slot, |_| async { Ok::<_, Infallible>(C { x: 1 }) }, [])
        .build()
        .unwrap();
    let second = GraphBuilder::new().build().unwrap();

    assert!(first.contains(slot));
    assert!(!second.contains(slot));
    assert!(matches!(
        second.load(slot),
        Err(ResolveError::NodeNotFound(_))
    ));
}

#[test]
fn provided_value_is_resolved_as_is() {
    let slot = Slot::<String>::new();
    let graph = GraphBuilder::new()
        .provide(slot, "provided".to_string())
        .build()
        .unwrap();

    assert_eq!(*graph.load(slot).unwrap(), "provided");
}

#[test]
fn constructor_can_require_undeclared_dependencies() {
    let (builder, nodes) = declare_abcd(GraphBuilder::new(), Cost::Free);
    let c = nodes.c;
    let sum = Slot::<u64>::new();
    let graph = builder
        .declare(
            sum,
            move |resolver| async move {
                // C is not a declared dependency, it is resolved on demand
                let c = resolver.require(c).await?;
                Ok::<_, ResolveError>(c.x + 1)
            },
            [],
        )
        .build()
        .unwrap();

    assert_eq!(*graph.load(sum).unwrap(), 31);
    graph.init().unwrap();

    let constructed = nodes.constructed();
    assert_eq!(constructed.iter().filter(|name| **name == "C").count(), 1);
}

#[test]
fn optional_dependency_may_be_missing() {
    let missing = Slot::<C>::new();
    let slot = Slot::<u64>::new();
    let graph = GraphBuilder::new()
        .declare(
            slot,
            move |resolver| async move {
                let c = resolver.optional(missing).await?;
                Ok::<_, ResolveError>(c.map_or(0, |c| c.x))
            },
            [],
        )
        .build()
        .unwrap();

    assert_eq!(*graph.load(slot).unwrap(), 0);
}

#[test]
fn declared_cycle_fails_the_build() {
    let a = Slot::<A>::new();
    let b = Slot::<B>::new();
    let result = GraphBuilder::new()
        .declare(a, |_| async { Ok::<_, Infallible>(A { x: 1 }) }, [b.id()])
        .declare(b, |_| async { Ok::<_, Infallible>(B { x: 1 }) }, [a.id()])
        .build();

    match result {
        Err(ResolveError::Graph(errors)) => assert_eq!(errors.errors.len(), 1),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn self_dependency_fails_the_build() {
    let a = Slot::<A>::new();
    let result = GraphBuilder::new()
        .declare(a, |_| async { Ok::<_, Infallible>(A { x: 1 }) }, [a.id()])
        .build();

    let error = result.unwrap_err();
    assert!(matches!(error, ResolveError::Graph(_)));
    assert!(error.is_contract_violation());
}

#[test]
fn requiring_itself_is_detected() {
    let slot = Slot::<C>::new();
    let graph = GraphBuilder::new()
        .declare(
            slot,
            move |resolver| async move {
                let itself = resolver.require(slot).await?;
                Ok::<_, ResolveError>(C { x: itself.x })
            },
            [],
        )
        .build()
        .unwrap();

    let error = graph.load(slot).unwrap_err();
    let cause = error
        .constructor_error()
        .and_then(|e| e.downcast_ref::<ResolveError>());

    match cause {
        Some(ResolveError::CycleDetected { chain }) => {
            let ids = chain.iter().map(|info| info.id).collect::<Vec<NodeId>>();
            assert_eq!(ids, vec![slot.id(), slot.id()]);
        }
        other => panic!("unexpected cause: {other:?}"),
    }
    assert!(!graph.is_ready(slot));
}

struct Doubler {
    c: Slot<C>,
}
impl NodeFactory for Doubler {
    type Provides = u64;

    fn dependencies(&self) -> Vec<NodeId> {
        vec![self.c.id()]
    }

    async fn construct(&self, resolver: Resolver) -> Result<u64, Infallible> {
        let c = resolver.get(self.c).map_or(0, |c| c.x);
        Ok(c * 2)
    }
}

#[test]
fn factory_dependencies_are_ready_before_construction() {
    let (builder, nodes) = declare_abcd(GraphBuilder::new(), Cost::Free);
    let doubled = Slot::<u64>::new();
    let graph = builder
        .declare_factory(doubled, Doubler { c: nodes.c })
        .build()
        .unwrap();

    assert_eq!(*graph.load(doubled).unwrap(), 60);
    assert_eq!(
        graph.dependency_graph().dependencies(doubled.id()),
        Some(&[nodes.c.id()][..])
    );
}

#[test]
fn debug_lists_node_states() {
    let slot = Slot::<C>::new();
    let graph = GraphBuilder::new()
        .declare(slot, |_| async { Ok::<_, Infallible>(C { x: 1 }) }, [])
        .build()
        .unwrap();

    assert!(format!("{graph:?}").contains("pending"));
    graph.init().unwrap();
    assert!(format!("{graph:?}").contains("ready"));
}

#[test]
fn resolver_exposes_the_construction_chain() {
    let inner = Slot::<Vec<NodeId>>::new();
    let outer = Slot::<Vec<NodeId>>::new();
    let graph = GraphBuilder::new()
        .declare(
            inner,
            |resolver| async move {
                let chain = resolver.chain().iter().map(|info| info.id).collect();
                Ok::<Vec<NodeId>, Infallible>(chain)
            },
            [],
        )
        .declare(
            outer,
            move |resolver| async move {
                let inner = resolver.require(inner).await?;
                Ok::<_, ResolveError>(inner.to_vec())
            },
            [],
        )
        .build()
        .unwrap();

    // Resolved through outer, inner sees both nodes on its chain
    assert_eq!(*graph.load(outer).unwrap(), vec![outer.id(), inner.id()]);
    assert_eq!(*graph.load(inner).unwrap(), vec![outer.id(), inner.id()]);
}
