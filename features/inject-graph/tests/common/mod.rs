#![allow(dead_code)]

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use futures_channel::oneshot;
use inject_graph::{GraphBuilder, ResolveError, Slot};

// Dependency tree:
// A -> B -> C
// A -> D

#[derive(Debug)]
pub struct A {
    pub x: u64,
}
#[derive(Debug)]
pub struct B {
    pub x: u64,
}
#[derive(Debug)]
pub struct C {
    pub x: u64,
}
#[derive(Debug)]
pub struct D {
    pub x: u64,
}

pub trait HasB: Send + Sync + std::fmt::Debug {
    fn b(&self) -> u64;
}
impl HasB for B {
    fn b(&self) -> u64 {
        self.x
    }
}

/// How constructors spend their construction time
#[derive(Debug, Clone, Copy)]
pub enum Cost {
    Free,
    /// Yields to the executor while waiting
    Async(Duration),
    /// Blocks the thread
    Blocking(Duration),
}
impl Cost {
    pub async fn spend(self, units: u32) {
        match self {
            Cost::Free => {}
            Cost::Async(unit) => delay(unit * units).await,
            Cost::Blocking(unit) => thread::sleep(unit * units),
        }
    }
}

/// Waits without blocking the executor
pub async fn delay(duration: Duration) {
    let (tx, rx) = oneshot::channel();
    thread::spawn(move || {
        thread::sleep(duration);
        let _ = tx.send(());
    });
    let _ = rx.await;
}

#[derive(Clone)]
pub struct Abcd {
    pub a: Slot<A>,
    pub b: Slot<B>,
    pub c: Slot<C>,
    pub d: Slot<D>,
    /// Names of the constructed nodes, in construction order
    pub constructed: Arc<Mutex<Vec<&'static str>>>,
}
impl Abcd {
    pub fn constructed(&self) -> Vec<&'static str> {
        self.constructed.lock().unwrap().clone()
    }
}

/// Declares the tree, costs are C = 5, B = 15, D = 10 and A = 10 units
pub fn declare_abcd(builder: GraphBuilder, cost: Cost) -> (GraphBuilder, Abcd) {
    let nodes = Abcd {
        a: Slot::new(),
        b: Slot::new(),
        c: Slot::new(),
        d: Slot::new(),
        constructed: Arc::default(),
    };
    let Abcd { a, b, c, d, .. } = nodes.clone();

    let log = nodes.constructed.clone();
    let builder = builder.declare(
        a,
        move |resolver| {
            let log = log.clone();
            async move {
                let b = resolver.require(b).await?;
                let d = resolver.require(d).await?;
                cost.spend(10).await;
                log.lock().unwrap().push("A");
                Ok::<_, ResolveError>(A { x: b.x + d.x })
            }
        },
        [b.id(), d.id()],
    );

    let log = nodes.constructed.clone();
    let builder = builder.declare(
        b,
        move |resolver| {
            let log = log.clone();
            async move {
                let c = resolver.require(c).await?;
                cost.spend(15).await;
                log.lock().unwrap().push("B");
                Ok::<_, ResolveError>(B { x: c.x * 2 })
            }
        },
        [c.id()],
    );

    let log = nodes.constructed.clone();
    let builder = builder.declare(
        c,
        move |_| {
            let log = log.clone();
            async move {
                cost.spend(5).await;
                log.lock().unwrap().push("C");
                Ok::<_, Infallible>(C { x: 30 })
            }
        },
        [],
    );

    let log = nodes.constructed.clone();
    let builder = builder.declare(
        d,
        move |_| {
            let log = log.clone();
            async move {
                cost.spend(10).await;
                log.lock().unwrap().push("D");
                Ok::<_, Infallible>(D { x: 30 })
            }
        },
        [],
    );

    (builder, nodes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestError(pub &'static str);
impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}
impl std::error::Error for TestError {}
