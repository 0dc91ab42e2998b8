use std::{
    convert::Infallible,
    env,
    error::Error,
    sync::Arc,
    thread::sleep,
    time::{Duration, Instant},
};

use futures::executor::{block_on, ThreadPool};
use inject_graph::{GraphBuilder, NodeFactory, NodeId, ResolveError, Resolver, Slot};
use tracing_subscriber::EnvFilter;

// Dependency tree:
// A -> B -> C
// A -> D

#[derive(Debug)]
struct A {
    x: u64,
}
#[derive(Debug)]
struct B {
    x: u64,
}
#[derive(Debug)]
struct C {
    x: u64,
}
#[derive(Debug)]
struct D {
    x: u64,
}

trait Doubled: Send + Sync {
    fn doubled(&self) -> u64;
}
impl Doubled for B {
    fn doubled(&self) -> u64 {
        self.x * 2
    }
}

struct AFactory {
    b: Slot<B>,
    d: Slot<D>,
    cost: Duration,
}
impl NodeFactory for AFactory {
    type Provides = A;

    fn dependencies(&self) -> Vec<NodeId> {
        vec![self.b.id(), self.d.id()]
    }

    async fn construct(&self, resolver: Resolver) -> Result<A, ResolveError> {
        let b = resolver.require(self.b).await?;
        let d = resolver.require(self.d).await?;
        sleep(self.cost);
        Ok(A { x: b.x + d.x })
    }
}

fn declare_b_and_c(builder: GraphBuilder, b: Slot<B>, c: Slot<C>, unit: Duration) -> GraphBuilder {
    builder
        .declare(
            b,
            move |resolver| async move {
                let c = resolver.require(c).await?;
                sleep(unit * 15);
                Ok::<_, ResolveError>(B { x: c.x * 2 })
            },
            [c.id()],
        )
        .declare(
            c,
            move |_| async move {
                sleep(unit * 5);
                Ok::<_, Infallible>(C { x: 30 })
            },
            [],
        )
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Time unit in milliseconds, construction costs are multiples of it
    let unit = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(100));

    let (a, b, c, d) = (Slot::new(), Slot::new(), Slot::new(), Slot::new());
    let graph = declare_b_and_c(GraphBuilder::new(), b, c, unit)
        .declare_factory(a, AFactory { b, d, cost: unit * 10 })
        .declare(
            d,
            move |_| async move {
                sleep(unit * 10);
                Ok::<_, Infallible>(D { x: 30 })
            },
            [],
        )
        .build()?;

    let pool = ThreadPool::builder().pool_size(4).create()?;

    let started = Instant::now();
    block_on(graph.resolve_all_with(&pool))?;
    // 30 units on the critical path, not the 40 units of constructing one after the other
    println!("{:?}", started.elapsed());
    println!("{:?}", graph);
    println!(
        "{:?} {:?} {:?} {:?}",
        graph.get(a),
        graph.get(b),
        graph.get(c),
        graph.get(d)
    );

    // Nothing is constructed until the handle is used
    let (b, c) = (Slot::new(), Slot::new());
    let graph = declare_b_and_c(GraphBuilder::new(), b, c, unit).build()?;
    let doubled = graph.deferred(b, |b: Arc<B>| b as Arc<dyn Doubled>)?;
    println!("B ready before first use: {}", graph.is_ready(b));

    let started = Instant::now();
    println!("{}", doubled.get()?.doubled());
    println!("{:?}", started.elapsed());

    Ok(())
}
