use std::{
    thread::{self, sleep},
    time::Duration,
};

use futures::{
    executor::block_on,
    future::{self, FutureExt},
    stream::{FusedStream, FuturesUnordered},
    task::{Spawn, SpawnExt},
    Stream, StreamExt,
};
use futures_channel::{mpsc, oneshot};

use crate::{errors::ResolveError, graph::Graph, resolver, types::Instance};

/// Resolves all nodes of the graph, polling every resolution from the current task
///
/// If the timeout fires, the unfinished resolutions are handed to a detached thread which keeps
/// driving them, so constructors which already started still run to completion.
pub(crate) async fn resolve_all(
    graph: &Graph,
    timeout: Option<Duration>,
) -> Result<(), ResolveError> {
    let mut resolutions = graph
        .node_ids()
        .map(|id| resolver::ensure_ready(graph, id, Vec::new()))
        .collect::<FuturesUnordered<_>>();

    let result = wait_for_all(&mut resolutions, graph.len(), timeout).await;
    if let Err(ResolveError::Timeout) = result {
        let pending = resolutions.len();
        thread::spawn(move || {
            block_on(resolutions.for_each(|_| future::ready(())));
            tracing::debug!("{pending} abandoned resolutions finished");
        });
    }
    result
}

/// Resolves all nodes of the graph, spawning one task per node
///
/// Results are reported back through a channel, so abandoned tasks keep running to completion.
pub(crate) async fn resolve_all_spawned(
    graph: &Graph,
    spawner: &impl Spawn,
    timeout: Option<Duration>,
) -> Result<(), ResolveError> {
    let (result_tx, result_rx) = mpsc::unbounded();

    for id in graph.node_ids() {
        let result_tx = result_tx.clone();
        let resolution = resolver::ensure_ready(graph, id, Vec::new());

        spawner
            .spawn(async move {
                // Receiver is gone if we stopped waiting
                let _ = result_tx.unbounded_send(resolution.await);
            })
            .map_err(|e| ResolveError::Spawn(e.to_string()))?;
    }

    // Stream ends once every task dropped its sender
    drop(result_tx);

    wait_for_all(result_rx, graph.len(), timeout).await
}

/// Resolves all nodes of the graph, running one worker thread per node
///
/// Constructors may block, independent nodes still construct in parallel.
/// Workers are not joined, after a timeout they keep running to completion.
pub(crate) async fn resolve_all_threaded(
    graph: &Graph,
    timeout: Option<Duration>,
) -> Result<(), ResolveError> {
    let (result_tx, result_rx) = mpsc::unbounded();

    for id in graph.node_ids() {
        let result_tx = result_tx.clone();
        let resolution = resolver::ensure_ready(graph, id, Vec::new());

        thread::Builder::new()
            .name(format!("inject-graph-{id}"))
            .spawn(move || {
                let _ = result_tx.unbounded_send(block_on(resolution));
            })
            .map_err(|e| ResolveError::Spawn(e.to_string()))?;
    }

    drop(result_tx);

    wait_for_all(result_rx, graph.len(), timeout).await
}

/// Waits for every resolution to finish
///
/// Returns the first error observed, after all resolutions are done.
async fn wait_for_all(
    mut results: impl Stream<Item = Result<Instance, ResolveError>> + FusedStream + Unpin,
    total: usize,
    timeout: Option<Duration>,
) -> Result<(), ResolveError> {
    let mut timeout = match timeout {
        Some(timeout) => timer(timeout).boxed().fuse(),
        None => future::pending().boxed().fuse(),
    };

    tracing::debug!("Resolving graph with {total} nodes");

    let mut finished = 0;
    let mut first_error = None;
    loop {
        futures::select! {
            result = results.next() => match result {
                Some(Ok(_)) => {
                    finished += 1;
                    tracing::debug!("Waiting for nodes [{finished} of {total} complete]");
                }
                Some(Err(e)) => {
                    finished += 1;
                    tracing::debug!("Resolution failed [{finished} of {total} complete]: {e}");
                    first_error.get_or_insert(e);
                }
                None => break,
            },
            _ = timeout => {
                tracing::error!("Graph resolution timed out [{finished} of {total} complete]");
                return Err(ResolveError::Timeout);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            tracing::debug!("All {total} nodes are ready");
            Ok(())
        }
    }
}

/// Fires once the duration passed
fn timer(duration: Duration) -> oneshot::Receiver<()> {
    let (timeout_tx, timeout_rx) = oneshot::channel::<()>();
    // We don't join the thread - it will just die after the timeout
    thread::spawn(move || {
        sleep(duration);
        let _ = timeout_tx.send(());
    });
    timeout_rx
}
