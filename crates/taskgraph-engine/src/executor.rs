//! Concurrent execution of a built task graph: a semaphore-bounded walk that
//! hands each task node to an external visitor and waits for its result
//! before marking the node done.

use std::sync::{Arc, Mutex};

use futures::{stream::FuturesUnordered, StreamExt};
use taskgraph_graph::Walker;
use taskgraph_id::TaskId;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::log::debug;

use crate::{Built, Engine, Error, TaskNode};

/// A task handed to the visitor, paired with a channel to report its
/// outcome back to the walk.
pub struct Message<T, U> {
    pub info: T,
    pub callback: oneshot::Sender<U>,
}

impl<T, U> Message<T, U> {
    pub fn new(info: T) -> (Self, oneshot::Receiver<U>) {
        let (callback, receiver) = oneshot::channel();
        (Self { info, callback }, receiver)
    }
}

/// What a visitor receives for each ready task, and what it must report
/// back: `Ok(())` to continue the walk, `Err(Stop)` to cancel any tasks not
/// yet started.
pub type Visit = Message<TaskId, Result<(), Stop>>;

/// Returned by a visitor to cancel the remainder of the walk. Tasks already
/// running are not interrupted.
#[derive(Debug, Clone, Copy)]
pub struct Stop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub parallel: bool,
    pub concurrency: usize,
}

impl ExecutionOptions {
    pub fn new(parallel: bool, concurrency: usize) -> Self {
        Self {
            parallel,
            concurrency,
        }
    }
}

impl Engine<Built> {
    /// Walks the task graph, sending each real task node to `visitor` once
    /// its dependencies have completed, and awaiting the node's callback
    /// before marking it done. Concurrency is bounded by
    /// `options.concurrency` unless `options.parallel` is set, in which case
    /// every ready node is dispatched immediately.
    pub async fn execute(
        self: Arc<Self>,
        options: ExecutionOptions,
        visitor: mpsc::Sender<Visit>,
    ) -> Result<(), Error> {
        let ExecutionOptions {
            parallel,
            concurrency,
        } = options;
        let sema = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks: FuturesUnordered<tokio::task::JoinHandle<Result<(), Error>>> =
            FuturesUnordered::new();

        let (walker, mut nodes) = Walker::new(self.task_graph()).walk();
        let walker = Arc::new(Mutex::new(walker));

        while let Some((node_id, done)) = nodes.recv().await {
            let visitor = visitor.clone();
            let sema = sema.clone();
            let walker = walker.clone();
            let this = self.clone();

            tasks.push(tokio::spawn(async move {
                let TaskNode::Task(task_id) = this
                    .task_graph()
                    .node_weight(node_id)
                    .expect("node id should be present")
                else {
                    if done.send(()).is_err() {
                        debug!(
                            "graph walker done callback receiver was closed before done signal \
                             could be sent"
                        );
                    }
                    return Ok(());
                };

                let _permit = match parallel {
                    false => Some(sema.acquire().await.expect(
                        "graph concurrency semaphore closed while tasks are still attempting to \
                         acquire permits",
                    )),
                    true => None,
                };

                let (message, result) = Message::new(task_id.clone());
                if visitor.send(message).await.is_err() {
                    return Err(Error::VisitorError {
                        task_id: task_id.clone(),
                        source: "visitor channel closed before walk finished".into(),
                    });
                }

                if let Err(Stop) = result.await.unwrap_or_else(|_| {
                    tracing::trace!(
                        "engine visitor dropped callback sender without sending result"
                    );
                    Ok(())
                }) {
                    if walker
                        .lock()
                        .expect("walker mutex poisoned")
                        .cancel()
                        .is_err()
                    {
                        debug!("unable to cancel graph walk");
                    }
                }
                if done.send(()).is_err() {
                    debug!("graph walk done receiver closed before node was finished processing");
                }
                Ok(())
            }));
        }

        while let Some(res) = tasks.next().await {
            res.expect("unable to join task")?;
        }

        Ok(())
    }
}
