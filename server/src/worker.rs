//! `WorkerPool` (§4.5): a fixed pool of threads draining the shared
//! ingress queue and invoking registered handlers.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use portcall_core::BoundedQueue;
use tracing::error;

use crate::{client_manager::IngressItem, registry::HandlerRegistry};

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(count: usize, ingress: Arc<BoundedQueue<IngressItem>>, registry: Arc<HandlerRegistry>) -> Self {
        assert_ne!(count, 0, "WorkerPool needs at least one worker thread");

        let handles = (0..count)
            .map(|idx| {
                let ingress = ingress.clone();
                let registry = registry.clone();
                thread::Builder::new()
                    .name(format!("portcall-worker-{idx}"))
                    .spawn(move || worker_loop(ingress, registry))
                    .expect("spawn worker thread")
            })
            .collect();

        Self { handles }
    }

    /// Block until every worker thread has exited — the ingress queue
    /// must be closed first or this never returns.
    pub fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.join() {
                error!("worker thread panicked: {e:?}");
            }
        }
    }
}

fn worker_loop(ingress: Arc<BoundedQueue<IngressItem>>, registry: Arc<HandlerRegistry>) {
    // Blocking dequeue, not a poll loop (§9 open question: the source's
    // spin loop is "almost certainly unintentional").
    while let Some(IngressItem { query, destination }) = ingress.try_dequeue(None) {
        let mut response = match registry.get(&query.handler) {
            Some(handler) => handler.call(&query),
            None => portcall_core::Response::failure(query.dispatch, format!("no such handler: {}", query.handler)),
        };
        // Invariant (§3): the response carries the originating query's
        // dispatch id regardless of what the handler itself set.
        response.dispatch = query.dispatch;
        destination.enqueue_response(response);
    }
}
