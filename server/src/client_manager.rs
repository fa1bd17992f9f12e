//! `ClientManager` (§4.4): one instance per accepted connection, owning a
//! reader thread, a writer thread, and that connection's outgoing queue.

use std::{
    net::{Shutdown, TcpStream},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use portcall_core::{
    frame::{decode_query, encode_response, read_frame, write_frame},
    BoundedQueue, ClientStats, Query, Response,
};
use tracing::{debug, warn};

/// A `(Query, destination)` pair as it sits on the server's shared
/// ingress queue (§2 data flow, §4.5 step 1).
pub struct IngressItem {
    pub query: Query,
    pub destination: Arc<ClientManager>,
}

pub struct ClientManager {
    outgoing: BoundedQueue<Response>,
    alive: AtomicBool,
    queries_received: AtomicU64,
    responses_returned: AtomicU64,
    shutdown_handle: TcpStream,
    peer: String,
}

impl ClientManager {
    /// Accept a freshly-connected socket, spawn its reader and writer
    /// threads, and return the shared handle both the reaper and the
    /// ingress queue hold onto.
    pub fn spawn(
        stream: TcpStream,
        ingress: Arc<BoundedQueue<IngressItem>>,
        outgoing_capacity: usize,
    ) -> (Arc<Self>, JoinHandle<()>, JoinHandle<()>) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_owned());

        let reader_stream = stream.try_clone().expect("tcp stream clone for reader");
        let writer_stream = stream.try_clone().expect("tcp stream clone for writer");

        let manager = Arc::new(Self {
            outgoing: BoundedQueue::new(outgoing_capacity),
            alive: AtomicBool::new(true),
            queries_received: AtomicU64::new(0),
            responses_returned: AtomicU64::new(0),
            shutdown_handle: stream,
            peer,
        });

        let reader_manager = manager.clone();
        let reader = thread::Builder::new()
            .name(format!("portcall-reader-{}", reader_manager.peer))
            .spawn(move || Self::run_reader(reader_manager, reader_stream, ingress))
            .expect("spawn reader thread");

        let writer_manager = manager.clone();
        let writer = thread::Builder::new()
            .name(format!("portcall-writer-{}", writer_manager.peer))
            .spawn(move || Self::run_writer(writer_manager, writer_stream))
            .expect("spawn writer thread");

        (manager, reader, writer)
    }

    fn run_reader(manager: Arc<Self>, mut stream: TcpStream, ingress: Arc<BoundedQueue<IngressItem>>) {
        loop {
            let body = match read_frame(&mut stream) {
                Ok(body) => body,
                Err(e) => {
                    debug!(peer = %manager.peer, error = %e, "connection reader stopped");
                    break;
                }
            };

            let query = match decode_query(&body) {
                Ok(query) => query,
                Err(e) => {
                    warn!(peer = %manager.peer, error = %e, "malformed query frame, closing connection");
                    break;
                }
            };

            manager.queries_received.fetch_add(1, Ordering::Relaxed);
            let dispatch = query.dispatch;

            // §7 / §5 backpressure: ingress full -> synthesize a failure
            // response for this query only, keep reading the connection.
            let item = IngressItem {
                query,
                destination: manager.clone(),
            };
            if !ingress.try_enqueue(item) {
                let _ = manager
                    .outgoing
                    .try_enqueue(Response::failure(dispatch, "server overloaded"));
            }
        }

        manager.mark_dead();
    }

    fn run_writer(manager: Arc<Self>, mut stream: TcpStream) {
        loop {
            let Some(response) = manager.outgoing.try_dequeue(None) else {
                break;
            };
            let body = encode_response(&response);
            if let Err(e) = write_frame(&mut stream, &body) {
                warn!(peer = %manager.peer, error = %e, "connection writer stopped");
                break;
            }
            manager.responses_returned.fetch_add(1, Ordering::Relaxed);
        }

        manager.mark_dead();
    }

    fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.outgoing.close();
        let _ = self.shutdown_handle.shutdown(Shutdown::Both);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Forcibly close the underlying socket (used by [`crate::ServerHandle::stop`]
    /// and the server's `Drop` impl). The reader thread observes the
    /// resulting EOF/error on its next read and runs the same teardown as
    /// a natural disconnect.
    pub fn shutdown(&self) {
        let _ = self.shutdown_handle.shutdown(Shutdown::Both);
    }

    /// Enqueue a worker-produced `Response` on this connection's outgoing
    /// queue. Silently drops it on overflow (§4.5 step 5) — the client
    /// will eventually time out.
    pub fn enqueue_response(&self, response: Response) -> bool {
        self.outgoing.try_enqueue(response)
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            outgoing_queue_len: self.outgoing.len(),
            queries_received: self.queries_received.load(Ordering::Relaxed),
            responses_returned: self.responses_returned.load(Ordering::Relaxed),
        }
    }
}
