//! `Server` (§4.6): TCP listener, handler registry, worker pool owner and
//! dead-client reaper for the `portcall` RPC transport.

pub mod builder;
pub mod client_manager;
pub mod error;
pub mod registry;
pub mod worker;

pub use builder::ServerBuilder;
pub use error::DispatchError;
pub use registry::{typed, Handler, HandlerRegistry};

use std::{
    collections::HashMap,
    io,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use portcall_core::{BoundedQueue, ServerStats};
use tracing::{error, info, warn};

use client_manager::{ClientManager, IngressItem};
use worker::WorkerPool;

type ClientMap = Mutex<HashMap<u64, Arc<ClientManager>>>;

/// A running server (§4.6 `Start`). Background threads — accept loop,
/// reaper, and the worker pool — are spawned by [`ServerBuilder::build`]
/// before this value is handed back; dropping or stopping it tears them
/// down.
pub struct Server {
    local_addr: SocketAddr,
    ingress: Arc<BoundedQueue<IngressItem>>,
    clients: Arc<ClientMap>,
    stop: Arc<AtomicBool>,
    worker_pool: Option<WorkerPool>,
    accept_handle: Option<JoinHandle<()>>,
    reaper_handle: Option<JoinHandle<()>>,
}

impl Server {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn start(
        listener: TcpListener,
        ingress: Arc<BoundedQueue<IngressItem>>,
        clients: Arc<ClientMap>,
        registry: Arc<HandlerRegistry>,
        worker_threads: usize,
        outgoing_capacity: usize,
        reaper_interval: Duration,
    ) -> io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let stop = Arc::new(AtomicBool::new(false));

        let worker_pool = WorkerPool::spawn(worker_threads, ingress.clone(), registry);

        let accept_ingress = ingress.clone();
        let accept_clients = clients.clone();
        let accept_stop = stop.clone();
        let next_id = Arc::new(AtomicU64::new(0));
        let accept_handle = thread::Builder::new()
            .name("portcall-accept".to_owned())
            .spawn(move || accept_loop(listener, accept_stop, accept_ingress, accept_clients, next_id, outgoing_capacity))
            .expect("spawn accept thread");

        let reaper_clients = clients.clone();
        let reaper_stop = stop.clone();
        let reaper_handle = thread::Builder::new()
            .name("portcall-reaper".to_owned())
            .spawn(move || reaper_loop(reaper_interval, reaper_stop, reaper_clients))
            .expect("spawn reaper thread");

        Ok(Self {
            local_addr,
            ingress,
            clients,
            stop,
            worker_pool: Some(worker_pool),
            accept_handle: Some(accept_handle),
            reaper_handle: Some(reaper_handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A cloneable handle that can stop this server from another thread
    /// (§11 supplement: `xitca_server::{ServerFuture, ServerHandle}`'s
    /// stop-signal pattern).
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            stop: self.stop.clone(),
            local_addr: self.local_addr,
        }
    }

    /// Snapshot of ingress depth and per-client counters (§3, serves the
    /// `_getStats` built-in and is also useful directly in tests).
    pub fn stats(&self) -> ServerStats {
        ServerStats {
            ingress_queue_len: self.ingress.len(),
            clients: self.clients.lock().unwrap().values().map(|c| c.stats()).collect(),
        }
    }

    /// Block the calling thread until the server has been stopped via a
    /// [`ServerHandle`] and all of its background threads have exited.
    pub fn wait(mut self) {
        if let Some(h) = self.accept_handle.take() {
            let _ = h.join();
        }
        if let Some(h) = self.reaper_handle.take() {
            let _ = h.join();
        }
        self.ingress.close();
        if let Some(pool) = self.worker_pool.take() {
            pool.join();
        }
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        // unblock a thread parked in `TcpListener::accept`
        let _ = TcpStream::connect(self.local_addr);
        for client in self.clients.lock().unwrap().values() {
            client.shutdown();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.request_stop();
    }
}

/// Handle returned by [`Server::handle`]; stopping is forceful — in-flight
/// connections are closed immediately rather than drained (spec.md has no
/// graceful-drain requirement; only the client's hard timeout governs
/// in-flight calls, §5).
#[derive(Clone)]
pub struct ServerHandle {
    stop: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

impl ServerHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(self.local_addr);
    }
}

fn accept_loop(
    listener: TcpListener,
    stop: Arc<AtomicBool>,
    ingress: Arc<BoundedQueue<IngressItem>>,
    clients: Arc<ClientMap>,
    next_id: Arc<AtomicU64>,
    outgoing_capacity: usize,
) {
    loop {
        match listener.accept() {
            Ok((stream, _peer)) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                let (manager, _reader, _writer) = ClientManager::spawn(stream, ingress.clone(), outgoing_capacity);
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                clients.lock().unwrap().insert(id, manager);
            }
            Err(e) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                // §4.6 / §7: "Accept failures are logged and the accept
                // loop continues."
                error!(error = %e, "accept failed");
            }
        }
    }
    info!("accept loop stopped");
}

fn reaper_loop(interval: Duration, stop: Arc<AtomicBool>, clients: Arc<ClientMap>) {
    let tick = Duration::from_millis(50).min(interval);
    let mut elapsed = Duration::ZERO;
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep(tick);
        elapsed += tick;
        if elapsed < interval {
            continue;
        }
        elapsed = Duration::ZERO;
        let mut guard = clients.lock().unwrap();
        let before = guard.len();
        guard.retain(|_, c| c.is_alive());
        let reaped = before - guard.len();
        if reaped > 0 {
            warn!(reaped, "reaper removed dead clients");
        }
    }
}
