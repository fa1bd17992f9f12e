//! Builder surface for [`crate::Server`] (§10.3 of the design: a typed,
//! builder-style config surface in place of env vars/CLI flags, mirroring
//! `xitca_server::Builder`).

use std::{
    collections::HashMap,
    convert::Infallible,
    fmt, io,
    net::{SocketAddr, TcpListener, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use portcall_core::{
    is_reserved_handler_name, payload::PayloadCodec, BincodeCodec, BoundedQueue, ServerStats, GET_STATS_HANDLER,
    PING_HANDLER,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    registry::{typed, Handler, HandlerRegistry},
    DispatchError, Server,
};

const DEFAULT_INGRESS_CAPACITY: usize = 2000;
const DEFAULT_WORKER_THREADS: usize = 8;
const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_OUTGOING_CAPACITY: usize = 2000;
const DEFAULT_BACKLOG: i32 = 2048;

/// Bind a listening `TcpListener` with `SO_REUSEADDR` set, the way
/// `xitca_server::Builder::_bind` does (`server_old/src/builder.rs` in
/// the retrieval pack).
fn bind_reuseaddr(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SockAddr::from(addr))?;
    socket.listen(DEFAULT_BACKLOG)?;
    socket.set_nonblocking(false)?;
    Ok(socket.into())
}

/// Builds a [`Server`]: bind address, ingress queue capacity, worker
/// thread count, reaper sweep interval, and the handler registry.
/// Registration is only possible here (§9 open question: "pre-Start
/// only"), so the running `Server` never exposes a `register` method.
pub struct ServerBuilder<C: PayloadCodec = BincodeCodec> {
    listener: TcpListener,
    worker_threads: usize,
    ingress_capacity: usize,
    outgoing_capacity: usize,
    reaper_interval: Duration,
    codec: Arc<C>,
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl ServerBuilder<BincodeCodec> {
    /// Bind `addr` and start a builder using the default `bincode`+`serde`
    /// payload codec (§11 supplement).
    pub fn new(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Self::with_codec(addr, BincodeCodec)
    }
}

impl<C: PayloadCodec> ServerBuilder<C> {
    /// Bind `addr` and start a builder using a caller-supplied payload
    /// codec (§4.8: the codec boundary is pluggable).
    pub fn with_codec(addr: impl ToSocketAddrs, codec: C) -> io::Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "could not resolve a SocketAddr"))?;
        let listener = bind_reuseaddr(addr)?;
        Ok(Self {
            listener,
            worker_threads: DEFAULT_WORKER_THREADS,
            ingress_capacity: DEFAULT_INGRESS_CAPACITY,
            outgoing_capacity: DEFAULT_OUTGOING_CAPACITY,
            reaper_interval: DEFAULT_REAPER_INTERVAL,
            codec: Arc::new(codec),
            handlers: HashMap::new(),
        })
    }

    /// Number of worker threads draining the ingress queue (§4.5, §6;
    /// default 8).
    ///
    /// # Panics
    /// When passed 0.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert_ne!(n, 0, "there must be at least one worker thread");
        self.worker_threads = n;
        self
    }

    /// Capacity of the shared ingress queue (§4.2, §6; default 2000).
    ///
    /// # Panics
    /// When passed 0.
    pub fn ingress_capacity(mut self, n: usize) -> Self {
        assert_ne!(n, 0, "ingress queue capacity must be non-zero");
        self.ingress_capacity = n;
        self
    }

    /// Capacity of each connection's outgoing `Response` queue (§4.4).
    ///
    /// # Panics
    /// When passed 0.
    pub fn outgoing_capacity(mut self, n: usize) -> Self {
        assert_ne!(n, 0, "outgoing queue capacity must be non-zero");
        self.outgoing_capacity = n;
        self
    }

    /// Interval between dead-client sweeps (§4.6, §6; default 2s).
    pub fn reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Register a handler under `name`. Fails if `name` is already taken
    /// or begins with `_` (reserved for the framework, §3/§4.6).
    pub fn register<In, Out, E, F>(mut self, name: impl Into<String>, f: F) -> Result<Self, DispatchError>
    where
        In: DeserializeOwned,
        Out: Serialize,
        E: fmt::Display,
        F: Fn(In) -> Result<Out, E> + Send + Sync + 'static,
    {
        let name = name.into();
        if is_reserved_handler_name(&name) {
            return Err(DispatchError::ReservedName(name));
        }
        if self.handlers.contains_key(&name) {
            return Err(DispatchError::HandlerAlreadyRegistered(name));
        }
        self.handlers.insert(name, Box::new(typed(self.codec.clone(), f)));
        Ok(self)
    }

    /// Bind the listener, start the worker pool, accept thread, and
    /// reaper thread, and return a running [`Server`] (§4.6 `Start`).
    /// Mirroring `xitca_server::Builder::build`, this spawns its
    /// background threads immediately and returns without blocking; use
    /// [`Server::wait`] to block the calling thread until it stops.
    pub fn build(self) -> io::Result<Server> {
        let ServerBuilder {
            listener,
            worker_threads,
            ingress_capacity,
            outgoing_capacity,
            reaper_interval,
            codec,
            mut handlers,
        } = self;

        let ingress = Arc::new(BoundedQueue::new(ingress_capacity));
        let clients = Arc::new(std::sync::Mutex::new(HashMap::new()));

        handlers
            .entry(PING_HANDLER.to_owned())
            .or_insert_with(|| Box::new(typed(codec.clone(), |x: i32| Ok::<_, Infallible>(x))));

        let builtin_ingress = ingress.clone();
        let builtin_clients = clients.clone();
        handlers.entry(GET_STATS_HANDLER.to_owned()).or_insert_with(|| {
            Box::new(typed(codec.clone(), move |_ignored: bool| {
                Ok::<_, Infallible>(ServerStats {
                    ingress_queue_len: builtin_ingress.len(),
                    clients: builtin_clients.lock().unwrap().values().map(|c| c.stats()).collect(),
                })
            }))
        });

        let registry = Arc::new(HandlerRegistry::new(handlers));

        Server::start(listener, ingress, clients, registry, worker_threads, outgoing_capacity, reaper_interval)
    }
}
