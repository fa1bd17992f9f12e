//! `Client` (§4.7): dialer, framed writer/reader, and a synchronous
//! `call` API built on top of [`pending::PendingRequests`].

pub mod error;
mod pending;

pub use error::CallError;

use std::{
    io,
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use portcall_core::{
    frame::{decode_response, encode_query, read_frame, write_frame},
    payload::PayloadCodec,
    BincodeCodec, BoundedQueue, Dispatch, Query,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use pending::PendingRequests;

const DEFAULT_OUTGOING_CAPACITY: usize = 2000;
const DEFAULT_HARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for [`Client::connect`] (§10.3: typed config surface in place
/// of env vars/CLI flags).
pub struct ClientBuilder<C: PayloadCodec = BincodeCodec> {
    addr: std::net::SocketAddr,
    hard_timeout: Duration,
    outgoing_capacity: usize,
    codec: Arc<C>,
}

impl ClientBuilder<BincodeCodec> {
    pub fn new(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Self::with_codec(addr, BincodeCodec)
    }
}

impl<C: PayloadCodec> ClientBuilder<C> {
    pub fn with_codec(addr: impl ToSocketAddrs, codec: C) -> io::Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "could not resolve a SocketAddr"))?;
        Ok(Self {
            addr,
            hard_timeout: DEFAULT_HARD_TIMEOUT,
            outgoing_capacity: DEFAULT_OUTGOING_CAPACITY,
            codec: Arc::new(codec),
        })
    }

    /// `HardQueryTimeout` (§4.3, §6; default 5s): the maximum time `call`
    /// will wait for a `Response` before synthesizing a timeout error.
    pub fn hard_timeout(mut self, timeout: Duration) -> Self {
        self.hard_timeout = timeout;
        self
    }

    /// Capacity of the outgoing `Query` queue drained by the writer
    /// thread (§4.2).
    ///
    /// # Panics
    /// When passed 0.
    pub fn outgoing_capacity(mut self, n: usize) -> Self {
        assert_ne!(n, 0, "outgoing queue capacity must be non-zero");
        self.outgoing_capacity = n;
        self
    }

    /// Dial `addr`, then start the writer and reader threads (§4.7
    /// `Connect`).
    pub fn connect(self) -> io::Result<Client<C>> {
        let stream = TcpStream::connect(self.addr)?;
        stream.set_nodelay(true)?;
        let reader_stream = stream.try_clone()?;
        let writer_stream = stream.try_clone()?;

        let outgoing = Arc::new(BoundedQueue::new(self.outgoing_capacity));
        let pending = Arc::new(PendingRequests::new(self.hard_timeout));
        let alive = Arc::new(AtomicBool::new(true));

        let w_outgoing = outgoing.clone();
        let w_alive = alive.clone();
        thread::Builder::new()
            .name("portcall-client-writer".to_owned())
            .spawn(move || writer_loop(writer_stream, w_outgoing, w_alive))
            .expect("spawn client writer thread");

        let r_outgoing = outgoing.clone();
        let r_pending = pending.clone();
        let r_alive = alive.clone();
        thread::Builder::new()
            .name("portcall-client-reader".to_owned())
            .spawn(move || reader_loop(reader_stream, r_pending, r_alive, r_outgoing))
            .expect("spawn client reader thread");

        Ok(Client {
            outgoing,
            pending,
            dispatch: Mutex::new(0),
            codec: self.codec,
            alive,
            shutdown_handle: stream,
        })
    }
}

/// A connected client (§4.7). Owns the socket, its outgoing `Query`
/// queue, and the dispatch-correlation table; `call` is the only public
/// entry point onto the wire.
pub struct Client<C: PayloadCodec = BincodeCodec> {
    outgoing: Arc<BoundedQueue<Query>>,
    pending: Arc<PendingRequests>,
    /// Per-`Client` monotonic counter (§9 design note: prefer this over
    /// the source's process-wide one; §3 invariant: strictly increasing,
    /// unique, and wraparound at i32::MAX is terminal).
    dispatch: Mutex<Dispatch>,
    codec: Arc<C>,
    alive: Arc<AtomicBool>,
    shutdown_handle: TcpStream,
}

impl<C: PayloadCodec> Client<C> {
    /// `true` while the reader and writer threads are both still running.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Number of calls currently awaiting a `Response`.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Invoke `handler` with `input`, block for up to `HardQueryTimeout`,
    /// and decode the result (§4.7 `Call`).
    pub fn call<In, Out>(&self, handler: &str, input: In) -> Result<Out, CallError>
    where
        In: Serialize,
        Out: DeserializeOwned,
    {
        if !self.is_alive() {
            return Err(CallError::TransportClosed);
        }

        let dispatch = self.next_dispatch()?;

        let message_data = self
            .codec
            .encode(&input)
            .map_err(|e| CallError::Decode(e.to_string()))?;
        let query = Query {
            dispatch,
            handler: handler.to_owned(),
            message_data,
        };

        // Add the slot before the Query is visible to the writer thread,
        // so a fast Response can never race ahead of it (§4.3, §4.7).
        self.pending.add(dispatch);
        if !self.outgoing.try_enqueue(query) {
            // §4.7: "transient write failures drop the Query; the caller
            // will observe a timeout error." Treated the same as a queue
            // that never drains: let Get() run out the clock.
            debug!(dispatch, "outgoing queue full, query dropped");
        }

        let response = self.pending.get(dispatch);
        if response.ok {
            self.codec
                .decode(&response.message_data)
                .map_err(|e| CallError::Decode(e.to_string()))
        } else if response.error_msg.as_deref() == Some("timeout") {
            Err(CallError::Timeout)
        } else {
            Err(CallError::Remote(response.error_msg.unwrap_or_default()))
        }
    }

    fn next_dispatch(&self) -> Result<Dispatch, CallError> {
        let mut guard = self.dispatch.lock().unwrap();
        let current = *guard;
        *guard = current.checked_add(1).ok_or(CallError::DispatchExhausted)?;
        Ok(current)
    }
}

impl<C: PayloadCodec> Drop for Client<C> {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.outgoing.close();
        let _ = self.shutdown_handle.shutdown(Shutdown::Both);
    }
}

fn writer_loop(mut stream: TcpStream, outgoing: Arc<BoundedQueue<Query>>, alive: Arc<AtomicBool>) {
    loop {
        let Some(query) = outgoing.try_dequeue(None) else {
            break;
        };
        let body = encode_query(&query);
        if let Err(e) = write_frame(&mut stream, &body) {
            warn!(error = %e, "client writer stopped");
            break;
        }
    }
    alive.store(false, Ordering::SeqCst);
    let _ = stream.shutdown(Shutdown::Both);
}

fn reader_loop(
    mut stream: TcpStream,
    pending: Arc<PendingRequests>,
    alive: Arc<AtomicBool>,
    outgoing: Arc<BoundedQueue<Query>>,
) {
    loop {
        let body = match read_frame(&mut stream) {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "client reader stopped");
                break;
            }
        };
        match decode_response(&body) {
            Ok(response) => pending.set(response.dispatch, response),
            Err(e) => {
                warn!(error = %e, "malformed response frame, closing connection");
                break;
            }
        }
    }
    alive.store(false, Ordering::SeqCst);
    outgoing.close();
    let _ = stream.shutdown(Shutdown::Both);
}
