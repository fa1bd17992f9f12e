//! Test-only helpers shared by the scenarios under `tests/` (mirrors
//! `xitca-test`'s `test_server` in the retrieval pack: a small harness
//! crate, not a library meant for downstream use).

use std::{
    net::SocketAddr,
    sync::{Condvar, Mutex},
    time::Duration,
};

use portcall_client::{Client, ClientBuilder};
use portcall_server::{Server, ServerBuilder};

/// Install a `tracing` subscriber controlled by `RUST_LOG`, once per test
/// binary. Scenarios that want to see accept/reaper/worker logs call this
/// first; it's harmless (and cheap) to call it from every test.
pub fn init_tracing() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A running [`Server`] bound to an ephemeral `127.0.0.1` port, kept
/// alive for the scope of a test. Stops itself on drop.
pub struct TestServer {
    pub server: Server,
    pub addr: SocketAddr,
}

impl TestServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new("127.0.0.1:0").expect("bind ephemeral test listener")
    }

    pub fn start(builder: ServerBuilder) -> Self {
        let server = builder.build().expect("start test server");
        let addr = server.local_addr();
        Self { server, addr }
    }

    pub fn client(&self) -> Client {
        self.connect_with(Duration::from_secs(5))
    }

    pub fn connect_with(&self, hard_timeout: Duration) -> Client {
        ClientBuilder::new(self.addr)
            .expect("resolve test client address")
            .hard_timeout(hard_timeout)
            .connect()
            .expect("connect test client")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.handle().stop();
    }
}

/// A counting gate a handler can block on, and a test can release one
/// permit at a time — lets a test pin a worker thread inside a handler
/// call on demand, to exercise backpressure and starvation scenarios
/// deterministically. Same `Mutex` + `Condvar` shape as
/// `portcall_core::BoundedQueue`.
#[derive(Default)]
pub struct Gate {
    permits: Mutex<u32>,
    ready: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until a permit is available, then consume it.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.ready.wait(permits).unwrap();
        }
        *permits -= 1;
    }

    /// Hand out one permit to an `acquire`r.
    pub fn release(&self) {
        *self.permits.lock().unwrap() += 1;
        self.ready.notify_all();
    }
}
