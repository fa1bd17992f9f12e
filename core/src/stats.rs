//! Plain records backing the `_getStats` built-in (§3, §4.6).

use serde::{Deserialize, Serialize};

/// Per-client counters, snapshotted at the moment `_getStats` is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    /// Depth of this connection's outgoing `Response` queue.
    pub outgoing_queue_len: usize,
    pub queries_received: u64,
    pub responses_returned: u64,
}

/// Snapshot returned by the `_getStats` built-in handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    /// Depth of the shared ingress queue feeding the worker pool.
    pub ingress_queue_len: usize,
    pub clients: Vec<ClientStats>,
}
