//! Shared wire framing, bounded queue and payload codec boundary for the
//! `portcall` RPC transport. `portcall-server` and `portcall-client`
//! both depend on this crate and never reach across each other's private
//! state; this is the only shared vocabulary between the two sides of the
//! connection.

pub mod error;
pub mod frame;
pub mod payload;
pub mod queue;
pub mod stats;

pub use error::{CodecError, FrameError};
pub use frame::{decode_query, decode_response, encode_query, encode_response, Dispatch, Query, Response};
pub use payload::{BincodeCodec, PayloadCodec};
pub use queue::BoundedQueue;
pub use stats::{ClientStats, ServerStats};

/// Names beginning with this prefix are reserved for framework built-ins
/// (§3, §4.6); user code may not register a handler under such a name.
pub const RESERVED_PREFIX: char = '_';

/// `_ping`: the built-in liveness probe's handler name.
pub const PING_HANDLER: &str = "_ping";

/// `_getStats`: the built-in stats probe's handler name.
pub const GET_STATS_HANDLER: &str = "_getStats";

/// `true` for any handler name reserved for the framework (starts with
/// `_`), per §3/§4.6.
pub fn is_reserved_handler_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reserved_name_detection() {
        assert!(is_reserved_handler_name("_ping"));
        assert!(is_reserved_handler_name("_custom"));
        assert!(!is_reserved_handler_name("echo"));
    }
}
