//! Client-side error taxonomy (§7, "user-visible behavior"): `Call`
//! returns either a decoded output or one of these.

use std::{error, fmt};

#[derive(Debug)]
#[non_exhaustive]
pub enum CallError {
    /// The server ran the handler and returned `ok=false`. Carries the
    /// server's `errorMsg` verbatim.
    Remote(String),
    /// `HardQueryTimeout` elapsed before a `Response` arrived (§4.3).
    Timeout,
    /// The connection's reader/writer observed a socket failure or EOF;
    /// no further calls on this `Client` can succeed.
    TransportClosed,
    /// The response decoded successfully at the wire level but its
    /// `messageData` did not decode into the caller's requested type.
    Decode(String),
    /// This `Client`'s dispatch id counter reached `i32::MAX` (§3: "a
    /// terminal condition").
    DispatchExhausted,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(msg) => write!(f, "remote error: {msg}"),
            Self::Timeout => write!(f, "timeout"),
            Self::TransportClosed => write!(f, "transport closed"),
            Self::Decode(msg) => write!(f, "response decode error: {msg}"),
            Self::DispatchExhausted => write!(f, "dispatch id space exhausted"),
        }
    }
}

impl error::Error for CallError {}
