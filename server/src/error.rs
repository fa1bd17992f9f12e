//! Server-side error taxonomy (§7): everything a worker or the registry
//! can fail with, converted to a failure `Response` at the dispatch seam
//! rather than ever propagated out of a worker thread.

use std::{error, fmt};

#[derive(Debug)]
#[non_exhaustive]
pub enum DispatchError {
    /// No handler registered under the requested name.
    UnknownHandler(String),
    /// A registered handler returned or panicked with an error message.
    HandlerFailure(String),
    /// The shared ingress queue was full when a `Query` arrived.
    ServerOverloaded,
    /// `register` called twice for the same name.
    HandlerAlreadyRegistered(String),
    /// `register` called with a name starting with `_` that isn't a
    /// built-in.
    ReservedName(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownHandler(name) => write!(f, "no such handler: {name}"),
            Self::HandlerFailure(msg) => write!(f, "{msg}"),
            Self::ServerOverloaded => write!(f, "server overloaded"),
            Self::HandlerAlreadyRegistered(name) => write!(f, "handler already registered: {name}"),
            Self::ReservedName(name) => write!(f, "handler name reserved for framework use: {name}"),
        }
    }
}

impl error::Error for DispatchError {}
