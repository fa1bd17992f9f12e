//! `HandlerRegistry` (§3): name → handler mapping, frozen once the server
//! is built (§9 design note: "freeze the registry after Start" — here
//! registration is structurally only possible on [`crate::builder::ServerBuilder`],
//! so the running `Server` never needs a lock around it at all).

use std::{collections::HashMap, fmt, panic::AssertUnwindSafe, sync::Arc};

use portcall_core::{payload::PayloadCodec, CodecError, Query, Response};
use serde::{de::DeserializeOwned, Serialize};

/// A server-side function invoked by a worker to turn a `Query` into a
/// `Response` (§3). Implementations must never block indefinitely — a
/// slow handler only ever steals one worker, by design (§8, "no handler
/// starvation").
pub trait Handler: Send + Sync + 'static {
    fn call(&self, query: &Query) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Query) -> Response + Send + Sync + 'static,
{
    fn call(&self, query: &Query) -> Response {
        self(query)
    }
}

/// Wraps a typed `Fn(In) -> Result<Out, E>` into a [`Handler`]: decodes
/// the `Query`'s opaque `message_data` via `codec`, invokes `f`, and
/// encodes the result back into a `Response`. Deserialization failures and
/// `Err` returns both become `HandlerFailure`-shaped failure responses
/// (§7: `DeserializationError` "becomes a HandlerFailure Response").
pub fn typed<C, In, Out, E, F>(codec: Arc<C>, f: F) -> impl Handler
where
    C: PayloadCodec,
    In: DeserializeOwned,
    Out: Serialize,
    E: fmt::Display,
    F: Fn(In) -> Result<Out, E> + Send + Sync + 'static,
{
    move |query: &Query| -> Response {
        let input: In = match codec.decode(&query.message_data) {
            Ok(input) => input,
            Err(CodecError(e)) => return Response::failure(query.dispatch, e.to_string()),
        };
        match std::panic::catch_unwind(AssertUnwindSafe(|| f(input))) {
            Ok(Ok(output)) => match codec.encode(&output) {
                Ok(bytes) => Response::ok(query.dispatch, bytes),
                Err(CodecError(e)) => Response::failure(query.dispatch, e.to_string()),
            },
            Ok(Err(e)) => Response::failure(query.dispatch, e.to_string()),
            Err(panic) => Response::failure(query.dispatch, panic_message(&panic)),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}

/// Immutable, built once by [`crate::builder::ServerBuilder::build`] and
/// shared read-only by every worker thread thereafter — no `RwLock`
/// needed (§9: shared registry is "read on every dispatch ... writes are
/// rare and may be restricted to pre-Start").
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub(crate) fn new(handlers: HashMap<String, Box<dyn Handler>>) -> Self {
        Self { handlers }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Handler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use portcall_core::BincodeCodec;

    #[test]
    fn typed_handler_round_trips_and_reports_errors() {
        let codec = Arc::new(BincodeCodec);
        let echo = typed(codec.clone(), |x: i32| Ok::<_, String>(x + 1));

        let query = Query {
            dispatch: 1,
            handler: "echo".to_owned(),
            message_data: codec.encode(&7i32).unwrap(),
        };
        let response = echo.call(&query);
        assert!(response.ok);
        assert_eq!(codec.decode::<i32>(&response.message_data).unwrap(), 8);
        assert_eq!(response.dispatch, 1);
    }

    #[test]
    fn typed_handler_converts_handler_error() {
        let codec = Arc::new(BincodeCodec);
        let boom = typed(codec.clone(), |_: i32| Err::<i32, _>("x"));
        let query = Query {
            dispatch: 2,
            handler: "boom".to_owned(),
            message_data: codec.encode(&0i32).unwrap(),
        };
        let response = boom.call(&query);
        assert!(!response.ok);
        assert_eq!(response.error_msg.as_deref(), Some("x"));
    }

    #[test]
    fn typed_handler_converts_panic() {
        let codec = Arc::new(BincodeCodec);
        let boom = typed(codec.clone(), |_: i32| -> Result<i32, String> { panic!("kaboom") });
        let query = Query {
            dispatch: 3,
            handler: "boom".to_owned(),
            message_data: codec.encode(&0i32).unwrap(),
        };
        let response = boom.call(&query);
        assert!(!response.ok);
        assert_eq!(response.error_msg.as_deref(), Some("kaboom"));
    }

    #[test]
    fn typed_handler_rejects_garbage_payload() {
        let codec = Arc::new(BincodeCodec);
        let echo = typed(codec.clone(), |x: i32| Ok::<_, String>(x));
        let query = Query {
            dispatch: 4,
            handler: "echo".to_owned(),
            message_data: Bytes::from_static(&[0xFF, 0xFF]),
        };
        let response = echo.call(&query);
        assert!(!response.ok);
    }
}
