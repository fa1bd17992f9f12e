//! `PendingRequests` (§4.3): the dispatch-correlation table that turns the
//! asynchronous wire protocol into `Client::call`'s synchronous,
//! timed-wait programming model.

use std::{
    collections::HashMap,
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};

use portcall_core::{Dispatch, Response};

/// One-shot cell a caller blocks on: a `Response` slot plus the
/// originating `Query`'s timer (§3 `PendingSlot`).
struct PendingSlot {
    response: Mutex<Option<Response>>,
    ready: Condvar,
    started_at: Instant,
}

/// Maps dispatch id -> `PendingSlot` (§4.3). All operations are safe under
/// concurrent access from the caller thread (`Add`/`Get`) and the
/// reader thread (`Set`) — no external lock required (§5).
pub struct PendingRequests {
    slots: Mutex<HashMap<Dispatch, std::sync::Arc<PendingSlot>>>,
    hard_timeout: Duration,
}

impl PendingRequests {
    pub fn new(hard_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            hard_timeout,
        }
    }

    /// Create a new slot keyed by `dispatch`, started now (§4.3 `Add`).
    /// Must be called before the `Query` is placed on the outgoing queue,
    /// so that a fast `Response` can never race ahead of the slot.
    pub fn add(&self, dispatch: Dispatch) {
        let slot = std::sync::Arc::new(PendingSlot {
            response: Mutex::new(None),
            ready: Condvar::new(),
            started_at: Instant::now(),
        });
        self.slots.lock().unwrap().insert(dispatch, slot);
    }

    /// Store `response` in the slot for `dispatch` and wake its waiter;
    /// a no-op if no such slot exists — e.g. the caller already timed out
    /// and deleted it (§8 "stale response discard", §5 "such stray
    /// Responses are ... silently dropped").
    pub fn set(&self, dispatch: Dispatch, response: Response) {
        let slot = self.slots.lock().unwrap().get(&dispatch).cloned();
        let Some(slot) = slot else { return };
        *slot.response.lock().unwrap() = Some(response);
        slot.ready.notify_all();
    }

    /// Wait up to `HardQueryTimeout - elapsed` for the `Response` matching
    /// `dispatch`, then remove its slot regardless of outcome (§4.3
    /// `Get`). Returns a synthesized [`Response::timeout`] on expiry, or
    /// immediately if no slot is found (nothing was ever `Add`ed, or the
    /// clock had already run out).
    pub fn get(&self, dispatch: Dispatch) -> Response {
        let Some(slot) = self.slots.lock().unwrap().get(&dispatch).cloned() else {
            return Response::timeout(dispatch);
        };

        let mut guard = slot.response.lock().unwrap();
        loop {
            if let Some(response) = guard.take() {
                self.delete(dispatch);
                return response;
            }

            let remaining = self.hard_timeout.saturating_sub(slot.started_at.elapsed());
            if remaining.is_zero() {
                self.delete(dispatch);
                return Response::timeout(dispatch);
            }

            let (next_guard, result) = slot.ready.wait_timeout(guard, remaining).unwrap();
            guard = next_guard;
            if result.timed_out() && guard.is_none() {
                self.delete(dispatch);
                return Response::timeout(dispatch);
            }
        }
    }

    /// Remove the slot for `dispatch`, if any (§4.3 `Delete`; idempotent).
    pub fn delete(&self, dispatch: Dispatch) {
        self.slots.lock().unwrap().remove(&dispatch);
    }

    /// Number of calls currently awaiting a `Response` on this table.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}
