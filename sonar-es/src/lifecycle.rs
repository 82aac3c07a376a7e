//! Facade lifecycle: closing flag, in-flight accounting and drain signal

use crate::descriptor::OperationKind;
use crate::error::{EsError, Result};
use crate::metrics::{record_in_flight, record_rejected_closed};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

pub(crate) const CLOSED_MESSAGE: &str = "ES client is closed";

#[derive(Default)]
pub(crate) struct Lifecycle {
    closing: AtomicBool,
    in_flight: AtomicUsize,
    drained: Notify,
}

/// Registration of one operation; dropping it leaves the in-flight set.
pub(crate) struct InFlight<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.lifecycle.leave();
    }
}

impl Lifecycle {
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Fail with IllegalState once closing has been signalled.
    pub fn ensure_open(&self, kind: OperationKind) -> Result<()> {
        if self.is_closing() {
            record_rejected_closed(kind);
            return Err(closed_error(kind));
        }
        Ok(())
    }

    /// Register an operation about to reach the transport.
    ///
    /// The counter is bumped before the flag is read, so a concurrent
    /// [`Lifecycle::drain`] either sees this operation or this operation sees
    /// the flag.
    pub fn enter(&self, kind: OperationKind) -> Result<InFlight<'_>> {
        let count = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        if self.is_closing() {
            self.leave();
            record_rejected_closed(kind);
            return Err(closed_error(kind));
        }
        record_in_flight(count);
        Ok(InFlight { lifecycle: self })
    }

    fn leave(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        record_in_flight(previous - 1);
        if previous == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Signal closing. Returns `false` if it was already signalled.
    pub fn signal_close(&self) -> bool {
        !self.closing.swap(true, Ordering::SeqCst)
    }

    /// Wait until no operation is in flight.
    pub async fn drain(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

fn closed_error(kind: OperationKind) -> EsError {
    EsError::illegal_state(format!("{}: cannot run {} request", CLOSED_MESSAGE, kind))
}
