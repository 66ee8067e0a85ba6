//! Admission control
//!
//! A counting semaphore bounding how many connections are served at once.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Bounded connection budget
///
/// ## Concurrency:
/// - `state`: its own Mutex, never held together with any engine lock
/// - `available`: signalled whenever a slot frees or the gate closes
///
/// Invariant: `0 <= in_use <= capacity`.
pub struct Admission {
    state: Mutex<AdmissionState>,
    available: Condvar,
    capacity: usize,
}

struct AdmissionState {
    in_use: usize,
    closed: bool,
}

impl Admission {
    /// Create a gate admitting at most `capacity` holders
    ///
    /// `capacity` must be non-zero; an unlimited server has no gate at all.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "admission capacity must be non-zero");

        Self {
            state: Mutex::new(AdmissionState {
                in_use: 0,
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Take one slot, blocking while all slots are held
    ///
    /// Returns `None` once the gate is closed, including for callers that
    /// were already waiting.
    pub fn acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut state = self.state.lock();

        while state.in_use >= self.capacity && !state.closed {
            self.available.wait(&mut state);
        }

        if state.closed {
            return None;
        }

        state.in_use += 1;
        Some(Permit {
            admission: Arc::clone(self),
        })
    }

    /// Take one slot if one is free right now
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut state = self.state.lock();

        if state.closed || state.in_use >= self.capacity {
            return None;
        }

        state.in_use += 1;
        Some(Permit {
            admission: Arc::clone(self),
        })
    }

    /// Close the gate and wake every waiter
    ///
    /// Permits already handed out stay valid and still release normally.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);

        self.available.notify_all();
    }

    /// Number of slots currently held
    pub fn in_use(&self) -> usize {
        self.state.lock().in_use
    }

    /// Maximum number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.in_use = state.in_use.saturating_sub(1);
        drop(state);

        self.available.notify_one();
    }
}

/// One held admission slot; dropping it frees the slot
pub struct Permit {
    admission: Arc<Admission>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.admission.release();
    }
}
