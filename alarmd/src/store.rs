/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Shared, lock-guarded alarm queue.
//!
//! [`AlarmStore`] owns one mutex, one condition variable and the state they
//! protect:
//!
//! * `pending` — alarms not yet watched, ordered by `(deadline, seq)`.
//! * `active_deadline` — the deadline the worker is currently blocked on, or
//!   `None` while the worker is between iterations.
//!
//! # Preemption protocol
//! Every insert compares the new deadline against `active_deadline`.  If the
//! worker is idle, or the new alarm is due strictly earlier than the one being
//! watched, `active_deadline` is overwritten and the worker is signalled.  The
//! worker's timed wait re-reads `active_deadline` after every wake; a changed
//! value means "your alarm is no longer the earliest" and the watched alarm is
//! handed back with [`StoreGuard::reinsert_after_preemption`].
//!
//! # Locking
//! Operations that must happen atomically with respect to inserts (the whole
//! idle → pop → watch sequence) run on a [`StoreGuard`], which holds the lock
//! for its lifetime.  Waits release the lock and reacquire it on wake.  The
//! convenience methods on `AlarmStore` itself each take the lock for a single
//! operation.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::alarm::{Alarm, AlarmKey};
use crate::error::StoreClosed;

// ── Internal state ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StoreState {
    pending: BTreeMap<AlarmKey, Alarm>,
    active_deadline: Option<Instant>,
    /// Next submission stamp.  Starts at 1 so `seq == 0` means "never inserted".
    next_seq: u64,
    closed: bool,
}

// ── Watch outcome ─────────────────────────────────────────────────────────────

/// Why [`StoreGuard::watch`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watch {
    /// The deadline has been reached and no earlier alarm arrived.
    Expired,
    /// An insert replaced `active_deadline` with an earlier deadline.
    Preempted,
    /// The store was closed while waiting.
    Closed,
}

// ── Debug dump ────────────────────────────────────────────────────────────────

/// One entry of a [`QueueSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlarm {
    /// Deadline as whole seconds since the Unix epoch.
    pub deadline_epoch_secs: u64,
    /// Time left until the deadline when the snapshot was taken.
    pub remaining: Duration,
    pub message: String,
}

/// Point-in-time copy of the pending queue, earliest first.
///
/// Displays as `{<deadline> (<remaining>) ["<message>"], ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub entries: Vec<PendingAlarm>,
}

impl QueueSnapshot {
    fn capture(pending: &BTreeMap<AlarmKey, Alarm>) -> Self {
        let now = Instant::now();
        let entries = pending
            .values()
            .map(|alarm| PendingAlarm {
                deadline_epoch_secs: alarm.deadline_epoch_secs(now),
                remaining: alarm.remaining(now),
                message: alarm.message().to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{} ({}) [\"{}\"]",
                entry.deadline_epoch_secs,
                entry.remaining.as_secs(),
                entry.message
            )?;
        }
        write!(f, "}}")
    }
}

// ── AlarmStore ────────────────────────────────────────────────────────────────

/// The process-wide alarm queue shared by every producer and the single worker.
///
/// Wrap it in an `Arc` to share it; all methods take `&self`.
#[derive(Debug, Default)]
pub struct AlarmStore {
    state: Mutex<StoreState>,
    changed: Condvar,
    debug_dump: bool,
}

impl AlarmStore {
    /// Creates an empty, open store with an idle `active_deadline`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that logs the full pending queue at `debug` level after
    /// every insert.
    pub fn with_debug_dump(debug_dump: bool) -> Self {
        Self {
            debug_dump,
            ..Self::default()
        }
    }

    /// Acquires the store lock.
    pub fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            store: self,
            state: self.state.lock(),
        }
    }

    /// Inserts a freshly submitted alarm.  See [`StoreGuard::insert`].
    pub fn insert(&self, alarm: Alarm) -> Result<(), StoreClosed> {
        self.lock().insert(alarm)
    }

    /// Blocks until an alarm is pending and removes it.  See
    /// [`StoreGuard::pop_earliest`].
    pub fn pop_earliest(&self) -> Option<Alarm> {
        self.lock().pop_earliest()
    }

    /// Marks the store closed and wakes every waiter.
    ///
    /// Pending alarms stay in place; the worker stops without firing them.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            debug!(pending = state.pending.len(), "alarm store closed");
        }
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of alarms waiting in `pending` (excludes one held by the worker).
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    /// The deadline the worker is watching, or `None` when idle.
    pub fn active_deadline(&self) -> Option<Instant> {
        self.state.lock().active_deadline
    }

    /// Copies the pending queue for diagnostics.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::capture(&self.state.lock().pending)
    }
}

// ── StoreGuard ────────────────────────────────────────────────────────────────

/// Exclusive access to an [`AlarmStore`].
///
/// Dropping the guard releases the lock.
pub struct StoreGuard<'a> {
    store: &'a AlarmStore,
    state: MutexGuard<'a, StoreState>,
}

impl StoreGuard<'_> {
    /// Inserts a freshly submitted alarm, stamping it with the next submission
    /// sequence number.
    ///
    /// Signals the worker if it is idle or watching a later deadline.
    ///
    /// # Errors
    /// [`StoreClosed`] after [`AlarmStore::close`].  The alarm is dropped.
    pub fn insert(&mut self, mut alarm: Alarm) -> Result<(), StoreClosed> {
        if self.state.closed {
            return Err(StoreClosed);
        }
        self.state.next_seq += 1;
        alarm.seq = self.state.next_seq;
        self.place(alarm);
        Ok(())
    }

    /// Returns a preempted alarm to the queue.
    ///
    /// Identical to [`insert`](Self::insert) except that the alarm keeps its
    /// original sequence number, so it still fires ahead of later submissions
    /// that share its deadline.
    pub fn reinsert_after_preemption(&mut self, alarm: Alarm) {
        self.place(alarm);
    }

    /// Blocks until `pending` is non-empty, then removes and returns the
    /// earliest alarm.
    ///
    /// Returns `None` once the store is closed.
    pub fn pop_earliest(&mut self) -> Option<Alarm> {
        loop {
            if self.state.closed {
                return None;
            }
            if let Some((_, alarm)) = self.state.pending.pop_first() {
                return Some(alarm);
            }
            self.store.changed.wait(&mut self.state);
        }
    }

    /// Marks the worker idle (`active_deadline = None`).
    pub fn set_idle(&mut self) {
        self.state.active_deadline = None;
    }

    /// Watches `alarm` until it is due, preempted, or the store closes.
    ///
    /// `alarm` must have been removed from `pending` by the caller.  An alarm
    /// that is already due returns [`Watch::Expired`] without waiting.  After
    /// every wake the loop re-checks preemption first and then the clock, so
    /// a spurious or early wake never yields `Expired` before the deadline.
    pub fn watch(&mut self, alarm: &Alarm) -> Watch {
        let deadline = alarm.deadline();
        if alarm.is_due(Instant::now()) {
            return Watch::Expired;
        }
        self.state.active_deadline = Some(deadline);

        loop {
            if self.state.closed {
                return Watch::Closed;
            }
            if self.state.active_deadline != Some(deadline) {
                return Watch::Preempted;
            }
            if alarm.is_due(Instant::now()) {
                return Watch::Expired;
            }
            let timed_out = self
                .store
                .changed
                .wait_until(&mut self.state, deadline)
                .timed_out();
            if !timed_out
                && !self.state.closed
                && self.state.active_deadline == Some(deadline)
            {
                trace!(seq = alarm.seq(), "spurious wakeup");
            }
        }
    }

    /// Runs `f` with the lock released, reacquiring it before returning.
    pub fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        MutexGuard::unlocked(&mut self.state, f)
    }

    pub fn len(&self) -> usize {
        self.state.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.pending.is_empty()
    }

    pub fn active_deadline(&self) -> Option<Instant> {
        self.state.active_deadline
    }

    /// Orders `alarm` into `pending` and applies the preemption check.
    fn place(&mut self, alarm: Alarm) {
        let deadline = alarm.deadline();
        self.state.pending.insert(alarm.key(), alarm);

        if self.store.debug_dump {
            debug!(
                pending = %QueueSnapshot::capture(&self.state.pending),
                "alarm queue"
            );
        }

        let preempts = match self.state.active_deadline {
            None => true,
            Some(active) => deadline < active,
        };
        if preempts {
            self.state.active_deadline = Some(deadline);
            self.store.changed.notify_one();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
