/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core alarm value type.
//!
//! ```text
//! Intake  ──(delay, message)──►  Alarm  ──(AlarmStore)──►  Worker  ──(AlarmSink)──►  "(5) wake up"
//!                                 ↑ owned by the store        ↑ owned exclusively while watched
//! ```
//!
//! # Ownership model
//! An `Alarm` is **moved** into the [`AlarmStore`](crate::store::AlarmStore)
//! on insert and **moved** out again by the worker when it becomes the
//! earliest pending entry.  The worker either hands it back (preemption) or
//! drops it after firing, so an alarm can never be in two places at once.

use std::fmt;
use std::time::{Duration, Instant, SystemTime};

// ── AlarmKey ──────────────────────────────────────────────────────────────────

/// Ordering key of a pending alarm: absolute deadline first, then the
/// submission sequence number.
///
/// Deriving `Ord` on the tuple layout gives earliest-deadline-first with
/// FIFO among equal deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct AlarmKey {
    pub(crate) deadline: Instant,
    pub(crate) seq: u64,
}

// ── Alarm ─────────────────────────────────────────────────────────────────────

/// A single timed request: print `message` once `deadline` has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    /// Requested delay.  Informational only: rendered in the fire line.
    delay: Duration,

    /// Absolute expiry instant (`submission time + delay`).
    deadline: Instant,

    /// Text payload.  Length bounds are enforced by the intake, not here.
    message: String,

    /// Submission order stamp, assigned by the store on first insert and
    /// preserved across preemption round trips.
    pub(crate) seq: u64,
}

impl Alarm {
    /// Create an alarm that becomes due `delay` from now.
    ///
    /// # Panics
    /// Panics if `now + delay` is not representable as an `Instant`.  Use
    /// [`try_after`](Self::try_after) for untrusted delays.
    pub fn after(delay: Duration, message: impl Into<String>) -> Self {
        Self::with_deadline(delay, Instant::now() + delay, message)
    }

    /// Like [`after`](Self::after), but returns `None` when the deadline
    /// would overflow the monotonic clock.
    pub fn try_after(delay: Duration, message: impl Into<String>) -> Option<Self> {
        let deadline = Instant::now().checked_add(delay)?;
        Some(Self::with_deadline(delay, deadline, message))
    }

    /// Create an alarm with an explicit absolute deadline.
    ///
    /// `delay` is kept only for the fire line; ordering uses `deadline`.
    pub fn with_deadline(delay: Duration, deadline: Instant, message: impl Into<String>) -> Self {
        Self {
            delay,
            deadline,
            message: message.into(),
            seq: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Submission sequence number (0 until the alarm first enters a store).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// `true` once `now` has reached the deadline.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Time left until the deadline, saturating at zero.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// Wall-clock rendering of the deadline, in whole seconds since the Unix
    /// epoch.  Used only by the debug dump.
    ///
    /// Saturates at `u64::MAX` when the deadline lies beyond what
    /// `SystemTime` can represent.
    pub fn deadline_epoch_secs(&self, now: Instant) -> u64 {
        match SystemTime::now().checked_add(self.remaining(now)) {
            Some(wall) => wall
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            None => u64::MAX,
        }
    }

    pub(crate) fn key(&self) -> AlarmKey {
        AlarmKey {
            deadline: self.deadline,
            seq: self.seq,
        }
    }
}

/// Fire-line format: `(<delay-seconds>) <message>`.
impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.delay.as_secs(), self.message)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
