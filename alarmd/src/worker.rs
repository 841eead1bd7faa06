/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The scheduler worker.
//!
//! A single long-lived thread that loops over three states:
//!
//! ```text
//!            ┌────────────── preempted: reinsert ──────────────┐
//!            ▼                                                 │
//!  IDLE ──pop_earliest()──► WATCHING ──deadline reached──► FIRING
//!   ▲                                                          │
//!   └──────────────────────── fired & dropped ─────────────────┘
//! ```
//!
//! The store lock is held for the whole loop except while blocked inside a
//! condition wait and while the sink writes output.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::alarm::Alarm;
use crate::store::{AlarmStore, Watch};

/// Name given to the worker thread.
pub const WORKER_THREAD_NAME: &str = "alarm-worker";

// ── AlarmSink ─────────────────────────────────────────────────────────────────

/// Destination for fired alarms.
///
/// Called without the store lock held.  Any `FnMut(&Alarm) + Send` closure is
/// a sink, which is how tests capture the fire stream.
pub trait AlarmSink: Send {
    fn fire(&mut self, alarm: &Alarm);
}

impl<F> AlarmSink for F
where
    F: FnMut(&Alarm) + Send,
{
    fn fire(&mut self, alarm: &Alarm) {
        self(alarm)
    }
}

/// Writes `(<delay>) <message>` lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl AlarmSink for StdoutSink {
    fn fire(&mut self, alarm: &Alarm) {
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{alarm}").and_then(|()| out.flush()) {
            warn!(error = %e, text = alarm.message(), "failed to write fired alarm");
        }
    }
}

// ── WorkerStats ───────────────────────────────────────────────────────────────

/// Counters reported when the worker stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub fired: u64,
    pub preemptions: u64,
    /// Alarms still pending at close, including the one being watched.
    pub unfired: u64,
}

// ── AlarmWorker ───────────────────────────────────────────────────────────────

pub struct AlarmWorker<S> {
    store: Arc<AlarmStore>,
    sink: S,
}

impl<S: AlarmSink> AlarmWorker<S> {
    pub fn new(store: Arc<AlarmStore>, sink: S) -> Self {
        Self { store, sink }
    }

    /// Runs the idle/watch/fire loop on the calling thread until the store is
    /// closed.
    pub fn run(self) -> WorkerStats {
        let AlarmWorker { store, mut sink } = self;
        let mut stats = WorkerStats::default();
        let mut guard = store.lock();

        info!("alarm worker started");

        let watched_at_close = loop {
            guard.set_idle();
            debug!(pending = guard.len(), "worker idle");

            let Some(alarm) = guard.pop_earliest() else {
                break 0;
            };

            debug!(
                seq = alarm.seq(),
                delay_secs = alarm.delay().as_secs(),
                remaining_ms = alarm.remaining(Instant::now()).as_millis() as u64,
                "watching alarm"
            );

            match guard.watch(&alarm) {
                Watch::Expired => {
                    debug!(seq = alarm.seq(), "alarm expired");
                    guard.unlocked(|| sink.fire(&alarm));
                    stats.fired += 1;
                }
                Watch::Preempted => {
                    debug!(seq = alarm.seq(), "watch preempted by earlier alarm");
                    stats.preemptions += 1;
                    guard.reinsert_after_preemption(alarm);
                }
                Watch::Closed => break 1,
            }
        };

        stats.unfired = guard.len() as u64 + watched_at_close;
        info!(
            fired = stats.fired,
            preemptions = stats.preemptions,
            unfired = stats.unfired,
            "alarm worker stopped"
        );
        stats
    }
}

impl<S: AlarmSink + 'static> AlarmWorker<S> {
    /// Starts the worker on a dedicated named thread.
    ///
    /// # Errors
    /// Returns the OS error if the thread cannot be created.
    pub fn spawn(self) -> io::Result<JoinHandle<WorkerStats>> {
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || self.run())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
