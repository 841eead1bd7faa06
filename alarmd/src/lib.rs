/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! alarmd – single-process alarm scheduling service
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── alarm     – Alarm value type and fire-line format
//! ├── store     – AlarmStore: lock, condition, ordered queue, preemption signal
//! ├── worker    – the idle / watching / firing loop and the AlarmSink seam
//! ├── intake    – request parsing and submit()
//! ├── error     – StoreClosed / SubmitError
//! └── config    – YAML service configuration
//! ```
//!
//! Control flow: `RequestIntake::submit` → `AlarmStore::insert` (may wake the
//! worker) → `AlarmWorker` watch / fire loop.

pub mod alarm;
pub mod config;
pub mod error;
pub mod intake;
pub mod store;
pub mod worker;

pub use alarm::Alarm;
pub use error::{StoreClosed, SubmitError};
pub use intake::RequestIntake;
pub use store::AlarmStore;
pub use worker::{AlarmSink, AlarmWorker, StdoutSink, WorkerStats};
