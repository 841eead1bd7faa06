/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for alarmd.
//!
//! Two error types model the two failure layers:
//!
//! * [`StoreClosed`] — the [`AlarmStore`](crate::store::AlarmStore) has been
//!   shut down and no longer accepts alarms.
//! * [`SubmitError`] — why a single request was rejected at the intake
//!   boundary.  Every variant is recoverable: the request is dropped and the
//!   service keeps accepting input.
//!
//! Nothing in here is fatal.  Allocation failure aborts the process on its
//! own and the store's lock primitives cannot fail.

use thiserror::Error;

// ── Store ─────────────────────────────────────────────────────────────────────

/// Returned by [`AlarmStore::insert`](crate::store::AlarmStore::insert) once
/// [`close`](crate::store::AlarmStore::close) has been called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("alarm store is closed")]
pub struct StoreClosed;

// ── Intake ────────────────────────────────────────────────────────────────────

/// Why a request was rejected by [`RequestIntake`](crate::intake::RequestIntake).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The request could not be parsed or carried an invalid delay.
    #[error("malformed request: {reason}")]
    Malformed { reason: &'static str },

    /// The message exceeds the configured size bound.
    #[error("message is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    /// The service is shutting down.
    #[error(transparent)]
    Closed(#[from] StoreClosed),
}

impl SubmitError {
    /// Short machine-friendly reason tag for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::Malformed { .. } => "malformed",
            SubmitError::TooLong { .. } => "too-long",
            SubmitError::Closed(_) => "closed",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
