/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Request intake: turns `<seconds> <message>` requests into alarms.
//!
//! All validation happens here.  A rejected request never reaches the store,
//! so the worker only ever sees well-formed alarms.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::alarm::Alarm;
use crate::error::SubmitError;
use crate::store::AlarmStore;

/// Default bound on message length, in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 63;

// ── Parsing ───────────────────────────────────────────────────────────────────

/// A parsed but not yet validated request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub delay_secs: i64,
    pub message: &'a str,
}

/// Splits a request line into delay and message.
///
/// The delay is a base-10 integer; the message is the rest of the line after
/// the separating whitespace, with the line terminator removed.  Range and
/// length checks are left to [`RequestIntake::submit`].
pub fn parse_request(line: &str) -> Result<Request<'_>, SubmitError> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    if line.trim_end().is_empty() {
        return Err(SubmitError::Malformed {
            reason: "empty request",
        });
    }

    let (delay, rest) = line
        .split_once(char::is_whitespace)
        .ok_or(SubmitError::Malformed {
            reason: "missing message",
        })?;

    let delay_secs = delay.parse::<i64>().map_err(|_| SubmitError::Malformed {
        reason: "delay is not an integer",
    })?;

    let message = rest.trim_start();
    if message.is_empty() {
        return Err(SubmitError::Malformed {
            reason: "missing message",
        });
    }

    Ok(Request {
        delay_secs,
        message,
    })
}

// ── RequestIntake ─────────────────────────────────────────────────────────────

/// Producer-side handle onto an [`AlarmStore`].
///
/// Cheap to clone; any number of intakes may submit concurrently.
#[derive(Debug, Clone)]
pub struct RequestIntake {
    store: Arc<AlarmStore>,
    max_message_bytes: usize,
}

impl RequestIntake {
    pub fn new(store: Arc<AlarmStore>, max_message_bytes: usize) -> Self {
        Self {
            store,
            max_message_bytes,
        }
    }

    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    /// Schedules `message` to fire `delay_secs` seconds from now.
    ///
    /// # Errors
    /// * [`SubmitError::Malformed`] if `delay_secs <= 0` or the deadline is
    ///   not representable.
    /// * [`SubmitError::TooLong`] if `message` exceeds the byte bound.
    /// * [`SubmitError::Closed`] if the store has shut down.
    pub fn submit(&self, delay_secs: i64, message: &str) -> Result<(), SubmitError> {
        let delay = u64::try_from(delay_secs)
            .ok()
            .filter(|&secs| secs > 0)
            .ok_or(SubmitError::Malformed {
                reason: "delay must be a positive number of seconds",
            })?;

        if message.len() > self.max_message_bytes {
            return Err(SubmitError::TooLong {
                len: message.len(),
                max: self.max_message_bytes,
            });
        }

        let alarm =
            Alarm::try_after(Duration::from_secs(delay), message).ok_or(SubmitError::Malformed {
                reason: "delay out of range",
            })?;
        self.store.insert(alarm)?;

        debug!(delay_secs = delay, text = message, "alarm submitted");
        Ok(())
    }

    /// Parses a `<seconds> <message>` line and submits it.
    pub fn submit_line(&self, line: &str) -> Result<(), SubmitError> {
        let request = parse_request(line)?;
        self.submit(request.delay_secs, request.message)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn intake() -> (Arc<AlarmStore>, RequestIntake) {
        let store = Arc::new(AlarmStore::new());
        let intake = RequestIntake::new(Arc::clone(&store), DEFAULT_MAX_MESSAGE_BYTES);
        (store, intake)
    }

    fn malformed(result: Result<impl std::fmt::Debug, SubmitError>) -> bool {
        matches!(result, Err(SubmitError::Malformed { .. }))
    }

    // ── parse_request ─────────────────────────────────────────────────────────

    #[test]
    fn parses_delay_and_message() {
        let req = parse_request("5 take the bread out\n").unwrap();
        assert_eq!(req.delay_secs, 5);
        assert_eq!(req.message, "take the bread out");
    }

    #[test]
    fn skips_extra_whitespace_before_message() {
        let req = parse_request("  10 \t  stretch\r\n").unwrap();
        assert_eq!(req.delay_secs, 10);
        assert_eq!(req.message, "stretch");
    }

    #[test]
    fn keeps_trailing_spaces_in_message() {
        let req = parse_request("1 hi  \n").unwrap();
        assert_eq!(req.message, "hi  ");
    }

    #[test]
    fn blank_line_is_malformed() {
        assert!(malformed(parse_request("")));
        assert!(malformed(parse_request("\n")));
        assert!(malformed(parse_request("   \t \n")));
    }

    #[test]
    fn delay_without_message_is_malformed() {
        assert!(malformed(parse_request("5")));
        assert!(malformed(parse_request("5   \n")));
    }

    #[test]
    fn non_numeric_delay_is_malformed() {
        assert!(malformed(parse_request("soon wake up")));
        assert!(malformed(parse_request("5s wake up")));
        assert!(malformed(parse_request("99999999999999999999 overflow")));
    }

    #[test]
    fn negative_delay_parses_but_is_rejected_on_submit() {
        let req = parse_request("-3 back in time").unwrap();
        assert_eq!(req.delay_secs, -3);

        let (store, intake) = intake();
        assert!(malformed(intake.submit(req.delay_secs, req.message)));
        assert!(store.is_empty());
    }

    // ── submit ────────────────────────────────────────────────────────────────

    #[test]
    fn submit_inserts_alarm_into_store() {
        let (store, intake) = intake();
        intake.submit(30, "stand up").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot().messages(), vec!["stand up"]);
        assert!(store.active_deadline().is_some());
    }

    #[test]
    fn zero_delay_is_rejected() {
        let (store, intake) = intake();
        assert!(malformed(intake.submit(0, "now")));
        assert!(store.is_empty());
        assert_eq!(store.active_deadline(), None);
    }

    #[test]
    fn unrepresentable_delay_is_rejected_without_panicking() {
        let (store, intake) = intake();
        assert!(malformed(intake.submit_line("9223372036854775807 far future\n")));
        assert!(malformed(intake.submit(i64::MAX, "far future")));
        assert!(store.is_empty());
        assert_eq!(store.active_deadline(), None);

        intake.submit(1, "still accepting").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn far_delay_on_debug_dump_store_renders_snapshot() {
        let store = Arc::new(AlarmStore::with_debug_dump(true));
        let intake = RequestIntake::new(Arc::clone(&store), DEFAULT_MAX_MESSAGE_BYTES);
        // Representable as an Instant on Linux, but past SystemTime's range.
        match intake.submit(i64::MAX - 100_000_000, "x") {
            Ok(()) => {
                let snapshot = store.snapshot();
                assert_eq!(snapshot.messages(), vec!["x"]);
                assert!(snapshot.to_string().starts_with(&format!("{{{} (", u64::MAX)));
            }
            Err(e) => assert!(matches!(e, SubmitError::Malformed { .. })),
        }
    }

    #[test]
    fn message_at_limit_is_accepted() {
        let (store, intake) = intake();
        let message = "m".repeat(DEFAULT_MAX_MESSAGE_BYTES);
        intake.submit(1, &message).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn message_over_limit_is_rejected() {
        let (store, intake) = intake();
        let message = "m".repeat(DEFAULT_MAX_MESSAGE_BYTES + 1);
        assert_eq!(
            intake.submit(1, &message),
            Err(SubmitError::TooLong {
                len: DEFAULT_MAX_MESSAGE_BYTES + 1,
                max: DEFAULT_MAX_MESSAGE_BYTES,
            })
        );
        assert!(store.is_empty());
    }

    #[test]
    fn limit_counts_bytes_not_characters() {
        let store = Arc::new(AlarmStore::new());
        let intake = RequestIntake::new(Arc::clone(&store), 4);
        // "éé" is 2 chars but 4 bytes; "ééé" is 6 bytes.
        intake.submit(1, "éé").unwrap();
        assert!(matches!(
            intake.submit(1, "ééé"),
            Err(SubmitError::TooLong { len: 6, max: 4 })
        ));
    }

    #[test]
    fn submit_after_close_reports_closed() {
        let (store, intake) = intake();
        store.close();
        assert!(matches!(
            intake.submit(1, "too late"),
            Err(SubmitError::Closed(_))
        ));
    }

    #[test]
    fn rejected_line_leaves_service_accepting() {
        let (store, intake) = intake();
        assert!(intake.submit_line("\n").is_err());
        assert!(intake.submit_line("garbage").is_err());
        intake.submit_line("2 still works\n").unwrap();
        assert_eq!(store.snapshot().messages(), vec!["still works"]);
    }
}
