/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! load-sim – hammers one AlarmStore with concurrent producers.
//!
//! Every producer is a tokio task that submits `--per-producer` alarms with
//! pseudo-random millisecond delays, pausing briefly between submissions so
//! new alarms regularly preempt the one being watched.  Once every alarm has
//! fired (or `--timeout-secs` elapses) the recorded fire stream is checked:
//!
//! * deadlines are non-decreasing
//! * no alarm fired before its deadline
//! * every alarm fired exactly once
//!
//! Exits with status 1 if any check fails.

use std::collections::HashSet;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};

use alarmd::{Alarm, AlarmStore, AlarmWorker};

#[derive(Debug, Parser)]
#[command(name = "load-sim", about = "Concurrent producer load test for alarmd")]
struct Cli {
    /// Number of concurrent producer tasks.
    #[arg(short = 'p', long = "producers", default_value_t = 8)]
    producers: u64,

    /// Alarms submitted by each producer.
    #[arg(short = 'n', long = "per-producer", default_value_t = 50)]
    per_producer: u64,

    /// Upper bound on each alarm's delay, in milliseconds.
    #[arg(short = 'm', long = "max-delay-ms", default_value_t = 2_000)]
    max_delay_ms: u64,

    /// Pause between submissions of one producer, in milliseconds.
    #[arg(long = "gap-ms", default_value_t = 3)]
    gap_ms: u64,

    /// Give up waiting for fires after this many seconds.
    #[arg(long = "timeout-secs", default_value_t = 30)]
    timeout_secs: u64,
}

/// One recorded fire.
#[derive(Debug, Clone)]
struct Record {
    message: String,
    deadline: Instant,
    fired_at: Instant,
}

/// Delay in `1..=max_ms` milliseconds.
fn next_delay(rng: &mut StdRng, max_ms: u64) -> Duration {
    Duration::from_millis(rng.random_range(1..=max_ms.max(1)))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(violations) if violations == 0 => info!("load-sim passed"),
        Ok(violations) => {
            error!(violations, "load-sim FAILED");
            process::exit(1);
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<usize> {
    let total = cli
        .producers
        .checked_mul(cli.per_producer)
        .ok_or_else(|| anyhow!("producers × per-producer overflows"))? as usize;

    info!(
        producers    = cli.producers,
        per_producer = cli.per_producer,
        max_delay_ms = cli.max_delay_ms,
        total        = total,
        "starting load simulation"
    );

    // ── Worker with a recording sink ──────────────────────────────────────────
    let store = Arc::new(AlarmStore::new());
    let records: Arc<Mutex<Vec<Record>>> = Arc::default();
    let sink_records = Arc::clone(&records);
    let worker = AlarmWorker::new(Arc::clone(&store), move |alarm: &Alarm| {
        sink_records.lock().push(Record {
            message: alarm.message().to_string(),
            deadline: alarm.deadline(),
            fired_at: Instant::now(),
        });
    })
    .spawn()
    .context("Failed to spawn alarm worker thread")?;

    // ── Producers ─────────────────────────────────────────────────────────────
    let started = Instant::now();
    let mut producers = Vec::new();
    for p in 0..cli.producers {
        let store = Arc::clone(&store);
        let (per_producer, max_delay_ms, gap) =
            (cli.per_producer, cli.max_delay_ms, Duration::from_millis(cli.gap_ms));
        producers.push(tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(p);
            for i in 0..per_producer {
                let delay = next_delay(&mut rng, max_delay_ms);
                store.insert(Alarm::after(delay, format!("p{p}-{i}")))?;
                tokio::time::sleep(gap).await;
            }
            Ok::<(), alarmd::StoreClosed>(())
        }));
    }
    for producer in producers {
        producer
            .await
            .context("producer task panicked")?
            .context("store closed while producing")?;
    }
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "all alarms submitted");

    // ── Wait for the fire stream to drain ─────────────────────────────────────
    let limit = Duration::from_secs(cli.timeout_secs);
    while records.lock().len() < total && started.elapsed() < limit {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    store.close();
    let stats = tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("Failed to join alarm worker")?
        .map_err(|_| anyhow!("alarm worker thread panicked"))?;

    info!(
        fired = stats.fired,
        preemptions = stats.preemptions,
        "worker finished"
    );

    let result = Ok(check(&records.lock(), total));
    result
}

/// Returns the number of violated guarantees, logging each one.
fn check(records: &[Record], expected: usize) -> usize {
    let mut violations = 0;

    if records.len() != expected {
        warn!(fired = records.len(), expected, "missing fires");
        violations += 1;
    }

    let unique: HashSet<&str> = records.iter().map(|r| r.message.as_str()).collect();
    if unique.len() != records.len() {
        warn!(
            duplicates = records.len() - unique.len(),
            "alarms fired more than once"
        );
        violations += 1;
    }

    for pair in records.windows(2) {
        if pair[1].deadline < pair[0].deadline {
            warn!(
                earlier = %pair[1].message,
                later = %pair[0].message,
                "out-of-order fire"
            );
            violations += 1;
        }
    }

    let mut max_lateness = Duration::ZERO;
    for r in records {
        if r.fired_at < r.deadline {
            warn!(alarm = %r.message, "fired before deadline");
            violations += 1;
        } else {
            max_lateness = max_lateness.max(r.fired_at - r.deadline);
        }
    }
    info!(
        max_lateness_ms = max_lateness.as_millis() as u64,
        "fire latency"
    );

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str, deadline: Instant, fired_at: Instant) -> Record {
        Record {
            message: message.to_string(),
            deadline,
            fired_at,
        }
    }

    #[test]
    fn delays_stay_in_range_and_repeat_per_seed() {
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            let delay = next_delay(&mut a, 50);
            assert!((1..=50).contains(&delay.as_millis()));
            assert_eq!(delay, next_delay(&mut b, 50));
        }
    }

    #[test]
    fn zero_max_delay_still_yields_one_millisecond() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(next_delay(&mut rng, 0), Duration::from_millis(1));
    }

    #[test]
    fn check_accepts_ordered_on_time_stream() {
        let t = Instant::now();
        let records = [
            record("a", t, t + Duration::from_millis(1)),
            record("b", t + Duration::from_millis(5), t + Duration::from_millis(5)),
        ];
        assert_eq!(check(&records, 2), 0);
    }

    #[test]
    fn check_flags_each_violation() {
        let t = Instant::now();
        let records = [
            record("a", t + Duration::from_millis(10), t + Duration::from_millis(10)),
            record("a", t, t + Duration::from_millis(11)),
            record("b", t + Duration::from_millis(20), t + Duration::from_millis(12)),
        ];
        // missing fire, duplicate, out-of-order, early
        assert_eq!(check(&records, 4), 4);
    }
}
