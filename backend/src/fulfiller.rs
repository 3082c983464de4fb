//! Development oracle loop: produces local blocks and answers oracle jobs.
//!
//! Each tick advances the local height by one block, then every job whose
//! confirmation depth has been reached is answered by calling the broker's
//! callback as the oracle address. Jobs orphaned by a newer request are
//! rejected by the broker as stale; that rejection is final. Other failures
//! put the job back for the next block, up to `MAX_RETRIES` attempts.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use vrf_broker::local::OracleJob;
use vrf_broker::{BrokerError, Context, InternalRequestId};

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::node::{Node, SharedNode};
use crate::vrf::random_words;

/// Rejections that will never succeed on retry.
fn is_non_retryable(err: &BrokerError) -> bool {
    matches!(
        err,
        BrokerError::StaleHandle { .. }
            | BrokerError::UnknownHandle { .. }
            | BrokerError::AlreadyFulfilled
            | BrokerError::NotOracle
    )
}

/// The job to answer again after `error`, or `None` if it is dropped.
fn next_attempt(job: &OracleJob, error: &BrokerError, max_retries: u32) -> Option<OracleJob> {
    let attempts = job.attempts.saturating_add(1);
    if is_non_retryable(error) || attempts >= max_retries {
        return None;
    }
    Some(OracleJob {
        attempts,
        ..job.clone()
    })
}

/// Main fulfiller loop.
pub async fn run_fulfiller(config: AppConfig, node: SharedNode, metrics: Arc<Metrics>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(config.block_time_ms.max(1)));

    loop {
        ticker.tick().await;
        let mut guard = node.lock().await;
        produce_block(&mut guard, &config, &metrics);
    }
}

struct Outcome {
    job: OracleJob,
    result: Result<InternalRequestId, BrokerError>,
    requeued: bool,
}

/// Advance one block and answer every ready job. Returns the number of
/// jobs processed.
///
/// If the block cannot be persisted the node rolls back to the start of the
/// answer pass and the jobs are tried again on the next tick.
pub fn produce_block(node: &mut Node, config: &AppConfig, metrics: &Metrics) -> usize {
    let height = node.chain.advance(1);
    if !node.chain.jobs().iter().any(|job| job.ready_at() <= height) {
        return 0;
    }

    let before = node.snapshot();
    let jobs = node.chain.take_ready_jobs();
    debug!(height, jobs = jobs.len(), "Answering oracle jobs");

    let mut outcomes = Vec::with_capacity(jobs.len());
    for job in jobs {
        let result = fulfill_job(node, config, &job);
        let retry = result
            .as_ref()
            .err()
            .and_then(|e| next_attempt(&job, e, config.max_retries));
        let requeued = retry.is_some();
        if let Some(retry) = retry {
            node.chain.requeue(retry);
        }
        outcomes.push(Outcome {
            job,
            result,
            requeued,
        });
    }

    if let Err(e) = node.commit(before) {
        error!(height, error = %format!("{e:#}"), "Failed to persist block, rolled back");
        return 0;
    }

    for outcome in &outcomes {
        match &outcome.result {
            Ok(request_id) => {
                let latency = height.saturating_sub(outcome.job.request_height);
                metrics.record_fulfillment(latency);
                info!(
                    request_id = %request_id,
                    handle = %outcome.job.handle,
                    latency_blocks = latency,
                    "Fulfilled successfully"
                );
            }
            Err(e) => handle_fulfillment_error(outcome, e, metrics),
        }
    }
    outcomes.len()
}

fn handle_fulfillment_error(outcome: &Outcome, error: &BrokerError, metrics: &Metrics) {
    let job = &outcome.job;
    if is_non_retryable(error) {
        metrics.record_rejection();
        warn!(
            handle = %job.handle,
            reason = %error,
            "Skipping job (non-retryable)"
        );
    } else if outcome.requeued {
        metrics.record_failure();
        warn!(
            handle = %job.handle,
            attempt = job.attempts + 1,
            error = %error,
            "Failed to fulfill, retrying next block"
        );
    } else {
        metrics.record_failure();
        error!(
            handle = %job.handle,
            attempts = job.attempts + 1,
            error = %error,
            "Failed to fulfill, max retries exceeded"
        );
    }
}

#[instrument(skip_all, fields(handle = %job.handle))]
fn fulfill_job(
    node: &mut Node,
    config: &AppConfig,
    job: &OracleJob,
) -> Result<InternalRequestId, BrokerError> {
    let words = random_words(
        &config.hmac_secret,
        &job.handle,
        job.request_height,
        job.num_words,
    );
    let Node { broker, chain, .. } = node;
    broker.fulfill_random_words(Context::new(config.oracle, chain), job.handle, &words)
}
