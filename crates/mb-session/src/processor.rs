//! Sequential generation processor.
//!
//! A single long-lived tokio task drains the queue one job at a time. It
//! sleeps on a `Notify` until a prompt is submitted, so there is never more
//! than one generation call in flight.

use crate::backend::ImageGenerator;
use crate::error::GenerationError;
use crate::queue::Job;
use crate::session::{Shared, lock};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub(crate) async fn run_processor(
    shared: Arc<Shared>,
    generator: Arc<dyn ImageGenerator>,
    cancel: CancellationToken,
) {
    loop {
        let job = lock(&shared.queue).begin_next();
        match job {
            Some(job) => {
                run_job(&shared, generator.as_ref(), &cancel, job).await;
                shared.settled.notify_waiters();
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = shared.wake.notified() => {}
                }
            }
        }
        if cancel.is_cancelled() {
            break;
        }
    }
    shared.settled.notify_waiters();
    log::debug!("generation processor stopped");
}

fn saturating_millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}

async fn with_timeout<F>(call: F, limit: Option<Duration>) -> Result<String, GenerationError>
where
    F: Future<Output = Result<String, GenerationError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(GenerationError::Timeout(saturating_millis(limit)))),
        None => call.await,
    }
}

async fn run_job(
    shared: &Shared,
    generator: &dyn ImageGenerator,
    cancel: &CancellationToken,
    job: Job,
) {
    // Reference context is whatever is selected now, not at submit time.
    let context = lock(&shared.editor).selected_elements();
    log::info!(
        "task {} started: {:?} with {} reference(s)",
        job.id,
        job.prompt,
        context.len()
    );

    let tick = shared.config.progress_tick();
    let max_increment = shared.config.progress_max_increment.max(1);
    let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let call = with_timeout(
        generator.generate(&job.prompt, &context),
        shared.config.generation_timeout(),
    );
    tokio::pin!(call);

    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Err(GenerationError::Cancelled),
            result = &mut call => break result,
            _ = ticker.tick() => {
                let increment = rand::rng().random_range(1..=max_increment);
                lock(&shared.queue).advance_progress(job.id, increment);
            }
        }
    };

    match outcome {
        Ok(url) => {
            // The element must exist before anyone can observe `completed`.
            let (element, revision) = {
                let mut editor = lock(&shared.editor);
                let element = editor.insert_generated(url.as_str(), &context);
                (element, editor.revision())
            };
            shared.publish_revision(revision);
            lock(&shared.queue).complete(job.id, url);
            log::info!("task {} completed as element {element}", job.id);
        }
        Err(e) => {
            lock(&shared.queue).fail(job.id, e.to_string());
            log::info!("task {} failed: {e}", job.id);
        }
    }
}
