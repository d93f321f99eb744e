//! Bounded-concurrency dispatch over a fixed worker pool
//!
//! A dispatcher thread feeds jobs into a rendezvous channel, a fixed
//! number of workers run them, and the calling thread is the single
//! consumer of the outcome channel. The rendezvous channel means a job
//! is only handed over when a worker is actually free, so a halt stops
//! dispatch immediately instead of after a buffered backlog drains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error};

use crate::config::Settings;
use crate::pipeline::job::EncodeJob;
use crate::pipeline::report::{Outcome, OutcomeCollector};
use crate::tools::Toolset;

/// Shared stop signal for one batch run
#[derive(Clone)]
pub struct HaltControl {
    stop: Arc<AtomicBool>,
    cancel_in_flight: bool,
}

impl HaltControl {
    pub fn new(cancel_in_flight: bool) -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            cancel_in_flight,
        }
    }

    /// Stop dispatching new jobs
    pub fn trigger(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// True when a running job should give up at its next stage boundary
    /// instead of draining to completion
    pub fn should_abandon(&self) -> bool {
        self.cancel_in_flight && self.stopped()
    }
}

/// Run every job to a terminal state, recording outcomes in dispatch
/// completion order
pub fn run_jobs(
    jobs: Vec<EncodeJob>,
    tools: &Toolset,
    settings: &Settings,
    collector: &mut OutcomeCollector,
) {
    if jobs.is_empty() {
        return;
    }

    let total = jobs.len();
    let workers = settings.workers.min(total).max(1);
    let continue_on_error = settings.continue_on_error;
    let halt = HaltControl::new(settings.cancel_in_flight);

    debug!("Dispatching {} job(s) across {} worker(s)", total, workers);

    // Rendezvous job channel: a send only completes when a worker is
    // ready to take the job, so after a halt at most one already-offered
    // job slips through.
    let (job_tx, job_rx) = bounded::<EncodeJob>(0);

    // Outcome channel must be unbounded: workers send results while this
    // thread may not be draining yet, and a bounded channel could block
    // a worker forever once the batch winds down.
    let (outcome_tx, outcome_rx) = unbounded::<Outcome>();

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let rx = job_rx.clone();
        let tx = outcome_tx.clone();
        let tools = tools.clone();
        let halt = halt.clone();
        handles.push(thread::spawn(move || {
            worker_loop(rx, tx, &tools, &halt, continue_on_error);
        }));
    }
    drop(job_rx);
    drop(outcome_tx);

    let dispatch_halt = halt.clone();
    let dispatcher = thread::spawn(move || {
        for job in jobs {
            if dispatch_halt.stopped() {
                debug!("Halt raised, leaving remaining jobs undispatched");
                break;
            }
            if job_tx.send(job).is_err() {
                break;
            }
        }
        // Dropping job_tx closes the channel and lets the workers drain out
    });

    let progress = if settings.show_progress {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(bar)
    } else {
        None
    };

    // Sole consumer: the loop ends once every worker has dropped its
    // sender, which in turn requires the dispatcher to have finished.
    for outcome in outcome_rx {
        if let Some(bar) = &progress {
            bar.inc(1);
            if let Some(name) = outcome.album.file_name() {
                bar.set_message(name.to_string_lossy().to_string());
            }
        }
        collector.record(outcome);
    }

    if let Some(bar) = progress {
        bar.finish_with_message("Encoding complete");
    }

    join_thread(dispatcher, "dispatcher");
    for handle in handles {
        join_thread(handle, "worker");
    }
}

fn worker_loop(
    jobs: Receiver<EncodeJob>,
    outcomes: Sender<Outcome>,
    tools: &Toolset,
    halt: &HaltControl,
    continue_on_error: bool,
) {
    for job in jobs {
        let outcome = job.run(tools, halt);
        if outcome.is_failure() && !continue_on_error {
            // Raise the halt before publishing the outcome so dispatch
            // stops no later than the next send attempt.
            halt.trigger();
        }
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}

fn join_thread(handle: JoinHandle<()>, what: &str) {
    if let Err(panic_info) = handle.join() {
        let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        error!("{} thread panicked: {}", what, panic_msg);
    }
}
