// SPDX-License-Identifier: MIT

//! Progress reporting seam between long-running jobs and their frontends
//!
//! The organizer and merger report through a [`Reporter`] so the CLI can log
//! to the terminal while the web UI mirrors the same events into a shared
//! job state that the dashboard polls.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{info, warn};

/// Kind of background job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Organize,
    Merge,
}

/// Lifecycle of a background job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Idle,
    Running,
    Done,
    Failed,
}

/// Sink for job progress events
pub trait Reporter: Send + Sync {
    /// A job started with a known number of items
    fn begin(&self, total: usize);

    /// An item is being worked on
    fn item_started(&self, name: &str);

    /// An item finished (successfully or not)
    fn item_done(&self, name: &str, ok: bool);

    /// Free-form progress note
    fn note(&self, message: &str);
}

/// Reporter that forwards everything to tracing (CLI frontend)
pub struct LogReporter;

impl Reporter for LogReporter {
    fn begin(&self, total: usize) {
        info!("Processing {} items", total);
    }

    fn item_started(&self, name: &str) {
        info!("Processing: {}", name);
    }

    fn item_done(&self, name: &str, ok: bool) {
        if ok {
            info!("Done: {}", name);
        } else {
            warn!("Failed: {}", name);
        }
    }

    fn note(&self, message: &str) {
        info!("{}", message);
    }
}

const LOG_CAPACITY: usize = 100;

#[derive(Debug)]
struct JobInner {
    phase: JobPhase,
    kind: Option<JobKind>,
    total: usize,
    processed: usize,
    failed: usize,
    current: Option<String>,
    log: VecDeque<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

/// Shared state of the single background job slot.
///
/// Only one organize or merge runs at a time; the dashboard polls a
/// [`JobSnapshot`] of this state.
pub struct JobState {
    inner: Mutex<JobInner>,
}

/// Serializable snapshot of the job state
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub phase: JobPhase,
    pub kind: Option<JobKind>,
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub current: Option<String>,
    pub log: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl JobState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(JobInner {
                phase: JobPhase::Idle,
                kind: None,
                total: 0,
                processed: 0,
                failed: 0,
                current: None,
                log: VecDeque::new(),
                started_at: None,
                finished_at: None,
                error: None,
            }),
        }
    }

    /// Claim the job slot. Returns false if a job is already running.
    pub fn try_start(&self, kind: JobKind) -> bool {
        let mut inner = self.inner.lock().expect("job state poisoned");
        if inner.phase == JobPhase::Running {
            return false;
        }
        *inner = JobInner {
            phase: JobPhase::Running,
            kind: Some(kind),
            total: 0,
            processed: 0,
            failed: 0,
            current: None,
            log: VecDeque::new(),
            started_at: Some(Utc::now()),
            finished_at: None,
            error: None,
        };
        true
    }

    /// Release the job slot with the job's outcome
    pub fn complete(&self, result: &crate::Result<()>) {
        let mut inner = self.inner.lock().expect("job state poisoned");
        inner.finished_at = Some(Utc::now());
        inner.current = None;
        match result {
            Ok(()) => inner.phase = JobPhase::Done,
            Err(e) => {
                inner.phase = JobPhase::Failed;
                inner.error = Some(e.to_string());
            }
        }
    }

    /// Take a snapshot for the status API
    pub fn snapshot(&self) -> JobSnapshot {
        let inner = self.inner.lock().expect("job state poisoned");
        JobSnapshot {
            phase: inner.phase,
            kind: inner.kind,
            total: inner.total,
            processed: inner.processed,
            failed: inner.failed,
            current: inner.current.clone(),
            log: inner.log.iter().cloned().collect(),
            started_at: inner.started_at,
            finished_at: inner.finished_at,
            error: inner.error.clone(),
        }
    }

    fn push_log(inner: &mut JobInner, line: String) {
        if inner.log.len() >= LOG_CAPACITY {
            inner.log.pop_front();
        }
        inner.log.push_back(line);
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for JobState {
    fn begin(&self, total: usize) {
        let mut inner = self.inner.lock().expect("job state poisoned");
        inner.total = total;
        Self::push_log(&mut inner, format!("Processing {} items", total));
    }

    fn item_started(&self, name: &str) {
        let mut inner = self.inner.lock().expect("job state poisoned");
        inner.current = Some(name.to_string());
    }

    fn item_done(&self, name: &str, ok: bool) {
        let mut inner = self.inner.lock().expect("job state poisoned");
        inner.processed += 1;
        if !ok {
            inner.failed += 1;
        }
        let status = if ok { "done" } else { "failed" };
        Self::push_log(&mut inner, format!("{}: {}", name, status));
    }

    fn note(&self, message: &str) {
        let mut inner = self.inner.lock().expect("job state poisoned");
        Self::push_log(&mut inner, message.to_string());
    }
}
