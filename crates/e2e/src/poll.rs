//! Retry-until combinator used by every polled assertion
//!
//! A probe is a zero-argument check returning `Ok(())` when satisfied or a
//! [`Diagnostic`] explaining why not. [`retry_until`] calls it once right
//! away, then once per interval, until it is satisfied, a fatal diagnostic is
//! returned, or the timeout has elapsed. The failure carries the diagnostic of
//! the last attempt so it points at the symptom that was actually observed.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Why a probe attempt did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Output did not match; re-running may change it
    Mismatch,
    /// Command exited non-zero; may be transient
    CommandFailed,
    /// Re-running cannot help; stop polling now
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Mismatch,
            message: message.into(),
        }
    }

    pub fn command_failed(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::CommandFailed,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Fatal,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == DiagnosticKind::Fatal
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type ProbeResult = Result<(), Diagnostic>;

/// How long to keep polling and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// Final result of a polling loop
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub result: ProbeResult,
    pub attempts: u32,
    pub elapsed: Duration,
}

impl PollOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }

    /// Last diagnostic, if the loop failed
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.result.as_ref().err()
    }

    /// Convert into a test result, annotating failures with `command`.
    pub fn into_result(self, command: impl fmt::Display) -> E2eResult<()> {
        self.result.map_err(|d| E2eError::AssertionFailed {
            command: command.to_string(),
            diagnostic: d.message,
        })
    }
}

/// Call `probe` until it succeeds, returns a fatal diagnostic, or
/// `policy.timeout` has elapsed.
///
/// Blocks the current thread while waiting. An attempt that is already running
/// when the deadline passes is allowed to finish.
pub fn retry_until<F>(policy: PollPolicy, mut probe: F) -> PollOutcome
where
    F: FnMut() -> ProbeResult,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = probe();

        if let Some(outcome) = settle(result, attempts, start, &policy) {
            return outcome;
        }

        std::thread::sleep(policy.interval);
    }
}

/// Async flavour of [`retry_until`] for tests running inside a tokio runtime.
///
/// The wait between attempts yields to the runtime instead of blocking the
/// thread; timing semantics are identical.
pub async fn retry_until_async<F, Fut>(policy: PollPolicy, mut probe: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult>,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = probe().await;

        if let Some(outcome) = settle(result, attempts, start, &policy) {
            return outcome;
        }

        tokio::time::sleep(policy.interval).await;
    }
}

/// Decide whether the loop is over after an attempt.
fn settle(
    result: ProbeResult,
    attempts: u32,
    start: Instant,
    policy: &PollPolicy,
) -> Option<PollOutcome> {
    let elapsed = start.elapsed();
    let done = match &result {
        Ok(()) => {
            debug!(attempts, ?elapsed, "Probe satisfied");
            true
        }
        Err(d) if d.is_fatal() => {
            warn!(attempts, "Probe failed permanently: {}", d);
            true
        }
        Err(d) => {
            debug!(attempts, ?elapsed, "Probe not yet satisfied: {}", d);
            if elapsed >= policy.timeout {
                warn!(
                    attempts,
                    "Gave up after {:?}, last attempt: {}", policy.timeout, d
                );
            }
            elapsed >= policy.timeout
        }
    };

    done.then_some(PollOutcome {
        result,
        attempts,
        elapsed,
    })
}
