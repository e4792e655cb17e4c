use std::sync::Arc;
use std::time::Duration;

use relay_common::{
    AttemptRecord, CallError, CallErrorKind, CallObserver, CallOutcome, CallReport, Request,
    RpcResult, Transport,
};
use relay_descriptor::{Descriptor, Target};
use relay_metrics::CallMetricsCollector;
use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::{self, CallerConfig, RelayConfig};

/// A successful logical call.
#[derive(Debug, Clone)]
pub struct CallSuccess {
    /// Payload returned by the target that answered
    pub payload: RpcResult,
    /// The target that answered
    pub target: Target,
    /// Duration of the successful attempt alone
    pub attempt_duration: Duration,
    pub report: CallReport,
}

/// A failed logical call.
///
/// `error` is either the non-retryable failure of the last attempt, or a
/// terminal `NoMoreTargets` / `TotalTimeoutExceeded` error carrying the last
/// attempt's failure as its cause.
#[derive(Debug, Error)]
#[error("{error} ({attempts} attempt(s), {elapsed_ms}ms total)",
    attempts = .report.attempt_count(),
    elapsed_ms = .report.total_duration.as_millis())]
pub struct CallFailure {
    #[source]
    pub error: CallError,
    pub report: CallReport,
}

impl CallFailure {
    pub fn kind(&self) -> CallErrorKind {
        self.error.kind()
    }

    pub fn into_error(self) -> CallError {
        self.error
    }
}

/// Failover call engine.
///
/// Issues one logical call against the targets of a [`Descriptor`], moving on
/// to the next candidate whenever a failure allows it, until one target
/// answers, the candidates run out or the time budget elapses.
///
/// # Call Lifecycle
///
/// ```text
/// SELECTING ──(deadline passed)──────────────► FAILED (TotalTimeoutExceeded)
///     │      ──(no candidate left)───────────► FAILED (NoMoreTargets)
///     ▼
/// ATTEMPTING ──(Ok)──────────────────────────► SUCCEEDED
///     │       ──(failure, no failover)───────► FAILED (failure as is)
///     ▼
/// RETRYING (log, optional backoff) ──────────► SELECTING
/// ```
///
/// The candidate list is taken once per call from [`Descriptor::leaves`], so a
/// load-balanced group rotates exactly once per logical call no matter how
/// many attempts the call makes. Attempts are strictly sequential.
///
/// The call deadline is the earliest of the configured total timeout, the
/// request's `timeout_ms` and a deadline passed to
/// [`call_with_deadline`](Self::call_with_deadline). It is checked before each
/// attempt; a running attempt is bounded by its target's
/// [`attempt_budget`](Target::attempt_budget) only.
///
/// # Example
///
/// ```no_run
/// use relay_caller::ServiceCaller;
/// use relay_common::{Request, TcpTransport};
/// use relay_descriptor::{Descriptor, Group, Target};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let descriptor: Descriptor = Group::load_balanced(vec![
///     Target::new("127.0.0.1:9001")?.into(),
///     Target::new("127.0.0.1:9002")?.into(),
/// ])?
/// .into();
///
/// let caller = ServiceCaller::new(Arc::new(descriptor), Arc::new(TcpTransport::new()));
/// let success = caller.call(Request::new("compute", json!({"n": 10}))).await?;
/// println!("{} answered {}", success.target, success.payload);
/// # Ok(())
/// # }
/// ```
pub struct ServiceCaller {
    descriptor: Arc<Descriptor>,
    transport: Arc<dyn Transport>,
    config: CallerConfig,
    observers: Vec<Arc<dyn CallObserver>>,
}

impl ServiceCaller {
    pub fn new(descriptor: Arc<Descriptor>, transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor,
            transport,
            config: CallerConfig::default(),
            observers: Vec::new(),
        }
    }

    /// Builds a caller from a parsed config file.
    pub fn from_config(config: &RelayConfig, transport: Arc<dyn Transport>) -> config::Result<Self> {
        config.caller.validate()?;
        let descriptor = config.build_descriptor()?;
        Ok(Self::new(Arc::new(descriptor), transport).with_config(config.caller.clone()))
    }

    pub fn with_config(mut self, config: CallerConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds an observer that receives a [`CallReport`] for every call.
    pub fn with_observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_metrics(self, metrics: Arc<CallMetricsCollector>) -> Self {
        self.with_observer(metrics)
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &CallerConfig {
        &self.config
    }

    /// Performs one logical call.
    pub async fn call(&self, request: Request) -> Result<CallSuccess, CallFailure> {
        self.execute(request, None).await
    }

    /// Performs one logical call that must finish by `deadline`.
    pub async fn call_with_deadline(
        &self,
        request: Request,
        deadline: Instant,
    ) -> Result<CallSuccess, CallFailure> {
        self.execute(request, Some(deadline)).await
    }

    async fn execute(
        &self,
        request: Request,
        caller_deadline: Option<Instant>,
    ) -> Result<CallSuccess, CallFailure> {
        let started = Instant::now();
        let request = Arc::new(request);
        let deadline = [
            self.config.total_timeout().map(|t| started + t),
            request.timeout().map(|t| started + t),
            caller_deadline,
        ]
        .into_iter()
        .flatten()
        .min();

        let candidates = self.descriptor.leaves();
        let max_attempts = self.config.max_attempts.unwrap_or(usize::MAX).max(1);
        let first = candidates
            .first()
            .unwrap_or_else(|| self.descriptor.first_target())
            .clone();

        debug!(
            method = %request.method,
            request_id = request.id,
            candidates = candidates.len(),
            "Starting call"
        );

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut last_error: Option<CallError> = None;
        let mut next_index = 0;

        loop {
            // SELECTING
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let target = last_error.as_ref().map_or(first.clone(), |e| e.target().clone());
                let error = self.terminal(
                    CallErrorKind::TotalTimeoutExceeded,
                    &request,
                    target,
                    started,
                    last_error.take(),
                );
                return Err(self.fail(error, attempts, started));
            }

            let next = if attempts.len() < max_attempts {
                candidates.get(next_index).cloned()
            } else {
                None
            };
            let Some(target) = next else {
                let target = last_error.as_ref().map_or(first.clone(), |e| e.target().clone());
                let error = self.terminal(
                    CallErrorKind::NoMoreTargets,
                    &request,
                    target,
                    started,
                    last_error.take(),
                );
                return Err(self.fail(error, attempts, started));
            };
            next_index += 1;

            // ATTEMPTING
            let attempt = attempts.len() + 1;
            let attempt_started = Instant::now();
            let budget = target.attempt_budget();
            let outcome = timeout(budget, self.transport.invoke(&request, &target)).await;
            let attempt_duration = attempt_started.elapsed();

            let error = match outcome {
                Ok(Ok(payload)) => {
                    attempts.push(AttemptRecord::succeeded(&target, attempt_duration));
                    let report = self.finish(&request, attempts, started, CallOutcome::Succeeded);
                    info!(
                        method = %request.method,
                        endpoint = %target,
                        attempt,
                        elapsed_ms = report.total_duration.as_millis() as u64,
                        "Call succeeded"
                    );
                    return Ok(CallSuccess {
                        payload,
                        target,
                        attempt_duration,
                        report,
                    });
                }
                Ok(Err(e)) => e.into_call_error(Arc::clone(&request), target, attempt_duration),
                Err(_) => CallError::new(
                    CallErrorKind::SocketTimeout,
                    Arc::clone(&request),
                    target,
                    attempt_duration,
                )
                .with_detail(format!("attempt exceeded its {}ms budget", budget.as_millis())),
            };

            attempts.push(AttemptRecord::failed(&error));

            if !error.is_fail_over_allowed() {
                return Err(self.fail(error, attempts, started));
            }

            // RETRYING
            let has_next = next_index < candidates.len()
                && attempts.len() < max_attempts
                && deadline.map_or(true, |d| Instant::now() < d);
            let next_step = if has_next { "failing over" } else { "no further attempts" };
            warn!(
                method = %request.method,
                endpoint = %error.target(),
                checksum = format_args!("{:08x}", error.target().checksum()),
                attempt,
                elapsed_ms = attempt_duration.as_millis() as u64,
                reason = error.short_reason(),
                "Attempt failed, {}",
                next_step
            );

            let backoff = self.config.retry.backoff_for(attempt as u32 - 1);
            last_error = Some(error);

            if has_next && !backoff.is_zero() {
                let wait = match deadline {
                    Some(d) => backoff.min(d.saturating_duration_since(Instant::now())),
                    None => backoff,
                };
                debug!(backoff_ms = wait.as_millis() as u64, "Backing off before failover");
                sleep(wait).await;
            }
        }
    }

    /// Builds a terminal error for the whole call, chaining the last attempt.
    fn terminal(
        &self,
        kind: CallErrorKind,
        request: &Arc<Request>,
        target: Target,
        started: Instant,
        last_attempt: Option<CallError>,
    ) -> CallError {
        let error = CallError::new(kind, Arc::clone(request), target, started.elapsed());
        match last_attempt {
            Some(last) => {
                let detail = last.to_string();
                error.with_detail(detail).with_last_attempt(last)
            }
            None => error,
        }
    }

    fn fail(&self, error: CallError, attempts: Vec<AttemptRecord>, started: Instant) -> CallFailure {
        let report = self.finish(error.request(), attempts, started, CallOutcome::Failed(error.kind()));
        warn!(
            method = %error.request().method,
            endpoint = %error.target(),
            attempts = report.attempt_count(),
            elapsed_ms = report.total_duration.as_millis() as u64,
            reason = error.short_reason(),
            "Call failed"
        );
        CallFailure { error, report }
    }

    fn finish(
        &self,
        request: &Request,
        attempts: Vec<AttemptRecord>,
        started: Instant,
        outcome: CallOutcome,
    ) -> CallReport {
        let report = CallReport {
            request_id: request.id,
            method: request.method.clone(),
            attempts,
            total_duration: started.elapsed(),
            outcome,
        };
        for observer in &self.observers {
            observer.on_call_complete(&report);
        }
        report
    }
}
