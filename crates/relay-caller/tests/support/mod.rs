//! Shared helpers for service caller tests
//!
//! `ScriptedTransport` answers each attempt from a per-address script so that
//! failover paths can be driven deterministically under a paused tokio clock.

#![allow(dead_code)]

use async_trait::async_trait;
use relay_common::{CallErrorKind, CallObserver, CallReport, Request, RpcResult, Transport, TransportError};
use relay_descriptor::{Descriptor, Group, SelectionPolicy, Target};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted answer: wait `delay`, then reply or fail.
#[derive(Debug, Clone)]
pub struct Step {
    delay: Duration,
    result: Result<Value, CallErrorKind>,
}

impl Step {
    pub fn reply(value: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(value),
        }
    }

    pub fn fail(kind: CallErrorKind) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(kind),
        }
    }

    pub fn after(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

/// Transport answering from per-address scripts.
///
/// Queued steps are used first, then the address's standing step. Addresses
/// with neither refuse the connection.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<Step>>>,
    standing: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every attempt against `address` with `step`.
    pub fn always(self, address: &str, step: Step) -> Self {
        self.standing.lock().unwrap().insert(address.to_string(), step);
        self
    }

    /// Answers the next attempt against `address` with `step`.
    pub fn once(self, address: &str, step: Step) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push_back(step);
        self
    }

    /// Addresses attempted so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_step(&self, address: &str) -> Step {
        if let Some(step) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(VecDeque::pop_front)
        {
            return step;
        }
        self.standing
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| Step::fail(CallErrorKind::ConnectionRefused))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn invoke(&self, _request: &Request, target: &Target) -> Result<RpcResult, TransportError> {
        self.calls.lock().unwrap().push(target.address().to_string());
        let step = self.next_step(target.address());
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result.map_err(|kind| {
            TransportError::new(kind).with_detail(format!("scripted failure from {}", target.address()))
        })
    }
}

/// Observer keeping every report it receives.
#[derive(Default)]
pub struct RecordingObserver {
    reports: Mutex<Vec<CallReport>>,
}

impl RecordingObserver {
    pub fn reports(&self) -> Vec<CallReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl CallObserver for RecordingObserver {
    fn on_call_complete(&self, report: &CallReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

pub fn target(address: &str) -> Target {
    Target::new(address).unwrap()
}

pub fn group(policy: SelectionPolicy, addresses: &[&str]) -> Descriptor {
    let children = addresses.iter().map(|a| target(a).into()).collect();
    Group::new(policy, children).unwrap().into()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("relay_caller=debug")
        .with_test_writer()
        .try_init();
}
