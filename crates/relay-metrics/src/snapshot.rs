// Copyright 2025 Relay Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::{BTreeMap, HashMap};

use relay_common::FailureCategory;
use serde::{Deserialize, Serialize};

/// Metrics for calls to a specific method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodMetrics {
    pub call_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub attempt_count: u64,
    pub avg_latency_us: u64,
    pub p50_latency_us: u64,
    pub p95_latency_us: u64,
    pub p99_latency_us: u64,
}

/// Metrics for attempts against a specific target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub address: String,
    pub attempt_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

impl TargetMetrics {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            attempt_count: 0,
            success_count: 0,
            failure_count: 0,
        }
    }
}

/// Complete metrics snapshot.
///
/// `attempt_failures` counts every failed attempt by category, whereas
/// `call_failures` counts the final outcome of failed logical calls. Targets
/// are keyed by checksum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_attempts: u64,
    pub failovers: u64,
    pub uptime_ms: u64,
    pub attempt_failures: BTreeMap<FailureCategory, u64>,
    pub call_failures: BTreeMap<FailureCategory, u64>,
    pub methods: HashMap<String, MethodMetrics>,
    pub targets: BTreeMap<u32, TargetMetrics>,
}

impl MetricsSnapshot {
    /// Average number of attempts per logical call.
    pub fn attempts_per_call(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_attempts as f64 / self.total_calls as f64
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
