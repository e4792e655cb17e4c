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

use std::sync::Arc;

use relay_common::{CallObserver, CallReport};

use crate::registry::{MetricsConfig, MetricsRegistry};
use crate::snapshot::MetricsSnapshot;

/// Call observer that feeds every completed call into a [`MetricsRegistry`].
///
/// Attach it to a service caller and read the aggregated numbers back with
/// [`snapshot`](Self::snapshot).
///
/// # Example
///
/// ```rust
/// use relay_common::{CallObserver, CallOutcome, CallReport};
/// use relay_metrics::CallMetricsCollector;
/// use std::time::Duration;
///
/// let collector = CallMetricsCollector::new();
/// collector.on_call_complete(&CallReport {
///     request_id: 1,
///     method: "compute".to_string(),
///     attempts: vec![],
///     total_duration: Duration::from_millis(3),
///     outcome: CallOutcome::Succeeded,
/// });
/// assert_eq!(collector.snapshot().total_calls, 1);
/// ```
#[derive(Debug, Clone)]
pub struct CallMetricsCollector {
    registry: Arc<MetricsRegistry>,
}

impl CallMetricsCollector {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(MetricsRegistry::new()))
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        Self::with_registry(Arc::new(MetricsRegistry::with_config(config)))
    }

    /// Shares an existing registry, e.g. between several callers.
    pub fn with_registry(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.registry.snapshot()
    }
}

impl Default for CallMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl CallObserver for CallMetricsCollector {
    fn on_call_complete(&self, report: &CallReport) {
        self.registry.record_report(report);
    }
}
