// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-call counters and latency samples.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use keystone_core::types::Label;
use keystone_core::{KeystoneError, MetricsService};

/// Status label value for successful calls.
pub const STATUS_OK: &str = "OK";

/// Label naming the node attestor type handling a call.
pub const ATTESTOR_LABEL: &str = "attestor";

/// Label naming the caller of a call.
pub const CALLER_ID_LABEL: &str = "caller_id";

/// Caller ID recorded when the caller is not known.
pub const UNKNOWN: &str = "unknown";

/// Tracks one call into a subsystem.
///
/// On [`CallCounter::done`] it emits a counter at `[subsystem, method]` and a
/// latency sample at `[subsystem, method, "elapsed_seconds"]`, both labelled
/// with the call status.
pub struct CallCounter {
    metrics: Arc<dyn MetricsService>,
    subsystem: &'static str,
    method: &'static str,
    labels: Vec<Label>,
    started: Instant,
}

impl CallCounter {
    pub fn start(
        metrics: &Arc<dyn MetricsService>,
        subsystem: &'static str,
        method: &'static str,
    ) -> Self {
        Self {
            metrics: Arc::clone(metrics),
            subsystem,
            method,
            labels: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn add_label(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.labels.push(Label::new(name, value));
    }

    pub fn add_attestor_type(&mut self, attestor_type: &str) {
        self.add_label(ATTESTOR_LABEL, attestor_type);
    }

    /// Labels the caller, recording [`UNKNOWN`] for an empty ID.
    pub fn add_caller_id(&mut self, id: &str) {
        let id = if id.is_empty() { UNKNOWN } else { id };
        self.add_label(CALLER_ID_LABEL, id);
    }

    pub fn done<T>(mut self, result: &Result<T, KeystoneError>) {
        let status = match result {
            Ok(_) => STATUS_OK,
            Err(err) => err.code(),
        };
        self.labels.push(Label::new("status", status));

        self.metrics
            .incr_counter(&[self.subsystem, self.method], 1, &self.labels);
        self.metrics.add_sample(
            &[self.subsystem, self.method, "elapsed_seconds"],
            self.started.elapsed(),
            &self.labels,
        );
    }
}

/// Runs `call` under a [`CallCounter`] and passes its result through.
pub async fn observe<T, F>(
    metrics: &Arc<dyn MetricsService>,
    subsystem: &'static str,
    method: &'static str,
    call: F,
) -> Result<T, KeystoneError>
where
    F: Future<Output = Result<T, KeystoneError>>,
{
    let counter = CallCounter::start(metrics, subsystem, method);
    let result = call.await;
    counter.done(&result);
    result
}
