// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metrics sinks implementing [`MetricsService`].

use std::sync::Arc;
use std::time::Duration;

use keystone_core::MetricsService;
use keystone_core::types::Label;

/// Forwards every metric to the metrics-rs facade.
///
/// Keys are joined with `_` under the configured prefix, so
/// `["datastore", "fetch_bundle"]` becomes `keystone_datastore_fetch_bundle`.
#[derive(Debug, Clone)]
pub struct FacadeMetrics {
    prefix: String,
}

impl FacadeMetrics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The metric name for a key.
    pub fn metric_name(&self, key: &[&str]) -> String {
        std::iter::once(self.prefix.as_str())
            .chain(key.iter().copied())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl Default for FacadeMetrics {
    fn default() -> Self {
        Self::new("keystone")
    }
}

fn facade_labels(labels: &[Label]) -> Vec<metrics::Label> {
    labels
        .iter()
        .map(|l| metrics::Label::new(l.name.clone(), l.value.clone()))
        .collect()
}

impl MetricsService for FacadeMetrics {
    fn incr_counter(&self, key: &[&str], value: u64, labels: &[Label]) {
        metrics::counter!(self.metric_name(key), facade_labels(labels)).increment(value);
    }

    fn add_sample(&self, key: &[&str], elapsed: Duration, labels: &[Label]) {
        metrics::histogram!(self.metric_name(key), facade_labels(labels))
            .record(elapsed.as_secs_f64());
    }

    fn set_gauge(&self, key: &[&str], value: f64, labels: &[Label]) {
        metrics::gauge!(self.metric_name(key), facade_labels(labels)).set(value);
    }
}

/// Discards every metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackholeMetrics;

impl MetricsService for BlackholeMetrics {
    fn incr_counter(&self, _key: &[&str], _value: u64, _labels: &[Label]) {}
    fn add_sample(&self, _key: &[&str], _elapsed: Duration, _labels: &[Label]) {}
    fn set_gauge(&self, _key: &[&str], _value: f64, _labels: &[Label]) {}
}

/// The metrics host service handed to plugins.
///
/// Plugin-emitted keys are nested under `plugin` so they cannot collide with
/// the server's own metrics.
#[derive(Clone)]
pub struct PluginMetrics {
    inner: Arc<dyn MetricsService>,
}

impl PluginMetrics {
    pub fn new(inner: Arc<dyn MetricsService>) -> Self {
        Self { inner }
    }

    fn scoped<'a>(key: &[&'a str]) -> Vec<&'a str> {
        std::iter::once("plugin").chain(key.iter().copied()).collect()
    }
}

impl MetricsService for PluginMetrics {
    fn incr_counter(&self, key: &[&str], value: u64, labels: &[Label]) {
        self.inner.incr_counter(&Self::scoped(key), value, labels);
    }

    fn add_sample(&self, key: &[&str], elapsed: Duration, labels: &[Label]) {
        self.inner.add_sample(&Self::scoped(key), elapsed, labels);
    }

    fn set_gauge(&self, key: &[&str], value: f64, labels: &[Label]) {
        self.inner.set_gauge(&Self::scoped(key), value, labels);
    }
}
