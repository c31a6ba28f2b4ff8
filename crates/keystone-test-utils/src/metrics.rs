// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A metrics sink that remembers everything it is given.

use std::sync::Mutex;
use std::time::Duration;

use keystone_core::MetricsService;
use keystone_core::types::Label;

/// One recorded metric. `key` is the key parts joined with `.`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded<T> {
    pub key: String,
    pub value: T,
    pub labels: Vec<Label>,
}

impl<T> Recorded<T> {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    counters: Mutex<Vec<Recorded<u64>>>,
    samples: Mutex<Vec<Recorded<Duration>>>,
    gauges: Mutex<Vec<Recorded<f64>>>,
}

fn record<T>(key: &[&str], value: T, labels: &[Label]) -> Recorded<T> {
    Recorded {
        key: key.join("."),
        value,
        labels: labels.to_vec(),
    }
}

impl RecordingMetrics {
    pub fn counters(&self) -> Vec<Recorded<u64>> {
        self.counters.lock().unwrap().clone()
    }

    pub fn samples(&self) -> Vec<Recorded<Duration>> {
        self.samples.lock().unwrap().clone()
    }

    pub fn gauges(&self) -> Vec<Recorded<f64>> {
        self.gauges.lock().unwrap().clone()
    }

    /// Counters recorded under `key`.
    pub fn counters_named(&self, key: &str) -> Vec<Recorded<u64>> {
        self.counters()
            .into_iter()
            .filter(|c| c.key == key)
            .collect()
    }
}

impl MetricsService for RecordingMetrics {
    fn incr_counter(&self, key: &[&str], value: u64, labels: &[Label]) {
        self.counters.lock().unwrap().push(record(key, value, labels));
    }

    fn add_sample(&self, key: &[&str], elapsed: Duration, labels: &[Label]) {
        self.samples.lock().unwrap().push(record(key, elapsed, labels));
    }

    fn set_gauge(&self, key: &[&str], value: f64, labels: &[Label]) {
        self.gauges.lock().unwrap().push(record(key, value, labels));
    }
}
