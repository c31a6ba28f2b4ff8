// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A clock that only moves when told to.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use keystone_core::Clock;

pub struct ManualClock {
    base: Instant,
    state: Mutex<(Duration, i64)>,
}

impl ManualClock {
    /// Starts at 2023-11-14T22:13:20Z.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            state: Mutex::new((Duration::ZERO, 1_700_000_000)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap();
        state.0 += by;
        state.1 += by.as_secs() as i64;
    }

    pub fn set_unix(&self, unix: i64) {
        self.state.lock().unwrap().1 = unix;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.state.lock().unwrap().0
    }

    fn unix_now(&self) -> i64 {
        self.state.lock().unwrap().1
    }
}
