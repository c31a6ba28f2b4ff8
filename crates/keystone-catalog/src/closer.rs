// SPDX-FileCopyrightText: 2026 Keystone Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composite release handle.

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use keystone_core::{KeystoneError, Plugin};

type Release = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), KeystoneError>> + Send>;

/// Ordered set of labelled release callbacks.
///
/// [`Closer::close`] runs the callbacks in reverse registration order. Every
/// callback runs even when an earlier one fails; the failures are returned
/// together as [`KeystoneError::Release`]. Closing again is a no-op.
pub struct Closer {
    releases: Mutex<Option<Vec<(String, Release)>>>,
}

impl Closer {
    pub fn new() -> Self {
        Self {
            releases: Mutex::new(Some(Vec::new())),
        }
    }

    fn pending(&mut self) -> &mut Vec<(String, Release)> {
        self.releases
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_or_insert_with(Vec::new)
    }

    /// Register a release callback.
    pub fn push<F, Fut>(&mut self, label: impl Into<String>, release: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), KeystoneError>> + Send + 'static,
    {
        self.pending()
            .push((label.into(), Box::new(move || Box::pin(release()))));
    }

    /// Register a plugin's `shutdown` as a release callback.
    pub fn push_shutdown<P>(&mut self, label: impl Into<String>, plugin: Arc<P>)
    where
        P: Plugin + ?Sized,
    {
        self.push(label, move || async move { plugin.shutdown().await });
    }

    /// Move every callback of `other` into this closer. They are released
    /// before anything already registered here.
    pub fn absorb(&mut self, mut other: Closer) {
        let absorbed = std::mem::take(other.pending());
        self.pending().extend(absorbed);
    }

    /// Number of callbacks not yet released.
    pub fn len(&self) -> usize {
        self.releases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release everything, newest first.
    pub async fn close(&self) -> Result<(), KeystoneError> {
        let releases = self
            .releases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(releases) = releases else {
            debug!("closer already released");
            return Ok(());
        };

        let mut failures = Vec::new();
        for (label, release) in releases.into_iter().rev() {
            match release().await {
                Ok(()) => debug!(resource = %label, "released"),
                Err(e) => {
                    warn!(resource = %label, error = %e, "release failed");
                    failures.push(format!("{label}: {e}"));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(KeystoneError::Release(failures))
        }
    }
}

impl Default for Closer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Closer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Closer")
            .field("pending", &self.len())
            .finish()
    }
}

impl Drop for Closer {
    fn drop(&mut self) {
        let pending = self.pending().len();
        if pending > 0 {
            warn!(pending, "closer dropped without being closed; resources leaked");
        }
    }
}
