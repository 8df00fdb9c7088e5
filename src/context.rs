//! Per-request state threaded through the middleware chain.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::auth::Claims;

/// Values recorded about one request.
///
/// The dispatcher creates exactly one per request. The errors middleware
/// records the final status; the logger reads it after the inner chain
/// returns. Layers of the same request share it through an `Arc`; it never
/// crosses into another request.
#[derive(Debug)]
pub struct Values {
    trace_id: String,
    start: Instant,
    status: AtomicU16,
    integrity_failure: OnceLock<String>,
}

impl Values {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            start: Instant::now(),
            status: AtomicU16::new(0),
            integrity_failure: OnceLock::new(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Status of the response written for this request, or `None` if no
    /// response has been recorded yet.
    pub fn status(&self) -> Option<u16> {
        match self.status.load(Ordering::Acquire) {
            0 => None,
            code => Some(code),
        }
    }

    pub fn record_status(&self, code: u16) {
        self.status.store(code, Ordering::Release);
    }

    /// Marks the request as having hit an integrity error. The dispatcher
    /// checks this once the chain returns and asks the process to drain.
    /// Only the first detail is kept.
    pub fn flag_integrity_failure(&self, detail: impl Into<String>) {
        let _ = self.integrity_failure.set(detail.into());
    }

    pub fn integrity_failure(&self) -> Option<&str> {
        self.integrity_failure.get().map(String::as_str)
    }
}

/// The request-scoped context: shared values plus the caller's claims once
/// authenticated.
#[derive(Debug, Clone)]
pub struct Context {
    pub(crate) values: Arc<Values>,
    pub(crate) claims: Option<Claims>,
}

impl Context {
    pub(crate) fn new(values: Arc<Values>) -> Self {
        Self { values, claims: None }
    }

    pub fn values(&self) -> &Arc<Values> {
        &self.values
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }
}
