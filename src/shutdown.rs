//! Process-level shutdown requests.
//!
//! A [`Shutdown`] handle is created by `main`, given to the [`App`](crate::App)
//! at construction and observed by the [`Server`](crate::Server). Writers are
//! the OS-signal listener inside the server and the dispatcher when a request
//! ends in an integrity error; the first reason written wins and later
//! requests are ignored. Any number of clones may wait on it.

use std::sync::Arc;

use tokio::sync::watch;

/// Why the process is draining.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShutdownReason {
    /// SIGTERM or Ctrl-C.
    Signal,
    /// A handler reported an integrity error; the detail is kept for the exit
    /// message.
    Integrity(String),
}

/// Cloneable shutdown handle.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Records `reason` unless a shutdown was already requested. Returns
    /// whether this call was the one that triggered it.
    pub fn request(&self, reason: ShutdownReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.tx.borrow().clone()
    }

    /// Resolves once a shutdown has been requested.
    pub async fn requested(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        // `self` keeps the sender alive, so waiting cannot fail.
        let reason = rx.wait_for(Option::is_some).await.ok().and_then(|r| r.clone());
        reason.unwrap_or(ShutdownReason::Signal)
    }
}

impl Default for Shutdown {
    fn default() -> Self { Self::new() }
}
