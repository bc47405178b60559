//! Cancellation context threaded through storage and execution calls.
//!
//! Every storage lookup and every plan execution takes a [`Context`] as its
//! first parameter; there is no global cancellation state. Cloning a context
//! is cheap and all clones observe the same cancellation flag, so a caller
//! can hand one clone to a producer thread and keep another to cancel it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::utils::error::{Error, Result};

/// A cancellation context.
///
/// Contexts are created with [`Context::new`] (never canceled unless asked)
/// or [`Context::with_timeout`]. Producers are expected to call
/// [`Context::check`] between units of work and bail out with
/// [`Error::Canceled`] once it fails.
#[derive(Clone, Debug, Default)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    canceled: AtomicBool,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context that is never canceled implicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that cancels itself after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                canceled: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    /// Cancels the context. All clones observe the cancellation.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::SeqCst);
    }

    /// Returns true once the context is canceled or past its deadline.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        if self.inner.canceled.load(Ordering::SeqCst) {
            return true;
        }
        match self.inner.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Returns `Err(Error::Canceled)` once the context is canceled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Canceled`] if the context was canceled or its
    /// deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }
}
