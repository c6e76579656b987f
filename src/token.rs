//! Per-cycle correlation tokens and the contexts that carry them.
//!
//! Every fetch cycle runs under a `TokenContext`: a fresh v4 UUID attached to
//! a cancellable, deadline-aware `Context` derived from the caller's. The
//! token is passed by reference to the mapper, readers and recorders so their
//! log lines can be tied back to one cycle. It is never used for locking.

use std::cmp;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Arc<Inner>>,
}

impl Inner {
    fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match self.parent {
            Some(ref p) => p.is_cancelled(),
            None => false,
        }
    }
}

/// A cancellable execution context with an optional deadline.
///
/// Clones share cancellation state. Children derived with `with_deadline`
/// or `with_timeout` observe their ancestors' cancellation but cancelling a
/// child leaves the parent untouched.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// The root context: no deadline, never done until cancelled.
    pub fn background() -> Context {
        Context {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: None,
                parent: None,
            }),
        }
    }

    fn child(&self, deadline: Option<Instant>) -> Context {
        let deadline = match (self.inner.deadline, deadline) {
            (Some(a), Some(b)) => Some(cmp::min(a, b)),
            (a, b) => a.or(b),
        };
        Context {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: deadline,
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// Derive a child that is done at `deadline` or at the parent's deadline,
    /// whichever comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Context {
        self.child(Some(deadline))
    }

    /// Derive a child that is done `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Context {
        self.child(Some(Instant::now() + timeout))
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// True once the context, or an ancestor, is cancelled or past its
    /// deadline.
    pub fn is_done(&self) -> bool {
        if self.inner.is_cancelled() {
            return true;
        }
        match self.inner.deadline {
            Some(d) => Instant::now() >= d,
            None => false,
        }
    }
}

/// A `Context` carrying the correlation token of one fetch cycle.
///
/// The identifier is part of the type, so there is no such thing as asking a
/// token context for a token it does not have.
#[derive(Debug, Clone)]
pub struct TokenContext {
    ctx: Context,
    id: Uuid,
}

impl TokenContext {
    /// Derive a new context from `parent` and tag it with a fresh random
    /// 128-bit identifier.
    pub fn new(parent: &Context) -> TokenContext {
        TokenContext {
            ctx: parent.child(None),
            id: Uuid::new_v4(),
        }
    }

    /// The cycle's identifier.
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// The underlying execution context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Shorthand for `self.context().is_done()`.
    pub fn is_done(&self) -> bool {
        self.ctx.is_done()
    }
}

impl fmt::Display for TokenContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id.hyphenated())
    }
}
