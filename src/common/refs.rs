//! Reference counting
//!
//! Logical ownership for storage entities. Memory is still managed by
//! `Arc`; the count decides when an entity releases what it holds.
//!
//! Callers that keep a handle beyond their own stack frame take a strong
//! reference (`add_ref`) and pair it with exactly one `unref`. Callers that
//! only inspect take no reference.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::Mutex;

/// Callback registered to run once when the count reaches zero
pub type ZeroCallback = Box<dyn FnOnce() + Send>;

/// Atomic reference counter with a run-once zero transition
pub struct RefHelper {
    refs: AtomicI64,
    zeroed: AtomicBool,
    on_zero: Mutex<Option<ZeroCallback>>,
}

impl RefHelper {
    pub fn new() -> Self {
        Self {
            refs: AtomicI64::new(0),
            zeroed: AtomicBool::new(false),
            on_zero: Mutex::new(None),
        }
    }

    /// Increment and return the new count
    pub fn inc(&self) -> i64 {
        self.refs.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement; returns true exactly once, on the 1 -> 0 transition
    pub fn dec(&self) -> bool {
        let prev = self.refs.fetch_sub(1, Ordering::AcqRel);
        if prev <= 0 {
            tracing::error!(refs = prev, "unref on a released node");
            panic!("logic error: unref on a node with ref count {}", prev);
        }
        prev == 1 && !self.zeroed.swap(true, Ordering::AcqRel)
    }

    pub fn count(&self) -> i64 {
        self.refs.load(Ordering::Acquire)
    }

    /// True once the zero transition has happened
    pub fn is_released(&self) -> bool {
        self.zeroed.load(Ordering::Acquire)
    }

    /// Register a callback for the zero transition, replacing any earlier one
    pub fn set_on_zero(&self, callback: ZeroCallback) {
        *self.on_zero.lock() = Some(callback);
    }

    fn take_on_zero(&self) -> Option<ZeroCallback> {
        self.on_zero.lock().take()
    }
}

impl Default for RefHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RefHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefHelper")
            .field("refs", &self.count())
            .field("released", &self.is_released())
            .finish()
    }
}

/// An entity whose resources are released when its logical count hits zero
pub trait RefCounted {
    fn ref_helper(&self) -> &RefHelper;

    /// Release owned resources. Runs at most once.
    fn on_zero(&self) {}

    fn add_ref(&self) -> i64 {
        self.ref_helper().inc()
    }

    fn unref(&self) {
        let helper = self.ref_helper();
        if helper.dec() {
            self.on_zero();
            if let Some(callback) = helper.take_on_zero() {
                callback();
            }
        }
    }

    fn ref_count(&self) -> i64 {
        self.ref_helper().count()
    }
}
