//! Singly-linked adjacency
//!
//! A node points at its successor through a `Weak`, so the chain never
//! owns memory and cannot form a cycle. The link still counts as one
//! logical holder of the successor: whoever links must `add_ref` first,
//! and replacing or releasing the link gives that reference back.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::RefCounted;

pub struct SllNode<T> {
    next: RwLock<Option<Weak<T>>>,
}

impl<T: RefCounted> SllNode<T> {
    pub fn new() -> Self {
        Self {
            next: RwLock::new(None),
        }
    }

    /// Link `next`, releasing the reference held on the previous successor.
    /// The caller has already taken the reference for the new link.
    pub fn set_next(&self, next: Option<Arc<T>>) {
        let old = {
            let mut guard = self.next.write();
            std::mem::replace(&mut *guard, next.as_ref().map(Arc::downgrade))
        };
        if let Some(old) = old.and_then(|w| w.upgrade()) {
            old.unref();
        }
    }

    /// Successor without taking a reference
    pub fn get_next(&self) -> Option<Arc<T>> {
        self.next.read().as_ref().and_then(Weak::upgrade)
    }

    /// Detach the successor without releasing its reference, so the link
    /// can be handed to another node
    pub fn take_next(&self) -> Option<Arc<T>> {
        self.next.write().take().and_then(|w| w.upgrade())
    }

    pub fn release_next(&self) {
        if let Some(next) = self.take_next() {
            next.unref();
        }
    }

    pub fn has_next(&self) -> bool {
        self.next.read().is_some()
    }
}

impl<T: RefCounted> Default for SllNode<T> {
    fn default() -> Self {
        Self::new()
    }
}
