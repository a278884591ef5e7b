//! Identity-preserving handle to long-lived mutable state.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// A long-lived value republished by reference.
///
/// One dataflow chain owns the value and mutates it through
/// [`update`](Self::update), typically via
/// [`Stream::scan_in_place`](crate::Stream::scan_in_place); everyone else
/// only [`read`](Self::read)s it. Clones share the same value, so identity is
/// stable across emissions.
pub struct Owned<S> {
    cell: Rc<RefCell<S>>,
}

impl<S> Clone for Owned<S> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<S> Owned<S> {
    /// Take ownership of `state`.
    pub fn new(state: S) -> Self {
        Self {
            cell: Rc::new(RefCell::new(state)),
        }
    }

    /// Read-only view of the current state.
    ///
    /// # Panics
    ///
    /// Panics if called while the state is being updated.
    pub fn read(&self) -> Ref<'_, S> {
        self.cell.borrow()
    }

    /// Mutate the state in place.
    ///
    /// # Panics
    ///
    /// Panics if the state is already borrowed.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.cell.borrow_mut())
    }

    /// Whether both handles refer to the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<S: fmt::Debug> fmt::Debug for Owned<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&*self.cell.borrow()).finish()
    }
}
