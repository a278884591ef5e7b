//! Observers and subscription handles.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::StreamError;

/// Receiver of a stream's notifications.
///
/// Cheap to clone; all clones share the same callbacks.
pub struct Observer<T> {
    on_next: Rc<dyn Fn(T)>,
    on_error: Rc<dyn Fn(StreamError)>,
    on_complete: Rc<dyn Fn()>,
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            on_next: Rc::clone(&self.on_next),
            on_error: Rc::clone(&self.on_error),
            on_complete: Rc::clone(&self.on_complete),
        }
    }
}

impl<T: 'static> Observer<T> {
    /// Observer with explicit handlers for all three notifications.
    pub fn new(
        on_next: impl Fn(T) + 'static,
        on_error: impl Fn(StreamError) + 'static,
        on_complete: impl Fn() + 'static,
    ) -> Self {
        Self {
            on_next: Rc::new(on_next),
            on_error: Rc::new(on_error),
            on_complete: Rc::new(on_complete),
        }
    }

    /// Observer that only handles values. Errors are logged and dropped.
    pub fn from_next(on_next: impl Fn(T) + 'static) -> Self {
        Self::new(
            on_next,
            |err| tracing::warn!("unhandled stream error: {err}"),
            || {},
        )
    }

    /// Deliver a value.
    pub fn next(&self, value: T) {
        (self.on_next)(value);
    }

    /// Deliver a terminal error.
    pub fn error(&self, err: StreamError) {
        (self.on_error)(err);
    }

    /// Deliver terminal completion.
    pub fn complete(&self) {
        (self.on_complete)();
    }

    /// Observer of another item type that hands values to `on_next` and
    /// forwards terminal notifications to `self`.
    pub fn relay<S: 'static>(&self, on_next: impl Fn(S) + 'static) -> Observer<S> {
        let on_error = Rc::clone(&self.on_error);
        let on_complete = Rc::clone(&self.on_complete);
        Observer {
            on_next: Rc::new(on_next),
            on_error,
            on_complete,
        }
    }

    /// Wrap this observer so it goes silent once `subscription` closes, and
    /// closes `subscription` on the first terminal notification.
    pub(crate) fn gated(self, subscription: Subscription) -> Observer<T> {
        let next_gate = subscription.clone();
        let error_gate = subscription.clone();
        let complete_gate = subscription;
        let Observer {
            on_next,
            on_error,
            on_complete,
        } = self;
        Observer::new(
            move |value| {
                if !next_gate.is_closed() {
                    on_next(value);
                }
            },
            move |err| {
                if !error_gate.is_closed() {
                    error_gate.unsubscribe();
                    on_error(err);
                }
            },
            move || {
                if !complete_gate.is_closed() {
                    complete_gate.unsubscribe();
                    on_complete();
                }
            },
        )
    }
}

#[derive(Default)]
struct SubscriptionInner {
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// Handle to an active subscription.
///
/// Dropping the handle does not cancel anything; call
/// [`unsubscribe`](Self::unsubscribe) to stop delivery and release upstream
/// resources.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    /// A fresh, open subscription with no teardown logic.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this subscription has been cancelled or has terminated.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Register `teardown` to run on unsubscribe. Runs immediately if the
    /// subscription is already closed.
    pub fn add_teardown(&self, teardown: impl FnOnce() + 'static) {
        if self.is_closed() {
            teardown();
        } else {
            self.inner.teardowns.borrow_mut().push(Box::new(teardown));
        }
    }

    /// Cancel `child` together with this subscription.
    pub fn add(&self, child: Subscription) {
        if Rc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        self.add_teardown(move || child.unsubscribe());
    }

    /// Stop delivery and run all teardown logic. Idempotent.
    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let teardowns = std::mem::take(&mut *self.inner.teardowns.borrow_mut());
        for teardown in teardowns {
            teardown();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}
