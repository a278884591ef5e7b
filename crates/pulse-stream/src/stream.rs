//! The core [`Stream`] type.

use std::rc::Rc;

use crate::propagation::{Depth, fixed_depth, propagate};
use crate::{Observer, StreamError, Subscription};

type Producer<T> = Rc<dyn Fn(Observer<T>) -> Subscription>;

/// A cold, push-based stream of `T`.
///
/// Cloning a stream clones the recipe, not a running instance: each
/// [`subscribe`](Self::subscribe) runs the producer again.
pub struct Stream<T> {
    producer: Producer<T>,
    depth: Depth,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
            depth: Rc::clone(&self.depth),
        }
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Stream driven by `producer`, which receives the subscriber's observer
    /// and returns the subscription that cancels its work.
    pub fn new(producer: impl Fn(Observer<T>) -> Subscription + 'static) -> Self {
        Self::with_depth(producer, fixed_depth(0))
    }

    pub(crate) fn with_depth(
        producer: impl Fn(Observer<T>) -> Subscription + 'static,
        depth: Depth,
    ) -> Self {
        Self {
            producer: Rc::new(producer),
            depth,
        }
    }

    /// One-shot stream: emits `value` and completes.
    pub fn of(value: T) -> Self {
        Self::new(move |observer| {
            observer.next(value.clone());
            observer.complete();
            Subscription::new()
        })
    }

    /// Completes immediately without emitting.
    pub fn empty() -> Self {
        Self::new(|observer| {
            observer.complete();
            Subscription::new()
        })
    }

    /// Never emits and never terminates.
    pub fn never() -> Self {
        Self::new(|_| Subscription::new())
    }

    /// Fails immediately with `err`.
    pub fn fail(err: StreamError) -> Self {
        Self::new(move |observer| {
            observer.error(err.clone());
            Subscription::new()
        })
    }

    /// Build the actual stream lazily, once per subscription.
    pub fn defer(factory: impl Fn() -> Stream<T> + 'static) -> Self {
        Self::new(move |observer| factory().subscribe(observer))
    }

    /// Depth of this stream in the dataflow graph. Sources are at depth 0.
    pub fn depth(&self) -> usize {
        (self.depth)()
    }

    pub(crate) fn depth_fn(&self) -> Depth {
        Rc::clone(&self.depth)
    }

    /// Start the producer, delivering notifications to `observer`.
    ///
    /// Runs as one propagation: values replayed synchronously at subscribe
    /// time reach combinators as a single settled update.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let subscription = Subscription::new();
        let gated = observer.gated(subscription.clone());
        propagate(|| {
            let inner = (self.producer)(gated);
            subscription.add(inner);
        });
        subscription
    }

    /// Subscribe with a value handler only. Errors are logged and dropped.
    pub fn subscribe_next(&self, on_next: impl Fn(T) + 'static) -> Subscription {
        self.subscribe(Observer::from_next(on_next))
    }
}
