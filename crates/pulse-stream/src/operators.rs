//! Single-input operators.
//!
//! All of these run synchronously inside the upstream emission and keep the
//! upstream depth, except `merge` (deepest input) and `flat_map_latest`
//! (deepest of upstream and every inner stream currently followed).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::propagation::{Depth, deepest};
use crate::{Observer, Owned, Stream, StreamError, Subscription};

impl<T: Clone + 'static> Stream<T> {
    /// Transform every value with `f`.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Stream<U> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Stream::with_depth(
            move |observer: Observer<U>| {
                let f = Rc::clone(&f);
                let downstream = observer.clone();
                upstream.subscribe(observer.relay(move |value| downstream.next(f(value))))
            },
            self.depth_fn(),
        )
    }

    /// Forward only values for which `predicate` holds.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        let upstream = self.clone();
        let predicate = Rc::new(predicate);
        Stream::with_depth(
            move |observer: Observer<T>| {
                let predicate = Rc::clone(&predicate);
                let downstream = observer.clone();
                upstream.subscribe(observer.relay(move |value| {
                    if predicate(&value) {
                        downstream.next(value);
                    }
                }))
            },
            self.depth_fn(),
        )
    }

    /// Pure accumulation: emits `step(previous, value)` for every value,
    /// starting from `seed` on each subscription.
    pub fn scan<A: Clone + 'static>(
        &self,
        seed: A,
        step: impl Fn(A, T) -> A + 'static,
    ) -> Stream<A> {
        let upstream = self.clone();
        let step = Rc::new(step);
        Stream::with_depth(
            move |observer: Observer<A>| {
                let step = Rc::clone(&step);
                let acc = RefCell::new(seed.clone());
                let downstream = observer.clone();
                upstream.subscribe(observer.relay(move |value| {
                    let current = acc.borrow().clone();
                    let next = step(current, value);
                    *acc.borrow_mut() = next.clone();
                    downstream.next(next);
                }))
            },
            self.depth_fn(),
        )
    }

    /// Mutate `state` with `step` for every value and re-emit the same handle.
    ///
    /// The state is shared by every subscription of the returned stream; it
    /// is meant to be driven by a single chain.
    pub fn scan_in_place<S: 'static>(
        &self,
        state: Owned<S>,
        step: impl Fn(&mut S, T) + 'static,
    ) -> Stream<Owned<S>> {
        let upstream = self.clone();
        let step = Rc::new(step);
        Stream::with_depth(
            move |observer: Observer<Owned<S>>| {
                let step = Rc::clone(&step);
                let state = state.clone();
                let downstream = observer.clone();
                upstream.subscribe(observer.relay(move |value| {
                    state.update(|s| step(s, value));
                    downstream.next(state.clone());
                }))
            },
            self.depth_fn(),
        )
    }

    /// Emit `value` on subscription, then everything from upstream.
    pub fn start_with(&self, value: T) -> Stream<T> {
        let upstream = self.clone();
        Stream::with_depth(
            move |observer: Observer<T>| {
                observer.next(value.clone());
                upstream.subscribe(observer)
            },
            self.depth_fn(),
        )
    }

    /// Interleave values from `self` and `other`. Completes when both have.
    pub fn merge(&self, other: &Stream<T>) -> Stream<T> {
        let inputs = [self.clone(), other.clone()];
        let depth = deepest(inputs.iter().map(Stream::depth_fn).collect());
        Stream::with_depth(
            move |observer: Observer<T>| {
                let subscription = Subscription::new();
                let remaining = Rc::new(Cell::new(inputs.len()));
                for input in &inputs {
                    let downstream = observer.clone();
                    let failed = observer.clone();
                    let finished = observer.clone();
                    let remaining = Rc::clone(&remaining);
                    subscription.add(input.subscribe(Observer::new(
                        move |value| downstream.next(value),
                        move |err| failed.error(err),
                        move || {
                            remaining.set(remaining.get() - 1);
                            if remaining.get() == 0 {
                                finished.complete();
                            }
                        },
                    )));
                }
                subscription
            },
            depth,
        )
    }

    /// On error, continue with the stream produced by `recover`.
    pub fn catch_error(&self, recover: impl Fn(StreamError) -> Stream<T> + 'static) -> Stream<T> {
        let upstream = self.clone();
        let recover = Rc::new(recover);
        Stream::with_depth(
            move |observer: Observer<T>| {
                let subscription = Subscription::new();
                let recover = Rc::clone(&recover);
                let downstream = observer.clone();
                let finished = observer.clone();
                let fallback_owner = subscription.clone();
                subscription.add(upstream.subscribe(Observer::new(
                    move |value| downstream.next(value),
                    move |err| {
                        let fallback = recover(err);
                        fallback_owner.add(fallback.subscribe(observer.clone()));
                    },
                    move || finished.complete(),
                )));
                subscription
            },
            self.depth_fn(),
        )
    }

    /// Map each value to an inner stream and follow only the newest one.
    ///
    /// Switching unsubscribes the previous inner stream. Completes once
    /// upstream has completed and the current inner stream has too.
    pub fn flat_map_latest<U: Clone + 'static>(
        &self,
        f: impl Fn(T) -> Stream<U> + 'static,
    ) -> Stream<U> {
        let upstream = self.clone();
        let f = Rc::new(f);
        // Inner stream currently followed by each live subscription.
        let followed: Rc<RefCell<Vec<(u64, Depth)>>> = Rc::new(RefCell::new(Vec::new()));
        let next_id = Rc::new(Cell::new(0u64));
        let depth = {
            let upstream_depth = self.depth_fn();
            let followed = Rc::clone(&followed);
            Rc::new(move || {
                let inner: Vec<Depth> =
                    followed.borrow().iter().map(|(_, d)| Rc::clone(d)).collect();
                upstream_depth().max(deepest(inner)())
            })
        };

        Stream::with_depth(
            move |observer: Observer<U>| {
                let id = next_id.get();
                next_id.set(id + 1);
                let subscription = Subscription::new();
                let current: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
                let upstream_done = Rc::new(Cell::new(false));
                let inner_done = Rc::new(Cell::new(true));

                let on_next = {
                    let f = Rc::clone(&f);
                    let observer = observer.clone();
                    let current = Rc::clone(&current);
                    let upstream_done = Rc::clone(&upstream_done);
                    let inner_done = Rc::clone(&inner_done);
                    let followed = Rc::clone(&followed);
                    move |value: T| {
                        let previous = current.borrow_mut().take();
                        if let Some(previous) = previous {
                            previous.unsubscribe();
                        }

                        let inner = f(value);
                        {
                            let mut followed = followed.borrow_mut();
                            followed.retain(|(owner, _)| *owner != id);
                            followed.push((id, inner.depth_fn()));
                        }
                        inner_done.set(false);

                        let downstream = observer.clone();
                        let failed = observer.clone();
                        let finished = observer.clone();
                        let upstream_done = Rc::clone(&upstream_done);
                        let inner_done = Rc::clone(&inner_done);
                        let sub = inner.subscribe(Observer::new(
                            move |v| downstream.next(v),
                            move |err| failed.error(err),
                            move || {
                                inner_done.set(true);
                                if upstream_done.get() {
                                    finished.complete();
                                }
                            },
                        ));
                        *current.borrow_mut() = Some(sub);
                    }
                };

                let failed = observer.clone();
                let finished = observer.clone();
                let done = Rc::clone(&upstream_done);
                let idle = Rc::clone(&inner_done);
                subscription.add(upstream.subscribe(Observer::new(
                    on_next,
                    move |err| failed.error(err),
                    move || {
                        done.set(true);
                        if idle.get() {
                            finished.complete();
                        }
                    },
                )));

                let followed = Rc::clone(&followed);
                subscription.add_teardown(move || {
                    followed.borrow_mut().retain(|(owner, _)| *owner != id);
                    let inner = current.borrow_mut().take();
                    if let Some(inner) = inner {
                        inner.unsubscribe();
                    }
                });
                subscription
            },
            depth,
        )
    }
}

impl<T: Clone + PartialEq + 'static> Stream<T> {
    /// Drop values equal to the previously forwarded one.
    pub fn distinct_until_changed(&self) -> Stream<T> {
        let upstream = self.clone();
        Stream::with_depth(
            move |observer: Observer<T>| {
                let last: RefCell<Option<T>> = RefCell::new(None);
                let downstream = observer.clone();
                upstream.subscribe(observer.relay(move |value: T| {
                    if last.borrow().as_ref() == Some(&value) {
                        return;
                    }
                    *last.borrow_mut() = Some(value.clone());
                    downstream.next(value);
                }))
            },
            self.depth_fn(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OneShot, Subject};

    fn collect<T: Clone + 'static>(stream: &Stream<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let sub = stream.subscribe_next(move |v| s.borrow_mut().push(v));
        (seen, sub)
    }

    #[test]
    fn test_map_and_filter() {
        let subject = Subject::new();
        let (seen, _sub) = collect(&subject.stream().filter(|v| v % 2 == 0).map(|v| v * 10));
        for v in 1..=4 {
            subject.next(v);
        }
        assert_eq!(*seen.borrow(), vec![20, 40]);
    }

    #[test]
    fn test_scan_accumulates() {
        let subject = Subject::new();
        let (seen, _sub) = collect(&subject.stream().scan(0, |acc, v| acc + v));
        subject.next(1);
        subject.next(2);
        subject.next(3);
        assert_eq!(*seen.borrow(), vec![1, 3, 6]);
    }

    #[test]
    fn test_scan_in_place_preserves_identity() {
        let subject = Subject::new();
        let state = Owned::new(Vec::<u32>::new());
        let (seen, _sub) = collect(&subject.stream().scan_in_place(state.clone(), |s, v| s.push(v)));
        subject.next(4);
        subject.next(5);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|h| h.ptr_eq(&state)));
        assert_eq!(*state.read(), vec![4, 5]);
    }

    #[test]
    fn test_start_with_precedes_upstream() {
        let subject = Subject::new();
        let (seen, _sub) = collect(&subject.stream().start_with(0));
        subject.next(1);
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_distinct_until_changed() {
        let subject = Subject::new();
        let (seen, _sub) = collect(&subject.stream().distinct_until_changed());
        for v in [1, 1, 2, 2, 1] {
            subject.next(v);
        }
        assert_eq!(*seen.borrow(), vec![1, 2, 1]);
    }

    #[test]
    fn test_merge_completes_after_both() {
        let a = OneShot::new();
        let b = OneShot::new();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        a.stream().merge(&b.stream()).subscribe(Observer::new(
            move |v| s.borrow_mut().push(v),
            |_| {},
            move || d.set(true),
        ));
        a.resolve(1);
        assert!(!done.get());
        b.resolve(2);
        assert!(done.get());
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_catch_error_switches_to_fallback() {
        let source = OneShot::<u32>::new();
        let (seen, _sub) = collect(&source.stream().catch_error(|_| Stream::of(99)));
        source.fail(StreamError::source_failed("test", "gone"));
        assert_eq!(*seen.borrow(), vec![99]);
    }

    #[test]
    fn test_flat_map_latest_switches_and_drops_previous_inner() {
        let outer = Subject::new();
        let first = Subject::new();
        let second = Subject::new();
        let (f, s) = (first.clone(), second.clone());
        let switched = outer
            .stream()
            .flat_map_latest(move |which: u8| if which == 0 { f.stream() } else { s.stream() });
        let (seen, _sub) = collect(&switched);

        outer.next(0);
        first.next("a");
        outer.next(1);
        first.next("stale");
        second.next("b");

        assert_eq!(*seen.borrow(), vec!["a", "b"]);
        assert_eq!(first.observer_count(), 0);
    }

    #[test]
    fn test_flat_map_latest_completes_after_inner() {
        let outer = OneShot::new();
        let inner = OneShot::new();
        let i = inner.clone();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        outer
            .stream()
            .flat_map_latest(move |_: ()| i.stream())
            .subscribe(Observer::new(|_: u8| {}, |_| {}, move || d.set(true)));
        outer.resolve(());
        assert!(!done.get(), "inner still pending");
        inner.resolve(1);
        assert!(done.get());
    }

    #[test]
    fn test_flat_map_latest_depth_covers_every_subscription() {
        // First subscriber follows a combined stream, the second a plain one.
        let subscribers = Rc::new(Cell::new(0));
        let upstream = Stream::new(move |observer: Observer<bool>| {
            let first = subscribers.get() == 0;
            subscribers.set(subscribers.get() + 1);
            observer.next(first);
            Subscription::new()
        });
        let switched = upstream.flat_map_latest(|combined| {
            if combined {
                crate::combine_latest2(&Stream::of(1), &Stream::of(2)).map(|(a, b)| a + b)
            } else {
                Stream::of(7)
            }
        });
        assert_eq!(switched.depth(), 0);

        let (deep_seen, deep_sub) = collect(&switched);
        let (plain_seen, _plain_sub) = collect(&switched);
        assert_eq!(*deep_seen.borrow(), vec![3]);
        assert_eq!(*plain_seen.borrow(), vec![7]);
        assert_eq!(switched.depth(), 1);

        deep_sub.unsubscribe();
        assert_eq!(switched.depth(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let subject = Subject::new();
        let (seen, sub) = collect(&subject.stream().map(|v: u8| v));
        subject.next(1);
        sub.unsubscribe();
        subject.next(2);
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(subject.observer_count(), 0);
    }
}
