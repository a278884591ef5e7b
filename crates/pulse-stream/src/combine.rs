//! Latest-value combinators.
//!
//! A combinator keeps the latest value of every input. Inputs write their
//! slot synchronously; the combined value is emitted from a deferred flush at
//! the end of the propagation, so several inputs changing for the same event
//! yield exactly one emission with all of them updated.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::propagation::{Depth, deeper, schedule};
use crate::{Observer, Stream, StreamError, Subscription};

type Snapshot<S, O> = Box<dyn Fn(&S) -> Option<O>>;

struct Combiner<S, O> {
    slots: RefCell<S>,
    snapshot: Snapshot<S, O>,
    observer: Observer<O>,
    depth: Depth,
    scheduled: Cell<bool>,
    remaining: Cell<usize>,
}

impl<S: 'static, O: Clone + 'static> Combiner<S, O> {
    fn new(
        slots: S,
        inputs: usize,
        snapshot: impl Fn(&S) -> Option<O> + 'static,
        observer: Observer<O>,
        depth: Depth,
    ) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(slots),
            snapshot: Box::new(snapshot),
            observer,
            depth,
            scheduled: Cell::new(false),
            remaining: Cell::new(inputs),
        })
    }

    /// Subscribe to `input`, storing its values with `write`.
    fn attach<T: Clone + 'static>(
        self: &Rc<Self>,
        input: &Stream<T>,
        write: impl Fn(&mut S, T) + 'static,
    ) -> Subscription {
        let seen = Rc::new(Cell::new(false));
        let on_value = Rc::clone(self);
        let on_error = Rc::clone(self);
        let on_complete = Rc::clone(self);
        let seen_value = Rc::clone(&seen);
        input.subscribe(Observer::new(
            move |value| {
                seen_value.set(true);
                write(&mut on_value.slots.borrow_mut(), value);
                on_value.mark_dirty();
            },
            move |err| on_error.fail(err),
            move || on_complete.input_completed(seen.get()),
        ))
    }

    fn mark_dirty(self: &Rc<Self>) {
        if self.scheduled.replace(true) {
            return;
        }
        let this = Rc::clone(self);
        schedule((self.depth)(), move || this.flush());
    }

    fn flush(&self) {
        self.scheduled.set(false);
        let combined = (self.snapshot)(&self.slots.borrow());
        if let Some(combined) = combined {
            self.observer.next(combined);
        }
    }

    fn fail(&self, err: StreamError) {
        self.observer.error(err);
    }

    fn input_completed(self: &Rc<Self>, had_value: bool) {
        self.remaining.set(self.remaining.get() - 1);
        if self.remaining.get() == 0 || !had_value {
            let this = Rc::clone(self);
            schedule((self.depth)(), move || this.observer.complete());
        }
    }
}

/// Latest pair of `a` and `b`, once both have produced a value.
pub fn combine_latest2<A, B>(a: &Stream<A>, b: &Stream<B>) -> Stream<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let (a, b) = (a.clone(), b.clone());
    let depth = deeper(vec![a.depth_fn(), b.depth_fn()]);
    let node_depth = Rc::clone(&depth);
    Stream::with_depth(
        move |observer| {
            let combiner = Combiner::new(
                (None::<A>, None::<B>),
                2,
                |(a, b)| Some((a.clone()?, b.clone()?)),
                observer,
                Rc::clone(&node_depth),
            );
            let subscription = Subscription::new();
            subscription.add(combiner.attach(&a, |s, v| s.0 = Some(v)));
            subscription.add(combiner.attach(&b, |s, v| s.1 = Some(v)));
            subscription
        },
        depth,
    )
}

/// Latest triple of `a`, `b` and `c`, once all three have produced a value.
pub fn combine_latest3<A, B, C>(a: &Stream<A>, b: &Stream<B>, c: &Stream<C>) -> Stream<(A, B, C)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    let (a, b, c) = (a.clone(), b.clone(), c.clone());
    let depth = deeper(vec![a.depth_fn(), b.depth_fn(), c.depth_fn()]);
    let node_depth = Rc::clone(&depth);
    Stream::with_depth(
        move |observer| {
            let combiner = Combiner::new(
                (None::<A>, None::<B>, None::<C>),
                3,
                |(a, b, c)| Some((a.clone()?, b.clone()?, c.clone()?)),
                observer,
                Rc::clone(&node_depth),
            );
            let subscription = Subscription::new();
            subscription.add(combiner.attach(&a, |s, v| s.0 = Some(v)));
            subscription.add(combiner.attach(&b, |s, v| s.1 = Some(v)));
            subscription.add(combiner.attach(&c, |s, v| s.2 = Some(v)));
            subscription
        },
        depth,
    )
}

/// Latest values of every input, in input order, once all have produced one.
///
/// With no inputs, emits a single empty vector and completes.
pub fn combine_latest_all<T: Clone + 'static>(inputs: Vec<Stream<T>>) -> Stream<Vec<T>> {
    if inputs.is_empty() {
        return Stream::of(Vec::new());
    }
    let depth = deeper(inputs.iter().map(Stream::depth_fn).collect());
    let node_depth = Rc::clone(&depth);
    Stream::with_depth(
        move |observer| {
            let combiner = Combiner::new(
                vec![None::<T>; inputs.len()],
                inputs.len(),
                |slots: &Vec<Option<T>>| slots.iter().cloned().collect::<Option<Vec<T>>>(),
                observer,
                Rc::clone(&node_depth),
            );
            let subscription = Subscription::new();
            for (index, input) in inputs.iter().enumerate() {
                subscription.add(combiner.attach(input, move |s, v| s[index] = Some(v)));
            }
            subscription
        },
        depth,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OneShot, ReplaySubject, Subject};

    #[test]
    fn test_waits_for_every_input() {
        let a = Subject::new();
        let b = Subject::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = combine_latest2(&a.stream(), &b.stream())
            .subscribe_next(move |pair| s.borrow_mut().push(pair));

        a.next(1);
        assert!(seen.borrow().is_empty(), "no partial tuples");
        b.next("x");
        a.next(2);
        assert_eq!(*seen.borrow(), vec![(1, "x"), (2, "x")]);
    }

    #[test]
    fn test_diamond_emits_once_per_event() {
        let source = Subject::new();
        let left = source.stream().map(|v: i32| v + 1);
        let right = source.stream().map(|v: i32| v * 2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = combine_latest2(&left, &right).subscribe_next(move |p| s.borrow_mut().push(p));

        source.next(1);
        source.next(5);
        // No (6, 2) glitch mixing the new left with the stale right.
        assert_eq!(*seen.borrow(), vec![(2, 2), (6, 10)]);
    }

    #[test]
    fn test_nested_combinators_flush_in_depth_order() {
        let source = ReplaySubject::seeded(1);
        let inner = combine_latest2(&source.stream(), &source.stream()).map(|(a, b)| a + b);
        let outer = combine_latest2(&inner, &source.stream());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = outer.subscribe_next(move |p| s.borrow_mut().push(p));

        source.next(10);
        assert_eq!(*seen.borrow(), vec![(2, 1), (20, 10)]);
    }

    #[test]
    fn test_subscribe_replays_coalesce() {
        let a = ReplaySubject::seeded(1);
        let b = ReplaySubject::seeded(2);
        let c = ReplaySubject::seeded(3);
        let count = Rc::new(Cell::new(0));
        let n = Rc::clone(&count);
        let _sub = combine_latest3(&a.stream(), &b.stream(), &c.stream()).subscribe_next(move |t| {
            assert_eq!(t, (1, 2, 3));
            n.set(n.get() + 1);
        });
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_completes_when_all_inputs_complete() {
        let a = OneShot::new();
        let b = OneShot::new();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        combine_latest2(&a.stream(), &b.stream()).subscribe(Observer::new(
            move |p| s.borrow_mut().push(p),
            |_| {},
            move || d.set(true),
        ));
        a.resolve(1);
        assert!(!done.get());
        b.resolve(2);
        assert_eq!(*seen.borrow(), vec![(1, 2)]);
        assert!(done.get());
    }

    #[test]
    fn test_completes_early_when_input_never_emits() {
        let a = Subject::<u8>::new();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        combine_latest2(&a.stream(), &Stream::<u8>::empty()).subscribe(Observer::new(
            |_| panic!("cannot emit"),
            |_| {},
            move || d.set(true),
        ));
        assert!(done.get());
        assert_eq!(a.observer_count(), 0);
    }

    #[test]
    fn test_error_tears_down_other_inputs() {
        let a = Subject::<u8>::new();
        let b = OneShot::<u8>::new();
        let failed = Rc::new(Cell::new(false));
        let f = Rc::clone(&failed);
        combine_latest2(&a.stream(), &b.stream()).subscribe(Observer::new(
            |_| {},
            move |_| f.set(true),
            || {},
        ));
        b.fail(StreamError::source_failed("b", "broken"));
        assert!(failed.get());
        assert_eq!(a.observer_count(), 0);
    }

    #[test]
    fn test_combine_all_preserves_input_order() {
        let inputs: Vec<Stream<u32>> = (0..4).map(Stream::of).collect();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        combine_latest_all(inputs).subscribe_next(move |v| s.borrow_mut().push(v));
        assert_eq!(*seen.borrow(), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_combine_all_empty_emits_once() {
        let count = Rc::new(Cell::new(0));
        let n = Rc::clone(&count);
        combine_latest_all(Vec::<Stream<u8>>::new()).subscribe_next(move |v| {
            assert!(v.is_empty());
            n.set(n.get() + 1);
        });
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_depth_is_one_below_deepest_input() {
        let source = Subject::<u8>::new();
        let once = combine_latest2(&source.stream(), &source.stream());
        let twice = combine_latest2(&once, &source.stream());
        assert_eq!(source.stream().depth(), 0);
        assert_eq!(once.depth(), 1);
        assert_eq!(twice.depth(), 2);
    }
}
