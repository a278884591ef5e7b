//! Hot multicast sources.
//!
//! - [`Subject`]: forwards pushed values to current subscribers only.
//! - [`ReplaySubject`]: additionally replays the latest value on subscribe.
//! - [`OneShot`]: settles once with a value or an error and replays the
//!   outcome to every later subscriber.
//!
//! Every push runs as its own propagation.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::propagation::propagate;
use crate::{Observer, Stream, StreamError, Subscription};

#[derive(Clone)]
enum Terminal {
    Completed,
    Failed(StreamError),
}

struct Core<T> {
    observers: RefCell<Vec<(u64, Observer<T>)>>,
    next_id: Cell<u64>,
    latest: RefCell<Option<T>>,
    replay: bool,
    terminal: RefCell<Option<Terminal>>,
}

impl<T: Clone + 'static> Core<T> {
    fn new(replay: bool, seed: Option<T>) -> Rc<Self> {
        Rc::new(Self {
            observers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            latest: RefCell::new(seed),
            replay,
            terminal: RefCell::new(None),
        })
    }

    fn snapshot(&self) -> Vec<Observer<T>> {
        self.observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect()
    }

    fn is_terminated(&self) -> bool {
        self.terminal.borrow().is_some()
    }

    fn emit(&self, value: T) {
        if self.is_terminated() {
            return;
        }
        if self.replay {
            *self.latest.borrow_mut() = Some(value.clone());
        }
        let observers = self.snapshot();
        propagate(|| {
            for observer in observers {
                observer.next(value.clone());
            }
        });
    }

    fn finish(&self, terminal: Terminal) {
        if self.is_terminated() {
            return;
        }
        *self.terminal.borrow_mut() = Some(terminal.clone());
        let observers: Vec<Observer<T>> = self
            .observers
            .borrow_mut()
            .drain(..)
            .map(|(_, observer)| observer)
            .collect();
        propagate(|| {
            for observer in observers {
                deliver(&observer, &terminal);
            }
        });
    }

    fn stream(self: &Rc<Self>) -> Stream<T> {
        let core = Rc::clone(self);
        Stream::new(move |observer| {
            let replayed = if core.replay {
                core.latest.borrow().clone()
            } else {
                None
            };
            if let Some(value) = replayed {
                observer.next(value);
            }

            let terminal = core.terminal.borrow().clone();
            if let Some(terminal) = terminal {
                deliver(&observer, &terminal);
                return Subscription::new();
            }

            let id = core.next_id.get();
            core.next_id.set(id + 1);
            core.observers.borrow_mut().push((id, observer));

            let subscription = Subscription::new();
            let weak: Weak<Core<T>> = Rc::downgrade(&core);
            subscription.add_teardown(move || {
                if let Some(core) = weak.upgrade() {
                    core.observers.borrow_mut().retain(|(i, _)| *i != id);
                }
            });
            subscription
        })
    }
}

fn deliver<T: 'static>(observer: &Observer<T>, terminal: &Terminal) {
    match terminal {
        Terminal::Completed => observer.complete(),
        Terminal::Failed(err) => observer.error(err.clone()),
    }
}

/// Hot source without replay: subscribers see only values pushed after they
/// subscribed.
pub struct Subject<T> {
    core: Rc<Core<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            core: Core::new(false, None),
        }
    }

    /// Push a value to every current subscriber.
    pub fn next(&self, value: T) {
        self.core.emit(value);
    }

    /// Terminate successfully. Later pushes are ignored.
    pub fn complete(&self) {
        self.core.finish(Terminal::Completed);
    }

    /// Terminate with `err`. Later pushes are ignored.
    pub fn error(&self, err: StreamError) {
        self.core.finish(Terminal::Failed(err));
    }

    pub fn stream(&self) -> Stream<T> {
        self.core.stream()
    }

    /// Number of live subscribers.
    pub fn observer_count(&self) -> usize {
        self.core.observers.borrow().len()
    }
}

/// Hot source with latest-value semantics: new subscribers immediately
/// receive the most recent value, if there is one.
pub struct ReplaySubject<T> {
    core: Rc<Core<T>>,
}

impl<T> Clone for ReplaySubject<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> Default for ReplaySubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ReplaySubject<T> {
    /// Subject with no current value until the first push.
    pub fn new() -> Self {
        Self {
            core: Core::new(true, None),
        }
    }

    /// Subject whose current value starts as `seed`.
    pub fn seeded(seed: T) -> Self {
        Self {
            core: Core::new(true, Some(seed)),
        }
    }

    pub fn next(&self, value: T) {
        self.core.emit(value);
    }

    pub fn complete(&self) {
        self.core.finish(Terminal::Completed);
    }

    pub fn error(&self, err: StreamError) {
        self.core.finish(Terminal::Failed(err));
    }

    /// The value a new subscriber would receive first.
    pub fn latest(&self) -> Option<T> {
        self.core.latest.borrow().clone()
    }

    pub fn stream(&self) -> Stream<T> {
        self.core.stream()
    }

    pub fn observer_count(&self) -> usize {
        self.core.observers.borrow().len()
    }
}

/// Source that settles exactly once.
///
/// [`resolve`](Self::resolve) emits the value and completes;
/// [`fail`](Self::fail) errors. Both are ignored after the first settlement.
/// Subscribers arriving later get the recorded outcome immediately.
pub struct OneShot<T> {
    core: Rc<Core<T>>,
}

impl<T> Clone for OneShot<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> OneShot<T> {
    pub fn new() -> Self {
        Self {
            core: Core::new(true, None),
        }
    }

    /// Settle with `value`. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        if self.is_settled() {
            return false;
        }
        propagate(|| {
            self.core.emit(value);
            self.core.finish(Terminal::Completed);
        });
        true
    }

    /// Settle with `err`. Returns `false` if already settled.
    pub fn fail(&self, err: StreamError) -> bool {
        if self.is_settled() {
            return false;
        }
        self.core.finish(Terminal::Failed(err));
        true
    }

    /// Settle from a `Result`, naming the source in the error.
    pub fn settle<E: std::fmt::Display>(&self, origin: &str, result: Result<T, E>) -> bool {
        match result {
            Ok(value) => self.resolve(value),
            Err(err) => self.fail(StreamError::source_failed(origin, err)),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.core.is_terminated()
    }

    pub fn stream(&self) -> Stream<T> {
        self.core.stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<String>>>, Observer<T>)
    where
        T: std::fmt::Debug,
    {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let observer = Observer::new(
            move |v: T| a.borrow_mut().push(format!("next {v:?}")),
            move |e| b.borrow_mut().push(format!("error {e}")),
            move || c.borrow_mut().push("complete".to_string()),
        );
        (log, observer)
    }

    #[test]
    fn test_subject_does_not_replay() {
        let subject = Subject::new();
        subject.next(1);
        let (log, observer) = recorder::<i32>();
        subject.stream().subscribe(observer);
        subject.next(2);
        assert_eq!(*log.borrow(), vec!["next 2"]);
    }

    #[test]
    fn test_replay_subject_replays_latest_only() {
        let subject = ReplaySubject::new();
        let (early, observer) = recorder::<i32>();
        subject.stream().subscribe(observer);
        assert!(early.borrow().is_empty(), "nothing before first value");

        subject.next(1);
        subject.next(2);
        let (late, observer) = recorder::<i32>();
        subject.stream().subscribe(observer);
        assert_eq!(*late.borrow(), vec!["next 2"]);
        assert_eq!(subject.latest(), Some(2));
    }

    #[test]
    fn test_seeded_replay_subject() {
        let subject = ReplaySubject::seeded("seed");
        let (log, observer) = recorder::<&str>();
        subject.stream().subscribe(observer);
        assert_eq!(*log.borrow(), vec!["next \"seed\""]);
    }

    #[test]
    fn test_one_shot_replays_outcome_to_late_subscriber() {
        let shot = OneShot::new();
        assert!(shot.resolve(3));
        assert!(!shot.resolve(4), "second resolution ignored");
        let (log, observer) = recorder::<i32>();
        shot.stream().subscribe(observer);
        assert_eq!(*log.borrow(), vec!["next 3", "complete"]);
    }

    #[test]
    fn test_one_shot_failure() {
        let shot = OneShot::<i32>::new();
        let (log, observer) = recorder::<i32>();
        shot.stream().subscribe(observer);
        assert!(shot.settle("loader", Err::<i32, _>("missing file")));
        assert_eq!(*log.borrow(), vec!["error loader failed: missing file"]);
        assert!(shot.is_settled());
    }

    #[test]
    fn test_complete_releases_observers() {
        let subject = Subject::<u8>::new();
        let (log, observer) = recorder::<u8>();
        subject.stream().subscribe(observer);
        subject.complete();
        subject.next(1);
        assert_eq!(*log.borrow(), vec!["complete"]);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_reentrant_push_from_observer() {
        let subject = Subject::new();
        let echo = subject.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        subject.stream().subscribe_next(move |v: u32| {
            s.borrow_mut().push(v);
            if v < 3 {
                echo.next(v + 1);
            }
        });
        subject.next(1);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }
}
