//! Glitch-free propagation queue.
//!
//! Every source emission runs inside a propagation. Combinators do not emit
//! while a propagation is in progress; they enqueue a flush tagged with their
//! depth in the graph. When the outermost propagation finishes, flushes run in
//! ascending `(depth, sequence)` order, so a combinator only emits after every
//! shallower node it can depend on has settled, and at most once per event.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

/// Lazily evaluated graph depth of a stream.
///
/// Dynamic because `flat_map_latest` adopts the depth of whichever inner
/// stream it is currently following.
pub(crate) type Depth = Rc<dyn Fn() -> usize>;

pub(crate) fn fixed_depth(depth: usize) -> Depth {
    Rc::new(move || depth)
}

/// Depth one below the deepest of `inputs`.
pub(crate) fn deeper(inputs: Vec<Depth>) -> Depth {
    Rc::new(move || inputs.iter().map(|d| d()).max().unwrap_or(0) + 1)
}

/// Depth of the deepest of `inputs`.
pub(crate) fn deepest(inputs: Vec<Depth>) -> Depth {
    Rc::new(move || inputs.iter().map(|d| d()).max().unwrap_or(0))
}

struct Scheduled {
    depth: usize,
    sequence: u64,
    flush: Box<dyn FnOnce()>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.sequence == other.sequence
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed: BinaryHeap is a max-heap and we pop the shallowest, oldest entry.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.depth, other.sequence).cmp(&(self.depth, self.sequence))
    }
}

#[derive(Default)]
struct Queue {
    nesting: usize,
    sequence: u64,
    pending: BinaryHeap<Scheduled>,
}

thread_local! {
    static QUEUE: RefCell<Queue> = RefCell::new(Queue::default());
}

/// Decrements the nesting counter even if the propagation body panics.
struct NestingGuard;

impl Drop for NestingGuard {
    fn drop(&mut self) {
        QUEUE.with(|q| q.borrow_mut().nesting -= 1);
    }
}

/// Run `body` as one propagation.
///
/// Nested calls join the enclosing propagation. When the outermost call's
/// body returns, every deferred combinator flush is drained before returning.
/// Subjects and [`Stream::subscribe`](crate::Stream::subscribe) call this
/// themselves; call it directly to coalesce several source events into one.
pub fn propagate<R>(body: impl FnOnce() -> R) -> R {
    let outermost = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        q.nesting += 1;
        q.nesting == 1
    });
    let _guard = NestingGuard;

    let result = body();
    if outermost {
        drain();
    }
    result
}

/// Defer `flush` to the end of the current propagation.
pub(crate) fn schedule(depth: usize, flush: impl FnOnce() + 'static) {
    let flush: Box<dyn FnOnce()> = Box::new(flush);
    let idle = QUEUE.with(|q| q.borrow().nesting == 0);
    if idle {
        propagate(move || enqueue(depth, flush));
    } else {
        enqueue(depth, flush);
    }
}

fn enqueue(depth: usize, flush: Box<dyn FnOnce()>) {
    QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        q.sequence += 1;
        let sequence = q.sequence;
        q.pending.push(Scheduled {
            depth,
            sequence,
            flush,
        });
    });
}

fn drain() {
    loop {
        let next = QUEUE.with(|q| q.borrow_mut().pending.pop());
        match next {
            Some(scheduled) => (scheduled.flush)(),
            None => break,
        }
    }
}
