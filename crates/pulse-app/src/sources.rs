//! Source adapters: raw external events as push streams with an explicit
//! current-value policy.
//!
//! | Source | Before first event | On subscribe |
//! |---|---|---|
//! | [`ViewportSource`] | no value | latest size |
//! | [`ThresholdControl`] | control's initial value | current value × 5 |
//! | [`ClockSource`] | seeded at construction | latest time |

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use pulse_scene::Dimensions;
use pulse_stream::{ReplaySubject, Stream, Subject};

/// A structural viewport notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    /// First layout.
    Load(Dimensions),
    Resize(Dimensions),
}

impl ViewportEvent {
    pub fn dimensions(&self) -> Dimensions {
        match self {
            ViewportEvent::Load(size) | ViewportEvent::Resize(size) => *size,
        }
    }
}

/// Viewport size, replayed to late subscribers once the first layout has
/// happened.
#[derive(Clone, Default)]
pub struct ViewportSource {
    sizes: ReplaySubject<Dimensions>,
}

impl ViewportSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self, event: ViewportEvent) {
        tracing::debug!(?event, "Viewport event");
        self.sizes.next(event.dimensions());
    }

    pub fn load(&self, width: u32, height: u32) {
        self.dispatch(ViewportEvent::Load(Dimensions::new(width, height)));
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.dispatch(ViewportEvent::Resize(Dimensions::new(width, height)));
    }

    /// Latest size, `None` before the first layout.
    pub fn current(&self) -> Option<Dimensions> {
        self.sizes.latest()
    }

    /// Distinct viewport sizes.
    pub fn stream(&self) -> Stream<Dimensions> {
        self.sizes.stream().distinct_until_changed()
    }
}

/// Scale from control position to stress threshold.
pub const THRESHOLD_SCALE: f64 = 5.0;

/// A bounded `[0, 1]` control whose value drives the stress threshold.
#[derive(Clone)]
pub struct ThresholdControl {
    value: Rc<Cell<f64>>,
    input: Subject<f64>,
}

impl ThresholdControl {
    pub fn new(initial: f64) -> Self {
        Self {
            value: Rc::new(Cell::new(clamp_control(initial))),
            input: Subject::new(),
        }
    }

    /// Move the control. Out-of-range values are clamped like a range input.
    pub fn set(&self, control: f64) {
        let control = clamp_control(control);
        self.value.set(control);
        self.input.next(control);
    }

    /// Current control position.
    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// Threshold stream. Each subscriber first receives the control's value
    /// at subscribe time, then every input.
    pub fn stream(&self) -> Stream<f64> {
        let value = Rc::clone(&self.value);
        let input = self.input.stream();
        Stream::defer(move || input.start_with(value.get()).map(|v| v * THRESHOLD_SCALE))
    }
}

fn clamp_control(control: f64) -> f64 {
    if control.is_nan() {
        0.0
    } else {
        control.clamp(0.0, 1.0)
    }
}

/// Where the current time comes from.
pub trait TimeSource {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Cell::new(time),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.time.set(time);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.time.set(self.time.get() + by);
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time.get()
    }
}

/// Current time, read once at construction and then only on [`tick`].
///
/// [`tick`]: ClockSource::tick
#[derive(Clone)]
pub struct ClockSource {
    source: Rc<dyn TimeSource>,
    times: ReplaySubject<DateTime<Utc>>,
}

impl ClockSource {
    pub fn new(source: Rc<dyn TimeSource>) -> Self {
        let times = ReplaySubject::seeded(source.now());
        Self { source, times }
    }

    /// Re-read the time source and publish it.
    pub fn tick(&self) -> DateTime<Utc> {
        let now = self.source.now();
        tracing::trace!(%now, "Clock tick");
        self.times.next(now);
        now
    }

    /// Tick only if at least `interval` has passed on the time source since
    /// the last published time.
    pub fn tick_if_due(&self, interval: chrono::Duration) -> Option<DateTime<Utc>> {
        let due = match self.times.latest() {
            Some(last) => self.source.now() - last >= interval,
            None => true,
        };
        due.then(|| self.tick())
    }

    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.times.latest()
    }

    pub fn stream(&self) -> Stream<DateTime<Utc>> {
        self.times.stream()
    }
}
