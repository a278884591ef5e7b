//! Single-threaded push streams for the globe dataflow.
//!
//! A [`Stream`] is a cold producer: every [`Stream::subscribe`] runs it anew.
//! Hot sources are exposed through the subjects in [`subject`]. Combinators
//! ([`combine_latest2`], [`combine_latest3`], [`combine_latest_all`]) never
//! emit mid-propagation; they are flushed shallowest-first once the triggering
//! event has settled, so downstream consumers never observe a half-updated
//! combination (see [`propagate`]).

mod combine;
mod error;
mod observer;
mod operators;
mod owned;
mod propagation;
mod stream;
pub mod subject;

pub use combine::{combine_latest_all, combine_latest2, combine_latest3};
pub use error::StreamError;
pub use observer::{Observer, Subscription};
pub use owned::Owned;
pub use propagation::propagate;
pub use stream::Stream;
pub use subject::{OneShot, ReplaySubject, Subject};
