//! Keeping a container node in sync with time-varying children.
//!
//! [`compose`] is a full replace: on every combined update the container's
//! child list is swapped wholesale. There is no diffing, which is fine for a
//! handful of top-level children and would not be for large lists.

use pulse_stream::{Stream, combine_latest_all};

use crate::node::SceneNode;

/// Something that holds an ordered, replaceable list of children.
pub trait Container: Clone + 'static {
    type Child: Clone + 'static;

    /// Replace every child in one step.
    fn replace_children(&self, children: Vec<Self::Child>);
}

impl Container for SceneNode {
    type Child = SceneNode;

    fn replace_children(&self, children: Vec<SceneNode>) {
        SceneNode::replace_children(self, children);
    }
}

/// A child that is either fixed or changes over time.
#[derive(Clone)]
pub enum Child<T> {
    Constant(T),
    Stream(Stream<T>),
}

impl<T: Clone + 'static> Child<T> {
    pub fn constant(value: T) -> Self {
        Child::Constant(value)
    }

    pub fn stream(stream: Stream<T>) -> Self {
        Child::Stream(stream)
    }

    fn into_stream(self) -> Stream<T> {
        match self {
            Child::Constant(value) => Stream::of(value),
            Child::Stream(stream) => stream,
        }
    }
}

impl<T: Clone + 'static> From<Stream<T>> for Child<T> {
    fn from(stream: Stream<T>) -> Self {
        Child::Stream(stream)
    }
}

impl From<SceneNode> for Child<SceneNode> {
    fn from(node: SceneNode) -> Self {
        Child::Constant(node)
    }
}

/// Stream of `container`, re-emitted each time the latest combination of
/// `children` changes, with its child list replaced by that combination.
///
/// Nothing is emitted until every child has a value, so a subtree that is
/// still loading keeps the whole container off screen rather than showing a
/// placeholder. The replacement happens before the container is emitted.
pub fn compose<C: Container>(container: C, children: Vec<Child<C::Child>>) -> Stream<C> {
    let inputs = children.into_iter().map(Child::into_stream).collect();
    combine_latest_all(inputs).map(move |latest| {
        tracing::trace!(children = latest.len(), "recomposing container");
        container.replace_children(latest);
        container.clone()
    })
}
