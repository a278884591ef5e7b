//! Paints one frame per settled change of renderer, scene, or camera.

use std::cell::Cell;
use std::rc::Rc;

use pulse_scene::{Camera, SceneNode};
use pulse_stream::{Observer, Owned, Stream, Subscription, combine_latest3};

use crate::render::{RenderBackend, Renderer};

/// A running render loop. Dropping it stops painting.
pub struct RenderLoop {
    subscription: Subscription,
    paints: Rc<Cell<u64>>,
}

impl RenderLoop {
    /// Subscribe to the latest renderer, scene, and camera and paint whenever
    /// any of them changes. Nothing is painted until all three have emitted.
    ///
    /// Paint failures are logged and the loop keeps running. A terminal error
    /// from upstream stops it.
    pub fn start<B: RenderBackend + 'static>(
        renderer: &Stream<Owned<Renderer<B>>>,
        scene: &Stream<SceneNode>,
        camera: &Stream<Owned<Camera>>,
    ) -> Self {
        let paints = Rc::new(Cell::new(0));
        let counter = Rc::clone(&paints);

        let subscription = combine_latest3(renderer, scene, camera).subscribe(Observer::new(
            move |(renderer, scene, camera): (Owned<Renderer<B>>, SceneNode, Owned<Camera>)| {
                let camera = camera.read();
                match renderer.update(|r| r.paint(&scene, &camera)) {
                    Ok(()) => {
                        counter.set(counter.get() + 1);
                        tracing::trace!(paints = counter.get(), "Painted");
                    }
                    Err(err) => tracing::warn!(error = %err, "Paint failed"),
                }
            },
            |err| tracing::error!(error = %err, "Render loop stopped"),
            || tracing::debug!("Render loop inputs completed"),
        ));

        tracing::debug!("Render loop started");
        Self {
            subscription,
            paints,
        }
    }

    /// Successful paints so far.
    pub fn paint_count(&self) -> u64 {
        self.paints.get()
    }

    pub fn is_running(&self) -> bool {
        !self.subscription.is_closed()
    }

    pub fn stop(&self) {
        if self.is_running() {
            self.subscription.unsubscribe();
            tracing::debug!(paints = self.paint_count(), "Render loop stopped");
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
