//! The assembled globe: sources wired through the entity layers into one
//! scene, painted by the render loop.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use glam::Vec3;
use pulse_config::Config;
use pulse_entities::{
    Dataset, GlobeStyle, MarkerStyle, SunStyle, ambient_light, globe_layer, marker_layer,
    sun_layer,
};
use pulse_scene::{Camera, Child, SceneNode, compose};
use pulse_stream::{OneShot, Owned, StreamError};

use crate::camera_rig::CameraRig;
use crate::orbit::{OrbitController, OrbitSettings};
use crate::render::{FrameSummary, HeadlessBackend, RenderBackend, Renderer, renderer_stream};
use crate::render_loop::RenderLoop;
use crate::script::Command;
use crate::sources::{ClockSource, ThresholdControl, TimeSource, ViewportSource};
use crate::textures::{TextureLoader, TextureResult, TextureSet, TextureSlot};

/// Name of the scene root node.
pub const SCENE_NODE: &str = "scene";

/// How long a `wait` command blocks for outstanding textures.
pub const TEXTURE_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Globe, markers, and sun composed into one scene and kept on screen.
///
/// Inputs go through the source handles ([`viewport`](Self::viewport),
/// [`threshold`](Self::threshold), [`orbit`](Self::orbit),
/// [`clock`](Self::clock)) or through [`execute`](Self::execute). Every
/// settled change paints exactly one frame.
pub struct GlobeApp<B: RenderBackend + 'static> {
    viewport: ViewportSource,
    threshold: ThresholdControl,
    clock: ClockSource,
    orbit: OrbitController,
    textures: TextureSet,
    dataset: OneShot<Rc<Dataset>>,
    scene: SceneNode,
    renderer: Owned<Renderer<B>>,
    rig: CameraRig,
    render_loop: RenderLoop,
    loader: Option<TextureLoader>,
    retick: Option<chrono::Duration>,
}

impl<B: RenderBackend + 'static> GlobeApp<B> {
    pub fn new(config: &Config, backend: B, time: Rc<dyn TimeSource>) -> Self {
        let viewport = ViewportSource::new();
        let threshold = ThresholdControl::new(config.markers.threshold_control);
        let clock = ClockSource::new(time);
        let orbit = OrbitController::new(
            OrbitSettings {
                rotate_speed: config.input.rotate_speed,
                min_distance: config.input.min_distance,
                max_distance: config.input.max_distance,
                invert_y: config.input.invert_y,
            },
            config.camera.start_distance,
        );
        let textures = TextureSet::new();
        let dataset = OneShot::new();

        let globe_style = GlobeStyle {
            radius: config.globe.radius,
            subdivisions: config.globe.subdivisions,
            bump_scale: config.globe.bump_scale,
            shininess: config.globe.shininess,
            ..GlobeStyle::default()
        };
        let marker_style = MarkerStyle {
            globe_radius: f64::from(config.globe.radius),
            footprint: config.markers.footprint,
        };
        let sun_style = SunStyle {
            orbit_radius: config.sun.orbit_radius,
            hour_offset: config.sun.hour_offset,
            intensity: config.sun.intensity,
            ambient_intensity: config.sun.ambient_intensity,
            ..SunStyle::default()
        };

        let scene = SceneNode::group(SCENE_NODE);
        let scene_stream = compose(
            scene.clone(),
            vec![
                Child::stream(globe_layer(
                    &textures.stream(TextureSlot::Color),
                    &textures.stream(TextureSlot::Bump),
                    &textures.stream(TextureSlot::Specular),
                    globe_style,
                )),
                Child::stream(marker_layer(dataset.stream(), threshold.stream(), marker_style)),
                Child::stream(sun_layer(&clock.stream(), sun_style.clone())),
                Child::constant(ambient_light(&sun_style)),
            ],
        );

        let sizes = viewport.stream();
        let renderer = Owned::new(Renderer::new(backend));
        let renderer_updates = renderer_stream(renderer.clone(), &sizes);

        let camera = Camera::perspective(
            config.camera.fov_degrees,
            config.camera.near,
            config.camera.far,
        );
        let rig = CameraRig::new(camera, orbit.pose());
        let camera_updates = rig.stream(&sizes, &orbit.changes());

        let render_loop = RenderLoop::start(&renderer_updates, &scene_stream, &camera_updates);

        let retick = i64::try_from(config.sun.retick_seconds)
            .ok()
            .filter(|&seconds| seconds > 0)
            .and_then(chrono::Duration::try_seconds);
        tracing::info!(?retick, "Globe dataflow assembled");

        Self {
            viewport,
            threshold,
            clock,
            orbit,
            textures,
            dataset,
            scene,
            renderer,
            rig,
            render_loop,
            loader: None,
            retick,
        }
    }

    /// Hand over the feature dataset. Only the first dataset is used.
    pub fn set_dataset(&self, dataset: Dataset) -> bool {
        let accepted = self.dataset.resolve(Rc::new(dataset));
        if !accepted {
            tracing::warn!("Dataset already set, ignoring");
        }
        accepted
    }

    /// Start decoding the color, bump, and specular maps in the background.
    /// Results are picked up by [`poll`](Self::poll).
    pub fn load_textures(&mut self, paths: [PathBuf; 3], workers: usize) {
        let loader = self.loader.get_or_insert_with(|| TextureLoader::new(workers));
        for (slot, path) in TextureSlot::ALL.into_iter().zip(paths) {
            tracing::debug!(slot = slot.name(), path = %path.display(), "Queueing texture");
            if !loader.submit(slot, path) {
                self.textures.slot(slot).fail(StreamError::source_failed(
                    format!("texture:{}", slot.name()),
                    "texture loader unavailable",
                ));
            }
        }
    }

    /// Deliver finished textures and re-tick the clock once `sun.retick_seconds`
    /// have passed on the time source. Returns the number of textures
    /// delivered.
    pub fn poll(&mut self) -> usize {
        let delivered = match &self.loader {
            Some(loader) => self.deliver_all(loader.drain_results()),
            None => 0,
        };

        if let Some(interval) = self.retick {
            self.clock.tick_if_due(interval);
        }
        delivered
    }

    /// Block until outstanding textures finish or `timeout` elapses.
    pub fn wait_for_textures(&mut self, timeout: Duration) -> usize {
        match &self.loader {
            Some(loader) => {
                let results = loader.wait_results(timeout);
                self.deliver_all(results)
            }
            None => 0,
        }
    }

    fn deliver_all(&self, results: Vec<TextureResult>) -> usize {
        let mut settled = 0;
        for result in results {
            if self.textures.deliver(result) {
                settled += 1;
            }
        }
        settled
    }

    /// Apply one scripted input.
    pub fn execute(&mut self, command: &Command) {
        tracing::debug!(?command, "Executing");
        match *command {
            Command::Load { width, height } => self.viewport.load(width, height),
            Command::Resize { width, height } => self.viewport.resize(width, height),
            Command::Threshold(control) => self.threshold.set(control),
            Command::Drag { dx, dy } => self.orbit.drag(dx, dy),
            Command::Zoom(factor) => self.orbit.zoom(factor),
            Command::Tick => {
                self.clock.tick();
            }
            Command::Wait => {
                self.wait_for_textures(TEXTURE_WAIT_TIMEOUT);
            }
        }
    }

    pub fn viewport(&self) -> &ViewportSource {
        &self.viewport
    }

    pub fn threshold(&self) -> &ThresholdControl {
        &self.threshold
    }

    pub fn clock(&self) -> &ClockSource {
        &self.clock
    }

    pub fn orbit(&self) -> &OrbitController {
        &self.orbit
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    /// The scene root. Its children are the latest composed layers.
    pub fn scene(&self) -> &SceneNode {
        &self.scene
    }

    pub fn camera(&self) -> Owned<Camera> {
        self.rig.camera()
    }

    pub fn camera_position(&self) -> Vec3 {
        self.rig.camera().read().position
    }

    pub fn renderer(&self) -> Owned<Renderer<B>> {
        self.renderer.clone()
    }

    /// Successful paints since startup.
    pub fn paint_count(&self) -> u64 {
        self.render_loop.paint_count()
    }

    pub fn is_rendering(&self) -> bool {
        self.render_loop.is_running()
    }
}

impl GlobeApp<HeadlessBackend> {
    /// Every frame painted so far.
    pub fn frames(&self) -> Vec<FrameSummary> {
        self.renderer.read().backend().frames().to_vec()
    }

    pub fn last_frame(&self) -> Option<FrameSummary> {
        self.renderer.read().backend().last_frame().cloned()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pulse_entities::{FeatureRecord, GLOBE_NODE};
    use pulse_scene::Texture;

    use super::*;
    use crate::sources::FixedClock;

    fn app() -> GlobeApp<HeadlessBackend> {
        let clock = Rc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        GlobeApp::new(&Config::default(), HeadlessBackend::new(), clock)
    }

    fn texture(name: &str) -> Texture {
        Texture::from_rgba8(name, 2, 1, vec![255; 8]).unwrap()
    }

    fn deliver_textures(app: &GlobeApp<HeadlessBackend>) {
        for slot in TextureSlot::ALL {
            app.textures().deliver(TextureResult {
                slot,
                result: Ok(texture(slot.name())),
            });
        }
    }

    #[test]
    fn test_nothing_painted_until_all_inputs_ready() {
        let mut app = app();
        app.execute(&Command::Load {
            width: 800,
            height: 600,
        });
        assert_eq!(app.paint_count(), 0);

        app.set_dataset(Dataset::new(vec![FeatureRecord::new(0.0, 0.0, 1.0, 1.0)]));
        assert_eq!(app.paint_count(), 0);

        deliver_textures(&app);
        assert_eq!(app.paint_count(), 1);
        assert!(app.scene().find(GLOBE_NODE).is_some());
        assert_eq!(app.scene().child_count(), 4);
    }

    #[test]
    fn test_second_dataset_ignored() {
        let app = app();
        assert!(app.set_dataset(Dataset::new(Vec::new())));
        assert!(!app.set_dataset(Dataset::new(Vec::new())));
    }

    #[test]
    fn test_execute_routes_inputs() {
        let mut app = app();
        app.execute(&Command::Threshold(0.5));
        assert_eq!(app.threshold().value(), 0.5);

        let before = app.orbit().pose();
        app.execute(&Command::Drag { dx: 40.0, dy: 0.0 });
        assert_ne!(app.orbit().pose(), before);

        app.execute(&Command::Zoom(2.0));
        assert!((app.orbit().pose().distance - 6.0).abs() < 1e-5);
        assert!((app.camera_position().length() - 6.0).abs() < 1e-4);

        app.execute(&Command::Resize {
            width: 300,
            height: 100,
        });
        assert!((app.camera().read().aspect_ratio - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_poll_without_loader_is_noop() {
        let mut app = app();
        assert_eq!(app.poll(), 0);
        assert_eq!(app.wait_for_textures(Duration::from_millis(1)), 0);
    }

    #[test]
    fn test_missing_texture_files_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app();
        app.execute(&Command::Load {
            width: 64,
            height: 64,
        });
        app.set_dataset(Dataset::new(Vec::new()));
        app.load_textures(
            [
                dir.path().join("a.jpg"),
                dir.path().join("b.jpg"),
                dir.path().join("c.jpg"),
            ],
            1,
        );
        app.execute(&Command::Wait);
        assert!(app.textures().is_complete());
        let frame = app.last_frame().unwrap();
        assert!(!frame.globe);
        assert_eq!(frame.children[0], pulse_entities::GLOBE_FALLBACK_NODE);
        assert!(app.is_rendering());
    }
}
