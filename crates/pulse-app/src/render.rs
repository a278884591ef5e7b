//! Renderer state and the backend seam.
//!
//! [`Renderer`] owns the paint surface and is mutated in place on resize;
//! the actual drawing is delegated to a [`RenderBackend`]. The
//! [`HeadlessBackend`] records a [`FrameSummary`] per paint instead of
//! producing pixels.

use std::fmt;

use glam::Vec3;
use pulse_entities::{GLOBE_NODE, MARKERS_NODE, SUN_NODE, instance_bytes, marker_instances};
use pulse_scene::{Camera, Dimensions, NodeKind, RenderSurface, SceneNode};
use pulse_stream::{Owned, Stream};

/// Errors that can occur while resizing or painting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// Paint requested before the surface was bound to a real size.
    #[error("render surface has not been configured")]
    SurfaceUnconfigured,

    #[error("render backend failed: {0}")]
    Backend(String),
}

/// Something that can put a scene on a surface.
pub trait RenderBackend {
    /// The surface was rebound to `size`.
    fn resize(&mut self, size: Dimensions) -> Result<(), RenderError>;

    /// Draw one frame of `scene` through `camera` onto `surface`.
    fn paint(
        &mut self,
        scene: &SceneNode,
        camera: &Camera,
        surface: &RenderSurface,
    ) -> Result<(), RenderError>;
}

/// Paint surface plus backend.
pub struct Renderer<B> {
    surface: RenderSurface,
    backend: B,
    frames: u64,
}

impl<B: RenderBackend> Renderer<B> {
    /// Renderer with an unconfigured 1×1 surface.
    pub fn new(backend: B) -> Self {
        Self {
            surface: RenderSurface::new(Dimensions::new(0, 0)),
            backend,
            frames: 0,
        }
    }

    /// Rebind the surface. A no-op when the size is unchanged.
    pub fn resize(&mut self, size: Dimensions) -> Result<(), RenderError> {
        match self.surface.resize(size) {
            Some(changed) => {
                tracing::debug!(size = %changed, "Resizing render surface");
                self.backend.resize(changed)
            }
            None => Ok(()),
        }
    }

    pub fn paint(&mut self, scene: &SceneNode, camera: &Camera) -> Result<(), RenderError> {
        if !self.surface.is_configured() {
            return Err(RenderError::SurfaceUnconfigured);
        }
        self.backend.paint(scene, camera, &self.surface)?;
        self.frames += 1;
        Ok(())
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Frames painted successfully.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

/// Renderer stream that follows `viewport`, re-emitting the same renderer
/// after each resize.
pub fn renderer_stream<B: RenderBackend + 'static>(
    renderer: Owned<Renderer<B>>,
    viewport: &Stream<Dimensions>,
) -> Stream<Owned<Renderer<B>>> {
    viewport.scan_in_place(renderer, |renderer, size| {
        if let Err(err) = renderer.resize(size) {
            tracing::warn!(error = %err, %size, "Surface resize failed");
        }
    })
}

/// What a headless paint saw.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    /// 1-based frame number.
    pub frame: u64,
    pub dimensions: Dimensions,
    pub aspect_ratio: f32,
    pub camera_position: Vec3,
    /// Names of the scene's direct children, in order.
    pub children: Vec<String>,
    /// Whether the textured globe mesh is in the scene.
    pub globe: bool,
    pub marker_count: usize,
    /// Size of the packed marker instance buffer.
    pub instance_bytes: usize,
    /// Meshes reached by a walk from the root, skipping hidden subtrees.
    pub visible_meshes: usize,
    /// Lowest and highest marker opacity, `None` without markers.
    pub opacity_range: Option<(f32, f32)>,
    pub sun_position: Option<Vec3>,
}

impl FrameSummary {
    pub fn capture(frame: u64, scene: &SceneNode, camera: &Camera, surface: &RenderSurface) -> Self {
        let globe = scene
            .find(GLOBE_NODE)
            .is_some_and(|node| matches!(node.read().kind, NodeKind::Mesh(_)));

        let instances = scene
            .find(MARKERS_NODE)
            .map(|group| marker_instances(&group))
            .unwrap_or_default();
        let opacity_range = instances
            .iter()
            .map(|instance| instance.color[3])
            .fold(None, |range: Option<(f32, f32)>, opacity| match range {
                Some((lo, hi)) => Some((lo.min(opacity), hi.max(opacity))),
                None => Some((opacity, opacity)),
            });

        let mut visible_meshes = 0;
        scene.walk(&mut |node, _| {
            if matches!(node.read().kind, NodeKind::Mesh(_)) {
                visible_meshes += 1;
            }
        });

        Self {
            frame,
            dimensions: surface.size(),
            aspect_ratio: camera.aspect_ratio,
            camera_position: camera.position,
            children: scene.children().iter().map(SceneNode::name).collect(),
            globe,
            marker_count: instances.len(),
            instance_bytes: instance_bytes(&instances).len(),
            visible_meshes,
            opacity_range,
            sun_position: scene
                .find(SUN_NODE)
                .map(|sun| sun.read().transform.translation),
        }
    }
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {} {} aspect={:.4} children=[{}] globe={} markers={} meshes={}",
            self.frame,
            self.dimensions,
            self.aspect_ratio,
            self.children.join(","),
            self.globe,
            self.marker_count,
            self.visible_meshes,
        )?;
        if let Some((lo, hi)) = self.opacity_range {
            write!(f, " opacity={lo:.2}..{hi:.2}")?;
        }
        if let Some(sun) = self.sun_position {
            write!(f, " sun=({:.2},{:.2},{:.2})", sun.x, sun.y, sun.z)?;
        }
        Ok(())
    }
}

/// Backend that records frames instead of drawing them.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    frames: Vec<FrameSummary>,
    resizes: Vec<Dimensions>,
    failure: Option<String>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose every paint fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> &[FrameSummary] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameSummary> {
        self.frames.last()
    }

    /// Sizes the surface was rebound to, in order.
    pub fn resizes(&self) -> &[Dimensions] {
        &self.resizes
    }
}

impl RenderBackend for HeadlessBackend {
    fn resize(&mut self, size: Dimensions) -> Result<(), RenderError> {
        self.resizes.push(size);
        Ok(())
    }

    fn paint(
        &mut self,
        scene: &SceneNode,
        camera: &Camera,
        surface: &RenderSurface,
    ) -> Result<(), RenderError> {
        if let Some(message) = &self.failure {
            return Err(RenderError::Backend(message.clone()));
        }
        let summary = FrameSummary::capture(self.frames.len() as u64 + 1, scene, camera, surface);
        tracing::debug!(%summary, "Painted frame");
        self.frames.push(summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pulse_scene::{Geometry, Light, Material};

    use super::*;

    fn scene() -> SceneNode {
        let root = SceneNode::group("scene");
        let markers = SceneNode::group(MARKERS_NODE);
        for opacity in [0.1, 0.8, 0.4] {
            markers.add(SceneNode::mesh(
                "marker",
                Rc::new(Geometry::cuboid(1.0, 1.0, 1.0)),
                Material {
                    opacity,
                    transparent: true,
                    ..Material::default()
                },
            ));
        }
        let sun = SceneNode::light(
            SUN_NODE,
            Light::Directional {
                color: Vec3::ONE,
                intensity: 1.0,
            },
        );
        sun.update(|d| d.transform.translation = Vec3::new(0.0, 0.0, -10.0));
        root.replace_children(vec![markers, sun]);
        root
    }

    #[test]
    fn test_paint_before_configure_fails() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        let result = renderer.paint(&scene(), &Camera::default());
        assert_eq!(result, Err(RenderError::SurfaceUnconfigured));
        assert_eq!(renderer.frame_count(), 0);
    }

    #[test]
    fn test_resize_is_in_place_and_deduplicated() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        renderer.resize(Dimensions::new(800, 600)).unwrap();
        renderer.resize(Dimensions::new(800, 600)).unwrap();
        renderer.resize(Dimensions::new(400, 300)).unwrap();
        assert_eq!(
            renderer.backend().resizes(),
            &[Dimensions::new(800, 600), Dimensions::new(400, 300)]
        );
        assert_eq!(renderer.surface().size(), Dimensions::new(400, 300));
    }

    #[test]
    fn test_first_layout_at_clamp_size_reaches_backend() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        renderer.resize(Dimensions::new(0, 0)).unwrap();
        assert!(renderer.backend().resizes().is_empty());

        renderer.resize(Dimensions::new(1, 1)).unwrap();
        assert_eq!(renderer.backend().resizes(), &[Dimensions::new(1, 1)]);
        assert!(renderer.surface().is_configured());
        renderer.paint(&scene(), &Camera::default()).unwrap();
        assert_eq!(renderer.frame_count(), 1);
    }

    #[test]
    fn test_headless_frame_summary() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        renderer.resize(Dimensions::new(400, 300)).unwrap();
        let mut camera = Camera::default();
        camera.set_aspect_ratio(400.0, 300.0);
        renderer.paint(&scene(), &camera).unwrap();

        let frame = renderer.backend().last_frame().unwrap();
        assert_eq!(frame.frame, 1);
        assert_eq!(frame.dimensions, Dimensions::new(400, 300));
        assert!((frame.aspect_ratio - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(frame.children, vec![MARKERS_NODE, SUN_NODE]);
        assert!(!frame.globe);
        assert_eq!(frame.marker_count, 3);
        assert_eq!(frame.instance_bytes, 3 * 80);
        assert_eq!(frame.visible_meshes, 3);
        assert_eq!(frame.opacity_range, Some((0.1, 0.8)));
        assert_eq!(frame.sun_position, Some(Vec3::new(0.0, 0.0, -10.0)));

        let line = frame.to_string();
        assert!(line.starts_with("frame 1 400x300 aspect=1.3333"));
        assert!(line.contains("markers=3 meshes=3"));
        assert!(line.contains("opacity=0.10..0.80"));
    }

    #[test]
    fn test_hidden_markers_are_not_visible_meshes() {
        let mut renderer = Renderer::new(HeadlessBackend::new());
        renderer.resize(Dimensions::new(10, 10)).unwrap();
        let scene = scene();
        let markers = scene.find(MARKERS_NODE).unwrap();
        markers.children()[0].update(|d| d.visible = false);
        renderer.paint(&scene, &Camera::default()).unwrap();
        assert_eq!(renderer.backend().last_frame().unwrap().visible_meshes, 2);

        markers.update(|d| d.visible = false);
        renderer.paint(&scene, &Camera::default()).unwrap();
        let frame = renderer.backend().last_frame().unwrap();
        assert_eq!(frame.visible_meshes, 0);
        assert_eq!(frame.marker_count, 3);
    }

    #[test]
    fn test_backend_failure_is_reported() {
        let mut renderer = Renderer::new(HeadlessBackend::failing("device lost"));
        renderer.resize(Dimensions::new(10, 10)).unwrap();
        let result = renderer.paint(&scene(), &Camera::default());
        assert_eq!(result, Err(RenderError::Backend("device lost".into())));
        assert_eq!(renderer.frame_count(), 0);
    }

    #[test]
    fn test_renderer_stream_keeps_identity() {
        use std::cell::RefCell;

        use pulse_stream::ReplaySubject;

        let renderer = Owned::new(Renderer::new(HeadlessBackend::new()));
        let viewport = ReplaySubject::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = renderer_stream(renderer.clone(), &viewport.stream())
            .subscribe_next(move |r| sink.borrow_mut().push(r));

        assert!(seen.borrow().is_empty());
        viewport.next(Dimensions::new(800, 600));
        viewport.next(Dimensions::new(400, 300));
        assert_eq!(seen.borrow().len(), 2);
        assert!(seen.borrow().iter().all(|r| r.ptr_eq(&renderer)));
        assert_eq!(renderer.read().surface().size(), Dimensions::new(400, 300));
    }
}
