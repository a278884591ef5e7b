//! Scene graph, camera and render-surface types for the stress globe,
//! plus the combinator that keeps a container node in sync with time-varying
//! children.

pub mod camera;
pub mod compose;
pub mod geometry;
pub mod light;
pub mod material;
pub mod node;
pub mod surface;

pub use camera::Camera;
pub use compose::{Child, Container, compose};
pub use geometry::Geometry;
pub use light::Light;
pub use material::{Material, Texture, TextureError, TextureFilter};
pub use node::{Mesh, NodeData, NodeKind, SceneNode, Transform};
pub use surface::{Dimensions, MIN_SURFACE_DIMENSION, RenderSurface};
