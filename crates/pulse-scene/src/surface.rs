//! Viewport dimensions and the render surface bound to them.

/// Minimum surface dimension (prevents zero-size surfaces).
pub const MIN_SURFACE_DIMENSION: u32 = 1;

/// Viewport size in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width / height, or `None` for a zero-height viewport.
    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.height > 0).then(|| self.width as f32 / self.height as f32)
    }

    /// Same dimensions with both sides clamped to [`MIN_SURFACE_DIMENSION`].
    pub fn clamped(&self) -> Self {
        Self {
            width: self.width.max(MIN_SURFACE_DIMENSION),
            height: self.height.max(MIN_SURFACE_DIMENSION),
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Paint target bound to fixed pixel dimensions.
///
/// Zero-size viewports (before first layout) are clamped to 1×1 and the
/// surface stays unconfigured until it sees a real size.
#[derive(Clone, Debug)]
pub struct RenderSurface {
    size: Dimensions,
    configured: bool,
}

impl RenderSurface {
    pub fn new(size: Dimensions) -> Self {
        Self {
            size: size.clamped(),
            configured: size.width > 0 && size.height > 0,
        }
    }

    /// Rebind to `size` in place. Returns the new size if it changed or if
    /// this is the first real size the surface has seen.
    pub fn resize(&mut self, size: Dimensions) -> Option<Dimensions> {
        let clamped = size.clamped();
        let was_configured = self.configured;
        if size.width > 0 && size.height > 0 {
            self.configured = true;
        }
        if clamped == self.size && was_configured == self.configured {
            return None;
        }
        self.size = clamped;
        Some(clamped)
    }

    pub fn size(&self) -> Dimensions {
        self.size
    }

    /// Whether the surface has been bound to a non-zero size at least once.
    pub fn is_configured(&self) -> bool {
        self.configured
    }
}
