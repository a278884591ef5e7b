//! Surface materials and decoded textures.

use std::sync::Arc;

use glam::Vec3;

/// Errors that can occur while building or decoding a texture.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    /// Width or height is zero.
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    /// Pixel data length doesn't match `width * height * 4`.
    #[error("texture data size ({actual}) does not match expected ({expected}) for {width}x{height} RGBA8")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    /// Reading the image file failed.
    #[error("failed to read texture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The image bytes could not be decoded.
    #[error("failed to decode texture {name}: {message}")]
    Decode { name: String, message: String },
}

/// Sampling filter. Globe textures always use [`TextureFilter::Linear`];
/// nearest sampling shimmers at orbital zoom levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

/// Immutable decoded RGBA8 image.
///
/// Pixel storage is shared, so clones are cheap and the texture can be
/// decoded on a worker thread and handed to the dataflow thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
    pixels: Arc<Vec<u8>>,
}

impl Texture {
    /// Wrap tightly packed RGBA8 pixels.
    pub fn from_rgba8(
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::ZeroDimensions { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(TextureError::DataSizeMismatch {
                actual: pixels.len(),
                expected,
                width,
                height,
            });
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            filter: TextureFilter::Linear,
            pixels: Arc::new(pixels),
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA at `(x, y)`, or `None` out of bounds.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Phong-style surface description.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Base color in linear RGB.
    pub color: Vec3,
    /// Opacity in `[0, 1]`. Only honored when `transparent` is set.
    pub opacity: f32,
    pub transparent: bool,
    /// Color (albedo) map.
    pub map: Option<Texture>,
    pub bump_map: Option<Texture>,
    pub bump_scale: f32,
    pub specular_map: Option<Texture>,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            transparent: false,
            map: None,
            bump_map: None,
            bump_scale: 1.0,
            specular_map: None,
            specular: Vec3::splat(0.07),
            shininess: 30.0,
        }
    }
}

impl Material {
    /// Untextured material of the given color.
    pub fn colored(color: Vec3) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Opacity as it would be blended: 1 for opaque materials.
    pub fn effective_opacity(&self) -> f32 {
        if self.transparent { self.opacity } else { 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_dimensions_returns_error() {
        let result = Texture::from_rgba8("empty", 0, 4, Vec::new());
        assert!(matches!(
            result,
            Err(TextureError::ZeroDimensions {
                width: 0,
                height: 4
            })
        ));
    }

    #[test]
    fn test_data_size_mismatch_returns_error() {
        let result = Texture::from_rgba8("short", 2, 2, vec![0; 15]);
        assert!(matches!(
            result,
            Err(TextureError::DataSizeMismatch {
                actual: 15,
                expected: 16,
                ..
            })
        ));
    }

    #[test]
    fn test_texel_lookup_and_linear_filter() {
        let mut pixels = vec![0u8; 2 * 2 * 4];
        pixels[12..16].copy_from_slice(&[1, 2, 3, 4]);
        let texture = Texture::from_rgba8("t", 2, 2, pixels).unwrap();
        assert_eq!(texture.texel(1, 1), Some([1, 2, 3, 4]));
        assert_eq!(texture.texel(2, 0), None);
        assert_eq!(texture.filter, TextureFilter::Linear);
    }

    #[test]
    fn test_opaque_material_ignores_opacity() {
        let mut material = Material::colored(Vec3::X);
        material.opacity = 0.3;
        assert_eq!(material.effective_opacity(), 1.0);
        material.transparent = true;
        assert!((material.effective_opacity() - 0.3).abs() < 1e-6);
    }
}
