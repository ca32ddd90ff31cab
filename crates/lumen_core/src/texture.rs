//! Texture loading and caching for materials.
//!
//! Images are decoded with the `image` crate and stored as linear float RGBA
//! so that the path tracer can sample them without per-lookup conversion.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumen_math::{Vec2, Vec3};
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Texture data of {len} bytes does not match {width}x{height} RGBA")]
    SizeMismatch { width: u32, height: u32, len: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// How 8-bit texel values are interpreted on load.
///
/// Color maps (albedo) are authored in sRGB. Data maps (roughness, metallic,
/// normal maps) must be read as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

/// A loaded texture with pixel data.
///
/// Stores pixels in linear RGBA float format for rendering.
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,

    /// Stored as [R, G, B, A] per pixel, row-major order, top row first
    pub pixels: Vec<[f32; 4]>,

    /// Original file path (for debugging)
    pub path: String,
}

impl Texture {
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>, path: impl Into<String>) -> Self {
        Self {
            width,
            height,
            pixels,
            path: path.into(),
        }
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Vec3) -> Self {
        Self::new(1, 1, vec![[color.x, color.y, color.z, 1.0]], "<solid>")
    }

    /// Build a texture from tightly packed 8-bit RGBA data.
    pub fn from_rgba8(
        width: u32,
        height: u32,
        data: &[u8],
        color_space: ColorSpace,
    ) -> TextureResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                len: data.len(),
            });
        }

        let pixels = data
            .chunks_exact(4)
            .map(|p| decode_texel([p[0], p[1], p[2], p[3]], color_space))
            .collect();
        Ok(Self::new(width, height, pixels, "<memory>"))
    }

    /// Sample the texture at UV coordinates (bilinear filtering).
    ///
    /// UVs wrap, with (0, 0) at bottom-left.
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);

        let x = u * (self.width as f32 - 1.0);
        let y = (1.0 - v) * (self.height as f32 - 1.0); // Flip V for image coordinates

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x.fract();
        let fy = y.fract();

        let top = self.texel(x0, y0).lerp(self.texel(x1, y0), fx);
        let bottom = self.texel(x0, y1).lerp(self.texel(x1, y1), fx);
        top.lerp(bottom, fy)
    }

    /// Sample a single channel without filtering (for roughness/metallic maps).
    pub fn sample_channel(&self, uv: Vec2, channel: usize) -> f32 {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);

        let x = (u * (self.width as f32 - 1.0)).round() as u32;
        let y = ((1.0 - v) * (self.height as f32 - 1.0)).round() as u32;

        self.get_pixel(x.min(self.width - 1), y.min(self.height - 1))[channel.min(3)]
    }

    fn texel(&self, x: u32, y: u32) -> Vec3 {
        let p = self.get_pixel(x, y);
        Vec3::new(p[0], p[1], p[2])
    }

    fn get_pixel(&self, x: u32, y: u32) -> [f32; 4] {
        let idx = (y * self.width + x) as usize;
        self.pixels
            .get(idx)
            .copied()
            .unwrap_or([0.0, 0.0, 0.0, 1.0])
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[f32; 4]>()
    }
}

/// Cache for loaded textures, keyed by path and color space.
pub struct TextureCache {
    textures: HashMap<(String, ColorSpace), Arc<Texture>>,

    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: None,
        }
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Load a texture from file, using cache if available.
    pub fn load(&mut self, path: &str, color_space: ColorSpace) -> TextureResult<Arc<Texture>> {
        let key = (path.to_string(), color_space);
        if let Some(texture) = self.textures.get(&key) {
            log::debug!("Texture cache hit: {}", path);
            return Ok(texture.clone());
        }

        let full_path = self.resolve_path(path);
        let texture = match load_texture_file(&full_path, color_space) {
            Ok(texture) => Arc::new(texture),
            Err(err) => {
                log::warn!("Failed to load texture {}: {}", full_path.display(), err);
                return Err(err);
            }
        };
        self.textures.insert(key, texture.clone());

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );

        Ok(texture)
    }

    /// Insert an already decoded texture under a path.
    pub fn insert(&mut self, path: &str, color_space: ColorSpace, texture: Texture) -> Arc<Texture> {
        let texture = Arc::new(texture);
        self.textures
            .insert((path.to_string(), color_space), texture.clone());
        texture
    }

    pub fn get(&self, path: &str, color_space: ColorSpace) -> Option<Arc<Texture>> {
        self.textures.get(&(path.to_string(), color_space)).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }

    /// Get total memory usage of cached textures.
    pub fn total_size_bytes(&self) -> usize {
        self.textures.values().map(|t| t.size_bytes()).sum()
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        match &self.base_dir {
            Some(base) if !path.is_absolute() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

fn load_texture_file(path: &Path, color_space: ColorSpace) -> TextureResult<Texture> {
    let img = image::open(path).map_err(|source| TextureError::Load {
        path: path.display().to_string(),
        source,
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba
        .pixels()
        .map(|p| decode_texel(p.0, color_space))
        .collect();

    Ok(Texture::new(
        width,
        height,
        pixels,
        path.to_string_lossy().to_string(),
    ))
}

fn decode_texel(p: [u8; 4], color_space: ColorSpace) -> [f32; 4] {
    let channel = |value: u8| match color_space {
        ColorSpace::Srgb => srgb_to_linear(value),
        ColorSpace::Linear => value as f32 / 255.0,
    };
    // Alpha is always linear
    [channel(p[0]), channel(p[1]), channel(p[2]), p[3] as f32 / 255.0]
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Texture {
        // 2x2: top row black/white, bottom row white/black
        let data = [
            0, 0, 0, 255, 255, 255, 255, 255, //
            255, 255, 255, 255, 0, 0, 0, 255,
        ];
        Texture::from_rgba8(2, 2, &data, ColorSpace::Linear).unwrap()
    }

    #[test]
    fn test_solid_color_texture() {
        let tex = Texture::solid_color(Vec3::new(1.0, 0.5, 0.0));
        let sample = tex.sample(Vec2::new(0.3, 0.9));
        assert!((sample - Vec3::new(1.0, 0.5, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_bilinear_sample_corners_and_center() {
        let tex = checker();

        // v = 1 is the top row in image space
        assert!(tex.sample(Vec2::new(0.0, 1.0 - 1e-6)).length() < 0.01);
        // Bottom-left texel is white
        assert!((tex.sample(Vec2::new(0.0, 0.0)).x - 1.0).abs() < 0.001);

        // The center blends all four texels equally
        let center = tex.sample(Vec2::new(0.5, 0.5));
        assert!((center.x - 0.5).abs() < 0.001, "center = {}", center.x);
    }

    #[test]
    fn test_sample_channel_is_nearest() {
        let tex = checker();
        assert_eq!(tex.sample_channel(Vec2::new(0.9, 0.1), 0), 0.0);
        assert_eq!(tex.sample_channel(Vec2::new(0.9, 0.9), 0), 1.0);
        assert_eq!(tex.sample_channel(Vec2::new(0.9, 0.9), 3), 1.0);
    }

    #[test]
    fn test_from_rgba8_rejects_wrong_length() {
        let err = Texture::from_rgba8(2, 2, &[0u8; 12], ColorSpace::Srgb).unwrap_err();
        assert!(matches!(err, TextureError::SizeMismatch { len: 12, .. }));
    }

    #[test]
    fn test_texture_cache_insert_and_get() {
        let mut cache = TextureCache::new();
        assert!(cache.is_empty());

        cache.insert("checker.png", ColorSpace::Linear, checker());
        assert_eq!(cache.len(), 1);
        assert!(cache.get("checker.png", ColorSpace::Linear).is_some());
        assert!(cache.get("checker.png", ColorSpace::Srgb).is_none());
        assert_eq!(cache.total_size_bytes(), 4 * 16);
    }

    #[test]
    fn test_missing_file_reports_load_error() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut cache = TextureCache::with_base_dir("/nonexistent-lumen-dir");
        let result = cache.load("missing.png", ColorSpace::Srgb);
        assert!(matches!(result, Err(TextureError::Load { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_srgb_to_linear() {
        assert!((srgb_to_linear(0) - 0.0).abs() < 0.001);
        assert!((srgb_to_linear(255) - 1.0).abs() < 0.001);

        // Mid-gray is darker in linear
        let mid = srgb_to_linear(128);
        assert!(mid < 0.5);
        assert!(mid > 0.1);
    }
}
