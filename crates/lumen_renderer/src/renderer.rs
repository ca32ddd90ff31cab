//! Progressive multithreaded renderer.
//!
//! Each call to [`Renderer::render`] traces one path per pixel and folds it
//! into a linear accumulation buffer. The displayed image is the running
//! mean, gamma corrected and packed as RGBA8.
//!
//! Work is split into horizontal bands, one scoped OS thread per band. Every
//! band owns a disjoint slice of both buffers and its own generator seeded
//! from `(seed, frame, band)`, so a frame is reproducible for a given thread
//! count.

use std::time::Instant;

use lumen_core::MaterialLibrary;
use lumen_math::{Ray, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::bands::generate_bands;
use crate::camera::Camera;
use crate::hittable::Hittable;
use crate::integrator::{MissShader, PathTracer};
use crate::light::Light;
use crate::primitive::Primitive;
use crate::sampling::mix_seed;
use crate::scene::Scene;
use crate::settings::{available_threads, RenderSettings};
use crate::tlas::Tlas;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("Camera viewport {camera:?} does not match renderer viewport {renderer:?}")]
    ViewportMismatch {
        camera: (u32, u32),
        renderer: (u32, u32),
    },

    #[error("Expected {expected} ray directions, found {found}")]
    DirectionCount { expected: usize, found: usize },
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Borrowed view of the display buffer.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    /// Packed pixels: red in the low byte, alpha in the high byte
    pub pixels: &'a [u32],
    pub width: u32,
    pub height: u32,
}

impl<'a> ImageView<'a> {
    pub const CHANNELS: u32 = 4;

    pub fn channels(&self) -> u32 {
        Self::CHANNELS
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * Self::CHANNELS as usize
    }

    /// Raw pixel memory. RGBA byte order on little-endian targets.
    pub fn as_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.pixels)
    }

    /// RGBA8 bytes in image order regardless of target endianness.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_le_bytes()).collect()
    }
}

/// Pack a linear RGBA color into `0xAABBGGRR`.
#[inline]
pub fn pack_rgba(color: Vec4) -> u32 {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    (c.w as u32) << 24 | (c.z as u32) << 16 | (c.y as u32) << 8 | c.x as u32
}

/// Mean of an accumulation cell over `frames`, NaN channels zeroed, gamma
/// corrected.
#[inline]
fn resolve(cell: Vec4, frames: f32, gamma: f32) -> Vec4 {
    let mean = cell / frames;
    let fix = |c: f32| if c.is_nan() { 0.0 } else { c.max(0.0).powf(1.0 / gamma) };
    Vec4::new(fix(mean.x), fix(mean.y), fix(mean.z), fix(mean.w))
}

pub struct Renderer {
    width: u32,
    height: u32,
    accumulation: Vec<Vec4>,
    image: Vec<u32>,
    frame_index: u32,
    settings: RenderSettings,
    miss_shader: Box<MissShader>,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_settings(width, height, RenderSettings::default())
    }

    pub fn with_settings(width: u32, height: u32, settings: RenderSettings) -> Self {
        let miss = Vec3::from_array(settings.miss_color);
        let mut renderer = Self {
            width: 0,
            height: 0,
            accumulation: Vec::new(),
            image: Vec::new(),
            frame_index: 1,
            settings: RenderSettings {
                thread_count: 1,
                ..settings.clone()
            },
            miss_shader: Box::new(move |_: &Ray| miss),
        };
        renderer.set_used_thread_count(settings.thread_count);
        renderer.set_gamma(settings.gamma);
        renderer.on_resize(width, height);
        renderer
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize both buffers and restart accumulation. Returns false if the
    /// size did not change.
    pub fn on_resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height && !self.image.is_empty() {
            return false;
        }
        let pixels = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.accumulation = vec![Vec4::ZERO; pixels];
        self.image = vec![0; pixels];
        self.reset_frame_index();
        true
    }

    pub fn accumulate(&mut self) {
        self.settings.accumulate = true;
    }

    pub fn dont_accumulate(&mut self) {
        self.settings.accumulate = false;
    }

    pub fn is_accumulating(&self) -> bool {
        self.settings.accumulate
    }

    pub fn set_accelerate(&mut self, accelerate: bool) {
        self.settings.accelerate = accelerate;
    }

    /// Number of worker threads, clamped to what the machine offers.
    pub fn set_used_thread_count(&mut self, count: usize) {
        let available = available_threads();
        let clamped = count.clamp(1, available);
        if clamped != count {
            log::warn!(
                "Requested {} render threads, using {} (available: {})",
                count,
                clamped,
                available
            );
        }
        self.settings.thread_count = clamped;
    }

    pub fn thread_count(&self) -> usize {
        self.settings.thread_count
    }

    pub fn set_max_ray_depth(&mut self, depth: u32) {
        self.settings.max_ray_depth = depth;
    }

    pub fn set_gamma(&mut self, gamma: f32) {
        self.settings.gamma = if gamma > 0.0 { gamma } else { 1.0 };
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.settings.seed = seed;
    }

    /// Replace the radiance returned for rays that leave the scene.
    pub fn on_ray_miss<F>(&mut self, shader: F)
    where
        F: Fn(&Ray) -> Vec3 + Send + Sync + 'static,
    {
        self.miss_shader = Box::new(shader);
    }

    /// Index of the frame the next render writes, starting at 1.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Restart accumulation on the next render.
    pub fn reset_frame_index(&mut self) {
        self.frame_index = 1;
    }

    pub fn image(&self) -> ImageView<'_> {
        ImageView {
            pixels: &self.image,
            width: self.width,
            height: self.height,
        }
    }

    /// Mean linear color accumulated at a pixel.
    pub fn pixel_color(&self, x: u32, y: u32) -> Option<Vec3> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let cell = self.accumulation[y as usize * self.width as usize + x as usize];
        if cell.w > 0.0 {
            Some(cell.truncate() / cell.w)
        } else {
            Some(Vec3::ZERO)
        }
    }

    /// Render one frame against any traceable world.
    pub fn render<W: Hittable + ?Sized>(
        &mut self,
        camera: &Camera,
        world: &W,
        lights: &[Light],
        materials: &MaterialLibrary,
    ) -> RenderResult<()> {
        if (camera.width(), camera.height()) != (self.width, self.height) {
            return Err(RenderError::ViewportMismatch {
                camera: (camera.width(), camera.height()),
                renderer: (self.width, self.height),
            });
        }
        let directions = camera.ray_directions();
        if directions.len() != self.image.len() {
            return Err(RenderError::DirectionCount {
                expected: self.image.len(),
                found: directions.len(),
            });
        }

        if !self.settings.accumulate {
            self.frame_index = 1;
        }
        if self.frame_index == 1 {
            self.accumulation.fill(Vec4::ZERO);
        }
        if self.image.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        let width = self.width as usize;
        let bands = generate_bands(self.height, self.settings.thread_count);
        let frame = self.frame_index;
        let frames = frame as f32;
        let gamma = self.settings.gamma;
        let seed = self.settings.seed;
        let origin = camera.position();

        let tracer = PathTracer {
            world,
            lights,
            materials,
            miss: self.miss_shader.as_ref(),
            max_depth: self.settings.max_ray_depth,
        };
        let tracer = &tracer;

        std::thread::scope(|scope| {
            let mut accumulation_rest = self.accumulation.as_mut_slice();
            let mut image_rest = self.image.as_mut_slice();

            for band in bands {
                let count = band.pixel_count(width as u32);
                let (accumulation, tail) = std::mem::take(&mut accumulation_rest).split_at_mut(count);
                accumulation_rest = tail;
                let (image, tail) = std::mem::take(&mut image_rest).split_at_mut(count);
                image_rest = tail;

                let first = band.y as usize * width;
                scope.spawn(move || {
                    let mut rng =
                        StdRng::seed_from_u64(mix_seed(&[seed, frame as u64, band.index as u64]));
                    let cells = accumulation.iter_mut().zip(image.iter_mut());

                    for (offset, (cell, pixel)) in cells.enumerate() {
                        let ray = Ray::new(origin, directions[first + offset]);
                        let color = tracer.radiance(ray, &mut rng);

                        *cell += color.extend(1.0);
                        *pixel = pack_rgba(resolve(*cell, frames, gamma));
                    }
                });
            }
        });

        log::debug!(
            "Frame {} rendered in {:.2?} ({}x{}, {} threads)",
            frame,
            start.elapsed(),
            self.width,
            self.height,
            self.settings.thread_count
        );

        if self.settings.accumulate {
            self.frame_index += 1;
        }
        Ok(())
    }

    /// Render loose primitives by brute force.
    pub fn render_primitives(
        &mut self,
        camera: &Camera,
        primitives: &[Primitive],
        lights: &[Light],
        materials: &MaterialLibrary,
    ) -> RenderResult<()> {
        self.render(camera, primitives, lights, materials)
    }

    /// Render instanced geometry through a TLAS.
    pub fn render_tlas(
        &mut self,
        camera: &Camera,
        tlas: &Tlas,
        lights: &[Light],
        materials: &MaterialLibrary,
    ) -> RenderResult<()> {
        self.render(camera, tlas, lights, materials)
    }

    /// Render a scene, using its acceleration structures when enabled.
    pub fn render_scene(&mut self, camera: &Camera, scene: &Scene) -> RenderResult<()> {
        let view = scene.view(self.settings.accelerate);
        self.render(camera, &view, scene.lights(), scene.materials())
    }
}
