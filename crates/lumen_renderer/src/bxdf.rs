//! GGX microfacet plus Lambert BRDF with a mixture sampling strategy.
//!
//! A path picks the diffuse lobe with probability `0.5 * (1 - metallic)` and
//! the GGX specular lobe otherwise. The reported PDF is the mixture of both
//! lobe densities, so `evaluate / pdf` stays unbiased whichever lobe produced
//! the direction.

use std::f32::consts::PI;

use lumen_core::Material;
use lumen_math::{Vec2, Vec3};
use rand::Rng;

use crate::sampling::{cosine_hemisphere, ggx_half_vector, random_f32, random_vec2, reflect};

/// Smallest roughness used for shading. Keeps `D` finite for mirror-like inputs.
pub const MIN_ROUGHNESS: f32 = 0.03;

/// Sampled directions with a PDF at or below this terminate the path.
pub const PDF_EPSILON: f32 = 1e-4;

/// Material inputs resolved at one surface point.
#[derive(Debug, Clone, Copy)]
pub struct Bxdf {
    pub albedo: Vec3,
    pub metallic: f32,
    pub specular: f32,
    pub roughness: f32,
}

impl Bxdf {
    /// Resolve the material's texture slots at `texcoord`.
    pub fn new(material: &Material, texcoord: Vec2) -> Self {
        Self::from_parts(
            material.albedo.color(texcoord),
            material.metallic.value(texcoord),
            material.specular.value(texcoord),
            material.roughness.value(texcoord),
        )
    }

    pub fn from_parts(albedo: Vec3, metallic: f32, specular: f32, roughness: f32) -> Self {
        Self {
            albedo,
            metallic: metallic.clamp(0.0, 1.0),
            specular: specular.clamp(0.0, 1.0),
            roughness: roughness.clamp(MIN_ROUGHNESS, 1.0),
        }
    }

    /// Probability of sampling the diffuse lobe.
    #[inline]
    pub fn diffuse_ratio(&self) -> f32 {
        0.5 * (1.0 - self.metallic)
    }

    #[inline]
    fn alpha(&self) -> f32 {
        self.roughness * self.roughness
    }

    /// GGX normal distribution.
    fn distribution(&self, n_dot_h: f32) -> f32 {
        let a2 = self.alpha() * self.alpha();
        let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
        a2 / (PI * denom * denom)
    }

    /// Schlick-GGX Smith masking for both directions.
    fn geometry(&self, n_dot_v: f32, n_dot_l: f32) -> f32 {
        let k = self.alpha() / 2.0;
        let g1 = |x: f32| x / (x * (1.0 - k) + k);
        g1(n_dot_v) * g1(n_dot_l)
    }

    fn fresnel(&self, v_dot_h: f32) -> Vec3 {
        let f0 = Vec3::splat(0.08 * self.specular).lerp(self.albedo, self.metallic);
        f0 + (Vec3::ONE - f0) * (1.0 - v_dot_h).clamp(0.0, 1.0).powi(5)
    }

    /// BRDF times the cosine term for light arriving from `light`.
    ///
    /// `view` and `light` point away from the surface. Returns zero below the
    /// shading hemisphere.
    pub fn evaluate(&self, normal: Vec3, view: Vec3, light: Vec3) -> Vec3 {
        let n_dot_l = normal.dot(light);
        if n_dot_l <= 0.0 {
            return Vec3::ZERO;
        }
        let n_dot_v = normal.dot(view).max(0.0);

        let half = (view + light).normalize_or_zero();
        let n_dot_h = normal.dot(half).max(0.0);
        let v_dot_h = view.dot(half).max(0.0);

        let d = self.distribution(n_dot_h);
        let g = self.geometry(n_dot_v, n_dot_l);
        let f = self.fresnel(v_dot_h);

        let specular = d * g * f / (4.0 * n_dot_v * n_dot_l + 0.001);
        let diffuse = self.albedo / PI * (Vec3::ONE - f) * (1.0 - self.metallic);

        (diffuse + specular) * n_dot_l
    }

    /// Mixture density of sampling `light` from `view`.
    pub fn pdf(&self, normal: Vec3, view: Vec3, light: Vec3) -> f32 {
        let n_dot_l = normal.dot(light);
        if n_dot_l <= 0.0 {
            return 0.0;
        }

        let ratio = self.diffuse_ratio();
        let diffuse_pdf = n_dot_l / PI;

        let half = (view + light).normalize_or_zero();
        let n_dot_h = normal.dot(half);
        let v_dot_h = view.dot(half);
        let specular_pdf = if n_dot_h > 0.0 && v_dot_h > 0.0 {
            self.distribution(n_dot_h) * n_dot_h / (4.0 * v_dot_h)
        } else {
            0.0
        };

        ratio * diffuse_pdf + (1.0 - ratio) * specular_pdf
    }

    /// Sample an outgoing direction and fold `evaluate / pdf` into `throughput`.
    ///
    /// Returns `None` when the sampled direction has a negligible density. The
    /// path is then over and `throughput` is left untouched.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        view: Vec3,
        normal: Vec3,
        throughput: &mut Vec3,
        rng: &mut R,
    ) -> Option<Vec3> {
        let light = if random_f32(rng) < self.diffuse_ratio() {
            cosine_hemisphere(normal, random_vec2(rng))
        } else {
            let half = ggx_half_vector(normal, self.alpha(), random_vec2(rng));
            reflect(view, half)
        };

        let pdf = self.pdf(normal, view, light);
        if pdf <= PDF_EPSILON {
            return None;
        }

        *throughput *= self.evaluate(normal, view, light) / pdf;
        Some(light)
    }
}
