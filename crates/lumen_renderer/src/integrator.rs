//! Unidirectional path tracing with next-event estimation.

use lumen_core::MaterialLibrary;
use lumen_math::{Interval, Ray, Vec3};
use rand::Rng;

use crate::bxdf::Bxdf;
use crate::hittable::{HitPayload, Hittable};
use crate::light::{Light, ShadowRay};

/// Offset applied along the normal when spawning secondary rays.
pub const RAY_OFFSET: f32 = 1e-4;

/// Radiance returned for rays that leave the scene.
pub type MissShader = dyn Fn(&Ray) -> Vec3 + Send + Sync;

/// Everything a single path needs to read. Shared by all worker threads.
pub struct PathTracer<'a, W: Hittable + ?Sized> {
    pub world: &'a W,
    pub lights: &'a [Light],
    pub materials: &'a MaterialLibrary,
    pub miss: &'a MissShader,
    pub max_depth: u32,
}

impl<W: Hittable + ?Sized> PathTracer<'_, W> {
    fn trace_closest(&self, ray: &Ray) -> Option<HitPayload> {
        let mut payload = HitPayload::new();
        self.world
            .hit(ray, Interval::new(RAY_OFFSET, f32::INFINITY), &mut payload)
            .then_some(payload)
    }

    /// Radiance arriving along `ray`, one stochastic path sample.
    pub fn radiance<R: Rng + ?Sized>(&self, mut ray: Ray, rng: &mut R) -> Vec3 {
        let mut light = Vec3::ZERO;
        let mut throughput = Vec3::ONE;

        for _ in 0..self.max_depth {
            let Some(payload) = self.trace_closest(&ray) else {
                light += throughput * (self.miss)(&ray);
                break;
            };

            let material = payload.material.and_then(|id| self.materials.get(id));
            debug_assert!(
                material.is_some(),
                "hit references unknown material {:?}",
                payload.material
            );
            let Some(material) = material else {
                break;
            };

            let direction = ray.direction();
            let mut normal = payload.normal;
            if direction.dot(normal) > 0.0 {
                normal = -normal;
            }

            light += throughput * material.emission();
            if material.is_emissive() {
                break;
            }

            let view = -direction.normalize();
            let bxdf = Bxdf::new(material, payload.texcoord);
            let origin = ray.at(payload.t) + normal * RAY_OFFSET;

            for emitter in self.lights {
                let shadow = ShadowRay::new(origin, emitter.sample_point(rng));
                let mut light_payload = HitPayload::new();
                self.world.hit(
                    &shadow.ray,
                    Interval::new(RAY_OFFSET, f32::INFINITY),
                    &mut light_payload,
                );
                light += throughput * emitter.sample(&shadow, normal, &light_payload, &bxdf, view);
            }

            match bxdf.sample(view, normal, &mut throughput, rng) {
                Some(next) => ray = Ray::new(origin, next),
                None => break,
            }
        }

        light
    }
}
