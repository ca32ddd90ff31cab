//! Emissive primitives used for next-event estimation.

use lumen_core::MaterialLibrary;
use lumen_math::{Mat4, Ray, Vec3};
use rand::Rng;

use crate::bxdf::Bxdf;
use crate::hittable::{HitPayload, Shape};
use crate::primitive::Primitive;
use crate::sampling::random_f32;

/// Shadow-ray hits further than this from the sampled point count as occluded.
pub const OCCLUSION_TOLERANCE: f32 = 0.01;

/// Light samples with a solid-angle PDF at or below this are discarded.
pub const MIN_LIGHT_PDF: f32 = 0.01;

/// A ray from a shading point toward a sampled point on a light.
#[derive(Debug, Clone, Copy)]
pub struct ShadowRay {
    pub ray: Ray,
    pub distance: f32,
    pub distance_squared: f32,
}

impl ShadowRay {
    pub fn new(origin: Vec3, target: Vec3) -> Self {
        let offset = target - origin;
        let distance_squared = offset.length_squared();
        let distance = distance_squared.sqrt();
        let direction = if distance > 0.0 { offset / distance } else { Vec3::Z };

        Self {
            ray: Ray::new(origin, direction),
            distance,
            distance_squared,
        }
    }
}

/// An area light: an emissive primitive and its placement in the world.
#[derive(Debug, Clone)]
pub struct Light {
    primitive: Primitive,
    emission: Vec3,
    transform: Mat4,
}

impl Light {
    pub fn new(primitive: Primitive, emission: Vec3) -> Self {
        Self {
            primitive,
            emission,
            transform: Mat4::IDENTITY,
        }
    }

    /// Place the emitter with an instance transform.
    ///
    /// Area is taken from the untransformed primitive, which holds for
    /// rigid transforms.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// A light for `primitive` if its material emits.
    pub fn for_primitive(primitive: &Primitive, materials: &MaterialLibrary) -> Option<Light> {
        let material = materials.get(primitive.material())?;
        material
            .is_emissive()
            .then(|| Light::new(primitive.clone(), material.emission()))
    }

    /// One light per primitive whose material emits.
    pub fn collect(primitives: &[Primitive], materials: &MaterialLibrary) -> Vec<Light> {
        primitives
            .iter()
            .filter_map(|primitive| Self::for_primitive(primitive, materials))
            .collect()
    }

    pub fn primitive(&self) -> &Primitive {
        &self.primitive
    }

    pub fn emission(&self) -> Vec3 {
        self.emission
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn area(&self) -> f32 {
        self.primitive.surface_area()
    }

    /// Uniformly distributed world-space point on the emitter.
    pub fn sample_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let local = self.primitive.sample_uniform(random_f32(rng), random_f32(rng));
        self.transform.transform_point3(local)
    }

    /// Direct lighting carried by a shadow ray toward this light.
    ///
    /// `light_payload` is the closest hit along `shadow.ray`. Anything hit
    /// noticeably before the sampled point blocks it.
    pub fn sample(
        &self,
        shadow: &ShadowRay,
        surface_normal: Vec3,
        light_payload: &HitPayload,
        bxdf: &Bxdf,
        view: Vec3,
    ) -> Vec3 {
        if (light_payload.t - shadow.distance).abs() > OCCLUSION_TOLERANCE {
            return Vec3::ZERO;
        }

        let cos_theta_light = light_payload.normal.dot(-shadow.ray.direction()).abs();
        let pdf = shadow.distance_squared / (cos_theta_light * self.area());
        if !pdf.is_finite() || pdf <= MIN_LIGHT_PDF {
            return Vec3::ZERO;
        }

        bxdf.evaluate(surface_normal, view, shadow.ray.direction()) * self.emission / pdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hittable::Hittable;
    use crate::sphere::Sphere;
    use crate::triangle::Triangle;
    use lumen_core::{Material, MaterialId};
    use lumen_math::Interval;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Downward-facing quad light at y = 2 as two triangles.
    fn quad_light() -> (Light, Light) {
        let id = MaterialId(0);
        let a = Vec3::new(-0.5, 2.0, -0.5);
        let b = Vec3::new(0.5, 2.0, -0.5);
        let c = Vec3::new(0.5, 2.0, 0.5);
        let d = Vec3::new(-0.5, 2.0, 0.5);
        let emission = Vec3::splat(10.0);
        (
            Light::new(Triangle::new(a, b, c, id).into(), emission),
            Light::new(Triangle::new(a, c, d, id).into(), emission),
        )
    }

    fn trace(light: &Light, shadow: &ShadowRay) -> HitPayload {
        let mut payload = HitPayload::new();
        light
            .primitive()
            .hit(&shadow.ray, Interval::new(1e-4, f32::INFINITY), &mut payload);
        payload
    }

    #[test]
    fn test_unoccluded_sample_is_positive() {
        let (light, _) = quad_light();
        let bxdf = Bxdf::from_parts(Vec3::splat(0.8), 0.0, 0.5, 0.8);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let target = light.sample_point(&mut rng);
            let shadow = ShadowRay::new(Vec3::ZERO, target);
            let payload = trace(&light, &shadow);

            let radiance = light.sample(&shadow, Vec3::Y, &payload, &bxdf, Vec3::Y);
            assert!(radiance.min_element() > 0.0, "radiance {:?}", radiance);
        }
    }

    #[test]
    fn test_occluded_sample_is_zero() {
        let (light, _) = quad_light();
        let bxdf = Bxdf::from_parts(Vec3::splat(0.8), 0.0, 0.5, 0.8);
        let blocker = Sphere::new(Vec3::new(0.0, 1.0, 0.0), 0.3, MaterialId(1));

        let shadow = ShadowRay::new(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0));
        let mut payload = trace(&light, &shadow);
        blocker.hit(&shadow.ray, Interval::new(1e-4, f32::INFINITY), &mut payload);
        assert!(payload.t < 1.0);

        assert_eq!(light.sample(&shadow, Vec3::Y, &payload, &bxdf, Vec3::Y), Vec3::ZERO);
    }

    #[test]
    fn test_close_light_pdf_is_rejected() {
        // Shading point right under the light: tiny distance, tiny pdf
        let (light, _) = quad_light();
        let bxdf = Bxdf::from_parts(Vec3::splat(0.8), 0.0, 0.5, 0.8);

        let origin = Vec3::new(0.0, 1.99, 0.0);
        let shadow = ShadowRay::new(origin, Vec3::new(0.0, 2.0, 0.0));
        let payload = trace(&light, &shadow);
        assert!(payload.is_hit());

        assert_eq!(light.sample(&shadow, Vec3::Y, &payload, &bxdf, Vec3::Y), Vec3::ZERO);
    }

    #[test]
    fn test_collect_keeps_only_emitters() {
        let mut materials = MaterialLibrary::new();
        let lamp = materials.add(Material::new("lamp", Vec3::ONE).with_emission(Vec3::ONE, 5.0));
        let wall = materials.add(Material::new("wall", Vec3::splat(0.7)));

        let primitives: Vec<Primitive> = vec![
            Sphere::new(Vec3::ZERO, 1.0, wall).into(),
            Sphere::new(Vec3::Y * 3.0, 0.5, lamp).into(),
            Sphere::new(Vec3::X * 3.0, 0.5, wall).into(),
        ];

        let lights = Light::collect(&primitives, &materials);
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].emission(), Vec3::splat(5.0));
    }

    #[test]
    fn test_transformed_light_samples_move() {
        let light = Light::new(Sphere::new(Vec3::ZERO, 1.0, MaterialId(0)).into(), Vec3::ONE)
            .with_transform(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..20 {
            let p = light.sample_point(&mut rng);
            assert!(((p - Vec3::new(10.0, 0.0, 0.0)).length() - 1.0).abs() < 1e-3);
        }
        assert!((light.area() - 4.0 * std::f32::consts::PI).abs() < 1e-3);
    }
}
