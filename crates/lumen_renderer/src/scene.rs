//! Scene container: loose primitives, model instances, lights and materials.

use lumen_core::{Material, MaterialId, MaterialLibrary};
use lumen_math::{Aabb, Interval, Mat4Ext, Ray, Transform};

use crate::blas::Blas;
use crate::bvh::Bvh;
use crate::hittable::{HitPayload, Hittable};
use crate::light::Light;
use crate::model::Model;
use crate::primitive::Primitive;
use crate::tlas::Tlas;

/// Everything the renderer traces against.
///
/// Structural edits drop the acceleration structures; call
/// [`Scene::build_acceleration`] before rendering with acceleration on.
/// Until then queries fall back to brute force. The light list is kept in
/// step with every edit that can change which primitives emit.
#[derive(Debug, Default)]
pub struct Scene {
    primitives: Vec<Primitive>,
    instances: Vec<Blas>,
    materials: MaterialLibrary,
    /// Lights of loose emissive primitives
    primitive_lights: Vec<Light>,
    /// Transformed emissive faces of every instance
    instance_lights: Vec<Light>,
    /// Lights added by hand
    extra_lights: Vec<Light>,
    lights: Vec<Light>,
    bvh: Option<Bvh>,
    tlas: Option<Tlas>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_materials(materials: MaterialLibrary) -> Self {
        Self {
            materials,
            ..Default::default()
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = self.materials.add(material);
        // Primitives may already refer to the new id
        self.collect_lights();
        id
    }

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    /// Edit the material library in place, then recollect the lights.
    ///
    /// Geometry does not depend on materials, so the acceleration
    /// structures stay valid.
    pub fn update_materials<R>(&mut self, edit: impl FnOnce(&mut MaterialLibrary) -> R) -> R {
        let result = edit(&mut self.materials);
        self.collect_lights();
        result
    }

    pub fn add_primitive(&mut self, primitive: impl Into<Primitive>) {
        let primitive = primitive.into();
        if let Some(light) = Light::for_primitive(&primitive, &self.materials) {
            self.primitive_lights.push(light);
            self.refresh_lights();
        }
        self.primitives.push(primitive);
        self.invalidate();
    }

    /// Add an instance. Its emissive faces become lights.
    pub fn add_instance(&mut self, instance: Blas) {
        self.instance_lights.extend(instance.lights(&self.materials));
        self.instances.push(instance);
        self.tlas = None;
        self.refresh_lights();
    }

    pub fn add_light(&mut self, light: Light) {
        self.extra_lights.push(light);
        self.refresh_lights();
    }

    /// Place an instance of `model` and register its emissive faces as lights.
    pub fn add_model_instance(&mut self, model: &Model, transform: &Transform) {
        self.add_instance(model.instantiate(transform));
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn instances(&self) -> &[Blas] {
        &self.instances
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    pub fn tlas(&self) -> Option<&Tlas> {
        self.tlas.as_ref()
    }

    pub fn is_accelerated(&self) -> bool {
        self.bvh.is_some() && self.tlas.is_some()
    }

    /// Build the BVH over loose primitives and the TLAS over instances.
    pub fn build_acceleration(&mut self) {
        self.bvh = Some(Bvh::new(self.primitives.clone()));
        self.tlas = Some(Tlas::new(self.instances.clone()));
    }

    /// Closest hit, through the acceleration structures when `accelerate`
    /// is set and they are built, by brute force otherwise.
    pub fn hit_with(
        &self,
        ray: &Ray,
        ray_t: Interval,
        payload: &mut HitPayload,
        accelerate: bool,
    ) -> bool {
        match (&self.bvh, &self.tlas) {
            (Some(bvh), Some(tlas)) if accelerate => {
                let hit_primitive = bvh.hit(ray, ray_t, payload);
                let hit_instance = tlas.hit(ray, ray_t, payload);
                hit_primitive || hit_instance
            }
            _ => {
                let hit_primitive = self.primitives.hit(ray, ray_t, payload);
                let hit_instance = self.instances.hit(ray, ray_t, payload);
                hit_primitive || hit_instance
            }
        }
    }

    /// A traceable view of the scene with a fixed acceleration choice.
    pub fn view(&self, accelerate: bool) -> SceneView<'_> {
        SceneView {
            scene: self,
            accelerate,
        }
    }

    fn invalidate(&mut self) {
        self.bvh = None;
        self.tlas = None;
    }

    fn collect_lights(&mut self) {
        self.primitive_lights = Light::collect(&self.primitives, &self.materials);
        let instance_lights = self
            .instances
            .iter()
            .flat_map(|instance| instance.lights(&self.materials))
            .collect();
        self.instance_lights = instance_lights;
        self.refresh_lights();
    }

    fn refresh_lights(&mut self) {
        self.lights.clear();
        self.lights.extend(self.primitive_lights.iter().cloned());
        self.lights.extend(self.instance_lights.iter().cloned());
        self.lights.extend(self.extra_lights.iter().cloned());
    }
}

/// [`Scene`] bound to an acceleration choice, usable wherever a
/// [`Hittable`] is expected.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    scene: &'a Scene,
    accelerate: bool,
}

impl Hittable for SceneView<'_> {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        self.scene.hit_with(ray, ray_t, payload, self.accelerate)
    }

    fn bounding_box(&self) -> Aabb {
        let primitives = self.scene.primitives.bounding_box();
        let instances = self
            .scene
            .instances
            .iter()
            .fold(Aabb::EMPTY, |acc, instance| {
                Aabb::surrounding(&acc, &instance.bounding_box())
            });
        Aabb::surrounding(&primitives, &instances)
    }
}

impl Hittable for Scene {
    fn hit(&self, ray: &Ray, ray_t: Interval, payload: &mut HitPayload) -> bool {
        self.hit_with(ray, ray_t, payload, true)
    }

    fn bounding_box(&self) -> Aabb {
        self.view(true).bounding_box()
    }
}

/// World-space bounds of a model instance. Used when framing cameras.
pub fn instance_bounds(model: &Model, transform: &Transform) -> Aabb {
    transform.to_matrix().transform_aabb(&model.bvh().bounding_box())
}
