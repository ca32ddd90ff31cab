//! Materials and the library that owns them.
//!
//! Primitives refer to materials through a [`MaterialId`]. The id is stable:
//! it survives removals of other materials and is what scene files store.
//! Storage position (the slot) is an implementation detail of
//! [`MaterialLibrary`] and may change on every removal.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lumen_math::{Vec2, Vec3};
use thiserror::Error;

use crate::texture::Texture;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MaterialError {
    #[error("Material id {0} is already in use")]
    DuplicateId(MaterialId),

    #[error("Unknown material id {0}")]
    Unknown(MaterialId),
}

/// Stable handle to a material in a [`MaterialLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A material input: a constant or an image looked up by UV.
#[derive(Clone, Debug)]
pub enum TextureSlot {
    Constant(Vec3),
    Image(Arc<Texture>),
}

impl TextureSlot {
    pub fn scalar(value: f32) -> Self {
        Self::Constant(Vec3::splat(value))
    }

    /// Color value at a texture coordinate.
    pub fn color(&self, uv: Vec2) -> Vec3 {
        match self {
            Self::Constant(c) => *c,
            Self::Image(texture) => texture.sample(uv),
        }
    }

    /// Single-channel value (red) at a texture coordinate.
    pub fn value(&self, uv: Vec2) -> f32 {
        match self {
            Self::Constant(c) => c.x,
            Self::Image(texture) => texture.sample_channel(uv, 0),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

/// A metallic/roughness PBR material.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,

    /// Base color (linear RGB, 0-1)
    pub albedo: TextureSlot,

    /// Metallic factor (0=dielectric, 1=metal)
    pub metallic: TextureSlot,

    /// Dielectric specular level, scales F0 = 0.08 * specular
    pub specular: TextureSlot,

    /// Perceptual roughness (0=smooth, 1=rough)
    pub roughness: TextureSlot,

    /// Tangent-space normal map
    pub bump: Option<Arc<Texture>>,

    pub emission_color: Vec3,
    pub emission_power: f32,

    id: MaterialId,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo: TextureSlot::Constant(Vec3::splat(0.5)), // Grey default
            metallic: TextureSlot::scalar(0.0),
            specular: TextureSlot::scalar(0.5),
            roughness: TextureSlot::scalar(0.5),
            bump: None,
            emission_color: Vec3::ONE,
            emission_power: 0.0,
            id: MaterialId(u32::MAX),
        }
    }
}

impl Material {
    /// Create a new material with just a name and albedo color.
    pub fn new(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            albedo: TextureSlot::Constant(albedo),
            ..Default::default()
        }
    }

    pub fn with_albedo_texture(mut self, texture: Arc<Texture>) -> Self {
        self.albedo = TextureSlot::Image(texture);
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = TextureSlot::scalar(metallic);
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = TextureSlot::scalar(roughness);
        self
    }

    pub fn with_roughness_texture(mut self, texture: Arc<Texture>) -> Self {
        self.roughness = TextureSlot::Image(texture);
        self
    }

    pub fn with_specular(mut self, specular: f32) -> Self {
        self.specular = TextureSlot::scalar(specular);
        self
    }

    pub fn with_bump(mut self, normal_map: Arc<Texture>) -> Self {
        self.bump = Some(normal_map);
        self
    }

    pub fn with_emission(mut self, color: Vec3, power: f32) -> Self {
        self.emission_color = color;
        self.emission_power = power;
        self
    }

    /// Stable id assigned by the owning library.
    pub fn id(&self) -> MaterialId {
        self.id
    }

    /// Emitted radiance, `emission_color * emission_power`.
    pub fn emission(&self) -> Vec3 {
        self.emission_color * self.emission_power
    }

    pub fn is_emissive(&self) -> bool {
        self.emission().max_element() > 0.0
    }

    pub fn has_textures(&self) -> bool {
        self.albedo.is_image()
            || self.metallic.is_image()
            || self.specular.is_image()
            || self.roughness.is_image()
            || self.bump.is_some()
    }
}

/// Owns every material of a scene.
///
/// Lookups by id go through an id-to-slot map, so ids may be sparse.
#[derive(Clone, Debug, Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    slots: HashMap<MaterialId, usize>,
    next_id: u32,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material under a fresh id.
    pub fn add(&mut self, mut material: Material) -> MaterialId {
        // Only wraps once u32::MAX has been handed out; skip ids still in use
        while self.contains(MaterialId(self.next_id)) {
            self.next_id = self.next_id.wrapping_add(1);
        }
        let id = MaterialId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        material.id = id;
        self.bind(id, self.materials.len());
        self.materials.push(material);
        id
    }

    /// Add a material under an id chosen by the caller (scene loading).
    pub fn insert_with_id(
        &mut self,
        id: MaterialId,
        mut material: Material,
    ) -> Result<(), MaterialError> {
        if self.contains(id) {
            return Err(MaterialError::DuplicateId(id));
        }

        material.id = id;
        self.bind(id, self.materials.len());
        self.materials.push(material);
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        Ok(())
    }

    /// Remove a material. Other ids stay valid; slots may move.
    pub fn remove(&mut self, id: MaterialId) -> Result<Material, MaterialError> {
        let slot = self.slots.remove(&id).ok_or(MaterialError::Unknown(id))?;

        let removed = self.materials.swap_remove(slot);
        if let Some(moved) = self.materials.get(slot) {
            let moved_id = moved.id;
            self.bind(moved_id, slot);
        }
        Ok(removed)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.slot_of(id).map(|slot| &self.materials[slot])
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.slot_of(id).map(|slot| &mut self.materials[slot])
    }

    /// Current storage position of a material.
    pub fn slot_of(&self, id: MaterialId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub fn contains(&self, id: MaterialId) -> bool {
        self.slot_of(id).is_some()
    }

    pub fn find_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials.iter().find(|m| m.name == name).map(|m| m.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    fn bind(&mut self, id: MaterialId, slot: usize) {
        self.slots.insert(id, slot);
    }
}
