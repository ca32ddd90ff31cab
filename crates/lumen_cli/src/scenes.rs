//! Built-in demo scenes.

use std::f32::consts::PI;
use std::str::FromStr;

use anyhow::{bail, Result};
use lumen_core::{Material, MaterialId, Mesh};
use lumen_math::{Transform, Vec2, Vec3};
use lumen_renderer::{Camera, Cuboid, Model, Scene, Sphere, Triangle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    /// Closed box with colored walls, a ceiling light, two blocks and a sphere
    Cornell,
    /// Grid of mesh instances sharing one BVH, lit by a sphere light
    Instances,
}

impl FromStr for SceneKind {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "cornell" => Ok(Self::Cornell),
            "instances" => Ok(Self::Instances),
            other => bail!("Unknown scene '{}' (expected 'cornell' or 'instances')", other),
        }
    }
}

/// Build a scene and a camera framing it. Acceleration structures are built.
pub fn build(kind: SceneKind, width: u32, height: u32) -> Result<(Scene, Camera)> {
    let (mut scene, camera) = match kind {
        SceneKind::Cornell => cornell(width, height),
        SceneKind::Instances => instances(width, height)?,
    };
    scene.build_acceleration();
    Ok((scene, camera))
}

/// Two triangles spanning `a`, `b`, `c`, `d` in order.
fn add_quad(scene: &mut Scene, [a, b, c, d]: [Vec3; 4], material: MaterialId) {
    scene.add_primitive(Triangle::new(a, b, c, material));
    scene.add_primitive(Triangle::new(a, c, d, material));
}

fn cornell(width: u32, height: u32) -> (Scene, Camera) {
    let mut scene = Scene::new();
    let white = scene.add_material(Material::new("white", Vec3::new(0.73, 0.73, 0.73)).with_roughness(0.9));
    let red = scene.add_material(Material::new("red", Vec3::new(0.65, 0.05, 0.05)).with_roughness(0.9));
    let green = scene.add_material(Material::new("green", Vec3::new(0.12, 0.45, 0.15)).with_roughness(0.9));
    let metal = scene.add_material(
        Material::new("metal", Vec3::new(0.9, 0.8, 0.6))
            .with_metallic(1.0)
            .with_roughness(0.15),
    );
    let lamp = scene.add_material(
        Material::new("lamp", Vec3::ONE).with_emission(Vec3::new(1.0, 0.85, 0.7), 15.0),
    );

    let corner = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);

    // Floor, ceiling, back wall, left (red) and right (green) walls
    add_quad(&mut scene, [corner(-1.0, 0.0, -1.0), corner(1.0, 0.0, -1.0), corner(1.0, 0.0, 1.0), corner(-1.0, 0.0, 1.0)], white);
    add_quad(&mut scene, [corner(-1.0, 2.0, -1.0), corner(-1.0, 2.0, 1.0), corner(1.0, 2.0, 1.0), corner(1.0, 2.0, -1.0)], white);
    add_quad(&mut scene, [corner(-1.0, 0.0, -1.0), corner(-1.0, 2.0, -1.0), corner(1.0, 2.0, -1.0), corner(1.0, 0.0, -1.0)], white);
    add_quad(&mut scene, [corner(-1.0, 0.0, -1.0), corner(-1.0, 0.0, 1.0), corner(-1.0, 2.0, 1.0), corner(-1.0, 2.0, -1.0)], red);
    add_quad(&mut scene, [corner(1.0, 0.0, -1.0), corner(1.0, 2.0, -1.0), corner(1.0, 2.0, 1.0), corner(1.0, 0.0, 1.0)], green);

    // Ceiling light, slightly below the ceiling
    add_quad(&mut scene, [corner(-0.25, 1.99, -0.25), corner(0.25, 1.99, -0.25), corner(0.25, 1.99, 0.25), corner(-0.25, 1.99, 0.25)], lamp);

    scene.add_primitive(Cuboid::new(Vec3::new(-0.7, 0.0, -0.6), Vec3::new(-0.1, 1.2, 0.0), white));
    scene.add_primitive(Cuboid::new(Vec3::new(0.1, 0.0, 0.1), Vec3::new(0.6, 0.5, 0.6), white));
    scene.add_primitive(Sphere::new(Vec3::new(0.35, 0.8, 0.35), 0.3, metal));

    let camera = Camera::new(Vec3::new(0.0, 1.0, 3.9), Vec3::new(0.0, 1.0, 0.0), width, height)
        .with_vfov(40.0);
    (scene, camera)
}

/// Smooth UV sphere mesh of unit radius.
fn uv_sphere(rings: u32, segments: u32, material: MaterialId) -> Mesh {
    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let theta = v * PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let phi = u * 2.0 * PI;
            positions.push(Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()));
            uvs.push(Vec2::new(u, 1.0 - v));
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }

    let mut mesh = Mesh::new(positions, indices, material).with_uvs(uvs);
    mesh.compute_normals();
    mesh
}

fn instances(width: u32, height: u32) -> Result<(Scene, Camera)> {
    let mut scene = Scene::new();
    let ground = scene.add_material(Material::new("ground", Vec3::new(0.4, 0.4, 0.45)).with_roughness(0.8));
    let clay = scene.add_material(Material::new("clay", Vec3::new(0.8, 0.35, 0.2)).with_roughness(0.5));
    let chrome = scene.add_material(
        Material::new("chrome", Vec3::splat(0.95))
            .with_metallic(1.0)
            .with_roughness(0.1),
    );
    let lamp = scene.add_material(Material::new("lamp", Vec3::ONE).with_emission(Vec3::ONE, 30.0));

    scene.add_primitive(Cuboid::new(Vec3::new(-20.0, -1.0, -20.0), Vec3::new(20.0, 0.0, 20.0), ground));
    scene.add_primitive(Sphere::new(Vec3::new(2.0, 6.0, 3.0), 1.0, lamp));

    let clay_model = Model::new(vec![uv_sphere(16, 32, clay)], scene.materials())?;
    let chrome_model = Model::new(vec![uv_sphere(16, 32, chrome)], scene.materials())?;

    for row in 0..5 {
        for column in 0..5 {
            let model = if (row + column) % 2 == 0 { &clay_model } else { &chrome_model };
            let transform = Transform::from_translation(Vec3::new(
                column as f32 * 2.5 - 5.0,
                1.0,
                row as f32 * -2.5 + 2.0,
            ))
            .with_rotation_degrees(Vec3::new(0.0, (row * 5 + column) as f32 * 15.0, 0.0));
            scene.add_model_instance(model, &transform);
        }
    }

    let camera = Camera::new(Vec3::new(0.0, 6.0, 12.0), Vec3::new(0.0, 0.5, -3.0), width, height)
        .with_vfov(45.0);
    Ok((scene, camera))
}
