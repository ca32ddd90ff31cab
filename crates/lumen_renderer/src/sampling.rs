//! Importance sampling helpers.
//!
//! All randomness comes from an explicit generator argument so that every
//! worker thread can own its own seeded `StdRng`.

use std::f32::consts::PI;

use lumen_math::{Vec2, Vec3};
use rand::Rng;

/// Uniform float in `[0, 1)`.
#[inline]
pub fn random_f32<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>()
}

/// Derive a generator seed from several integers (SplitMix64 finalizer per step).
pub fn mix_seed(parts: &[u64]) -> u64 {
    parts.iter().fold(0x9E37_79B9_7F4A_7C15u64, |acc, &part| {
        let mut z = acc ^ part.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    })
}

/// Two uniform floats in `[0, 1)`.
#[inline]
pub fn random_vec2<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    Vec2::new(rng.gen::<f32>(), rng.gen::<f32>())
}

/// Orthonormal tangent and bitangent around a unit normal.
pub fn tangent_frame(n: Vec3) -> (Vec3, Vec3) {
    let up = if n.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let tangent = up.cross(n).normalize();
    let bitangent = n.cross(tangent);
    (tangent, bitangent)
}

/// Rotate a vector from the local frame (z = normal) to world space.
#[inline]
pub fn to_world(local: Vec3, n: Vec3) -> Vec3 {
    let (tangent, bitangent) = tangent_frame(n);
    tangent * local.x + bitangent * local.y + n * local.z
}

/// Cosine-weighted direction in the hemisphere around `n`. PDF is `cos / pi`.
pub fn cosine_hemisphere(n: Vec3, u: Vec2) -> Vec3 {
    let cos_theta = u.x.sqrt();
    let sin_theta = (1.0 - u.x).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;

    to_world(Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta), n)
}

/// GGX-distributed microfacet normal around `n` for `alpha = roughness^2`.
///
/// The density of the returned half vector is `D(h) * dot(n, h)`.
pub fn ggx_half_vector(n: Vec3, alpha: f32, u: Vec2) -> Vec3 {
    let a2 = alpha * alpha;
    let cos_theta = ((1.0 - u.x) / (1.0 + (a2 - 1.0) * u.x)).max(0.0).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;

    to_world(Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta), n)
}

/// Mirror `v` (pointing away from the surface) about `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    2.0 * v.dot(n) * n - v
}

/// Uniform direction on the unit sphere.
pub fn uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tangent_frame_is_orthonormal() {
        for n in [Vec3::Z, Vec3::NEG_Z, Vec3::X, Vec3::new(0.3, -0.4, 0.866).normalize()] {
            let (t, b) = tangent_frame(n);
            assert!(t.dot(n).abs() < 1e-5);
            assert!(b.dot(n).abs() < 1e-5);
            assert!(t.dot(b).abs() < 1e-5);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!((b.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cosine_hemisphere_mean_cosine() {
        // E[cos] under a cos/pi density is 2/3
        let n = Vec3::new(1.0, 1.0, 0.0).normalize();
        let mut rng = StdRng::seed_from_u64(42);
        let samples = 20_000;

        let mut sum = 0.0;
        for _ in 0..samples {
            let d = cosine_hemisphere(n, random_vec2(&mut rng));
            assert!(d.dot(n) >= -1e-5);
            assert!((d.length() - 1.0).abs() < 1e-4);
            sum += d.dot(n);
        }
        let mean = sum / samples as f32;
        assert!((mean - 2.0 / 3.0).abs() < 0.01, "mean cosine {}", mean);
    }

    #[test]
    fn test_ggx_half_vector_concentrates_with_low_roughness() {
        let mut rng = StdRng::seed_from_u64(42);
        let mean_cos = |alpha: f32, rng: &mut StdRng| {
            (0..5_000)
                .map(|_| ggx_half_vector(Vec3::Y, alpha, random_vec2(rng)).dot(Vec3::Y))
                .sum::<f32>()
                / 5_000.0
        };

        let smooth = mean_cos(0.05, &mut rng);
        let rough = mean_cos(0.8, &mut rng);
        assert!(smooth > 0.97, "smooth {}", smooth);
        assert!(rough < smooth);
    }

    #[test]
    fn test_reflect() {
        let v = Vec3::new(1.0, 1.0, 0.0).normalize();
        let r = reflect(v, Vec3::Y);
        assert!((r - Vec3::new(-1.0, 1.0, 0.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn test_mix_seed_depends_on_every_part() {
        let base = mix_seed(&[1, 2, 3]);
        assert_eq!(base, mix_seed(&[1, 2, 3]));
        assert_ne!(base, mix_seed(&[1, 2, 4]));
        assert_ne!(base, mix_seed(&[0, 2, 3]));
        assert_ne!(mix_seed(&[1, 2]), mix_seed(&[2, 1]));
    }

    #[test]
    fn test_uniform_sphere_is_unit() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!((uniform_sphere(random_vec2(&mut rng)).length() - 1.0).abs() < 1e-4);
        }
    }
}
