//! Blendable surface material
//!
//! A metallic-roughness triple that follows the scalar field through every
//! blend: weighted means where fields are summed, linear interpolation along
//! primitive parametrizations.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Surface appearance carried by the field
///
/// Uses the metallic-roughness workflow (glTF 2.0 / UE5 / Unity HDRP).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Base color (RGB, linear space)
    pub color: DVec3,
    /// Roughness factor (0.0 = mirror, 1.0 = diffuse)
    pub roughness: f64,
    /// Metallic factor (0.0 = dielectric, 1.0 = metal)
    pub metalness: f64,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            color: DVec3::ONE,
            roughness: 0.5,
            metalness: 0.0,
        }
    }
}

impl Material {
    /// All channels zero; the identity for weighted accumulation
    pub const ZERO: Material = Material {
        color: DVec3::ZERO,
        roughness: 0.0,
        metalness: 0.0,
    };

    /// Create a material
    pub fn new(color: DVec3, roughness: f64, metalness: f64) -> Self {
        Material {
            color,
            roughness,
            metalness,
        }
    }

    /// Dielectric material with the given color
    pub fn with_color(r: f64, g: f64, b: f64) -> Self {
        Material {
            color: DVec3::new(r, g, b),
            ..Default::default()
        }
    }

    /// Linear interpolation, `t = 0` gives `self`
    #[inline(always)]
    pub fn lerp(&self, other: &Material, t: f64) -> Material {
        Material {
            color: self.color.lerp(other.color, t),
            roughness: self.roughness + (other.roughness - self.roughness) * t,
            metalness: self.metalness + (other.metalness - self.metalness) * t,
        }
    }

    /// Barycentric interpolation of three materials
    #[inline(always)]
    pub fn barycentric(m: &[Material; 3], w: DVec3) -> Material {
        let mut out = Material::ZERO;
        out.add_weighted(&m[0], w.x);
        out.add_weighted(&m[1], w.y);
        out.add_weighted(&m[2], w.z);
        out
    }

    /// Accumulate `weight * other` into `self`
    #[inline(always)]
    pub fn add_weighted(&mut self, other: &Material, weight: f64) {
        self.color += other.color * weight;
        self.roughness += other.roughness * weight;
        self.metalness += other.metalness * weight;
    }

    /// Multiply every channel by `s`
    #[inline(always)]
    pub fn scaled(&self, s: f64) -> Material {
        Material {
            color: self.color * s,
            roughness: self.roughness * s,
            metalness: self.metalness * s,
        }
    }

    /// Weighted mean of materials
    ///
    /// Returns the default material when the weights sum to zero.
    pub fn weighted_mean(materials: &[Material], weights: &[f64]) -> Material {
        let mut acc = Material::ZERO;
        let mut total = 0.0;
        for (m, &w) in materials.iter().zip(weights) {
            acc.add_weighted(m, w);
            total += w;
        }
        if total == 0.0 {
            Material::default()
        } else {
            acc.scaled(1.0 / total)
        }
    }

    /// Color as `[f32; 3]` for mesh buffers
    pub fn color_f32(&self) -> [f32; 3] {
        [self.color.x as f32, self.color.y as f32, self.color.z as f32]
    }
}
