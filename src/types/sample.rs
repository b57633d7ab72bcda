//! Field result record
//!
//! Callers decide which outputs they pay for by which slots they allocate:
//! `value` is always written, the optional slots only when present.

use crate::material::Material;
use glam::DVec3;

/// Output of one field evaluation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldSample {
    /// Scalar field value (0 is the neutral "empty space" value)
    pub value: f64,
    /// Field gradient, filled iff requested
    pub gradient: Option<DVec3>,
    /// Blended material, filled iff requested
    pub material: Option<Material>,
    /// Conservative distance to the nearest possibly non-neutral point,
    /// filled iff requested
    pub step: Option<f64>,
}

impl FieldSample {
    /// Request the value only
    pub fn value_only() -> Self {
        FieldSample::default()
    }

    /// Request value and gradient
    pub fn with_gradient() -> Self {
        FieldSample {
            gradient: Some(DVec3::ZERO),
            ..Default::default()
        }
    }

    /// Request value, gradient and material
    pub fn full() -> Self {
        FieldSample {
            gradient: Some(DVec3::ZERO),
            material: Some(Material::default()),
            ..Default::default()
        }
    }

    /// Add the material slot to this request
    pub fn and_material(mut self) -> Self {
        self.material = Some(Material::default());
        self
    }

    /// Add the safe-step slot to this request
    pub fn and_step(mut self) -> Self {
        self.step = Some(0.0);
        self
    }

    /// Same slots as `other`, all reset
    #[inline(always)]
    pub fn request_like(other: &FieldSample) -> Self {
        FieldSample {
            value: 0.0,
            gradient: other.gradient.map(|_| DVec3::ZERO),
            material: other.material.map(|_| Material::default()),
            step: other.step.map(|_| 0.0),
        }
    }

    /// Write the neutral result into every requested slot
    #[inline(always)]
    pub fn set_neutral(&mut self) {
        self.value = 0.0;
        if let Some(g) = self.gradient.as_mut() {
            *g = DVec3::ZERO;
        }
        if let Some(m) = self.material.as_mut() {
            *m = Material::default();
        }
    }

    /// Whether the gradient slot is present
    #[inline(always)]
    pub fn wants_gradient(&self) -> bool {
        self.gradient.is_some()
    }

    /// Whether the material slot is present
    #[inline(always)]
    pub fn wants_material(&self) -> bool {
        self.material.is_some()
    }

    /// Whether the step slot is present
    #[inline(always)]
    pub fn wants_step(&self) -> bool {
        self.step.is_some()
    }
}
