//! Ricci power blend
//!
//! `value = (Σ vᵢⁿ)^(1/n)` over the children with a positive value. The sum
//! is kept relative to the running maximum so that large powers (the root
//! uses 64) neither overflow nor lose the smaller contributions.

use crate::material::Material;
use crate::types::FieldSample;
use glam::DVec3;

/// Power used by the root node: an effectively-max blend
pub const ROOT_RICCI_POWER: f64 = 64.0;

/// Streaming accumulator for one Ricci evaluation
#[derive(Debug, Clone, Copy)]
pub struct RicciAccumulator {
    power: f64,
    /// Largest child value seen so far
    max: f64,
    /// `Σ (v / max)ⁿ`
    sum: f64,
    /// `Σ (v / max)ⁿ⁻¹ ∇v`
    gradient: DVec3,
    /// `Σ (v / max)ⁿ m`
    material: Material,
}

impl RicciAccumulator {
    /// Start an empty blend of power `power`
    #[inline(always)]
    pub fn new(power: f64) -> Self {
        RicciAccumulator {
            power,
            max: 0.0,
            sum: 0.0,
            gradient: DVec3::ZERO,
            material: Material::ZERO,
        }
    }

    /// Add one child sample; non-positive values are ignored
    #[inline]
    pub fn add(&mut self, sample: &FieldSample) {
        let v = sample.value;
        if v <= 0.0 {
            return;
        }
        if v > self.max {
            if self.max > 0.0 {
                let ratio = self.max / v;
                let rn = ratio.powf(self.power);
                self.sum *= rn;
                self.gradient *= rn / ratio;
                self.material = self.material.scaled(rn);
            }
            self.max = v;
        }
        let r = v / self.max;
        let rn1 = r.powf(self.power - 1.0);
        let rn = rn1 * r;
        self.sum += rn;
        if let Some(g) = sample.gradient {
            self.gradient += g * rn1;
        }
        if let Some(m) = sample.material.as_ref() {
            self.material.add_weighted(m, rn);
        }
    }

    /// Blended value, or 0 when nothing was accumulated
    #[inline(always)]
    pub fn value(&self) -> f64 {
        if self.sum > 0.0 {
            self.max * self.sum.powf(1.0 / self.power)
        } else {
            0.0
        }
    }

    /// Write the blend into the requested slots of `out` (the step slot is untouched)
    pub fn finish(&self, out: &mut FieldSample) {
        if self.sum <= 0.0 {
            out.set_neutral();
            return;
        }
        out.value = self.value();
        if let Some(g) = out.gradient.as_mut() {
            // ∇ = (Σ vⁿ)^(1/n - 1) Σ vⁿ⁻¹ ∇v, with the max factored out
            *g = self.gradient * self.sum.powf(1.0 / self.power - 1.0);
        }
        if let Some(m) = out.material.as_mut() {
            *m = self.material.scaled(1.0 / self.sum);
        }
    }
}

/// Ricci blend of plain values
pub fn ricci_blend(values: &[f64], power: f64) -> f64 {
    let mut acc = RicciAccumulator::new(power);
    for &v in values {
        acc.add(&FieldSample {
            value: v,
            ..Default::default()
        });
    }
    acc.value()
}
