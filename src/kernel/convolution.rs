//! Convolution kernels integrated along a weighted segment
//!
//! Contract: given a [`HomotheticSegment`] and the [`Clip`] bounds where its
//! support is non-empty, return
//!
//! `I = ∫ K(q(s) / R(s)²) / t(s)^k ds` over `[s0, s1]`
//!
//! where `q(s) = |w - s u|²`, `t(s) = R(s) / KS` and `k` is the weighting
//! power (1 for segments, 2 for triangle slices). When the gradient is
//! requested the kernel also returns the two scalars `gw`, `gu` such that
//! `∇_p I = gw * w + gu * u`.
//!
//! Any compact kernel satisfying this contract can replace
//! [`Poly6Convolution`] without touching the primitives.

use super::homothetic::{Clip, HomotheticSegment};
use super::{nf_segment, nf_triangle, KIS};

/// Gauss-Legendre abscissae on `[-1, 1]` (8 points, positive half)
const GL8_X: [f64; 4] = [
    0.183_434_642_495_649_8,
    0.525_532_409_916_329_0,
    0.796_666_477_413_626_7,
    0.960_289_856_497_536_3,
];

/// Gauss-Legendre weights matching [`GL8_X`]
const GL8_W: [f64; 4] = [
    0.362_683_783_378_362_0,
    0.313_706_645_877_887_3,
    0.222_381_034_453_374_5,
    0.101_228_536_290_376_3,
];

/// Relative slope under which the support is treated as constant
const UNIFORM_EPS: f64 = 1e-9;

/// Result of a kernel integration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KernelIntegral {
    /// Integral value
    pub value: f64,
    /// Gradient coefficient on `w = p - a`
    pub gw: f64,
    /// Gradient coefficient on `u = b - a`
    pub gu: f64,
}

impl KernelIntegral {
    /// Accumulate `weight * other`
    #[inline(always)]
    pub fn add_scaled(&mut self, other: &KernelIntegral, weight: f64) {
        self.value += other.value * weight;
        self.gw += other.gw * weight;
        self.gu += other.gu * weight;
    }
}

/// Closed-form or quadrature integral of a compact kernel along a segment
pub trait ConvolutionKernel: std::fmt::Debug + Send + Sync {
    /// Integrate over `clip`; fill `gw`/`gu` iff `gradient`
    fn integrate(
        &self,
        seg: &HomotheticSegment,
        clip: Clip,
        power: i32,
        gradient: bool,
    ) -> KernelIntegral;

    /// Scale making an infinite segment reach `density` at distance `thickness`
    fn segment_normalization(&self) -> f64;

    /// Scale making an infinite plane reach `density` at distance `thickness`
    fn triangle_normalization(&self) -> f64;
}

/// The `(1 - r²)³` kernel
///
/// Constant-thickness segments use the exact polynomial antiderivative;
/// varying thickness makes the integrand rational and falls back to
/// 8-point Gauss-Legendre quadrature on the clipped interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poly6Convolution;

impl ConvolutionKernel for Poly6Convolution {
    fn integrate(
        &self,
        seg: &HomotheticSegment,
        clip: Clip,
        power: i32,
        gradient: bool,
    ) -> KernelIntegral {
        if clip.length() <= 0.0 || seg.r0 <= 0.0 {
            return KernelIntegral::default();
        }
        if seg.dr.abs() <= UNIFORM_EPS * seg.r0 {
            poly6_closed_form(seg, clip, power, gradient)
        } else {
            gauss_legendre(clip, |s| poly6_integrand(seg, s, power, gradient))
        }
    }

    fn segment_normalization(&self) -> f64 {
        nf_segment()
    }

    fn triangle_normalization(&self) -> f64 {
        nf_triangle()
    }
}

/// Integrand of the poly6 kernel at `s` as `(value, gw, gu)` contributions
#[inline(always)]
fn poly6_integrand(seg: &HomotheticSegment, s: f64, power: i32, gradient: bool) -> KernelIntegral {
    let r = seg.support(s);
    if r <= 0.0 {
        return KernelIntegral::default();
    }
    let r2 = r * r;
    let x = seg.squared_distance(s) / r2;
    if x >= 1.0 {
        return KernelIntegral::default();
    }
    let a = 1.0 - x;
    let weight = (r * KIS).powi(-power);
    let mut out = KernelIntegral {
        value: a * a * a * weight,
        ..Default::default()
    };
    if gradient {
        // dK/dq = -3 (1 - x)² / R²
        let dk = -3.0 * a * a / r2 * weight;
        out.gw = 2.0 * dk;
        out.gu = -2.0 * s * dk;
    }
    out
}

/// Composite-free 8-point Gauss-Legendre rule on `clip`
#[inline(always)]
fn gauss_legendre<F>(clip: Clip, mut f: F) -> KernelIntegral
where
    F: FnMut(f64) -> KernelIntegral,
{
    let half = 0.5 * clip.length();
    let mid = 0.5 * (clip.s0 + clip.s1);
    let mut acc = KernelIntegral::default();
    for (x, w) in GL8_X.iter().zip(GL8_W.iter()) {
        acc.add_scaled(&f(mid - half * x), *w);
        acc.add_scaled(&f(mid + half * x), *w);
    }
    acc.value *= half;
    acc.gw *= half;
    acc.gu *= half;
    acc
}

/// Exact integral for constant support radius
///
/// With `P(s) = 1 - q(s)/R²` a quadratic, the value is `∫P³` and the
/// gradient terms are `∫P²` and `∫s P²`, all polynomial antiderivatives.
/// `P` is expanded around the clip midpoint: long segments seen from close
/// by have huge coefficients around `s = 0`, and their cubes cancel badly.
fn poly6_closed_form(
    seg: &HomotheticSegment,
    clip: Clip,
    power: i32,
    gradient: bool,
) -> KernelIntegral {
    let r2 = seg.r0 * seg.r0;
    let inv_r2 = 1.0 / r2;
    let weight = (seg.r0 * KIS).powi(-power);
    let mid = 0.5 * (clip.s0 + clip.s1);
    let local = Clip {
        s0: clip.s0 - mid,
        s1: clip.s1 - mid,
    };
    let p = [
        1.0 - seg.squared_distance(mid) * inv_r2,
        2.0 * (seg.wu - mid * seg.uu) * inv_r2,
        -seg.uu * inv_r2,
    ];
    let p2 = poly_mul::<3, 3, 5>(&p, &p);
    let p3 = poly_mul::<5, 3, 7>(&p2, &p);

    let mut out = KernelIntegral {
        value: poly_integral(&p3, local) * weight,
        ..Default::default()
    };
    if gradient {
        let i_p2 = poly_integral(&p2, local);
        let sp2 = poly_mul::<5, 2, 6>(&p2, &[0.0, 1.0]);
        // ∫ s P² = mid ∫ P² + ∫ σ P² with s = mid + σ
        let i_sp2 = mid * i_p2 + poly_integral(&sp2, local);
        let dk = -3.0 * inv_r2 * weight;
        out.gw = 2.0 * dk * i_p2;
        out.gu = -2.0 * dk * i_sp2;
    }
    out
}

/// Product of two polynomials given by ascending coefficients
#[inline(always)]
fn poly_mul<const N: usize, const M: usize, const R: usize>(
    a: &[f64; N],
    b: &[f64; M],
) -> [f64; R] {
    debug_assert_eq!(R, N + M - 1, "result degree mismatch");
    let mut out = [0.0; R];
    for (i, ai) in a.iter().enumerate() {
        for (j, bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

/// Definite integral of a polynomial over `clip`
#[inline(always)]
fn poly_integral<const N: usize>(coeffs: &[f64; N], clip: Clip) -> f64 {
    let antiderivative = |s: f64| {
        // Horner on the antiderivative c_i s^(i+1) / (i+1)
        let mut acc = 0.0;
        for (i, c) in coeffs.iter().enumerate().rev() {
            acc = acc * s + c / (i + 1) as f64;
        }
        acc * s
    };
    antiderivative(clip.s1) - antiderivative(clip.s0)
}
