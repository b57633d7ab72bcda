//! Safeguarded root finding on scalar fields
//!
//! Three searches for points where the field reaches a target value:
//! - [`safe_newton_3d`]: free Newton steps along the gradient, bounded to a
//!   ball around the start point
//! - [`safe_newton_1d`]: Newton on a bracketed line, falling back to bisection
//! - [`dichotomy_1d`]: plain bisection, no gradient needed
//!
//! Degenerate situations are outcomes, not errors: the caller gets the
//! pre-refinement point back and decides what to do with it.

use crate::types::FieldSample;
use glam::DVec3;
use log::trace;

/// Anything that can be sampled like a blobtree
///
/// Implementations fill `out.value` and every optional slot `out` carries.
/// The contract is total: every point yields a value.
pub trait ScalarField {
    /// Evaluate at `p`
    fn sample(&mut self, p: DVec3, out: &mut FieldSample);

    /// Value only
    fn value(&mut self, p: DVec3) -> f64 {
        let mut out = FieldSample::value_only();
        self.sample(p, &mut out);
        out.value
    }
}

impl<F> ScalarField for F
where
    F: FnMut(DVec3, &mut FieldSample),
{
    #[inline(always)]
    fn sample(&mut self, p: DVec3, out: &mut FieldSample) {
        self(p, out)
    }
}

/// Why a search gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Degeneracy {
    /// The gradient vanished exactly
    ZeroGradient,
    /// The iterate left the allowed ball around the start point
    LeftRadius,
    /// The two abscissae do not straddle the target
    NoBracket,
}

/// How a search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Tolerance reached
    Converged,
    /// Step budget exhausted; the result is the best estimate so far
    MaxSteps,
    /// Aborted; the result is the starting estimate
    Degenerate(Degeneracy),
}

/// Result of a 3D search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    /// Final point (the start point when degenerate)
    pub point: DVec3,
    /// Newton steps taken
    pub steps: usize,
    /// How the search ended
    pub outcome: Outcome,
}

impl Convergence {
    /// Whether the tolerance was reached
    pub fn converged(&self) -> bool {
        self.outcome == Outcome::Converged
    }
}

/// Result of a search along a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineConvergence {
    /// Final abscissa along the line
    pub t: f64,
    /// `origin + t * dir`
    pub point: DVec3,
    /// Iterations taken
    pub steps: usize,
    /// How the search ended
    pub outcome: Outcome,
}

/// Newton iteration along the normalized gradient
///
/// Each step moves by `(target - value) / |gradient|`. Once two consecutive
/// steps undershoot (the field stays on the same side of `target`), steps are
/// at least `epsilon` long. The search stops after two consecutive steps
/// shorter than `epsilon`, after `max_steps` steps, on an exactly zero
/// gradient, or when the iterate leaves the ball of radius `max_radius`
/// around `start`; the last two return `start` unchanged.
pub fn safe_newton_3d<F: ScalarField + ?Sized>(
    field: &mut F,
    start: DVec3,
    target: f64,
    epsilon: f64,
    max_steps: usize,
    max_radius: f64,
) -> Convergence {
    let mut p = start;
    let mut sample = FieldSample::with_gradient();
    let mut prev_diff: Option<f64> = None;
    let mut undershoots = 0;
    let mut small_steps = 0;

    for step in 0..max_steps {
        field.sample(p, &mut sample);
        let diff = target - sample.value;
        let g = sample.gradient.unwrap_or(DVec3::ZERO);
        let g_len = g.length();
        if g_len == 0.0 {
            trace!("newton aborted at step {}: zero gradient at {:?}", step, p);
            return Convergence {
                point: start,
                steps: step,
                outcome: Outcome::Degenerate(Degeneracy::ZeroGradient),
            };
        }

        match prev_diff {
            Some(prev) if prev.signum() == diff.signum() => undershoots += 1,
            _ => undershoots = 0,
        }
        prev_diff = Some(diff);

        let mut length = diff / g_len;
        if undershoots >= 2 && length.abs() < epsilon {
            length = epsilon.copysign(length);
        }
        if length.abs() <= epsilon {
            small_steps += 1;
        } else {
            small_steps = 0;
        }

        p += g * (length / g_len);
        if p.distance(start) > max_radius {
            trace!("newton aborted at step {}: left radius {}", step, max_radius);
            return Convergence {
                point: start,
                steps: step + 1,
                outcome: Outcome::Degenerate(Degeneracy::LeftRadius),
            };
        }
        if small_steps >= 2 {
            return Convergence {
                point: p,
                steps: step + 1,
                outcome: Outcome::Converged,
            };
        }
    }

    Convergence {
        point: p,
        steps: max_steps,
        outcome: Outcome::MaxSteps,
    }
}

/// Value of `field - target` along the line
#[inline(always)]
fn line_sample<F: ScalarField + ?Sized>(
    field: &mut F,
    origin: DVec3,
    dir: DVec3,
    t: f64,
    target: f64,
    sample: &mut FieldSample,
) -> f64 {
    field.sample(origin + dir * t, sample);
    sample.value - target
}

/// Newton on the line `origin + t * dir`, kept inside the bracket `[t0, t1]`
///
/// The bracket shrinks with every iterate using the sign of
/// `value - target`. Steps with a zero directional derivative, or that would
/// leave the bracket, are replaced by bisection. Returns the midpoint of the
/// final bracket when the budget runs out.
pub fn safe_newton_1d<F: ScalarField + ?Sized>(
    field: &mut F,
    origin: DVec3,
    dir: DVec3,
    bracket: (f64, f64),
    target: f64,
    epsilon: f64,
    max_steps: usize,
) -> LineConvergence {
    let done = |t: f64, steps: usize, outcome: Outcome| LineConvergence {
        t,
        point: origin + dir * t,
        steps,
        outcome,
    };
    let mut sample = FieldSample::with_gradient();
    let (mut a, mut b) = bracket;
    let mut fa = line_sample(field, origin, dir, a, target, &mut sample);
    if fa.abs() < epsilon {
        return done(a, 0, Outcome::Converged);
    }
    let fb = line_sample(field, origin, dir, b, target, &mut sample);
    if fb.abs() < epsilon {
        return done(b, 0, Outcome::Converged);
    }
    if fa.signum() == fb.signum() {
        return done(a, 0, Outcome::Degenerate(Degeneracy::NoBracket));
    }

    let mut t = 0.5 * (a + b);
    for step in 0..max_steps {
        let ft = line_sample(field, origin, dir, t, target, &mut sample);
        if ft.abs() < epsilon {
            return done(t, step + 1, Outcome::Converged);
        }
        if ft.signum() == fa.signum() {
            a = t;
            fa = ft;
        } else {
            b = t;
        }

        let slope = sample.gradient.map_or(0.0, |g| g.dot(dir));
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        t = if slope != 0.0 {
            let newton = t - ft / slope;
            if newton > lo && newton < hi {
                newton
            } else {
                0.5 * (a + b)
            }
        } else {
            0.5 * (a + b)
        };
    }
    done(0.5 * (a + b), max_steps, Outcome::MaxSteps)
}

/// Bisection on the line `origin + t * dir` within the bracket `[t0, t1]`
///
/// Stops when `|value - target| < epsilon` or the bracket is shorter than
/// `epsilon`; never looks at the gradient.
pub fn dichotomy_1d<F: ScalarField + ?Sized>(
    field: &mut F,
    origin: DVec3,
    dir: DVec3,
    bracket: (f64, f64),
    target: f64,
    epsilon: f64,
    max_steps: usize,
) -> LineConvergence {
    let done = |t: f64, steps: usize, outcome: Outcome| LineConvergence {
        t,
        point: origin + dir * t,
        steps,
        outcome,
    };
    let mut sample = FieldSample::value_only();
    let (mut a, mut b) = bracket;
    let fa0 = line_sample(field, origin, dir, a, target, &mut sample);
    let fb0 = line_sample(field, origin, dir, b, target, &mut sample);
    if fa0.signum() == fb0.signum() && fa0 != 0.0 && fb0 != 0.0 {
        return done(a, 0, Outcome::Degenerate(Degeneracy::NoBracket));
    }
    let mut fa = fa0;

    for step in 0..max_steps {
        let t = 0.5 * (a + b);
        let ft = line_sample(field, origin, dir, t, target, &mut sample);
        if ft.abs() < epsilon || (b - a).abs() < epsilon {
            return done(t, step + 1, Outcome::Converged);
        }
        if ft.signum() == fa.signum() {
            a = t;
            fa = ft;
        } else {
            b = t;
        }
    }
    done(0.5 * (a + b), max_steps, Outcome::MaxSteps)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Linear ramp along X: value = 2 - x
    fn ramp(p: DVec3, out: &mut FieldSample) {
        out.value = 2.0 - p.x;
        if let Some(g) = out.gradient.as_mut() {
            *g = DVec3::new(-1.0, 0.0, 0.0);
        }
    }

    #[test]
    fn test_newton_3d_linear_converges() {
        let mut f = ramp;
        let c = safe_newton_3d(&mut f, DVec3::new(0.3, 0.5, 0.0), 1.0, 1e-9, 10, 5.0);
        assert!(c.converged());
        assert!((c.point.x - 1.0).abs() < 1e-9);
        assert!((c.point.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_newton_3d_zero_gradient_returns_start() {
        let mut flat = |_: DVec3, out: &mut FieldSample| {
            out.value = 0.5;
            if let Some(g) = out.gradient.as_mut() {
                *g = DVec3::ZERO;
            }
        };
        let start = DVec3::new(1.0, 2.0, 3.0);
        let c = safe_newton_3d(&mut flat, start, 1.0, 1e-6, 10, 1.0);
        assert_eq!(c.point, start);
        assert_eq!(c.outcome, Outcome::Degenerate(Degeneracy::ZeroGradient));
    }

    #[test]
    fn test_newton_3d_radius_guard() {
        let mut f = ramp;
        let start = DVec3::new(-5.0, 0.0, 0.0);
        let c = safe_newton_3d(&mut f, start, 1.0, 1e-9, 10, 1.0);
        assert_eq!(c.point, start);
        assert_eq!(c.outcome, Outcome::Degenerate(Degeneracy::LeftRadius));
    }

    #[test]
    fn test_newton_1d_and_dichotomy() {
        let mut f = ramp;
        let n = safe_newton_1d(&mut f, DVec3::ZERO, DVec3::X, (0.0, 2.0), 0.5, 1e-10, 20);
        assert!(matches!(n.outcome, Outcome::Converged));
        assert!((n.t - 1.5).abs() < 1e-9);

        let d = dichotomy_1d(&mut f, DVec3::ZERO, DVec3::X, (0.0, 2.0), 0.3, 1e-8, 100);
        assert!((d.t - 1.7).abs() < 1e-7);
    }

    #[test]
    fn test_no_bracket() {
        let mut f = ramp;
        let n = safe_newton_1d(&mut f, DVec3::ZERO, DVec3::X, (0.0, 0.5), 0.5, 1e-10, 20);
        assert_eq!(n.outcome, Outcome::Degenerate(Degeneracy::NoBracket));
    }
}
