//! Value-level operations on sampled curves: normalization, range mapping,
//! Ramer–Douglas–Peucker simplification and point-curve reshaping.

use crate::error::Result;
use crate::model::{Curve, CurvePoint, PointCurve};
use crate::util::lerp;

use super::grid;

/// Map values onto [0, 1] by their own min/max. Constant (or single-value)
/// input maps to 0.5 everywhere.
pub fn normalize_to_unit_range(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let span = max - min;
    if !span.is_finite() || span <= f64::EPSILON {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / span).collect()
}

/// Map normalized values linearly onto [min, max].
pub fn linear_map_to_range(values: &[f64], min: f64, max: f64) -> Vec<f64> {
    values.iter().map(|v| lerp(min, max, *v)).collect()
}

/// Normalize, then map onto [min, max].
pub fn auto_fit_to_range(values: &[f64], min: f64, max: f64) -> Vec<f64> {
    linear_map_to_range(&normalize_to_unit_range(values), min, max)
}

/// Ramer–Douglas–Peucker simplification. Distances are measured after
/// scaling t by `scale_t` and v by `scale_v`, so `epsilon` can be given in
/// device units. Both endpoints are always kept.
pub fn simplify_rdp(points: &[CurvePoint], epsilon: f64, scale_t: f64, scale_v: f64) -> Vec<CurvePoint> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let scaled: Vec<(f64, f64)> = points.iter().map(|p| (p.t() * scale_t, p.v() * scale_v)).collect();
    let mut keep = vec![false; points.len()];
    mark_rdp(&scaled, 0, points.len() - 1, epsilon, &mut keep);
    if let Some(first) = keep.first_mut() {
        *first = true;
    }
    if let Some(last) = keep.last_mut() {
        *last = true;
    }
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

fn mark_rdp(points: &[(f64, f64)], start: usize, end: usize, epsilon: f64, keep: &mut [bool]) {
    if end <= start + 1 {
        return;
    }
    let (Some(&a), Some(&b)) = (points.get(start), points.get(end)) else {
        return;
    };
    let mut farthest = (start, 0.0);
    for i in start + 1..end {
        let Some(&p) = points.get(i) else { continue };
        let d = perpendicular_distance(p, a, b);
        if d > farthest.1 {
            farthest = (i, d);
        }
    }
    if farthest.1 > epsilon {
        if let Some(k) = keep.get_mut(farthest.0) {
            *k = true;
        }
        mark_rdp(points, start, farthest.0, epsilon, keep);
        mark_rdp(points, farthest.0, end, epsilon, keep);
    }
}

fn perpendicular_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = dx.hypot(dy);
    if len <= f64::EPSILON {
        return (p.0 - a.0).hypot(p.1 - a.1);
    }
    ((p.0 - a.0) * dy - (p.1 - a.1) * dx).abs() / len
}

/// Evaluate a point curve on a uniform grid of `n` samples (at least 2).
pub fn resample(curve: &PointCurve, n: usize) -> Vec<CurvePoint> {
    grid(n.max(2))
        .map(|t| CurvePoint::clamped_overshoot(t, curve.evaluate(t)))
        .collect()
}

/// Rotate a curve in time: the result at t is the source at (t + phase) mod 1.
pub fn phase_shift(curve: &Curve, phase: f64, n: usize) -> Result<PointCurve> {
    let phase = phase.rem_euclid(1.0);
    PointCurve::new(
        grid(n.max(2))
            .map(|t| {
                let src = (t + phase).rem_euclid(1.0);
                // keep the final sample on the source's end value for full-period shifts
                let src = if t >= 1.0 && src == 0.0 { 1.0 } else { src };
                CurvePoint::clamped_overshoot(t, curve.evaluate(src))
            })
            .collect(),
    )
}

/// The portion of `curve` over [a, b], re-normalized onto [0, 1]. Point
/// curves keep their interior breakpoints exactly; generators are sampled.
pub fn window(curve: &Curve, a: f64, b: f64, n: usize) -> Result<PointCurve> {
    let a = a.clamp(0.0, 1.0);
    let b = b.clamp(a, 1.0);
    let span = b - a;
    if span <= f64::EPSILON {
        return Ok(PointCurve::constant(curve.evaluate(a)));
    }
    let points = match curve {
        Curve::Points(pc) => {
            let mut pts = vec![CurvePoint::clamped_overshoot(0.0, pc.evaluate(a))];
            pts.extend(
                pc.points()
                    .iter()
                    .filter(|p| p.t() > a && p.t() < b)
                    .map(|p| CurvePoint::clamped_overshoot((p.t() - a) / span, p.v())),
            );
            pts.push(CurvePoint::clamped_overshoot(1.0, pc.evaluate(b)));
            pts
        }
        Curve::Native(_) => grid(n.max(2))
            .map(|t| CurvePoint::clamped_overshoot(t, curve.evaluate(a + span * t)))
            .collect(),
    };
    PointCurve::new(points)
}
