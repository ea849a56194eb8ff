//! Value-curve strings in the show-control device's settings format.
//!
//! Two forms exist. The custom form carries an explicit point list
//! (`Values=t:v;t:v;...`); the native form names one of the device's own
//! parametric shapes and its `P1..P4`.

use std::fmt::Write as _;

use crate::curves::native::NativeCurveType;
use crate::curves::ops::simplify_rdp;
use crate::model::CurvePoint;

/// Points closer than this to 0 or 1 count as sitting on the boundary.
const ANCHOR_TOLERANCE: f64 = 0.01;

/// Device value range of a curve and whether the device should read it
/// reversed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveRange {
    pub min: f64,
    pub max: f64,
    pub reversed: bool,
}

impl CurveRange {
    pub fn dmx() -> Self {
        Self {
            min: 0.0,
            max: 255.0,
            reversed: false,
        }
    }
}

fn header(name: &str, kind: &str, range: CurveRange) -> String {
    format!(
        "Active=TRUE|Id=ID_VALUECURVE_{name}|Type={kind}|Min={:.2}|Max={:.2}|",
        range.min, range.max
    )
}

fn flag(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Round to the device's two-decimal grid, merge points that collapse onto
/// the same time and anchor both ends.
pub fn device_points(points: &[CurvePoint]) -> Vec<(f64, f64)> {
    let round = |x: f64| (x.clamp(0.0, 1.0) * 100.0).round() / 100.0;
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(points.len() + 2);
    for p in points {
        let (t, v) = (round(p.t()), round(p.v()));
        match out.last_mut() {
            Some(last) if (last.0 - t).abs() < f64::EPSILON => last.1 = v,
            _ => out.push((t, v)),
        }
    }
    if let Some(&(t, v)) = out.first() {
        if t > ANCHOR_TOLERANCE {
            out.insert(0, (0.0, v));
        }
    }
    if let Some(&(t, v)) = out.last() {
        if t < 1.0 - ANCHOR_TOLERANCE {
            out.push((1.0, v));
        }
    }
    out
}

/// Custom point-list curve. Points are normalized (t and v in [0, 1]) and
/// simplified with RDP at `epsilon` before rounding.
pub fn custom_curve(name: &str, points: &[CurvePoint], range: CurveRange, epsilon: f64) -> String {
    let simplified = simplify_rdp(points, epsilon, 1.0, 1.0);
    let mut s = header(name, "Custom", range);
    let _ = write!(s, "RV={}|Values=", flag(range.reversed));
    let values: Vec<String> = device_points(&simplified)
        .into_iter()
        .map(|(t, v)| format!("{t:.2}:{v:.2}"))
        .collect();
    s.push_str(&values.join(";"));
    s.push('|');
    s
}

/// Native parametric curve.
pub fn native_curve(name: &str, kind: NativeCurveType, params: [f64; 4], range: CurveRange) -> String {
    let mut s = header(name, kind.device_name(), range);
    for (i, p) in params.iter().enumerate() {
        let _ = write!(s, "P{}={p:.2}|", i + 1);
    }
    let _ = write!(s, "RV={}|", flag(range.reversed));
    s
}
