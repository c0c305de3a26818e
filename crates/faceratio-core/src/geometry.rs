//! Distance, angle and ratio helpers over 2D points.

use crate::types::Point;

/// Added to denominators that may collapse to zero on degenerate landmarks.
pub const EPSILON: f64 = 1e-9;

/// Euclidean distance between two points.
pub fn dist(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Angle in degrees at `vertex` between the rays towards `a` and `b`.
///
/// Coincident points yield 90° (cosine of 0) rather than NaN.
pub fn angle_deg(a: Point, vertex: Point, b: Point) -> f64 {
    let v1 = a - vertex;
    let v2 = b - vertex;
    let dot = v1.x * v2.x + v1.y * v2.y;
    let cos = dot / (v1.x.hypot(v1.y) * v2.x.hypot(v2.y) + EPSILON);
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// `numerator / denominator` with [`EPSILON`] added to the denominator.
pub fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    numerator / (denominator + EPSILON)
}

/// Relative difference `|a - b| / max(a, b)` as a percentage.
///
/// Two zero measurements count as perfectly symmetric.
pub fn relative_diff_pct(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max <= 0.0 {
        return 0.0;
    }
    (a - b).abs() / max * 100.0
}

/// Round to `decimals` places, deciding on the exact binary value.
///
/// `0.15` is stored just below one half step and rounds down; exact ties
/// round to even. Scaling by a power of ten first would round both up.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let places = decimals.max(0) as usize;
    format!("{value:.places$}").parse().unwrap_or(value)
}
