// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small geometry helpers shared by hit testing and rasterization.

use kurbo::Point;

/// Squared distance from `p` to the segment `a`–`b`. A zero-length segment
/// degrades to the distance to `a`.
#[must_use]
pub(crate) fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return (p - a).hypot2();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).hypot2()
}

/// Squared distance from `p` to the nearest segment of a polyline, or `None`
/// for an empty polyline. A single point is treated as a zero-length segment.
#[must_use]
pub(crate) fn distance_sq_to_polyline(p: Point, points: &[Point]) -> Option<f64> {
    match points {
        [] => None,
        [only] => Some((p - *only).hypot2()),
        _ => points
            .windows(2)
            .map(|w| distance_sq_to_segment(p, w[0], w[1]))
            .reduce(f64::min),
    }
}
