// src/geometry.rs
use crate::landmarks::Point2D;

/// Angle at vertex `b` between the rays `b→a` and `b→c`, in degrees.
///
/// Always the minor angle, so the result lies in `[0, 180]`. Returns 0 when
/// either ray has zero length.
pub fn joint_angle(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    let ba = a - b;
    let bc = c - b;

    if ba.norm() < f64::EPSILON || bc.norm() < f64::EPSILON {
        return 0.0;
    }

    let radians = bc.y.atan2(bc.x) - ba.y.atan2(ba.x);
    let angle = radians.to_degrees().abs();

    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}
