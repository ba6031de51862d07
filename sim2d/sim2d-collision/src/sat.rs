//! Separating Axis Theorem contact generation.
//!
//! - Polygon/polygon: find each polygon's face of maximum separation. Any
//!   positive separation is a separating axis and ends the test early. The
//!   face with the larger (least negative) separation is the reference face;
//!   the most anti-parallel face of the other polygon is the incident face.
//!   The incident face is clipped against the reference face's side planes,
//!   and clipped points with non-negative depth are dropped.
//! - Circle/polygon: closest point on the face of maximum separation.
//! - Circle/circle and capsule/circle: center distance against summed radii.
//!
//! All results use the convention of [`ContactInfo`]: normal from A to B.

use crate::narrow_phase::{ContactInfo, ContactSet};
use crate::shape::{Capsule, Circle, Polygon};
use nalgebra::{Isometry2, Point2, Vector2};
use sim2d_types::math::{EPSILON, try_normalize};

/// Extra separation the second polygon's face needs to become the
/// reference face; keeps the choice stable between frames.
pub(crate) const REFERENCE_FACE_TOLERANCE: f64 = 1e-4;

/// Face of `p` with maximum separation from `q`, both in `p`'s frame.
///
/// Returns `None` as soon as a separating face is found.
fn max_separation(p: &Polygon, q: &Polygon, q_to_p: &Isometry2<f64>) -> Option<(usize, f64)> {
    let p_to_q_rot = q_to_p.rotation.inverse();
    let mut best = (0, f64::NEG_INFINITY);
    for (i, v) in p.vertices().iter().enumerate() {
        let deepest = q_to_p * q.support(&(p_to_q_rot * -v.normal));
        let separation = v.normal.dot(&(deepest - v.point));
        if separation > 0.0 {
            return None;
        }
        if separation > best.1 {
            best = (i, separation);
        }
    }
    Some(best)
}

/// Keep the part of segment `points` where `normal · x <= offset`.
pub(crate) fn clip_segment(points: [Point2<f64>; 2], normal: &Vector2<f64>, offset: f64) -> Option<[Point2<f64>; 2]> {
    let d0 = normal.dot(&points[0].coords) - offset;
    let d1 = normal.dot(&points[1].coords) - offset;
    match (d0 <= 0.0, d1 <= 0.0) {
        (true, true) => Some(points),
        (false, false) => None,
        (inside0, _) => {
            let t = d0 / (d0 - d1);
            let cut = points[0] + (points[1] - points[0]) * t;
            if inside0 {
                Some([points[0], cut])
            } else {
                Some([cut, points[1]])
            }
        }
    }
}

/// Contact manifold of two convex polygons.
#[must_use]
pub fn collide_polygons(
    a: &Polygon,
    pose_a: &Isometry2<f64>,
    b: &Polygon,
    pose_b: &Isometry2<f64>,
) -> ContactSet {
    let b_to_a = pose_a.inv_mul(pose_b);
    let a_to_b = b_to_a.inverse();

    let Some((face_a, sep_a)) = max_separation(a, b, &b_to_a) else {
        return ContactSet::new();
    };
    let Some((face_b, sep_b)) = max_separation(b, a, &a_to_b) else {
        return ContactSet::new();
    };

    // Work in the reference polygon's frame.
    let flip = sep_b > sep_a + REFERENCE_FACE_TOLERANCE;
    let (reference, ref_pose, incident, inc_to_ref, face) = if flip {
        (b, pose_b, a, a_to_b, face_b)
    } else {
        (a, pose_a, b, b_to_a, face_a)
    };

    let rv = reference.vertex(face);
    let v1 = rv.point;
    let v2 = reference.vertex(rv.next).point;
    let normal = rv.normal;
    let Some(tangent) = try_normalize(&(v2 - v1)) else {
        return ContactSet::new();
    };

    let inc_normal = inc_to_ref.rotation.inverse() * normal;
    let edge = incident.incident_edge(&inc_normal);
    let ie = incident.vertex(edge);
    let segment = [inc_to_ref * ie.point, inc_to_ref * incident.vertex(ie.next).point];

    let Some(segment) = clip_segment(segment, &-tangent, -tangent.dot(&v1.coords)) else {
        return ContactSet::new();
    };
    let Some(segment) = clip_segment(segment, &tangent, tangent.dot(&v2.coords)) else {
        return ContactSet::new();
    };

    let world_normal = ref_pose.rotation * normal;
    let mut contacts = ContactSet::new();
    for p in segment {
        let separation = normal.dot(&(p - v1));
        if separation >= 0.0 {
            continue;
        }
        let on_incident = ref_pose * p;
        let on_reference = ref_pose * (p - normal * separation);
        let contact = if flip {
            ContactInfo::new(on_incident, on_reference, -world_normal, -separation, pose_a, pose_b)
        } else {
            ContactInfo::new(on_reference, on_incident, world_normal, -separation, pose_a, pose_b)
        };
        contacts.push(contact);
    }
    contacts
}

/// Contact of a circle against a polygon, normal from polygon to circle.
fn circle_polygon_raw(
    circle: &Circle,
    center_world: &Point2<f64>,
    poly: &Polygon,
    pose_p: &Isometry2<f64>,
) -> Option<(Point2<f64>, Point2<f64>, Vector2<f64>, f64)> {
    let c = pose_p.inverse_transform_point(center_world);
    let r = circle.radius;

    let mut face = 0;
    let mut separation = f64::NEG_INFINITY;
    for (i, v) in poly.vertices().iter().enumerate() {
        let s = v.normal.dot(&(c - v.point));
        if s > r {
            return None;
        }
        if s > separation {
            face = i;
            separation = s;
        }
    }

    let v = poly.vertex(face);
    let (v1, v2) = (v.point, poly.vertex(v.next).point);

    let (normal, closest, depth) = if separation < EPSILON {
        (v.normal, c - v.normal * separation, r - separation)
    } else {
        let e = v2 - v1;
        let t = ((c - v1).dot(&e) / e.norm_squared()).clamp(0.0, 1.0);
        let closest = v1 + e * t;
        let d = c - closest;
        let dist = d.norm();
        if dist > r {
            return None;
        }
        (try_normalize(&d).unwrap_or(v.normal), closest, r - dist)
    };

    let on_circle = pose_p * (c - normal * r);
    let on_polygon = pose_p * closest;
    Some((on_circle, on_polygon, pose_p.rotation * normal, depth))
}

/// Contact of circle A against polygon B.
#[must_use]
pub fn collide_circle_polygon(
    circle: &Circle,
    pose_a: &Isometry2<f64>,
    poly: &Polygon,
    pose_b: &Isometry2<f64>,
) -> ContactSet {
    let center = Point2::from(pose_a.translation.vector);
    let mut contacts = ContactSet::new();
    if let Some((on_circle, on_poly, normal, depth)) = circle_polygon_raw(circle, &center, poly, pose_b) {
        contacts.push(ContactInfo::new(on_circle, on_poly, -normal, depth, pose_a, pose_b));
    }
    contacts
}

/// Contact of polygon A against circle B.
#[must_use]
pub fn collide_polygon_circle(
    poly: &Polygon,
    pose_a: &Isometry2<f64>,
    circle: &Circle,
    pose_b: &Isometry2<f64>,
) -> ContactSet {
    let center = Point2::from(pose_b.translation.vector);
    let mut contacts = ContactSet::new();
    if let Some((on_circle, on_poly, normal, depth)) = circle_polygon_raw(circle, &center, poly, pose_a) {
        contacts.push(ContactInfo::new(on_poly, on_circle, normal, depth, pose_a, pose_b));
    }
    contacts
}

/// Contact between two world-space discs.
fn discs(
    center_a: Point2<f64>,
    radius_a: f64,
    center_b: Point2<f64>,
    radius_b: f64,
    pose_a: &Isometry2<f64>,
    pose_b: &Isometry2<f64>,
) -> ContactSet {
    let mut contacts = ContactSet::new();
    let d = center_b - center_a;
    let dist = d.norm();
    let depth = radius_a + radius_b - dist;
    if depth < 0.0 {
        return contacts;
    }
    let normal = try_normalize(&d).unwrap_or_else(Vector2::x);
    contacts.push(ContactInfo::new(
        center_a + normal * radius_a,
        center_b - normal * radius_b,
        normal,
        depth,
        pose_a,
        pose_b,
    ));
    contacts
}

/// Contact of two circles.
#[must_use]
pub fn collide_circles(
    a: &Circle,
    pose_a: &Isometry2<f64>,
    b: &Circle,
    pose_b: &Isometry2<f64>,
) -> ContactSet {
    discs(
        Point2::from(pose_a.translation.vector),
        a.radius,
        Point2::from(pose_b.translation.vector),
        b.radius,
        pose_a,
        pose_b,
    )
}

/// Point of the capsule core segment closest to `point` (world space).
fn closest_on_core(capsule: &Capsule, pose: &Isometry2<f64>, point: &Point2<f64>) -> Point2<f64> {
    let local = pose.inverse_transform_point(point);
    let x = local.x.clamp(-capsule.half_length, capsule.half_length);
    pose * Point2::new(x, 0.0)
}

/// Contact of capsule A against circle B.
#[must_use]
pub fn collide_capsule_circle(
    capsule: &Capsule,
    pose_a: &Isometry2<f64>,
    circle: &Circle,
    pose_b: &Isometry2<f64>,
) -> ContactSet {
    let center = Point2::from(pose_b.translation.vector);
    let core = closest_on_core(capsule, pose_a, &center);
    discs(core, capsule.radius, center, circle.radius, pose_a, pose_b)
}

/// Contact of circle A against capsule B.
#[must_use]
pub fn collide_circle_capsule(
    circle: &Circle,
    pose_a: &Isometry2<f64>,
    capsule: &Capsule,
    pose_b: &Isometry2<f64>,
) -> ContactSet {
    let center = Point2::from(pose_a.translation.vector);
    let core = closest_on_core(capsule, pose_b, &center);
    discs(center, circle.radius, core, capsule.radius, pose_a, pose_b)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(x: f64, y: f64, angle: f64) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(x, y), angle)
    }

    #[test]
    fn test_box_resting_on_box() {
        let ground = Polygon::rectangle(5.0, 0.5).unwrap();
        let boxy = Polygon::rectangle(0.5, 0.5).unwrap();
        let contacts = collide_polygons(&ground, &at(0.0, 0.0, 0.0), &boxy, &at(1.0, 0.95, 0.0));
        assert_eq!(contacts.len(), 2);
        for c in &contacts {
            assert_relative_eq!(c.normal, Vector2::y(), epsilon = 1e-12);
            assert_relative_eq!(c.depth, 0.05, epsilon = 1e-12);
            // Point on A lies on the ground's top face.
            assert_relative_eq!(c.point_a.y, 0.5, epsilon = 1e-12);
            assert_relative_eq!(c.point_b.y, 0.45, epsilon = 1e-12);
        }
        let xs: Vec<f64> = contacts.iter().map(|c| c.point_b.x).collect();
        assert!(xs.contains(&0.5) && xs.contains(&1.5));
    }

    #[test]
    fn test_reference_face_on_b() {
        // Diamond A resting on its corner on a wide box B: B's top face is
        // the reference, the normal still points from A to B.
        let diamond = Polygon::rectangle(0.5, 0.5).unwrap();
        let ground = Polygon::rectangle(5.0, 0.5).unwrap();
        let r = 0.5 * 2.0_f64.sqrt();
        let contacts = collide_polygons(
            &diamond,
            &at(0.0, 0.5 + r - 0.1, std::f64::consts::FRAC_PI_4),
            &ground,
            &at(0.0, 0.0, 0.0),
        );
        assert_eq!(contacts.len(), 1);
        let c = &contacts[0];
        assert_relative_eq!(c.normal, -Vector2::y(), epsilon = 1e-12);
        assert_relative_eq!(c.depth, 0.1, epsilon = 1e-9);
        assert_relative_eq!(c.point_a, Point2::new(0.0, 0.4), epsilon = 1e-9);
        assert_relative_eq!(c.point_b, Point2::new(0.0, 0.5), epsilon = 1e-9);
    }

    #[test]
    fn test_box_sinking_into_ground() {
        let small = Polygon::rectangle(0.5, 0.5).unwrap();
        let ground = Polygon::rectangle(5.0, 0.5).unwrap();
        let contacts = collide_polygons(&small, &at(0.0, 0.9, 0.0), &ground, &at(0.0, 0.0, 0.0));
        assert_eq!(contacts.len(), 2);
        for c in &contacts {
            assert_relative_eq!(c.normal, -Vector2::y(), epsilon = 1e-12);
            assert_relative_eq!(c.depth, 0.1, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_separated_polygons() {
        let a = Polygon::rectangle(1.0, 1.0).unwrap();
        assert!(collide_polygons(&a, &at(0.0, 0.0, 0.0), &a, &at(2.1, 0.0, 0.0)).is_empty());
        assert!(collide_polygons(&a, &at(0.0, 0.0, 0.0), &a, &at(2.0, 2.0, 0.3)).is_empty());
    }

    #[test]
    fn test_corner_into_face() {
        let a = Polygon::rectangle(1.0, 1.0).unwrap();
        let diamond = Polygon::rectangle(0.5, 0.5).unwrap();
        let r = 0.5 * 2.0_f64.sqrt();
        let contacts = collide_polygons(
            &a,
            &at(0.0, 0.0, 0.0),
            &diamond,
            &at(0.0, 1.0 + r - 0.1, std::f64::consts::FRAC_PI_4),
        );
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].depth, 0.1, epsilon = 1e-9);
        assert_relative_eq!(contacts[0].normal, Vector2::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_circle_circle() {
        let c = Circle { radius: 1.0 };
        let contacts = collide_circles(&c, &at(0.0, 0.0, 0.0), &c, &at(1.5, 0.0, 0.0));
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].depth, 0.5);
        assert_relative_eq!(contacts[0].normal, Vector2::x());
        assert_relative_eq!(contacts[0].point_a, Point2::new(1.0, 0.0));
        assert_relative_eq!(contacts[0].point_b, Point2::new(0.5, 0.0));
        assert!(collide_circles(&c, &at(0.0, 0.0, 0.0), &c, &at(2.5, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_circle_polygon_face_and_corner() {
        let c = Circle { radius: 0.5 };
        let b = Polygon::rectangle(1.0, 1.0).unwrap();

        // Face region: circle above the box.
        let contacts = collide_circle_polygon(&c, &at(0.2, 1.3, 0.0), &b, &at(0.0, 0.0, 0.0));
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].normal, -Vector2::y(), epsilon = 1e-12);
        assert_relative_eq!(contacts[0].depth, 0.2, epsilon = 1e-12);

        // Corner region.
        let d = 0.4 / 2.0_f64.sqrt();
        let contacts = collide_polygon_circle(&b, &at(0.0, 0.0, 0.0), &c, &at(1.0 + d, 1.0 + d, 0.0));
        assert_eq!(contacts.len(), 1);
        let diag = Vector2::new(1.0, 1.0).normalize();
        assert_relative_eq!(contacts[0].normal, diag, epsilon = 1e-9);
        assert_relative_eq!(contacts[0].depth, 0.1, epsilon = 1e-9);
        assert_relative_eq!(contacts[0].point_a, Point2::new(1.0, 1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_circle_center_inside_polygon() {
        let c = Circle { radius: 0.25 };
        let b = Polygon::rectangle(1.0, 1.0).unwrap();
        let contacts = collide_polygon_circle(&b, &at(0.0, 0.0, 0.0), &c, &at(0.9, 0.0, 0.0));
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].normal, Vector2::x(), epsilon = 1e-12);
        assert_relative_eq!(contacts[0].depth, 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_capsule_circle() {
        let cap = Capsule {
            half_length: 1.0,
            radius: 0.25,
        };
        let c = Circle { radius: 0.5 };
        let contacts = collide_capsule_circle(&cap, &at(0.0, 0.0, 0.0), &c, &at(0.6, 0.7, 0.0));
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].normal, Vector2::y(), epsilon = 1e-12);
        assert_relative_eq!(contacts[0].depth, 0.05, epsilon = 1e-12);

        let flipped = collide_circle_capsule(&c, &at(0.6, 0.7, 0.0), &cap, &at(0.0, 0.0, 0.0));
        assert_relative_eq!(flipped[0].normal, -Vector2::y(), epsilon = 1e-12);
    }
}
