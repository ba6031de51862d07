//! Narrow phase: exact contact generation for candidate pairs.
//!
//! Two interchangeable backends implement [`NarrowPhase`]:
//!
//! - [`SatNarrowPhase`] - analytic SAT paths for circles, polygons and
//!   capsule/circle; every other combination goes through GJK+EPA.
//! - [`GjkEpaNarrowPhase`] - GJK overlap test followed by EPA for every pair.
//!   The EPA normal selects the facing features of both pieces; facing
//!   segments are clipped into a two-point manifold and rounded points get
//!   an exact core-to-core normal.
//!
//! Both report contacts with the normal pointing from A to B and at most two
//! points per candidate.

use crate::epa::epa;
use crate::gjk::{MinkowskiDifference, gjk_distance};
use crate::sat;
use crate::shape::{Convex, Feature, Shape, ShapePart};
use nalgebra::{Isometry2, Point2, Vector2};
use sim2d_types::math::{EPSILON, try_normalize};
use sim2d_types::{NarrowPhaseKind, Settings};
use smallvec::SmallVec;

/// One contact point between two placed shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    /// Point on A, world space.
    pub point_a: Point2<f64>,
    /// Point on B, world space.
    pub point_b: Point2<f64>,
    /// Point on A in A's frame.
    pub local_a: Point2<f64>,
    /// Point on B in B's frame.
    pub local_b: Point2<f64>,
    /// Unit normal from A to B, world space.
    pub normal: Vector2<f64>,
    /// Penetration depth (positive when overlapping).
    pub depth: f64,
}

impl ContactInfo {
    /// Contact from world-space data; local points are derived from the poses.
    #[must_use]
    pub fn new(
        point_a: Point2<f64>,
        point_b: Point2<f64>,
        normal: Vector2<f64>,
        depth: f64,
        pose_a: &Isometry2<f64>,
        pose_b: &Isometry2<f64>,
    ) -> Self {
        Self {
            point_a,
            point_b,
            local_a: pose_a.inverse_transform_point(&point_a),
            local_b: pose_b.inverse_transform_point(&point_b),
            normal,
            depth,
        }
    }

    /// The same contact seen from B.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            point_a: self.point_b,
            point_b: self.point_a,
            local_a: self.local_b,
            local_b: self.local_a,
            normal: -self.normal,
            depth: self.depth,
        }
    }
}

/// Contacts of one candidate pair.
pub type ContactSet = SmallVec<[ContactInfo; 2]>;

/// A shape part placed in the world.
#[derive(Debug, Clone, Copy)]
pub struct ShapeInstance<'a> {
    /// The shape.
    pub shape: &'a Shape,
    /// Which part of it takes part in the test.
    pub part: ShapePart,
    /// World pose of the shape.
    pub pose: Isometry2<f64>,
}

impl<'a> ShapeInstance<'a> {
    /// The whole shape at `pose`.
    #[must_use]
    pub fn new(shape: &'a Shape, pose: Isometry2<f64>) -> Self {
        Self {
            shape,
            part: ShapePart::Whole,
            pose,
        }
    }

    /// One part of the shape at `pose`.
    #[must_use]
    pub fn with_part(shape: &'a Shape, part: ShapePart, pose: Isometry2<f64>) -> Self {
        Self { shape, part, pose }
    }

    /// The convex piece under test.
    #[must_use]
    pub fn convex(&self) -> Convex<'a> {
        self.shape.convex(self.part)
    }
}

/// Contact generation strategy.
pub trait NarrowPhase {
    /// Contacts between `a` and `b`, normal from A to B. Empty when apart.
    fn collide(&self, a: &ShapeInstance<'_>, b: &ShapeInstance<'_>) -> ContactSet;

    /// Strategy key.
    fn name(&self) -> &'static str;
}

/// Build the narrow phase selected in `settings`.
#[must_use]
pub fn create_narrow_phase(settings: &Settings) -> Box<dyn NarrowPhase> {
    let gjk = GjkEpaNarrowPhase::from_settings(settings);
    match settings.narrow_phase {
        NarrowPhaseKind::Sat => Box::new(SatNarrowPhase::new(gjk)),
        NarrowPhaseKind::GjkEpa => Box::new(gjk),
    }
}

/// GJK overlap test followed by EPA penetration.
#[derive(Debug, Clone, Copy)]
pub struct GjkEpaNarrowPhase {
    /// GJK relative error.
    pub rel_error: f64,
    /// GJK iteration cap.
    pub max_iterations: usize,
    /// EPA convergence threshold.
    pub epa_epsilon: f64,
    /// EPA iteration cap.
    pub epa_max_iterations: usize,
}

impl Default for GjkEpaNarrowPhase {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl GjkEpaNarrowPhase {
    /// Tolerances taken from `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rel_error: settings.gjk_rel_error,
            max_iterations: settings.gjk_max_iterations,
            epa_epsilon: settings.epa_epsilon,
            epa_max_iterations: settings.epa_max_iterations,
        }
    }

    /// Contact of two convex pieces.
    #[must_use]
    pub fn collide_convex(
        &self,
        a: Convex<'_>,
        pose_a: &Isometry2<f64>,
        b: Convex<'_>,
        pose_b: &Isometry2<f64>,
    ) -> ContactSet {
        let mut contacts = ContactSet::new();
        let md = MinkowskiDifference::new(a, pose_a, b, pose_b);
        let gjk = gjk_distance(&md, self.rel_error, self.max_iterations);
        if !gjk.is_overlapping() {
            return contacts;
        }
        let Some(pen) = epa(&md, &gjk.simplex, self.epa_epsilon, self.epa_max_iterations) else {
            return contacts;
        };

        // EPA only finds the deepest point. Rebuild the contact from the
        // features facing each other along its normal.
        let normal = pose_a.rotation * pen.normal;
        let (feature_a, feature_b) = (a.feature(pose_a, &normal), b.feature(pose_b, &-normal));
        if let Some(contact) = round_contact(&feature_a, &feature_b, &normal, pose_a, pose_b) {
            contacts.push(contact);
            return contacts;
        }
        let clipped = clip_faces(&feature_a, &feature_b, &normal, pose_a, pose_b);
        if !clipped.is_empty() {
            return clipped;
        }

        contacts.push(ContactInfo::new(
            pose_a * pen.point_a,
            pose_a * pen.point_b,
            pose_a.rotation * pen.normal,
            pen.depth,
            pose_a,
            pose_b,
        ));
        contacts
    }
}

/// Minimum cosine between a reference face normal and the EPA normal for
/// the face to be clipped.
const FACE_ALIGNMENT: f64 = 0.995;

/// Minimum cosine between the core-to-core direction and the EPA normal.
const ROUND_ALIGNMENT: f64 = 0.9;

fn closest_on_segment(start: &Point2<f64>, end: &Point2<f64>, point: &Point2<f64>) -> Point2<f64> {
    let edge = end - start;
    let len2 = edge.norm_squared();
    if len2 < EPSILON {
        return *start;
    }
    let t = ((point - start).dot(&edge) / len2).clamp(0.0, 1.0);
    start + edge * t
}

/// Contact between cores when one side is a rounded point (circle or
/// capsule cap). The normal runs between the closest core points, which is
/// exact where EPA only converges to a tolerance.
fn round_contact(
    feature_a: &Feature,
    feature_b: &Feature,
    normal: &Vector2<f64>,
    pose_a: &Isometry2<f64>,
    pose_b: &Isometry2<f64>,
) -> Option<ContactInfo> {
    let (core_a, radius_a, core_b, radius_b) = match (*feature_a, *feature_b) {
        (Feature::Vertex { point: a, radius: ra }, Feature::Vertex { point: b, radius: rb })
            if ra > 0.0 && rb > 0.0 =>
        {
            (a, ra, b, rb)
        }
        (Feature::Vertex { point, radius }, Feature::Face { start, end, radius: rb, .. })
            if radius > 0.0 =>
        {
            (point, radius, closest_on_segment(&start, &end, &point), rb)
        }
        (Feature::Face { start, end, radius: ra, .. }, Feature::Vertex { point, radius })
            if radius > 0.0 =>
        {
            (closest_on_segment(&start, &end, &point), ra, point, radius)
        }
        _ => return None,
    };
    let offset = core_b - core_a;
    let n = try_normalize(&offset)?;
    let depth = radius_a + radius_b - offset.norm();
    if n.dot(normal) < ROUND_ALIGNMENT || depth <= 0.0 {
        return None;
    }
    Some(ContactInfo::new(
        core_a + n * radius_a,
        core_b - n * radius_b,
        n,
        depth,
        pose_a,
        pose_b,
    ))
}

/// Up to two contacts between facing segments: the incident face is
/// clipped against the side planes of the reference face, as in
/// [`sat::collide_polygons`], then pushed out by the rounding radii.
fn clip_faces(
    feature_a: &Feature,
    feature_b: &Feature,
    normal: &Vector2<f64>,
    pose_a: &Isometry2<f64>,
    pose_b: &Isometry2<f64>,
) -> ContactSet {
    let mut contacts = ContactSet::new();
    let (
        Feature::Face { start: a1, end: a2, normal: na, radius: ra },
        Feature::Face { start: b1, end: b2, normal: nb, radius: rb },
    ) = (*feature_a, *feature_b)
    else {
        return contacts;
    };

    let (align_a, align_b) = (na.dot(normal), -nb.dot(normal));
    let flip = align_b > align_a + sat::REFERENCE_FACE_TOLERANCE;
    let (r1, r2, reference, incident) = if flip {
        (b1, b2, nb, [a1, a2])
    } else {
        (a1, a2, na, [b1, b2])
    };
    if align_a.max(align_b) < FACE_ALIGNMENT {
        return contacts;
    }
    let Some(tangent) = try_normalize(&(r2 - r1)) else {
        return contacts;
    };
    let Some(segment) = sat::clip_segment(incident, &-tangent, -tangent.dot(&r1.coords)) else {
        return contacts;
    };
    let Some(segment) = sat::clip_segment(segment, &tangent, tangent.dot(&r2.coords)) else {
        return contacts;
    };

    for p in segment {
        let gap = reference.dot(&(p - r1));
        let separation = gap - ra - rb;
        if separation >= 0.0 {
            continue;
        }
        let on_reference = p - reference * gap;
        let contact = if flip {
            ContactInfo::new(
                p - reference * ra,
                on_reference + reference * rb,
                -reference,
                -separation,
                pose_a,
                pose_b,
            )
        } else {
            ContactInfo::new(
                on_reference + reference * ra,
                p - reference * rb,
                reference,
                -separation,
                pose_a,
                pose_b,
            )
        };
        contacts.push(contact);
    }
    contacts
}

impl NarrowPhase for GjkEpaNarrowPhase {
    fn collide(&self, a: &ShapeInstance<'_>, b: &ShapeInstance<'_>) -> ContactSet {
        self.collide_convex(a.convex(), &a.pose, b.convex(), &b.pose)
    }

    fn name(&self) -> &'static str {
        NarrowPhaseKind::GjkEpa.key()
    }
}

/// Analytic SAT where available, GJK+EPA otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SatNarrowPhase {
    fallback: GjkEpaNarrowPhase,
}

impl SatNarrowPhase {
    /// SAT backed by `fallback` for shape pairs without an analytic path.
    #[must_use]
    pub fn new(fallback: GjkEpaNarrowPhase) -> Self {
        Self { fallback }
    }
}

impl NarrowPhase for SatNarrowPhase {
    fn collide(&self, a: &ShapeInstance<'_>, b: &ShapeInstance<'_>) -> ContactSet {
        let (pa, pb) = (&a.pose, &b.pose);
        match (a.convex(), b.convex()) {
            (Convex::Circle(ca), Convex::Circle(cb)) => sat::collide_circles(ca, pa, cb, pb),
            (Convex::Circle(c), Convex::Polygon(p)) => sat::collide_circle_polygon(c, pa, p, pb),
            (Convex::Polygon(p), Convex::Circle(c)) => sat::collide_polygon_circle(p, pa, c, pb),
            (Convex::Polygon(pa_), Convex::Polygon(pb_)) => sat::collide_polygons(pa_, pa, pb_, pb),
            (Convex::Capsule(cap), Convex::Circle(c)) => sat::collide_capsule_circle(cap, pa, c, pb),
            (Convex::Circle(c), Convex::Capsule(cap)) => sat::collide_circle_capsule(c, pa, cap, pb),
            (ca, cb) => self.fallback.collide_convex(ca, pa, cb, pb),
        }
    }

    fn name(&self) -> &'static str {
        NarrowPhaseKind::Sat.key()
    }
}
