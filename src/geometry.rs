//! Geometric primitives shared by collision tests and body construction
//!
//! Everything here is a pure function over `glam::Vec2`. Polygon routines
//! assume (and produce) counter-clockwise winding in standard axes; the
//! shoelace sign is used to normalize winding at construction time.

use glam::Vec2;

/// 2D scalar cross product (z component of the 3D cross).
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar angular velocity with a vector: `w x v`.
/// This is the velocity contribution of rotation at offset `v`.
#[inline]
pub fn cross_scalar(w: f32, v: Vec2) -> Vec2 {
    Vec2::new(-w * v.y, w * v.x)
}

/// Closest point to `p` on the segment `a`-`b`, clamped to the segment.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < crate::consts::EPSILON_SQ {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Vertices of a regular polygon with `sides` vertices inscribed in
/// `radius` around `center`, counter-clockwise, first vertex at angle 0.
pub fn regular_polygon(center: Vec2, sides: usize, radius: f32) -> Vec<Vec2> {
    let step = std::f32::consts::TAU / sides as f32;
    (0..sides)
        .map(|i| {
            let theta = i as f32 * step;
            center + Vec2::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect()
}

/// Signed shoelace area; positive for counter-clockwise winding.
///
/// The sums run over coordinates relative to the first vertex: in f32 the
/// raw world-coordinate cross terms cancel catastrophically for a small
/// polygon far from the origin.
pub fn polygon_signed_area(points: &[Vec2]) -> f32 {
    let origin = points[0];
    let mut sum = 0.0;
    for (i, &p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        sum += cross(p - origin, q - origin);
    }
    sum / 2.0
}

/// Absolute polygon area.
pub fn polygon_area(points: &[Vec2]) -> f32 {
    polygon_signed_area(points).abs()
}

/// Centre of mass of a polygon with uniform density. Accumulated relative
/// to the first vertex for the same precision reason as
/// [`polygon_signed_area`].
pub fn polygon_centroid(points: &[Vec2]) -> Vec2 {
    let origin = points[0];
    let mut centroid = Vec2::ZERO;
    let mut area_sum = 0.0;
    for (i, &p) in points.iter().enumerate() {
        let p = p - origin;
        let q = points[(i + 1) % points.len()] - origin;
        let c = cross(p, q);
        centroid += (p + q) * c;
        area_sum += c;
    }
    origin + centroid / (3.0 * area_sum)
}

/// Moment of inertia of a polygon about the origin, for vertices already
/// expressed relative to the centre of mass.
pub fn polygon_inertia(local: &[Vec2], density: f32) -> f32 {
    let mut numer = 0.0;
    for (i, &p) in local.iter().enumerate() {
        let q = local[(i + 1) % local.len()];
        let c = cross(p, q);
        numer += c * (p.dot(p) + p.dot(q) + q.dot(q));
    }
    (density * numer / 12.0).abs()
}

/// Whether `p` lies inside (or on the boundary of) a convex polygon given
/// as counter-clockwise vertices.
pub fn point_in_convex(p: Vec2, verts: &[Vec2]) -> bool {
    for (i, &a) in verts.iter().enumerate() {
        let b = verts[(i + 1) % verts.len()];
        if cross(b - a, p - a) < 0.0 {
            return false;
        }
    }
    true
}

/// Outward edge normal for edge `i` of a counter-clockwise polygon.
#[inline]
pub fn edge_normal(verts: &[Vec2], i: usize) -> Vec2 {
    let a = verts[i];
    let b = verts[(i + 1) % verts.len()];
    let d = b - a;
    Vec2::new(d.y, -d.x).normalize_or_zero()
}

/// Vertex of `verts` with the greatest projection along `dir`.
pub fn support(verts: &[Vec2], dir: Vec2) -> Vec2 {
    let mut best = verts[0];
    let mut best_proj = best.dot(dir);
    for &v in &verts[1..] {
        let proj = v.dot(dir);
        if proj > best_proj {
            best_proj = proj;
            best = v;
        }
    }
    best
}
