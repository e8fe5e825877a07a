//! Narrow-phase collision tests
//!
//! One function per shape pair, all pure: they take geometry and return an
//! optional [`Contact`]. The convention throughout is that `normal` points
//! from the first body toward the second, so pushing the second body along
//! `+normal` (and the first along `-normal`) separates the pair.

use glam::Vec2;

use crate::consts::EPSILON_SQ;
use crate::geometry::{
    closest_point_on_segment, edge_normal, point_in_convex, support,
};

/// A single contact point between two bodies.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// World-space contact point.
    pub point: Vec2,
    /// Unit normal, pointing from the first body toward the second.
    pub normal: Vec2,
    /// Overlap depth along the normal.
    pub penetration: f32,
}

/// Sphere vs. sphere: centre distance against the radius sum.
pub fn sphere_sphere(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> Option<Contact> {
    let delta = cb - ca;
    let radius_sum = ra + rb;
    let dist_sq = delta.length_squared();
    if dist_sq >= radius_sum * radius_sum {
        return None;
    }
    let dist = dist_sq.sqrt();
    // Concentric centres have no meaningful normal; pick +x like any axis
    let normal = if dist_sq > EPSILON_SQ {
        delta / dist
    } else {
        Vec2::X
    };
    Some(Contact {
        point: ca + normal * ra,
        normal,
        penetration: radius_sum - dist,
    })
}

/// Wall vs. sphere: clamped point-to-segment distance against the radius.
/// Normal points from the wall toward the sphere centre (the sphere's
/// push-out direction).
pub fn wall_sphere(p1: Vec2, p2: Vec2, center: Vec2, radius: f32) -> Option<Contact> {
    let closest = closest_point_on_segment(center, p1, p2);
    let delta = center - closest;
    let dist_sq = delta.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist_sq > EPSILON_SQ {
        delta / dist
    } else {
        // Centre exactly on the segment: push out perpendicular
        let d = (p2 - p1).normalize_or_zero();
        Vec2::new(-d.y, d.x)
    };
    Some(Contact {
        point: closest,
        normal,
        penetration: radius - dist,
    })
}

/// Sphere vs. convex polygon (world vertices, counter-clockwise).
/// Normal points from the sphere toward the polygon.
pub fn sphere_polygon(center: Vec2, radius: f32, verts: &[Vec2]) -> Option<Contact> {
    if point_in_convex(center, verts) {
        // Centre is inside: separate along the nearest face
        let mut best_sep = f32::MIN;
        let mut best_face = 0;
        for i in 0..verts.len() {
            let n = edge_normal(verts, i);
            let sep = n.dot(center - verts[i]);
            if sep > best_sep {
                best_sep = sep;
                best_face = i;
            }
        }
        let n_out = edge_normal(verts, best_face);
        return Some(Contact {
            // Project the centre onto the face plane
            point: center - n_out * best_sep,
            normal: -n_out,
            penetration: radius - best_sep,
        });
    }

    // Centre outside: closest point over the boundary edges
    let mut best_point = verts[0];
    let mut best_dist_sq = f32::MAX;
    for (i, &a) in verts.iter().enumerate() {
        let b = verts[(i + 1) % verts.len()];
        let c = closest_point_on_segment(center, a, b);
        let d = (center - c).length_squared();
        if d < best_dist_sq {
            best_dist_sq = d;
            best_point = c;
        }
    }
    if best_dist_sq >= radius * radius {
        return None;
    }
    let dist = best_dist_sq.sqrt();
    let normal = if best_dist_sq > EPSILON_SQ {
        (best_point - center) / dist
    } else {
        Vec2::X
    };
    Some(Contact {
        point: best_point,
        normal,
        penetration: radius - dist,
    })
}

/// Wall vs. convex polygon. Normal points from the wall toward the polygon.
///
/// Two cases: a polygon vertex across the wall line (within the segment
/// extent), and a wall endpoint inside the polygon (a body resting on the
/// end of a wall).
pub fn wall_polygon(p1: Vec2, p2: Vec2, verts: &[Vec2]) -> Option<Contact> {
    let d = p2 - p1;
    let len_sq = d.length_squared();
    if len_sq < EPSILON_SQ {
        return None;
    }
    // Perpendicular oriented toward the polygon's centroid
    let mut n = Vec2::new(-d.y, d.x) / len_sq.sqrt();
    let centroid = verts.iter().copied().sum::<Vec2>() / verts.len() as f32;
    if n.dot(centroid - p1) < 0.0 {
        n = -n;
    }

    // Deepest vertex across the line, restricted to the segment's extent
    let mut best: Option<(f32, Vec2)> = None;
    for &v in verts {
        let depth = n.dot(v - p1);
        if depth >= 0.0 {
            continue;
        }
        let t = (v - p1).dot(d) / len_sq;
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        if best.is_none_or(|(d0, _)| depth < d0) {
            best = Some((depth, v));
        }
    }
    if let Some((depth, v)) = best {
        return Some(Contact {
            point: v,
            normal: n,
            penetration: -depth,
        });
    }

    // Wall endpoint poking into the polygon
    for endpoint in [p1, p2] {
        if !point_in_convex(endpoint, verts) {
            continue;
        }
        let mut best_sep = f32::MIN;
        let mut best_face = 0;
        for i in 0..verts.len() {
            let face_n = edge_normal(verts, i);
            let sep = face_n.dot(endpoint - verts[i]);
            if sep > best_sep {
                best_sep = sep;
                best_face = i;
            }
        }
        let n_out = edge_normal(verts, best_face);
        return Some(Contact {
            point: endpoint,
            // Moving the polygon along -n_out carries the endpoint out
            // through its nearest face
            normal: -n_out,
            penetration: -best_sep,
        });
    }

    None
}

/// Greatest separation of `b` from `a`'s face planes (SAT half-test).
/// Returns the separation and the face normal achieving it; a positive
/// separation proves the polygons disjoint.
fn least_penetration(a: &[Vec2], b: &[Vec2]) -> (f32, Vec2) {
    let mut best_sep = f32::MIN;
    let mut best_normal = Vec2::X;
    for i in 0..a.len() {
        let n = edge_normal(a, i);
        // Deepest vertex of b against this face
        let s = support(b, -n);
        let sep = n.dot(s - a[i]);
        if sep > best_sep {
            best_sep = sep;
            best_normal = n;
        }
    }
    (best_sep, best_normal)
}

/// Convex polygon vs. convex polygon via the separating-axis test over both
/// edge-normal sets. Contact point is the deepest incident vertex along the
/// axis of least penetration. Normal points from `a` toward `b`.
pub fn polygon_polygon(a: &[Vec2], b: &[Vec2]) -> Option<Contact> {
    let (sep_a, normal_a) = least_penetration(a, b);
    if sep_a > 0.0 {
        return None;
    }
    let (sep_b, normal_b) = least_penetration(b, a);
    if sep_b > 0.0 {
        return None;
    }

    if sep_a >= sep_b {
        // Reference face on a; its outward normal already points toward b
        Some(Contact {
            point: support(b, -normal_a),
            normal: normal_a,
            penetration: -sep_a,
        })
    } else {
        // Reference face on b; flip so the normal runs a -> b
        Some(Contact {
            point: support(a, -normal_b),
            normal: -normal_b,
            penetration: -sep_b,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::regular_polygon;

    #[test]
    fn test_sphere_sphere_hit_and_miss() {
        let hit = sphere_sphere(Vec2::ZERO, 10.0, Vec2::new(15.0, 0.0), 10.0).unwrap();
        assert!((hit.normal - Vec2::X).length() < 1e-6);
        assert!((hit.penetration - 5.0).abs() < 1e-5);
        assert!((hit.point - Vec2::new(10.0, 0.0)).length() < 1e-5);

        assert!(sphere_sphere(Vec2::ZERO, 10.0, Vec2::new(25.0, 0.0), 10.0).is_none());
        // Touching exactly is not a contact
        assert!(sphere_sphere(Vec2::ZERO, 10.0, Vec2::new(20.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_wall_sphere_above_and_below() {
        let (p1, p2) = (Vec2::new(0.0, 100.0), Vec2::new(100.0, 100.0));

        // Sphere overlapping from above (smaller y, screen coords)
        let hit = wall_sphere(p1, p2, Vec2::new(50.0, 92.0), 10.0).unwrap();
        assert!(hit.normal.y < -0.99);
        assert!((hit.penetration - 2.0).abs() < 1e-5);

        // From below the normal flips
        let hit = wall_sphere(p1, p2, Vec2::new(50.0, 108.0), 10.0).unwrap();
        assert!(hit.normal.y > 0.99);

        // Beyond the segment end, distance is to the endpoint
        assert!(wall_sphere(p1, p2, Vec2::new(120.0, 100.0), 10.0).is_none());
        let hit = wall_sphere(p1, p2, Vec2::new(106.0, 100.0), 10.0).unwrap();
        assert!((hit.point - p2).length() < 1e-5);
    }

    #[test]
    fn test_sphere_polygon_outside_edge() {
        let square = vec![
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ];
        // Sphere to the right, overlapping the x=10 face
        let hit = sphere_polygon(Vec2::new(17.0, 0.0), 8.0, &square).unwrap();
        // Normal runs sphere -> polygon, i.e. -x
        assert!(hit.normal.x < -0.99);
        assert!((hit.penetration - 1.0).abs() < 1e-5);
        assert!((hit.point - Vec2::new(10.0, 0.0)).length() < 1e-4);

        assert!(sphere_polygon(Vec2::new(25.0, 0.0), 8.0, &square).is_none());
    }

    #[test]
    fn test_sphere_polygon_center_inside() {
        let square = vec![
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ];
        let hit = sphere_polygon(Vec2::new(8.0, 0.0), 5.0, &square).unwrap();
        // Nearest face is x=10; penetration covers radius plus the 2 units
        // still inside
        assert!(hit.normal.x < -0.99);
        assert!((hit.penetration - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_wall_polygon_vertex_penetration() {
        let (p1, p2) = (Vec2::new(-100.0, 50.0), Vec2::new(100.0, 50.0));
        // Square straddling the wall line from above
        let square = vec![
            Vec2::new(-10.0, 32.0),
            Vec2::new(10.0, 32.0),
            Vec2::new(10.0, 52.0),
            Vec2::new(-10.0, 52.0),
        ];
        let hit = wall_polygon(p1, p2, &square).unwrap();
        // Polygon centroid is above the wall, push-out is -y
        assert!(hit.normal.y < -0.99);
        assert!((hit.penetration - 2.0).abs() < 1e-4);

        // Fully above: no contact
        let clear = vec![
            Vec2::new(-10.0, 20.0),
            Vec2::new(10.0, 20.0),
            Vec2::new(10.0, 40.0),
            Vec2::new(-10.0, 40.0),
        ];
        assert!(wall_polygon(p1, p2, &clear).is_none());
    }

    #[test]
    fn test_wall_polygon_endpoint_inside() {
        // Wall ending inside a diamond whose only vertex below the wall
        // line projects past the segment end, so the vertex case cannot
        // fire and the endpoint contact must
        let (p1, p2) = (Vec2::new(-100.0, 0.0), Vec2::new(-2.0, 0.0));
        let diamond = vec![
            Vec2::new(0.0, -9.0),
            Vec2::new(10.0, 1.0),
            Vec2::new(0.0, 11.0),
            Vec2::new(-10.0, 1.0),
        ];
        let hit = wall_polygon(p1, p2, &diamond).unwrap();
        assert!((hit.point - p2).length() < 1e-5);
        // Nearest face is the lower-left one; the push-out runs up-right
        assert!(hit.normal.x > 0.5 && hit.normal.y > 0.5);
        let expected = 7.0 / std::f32::consts::SQRT_2;
        assert!((hit.penetration - expected).abs() < 1e-4);
    }

    fn square(center: Vec2, half: f32) -> Vec<Vec2> {
        vec![
            center + Vec2::new(-half, -half),
            center + Vec2::new(half, -half),
            center + Vec2::new(half, half),
            center + Vec2::new(-half, half),
        ]
    }

    #[test]
    fn test_polygon_polygon_overlap_and_separation() {
        let a = square(Vec2::ZERO, 10.0);
        let b = square(Vec2::new(18.0, 0.0), 10.0);
        let hit = polygon_polygon(&a, &b).unwrap();
        assert!(hit.normal.x > 0.99);
        assert!((hit.penetration - 2.0).abs() < 1e-4);

        let c = square(Vec2::new(40.0, 0.0), 10.0);
        assert!(polygon_polygon(&a, &c).is_none());
    }

    #[test]
    fn test_polygon_polygon_normal_separates() {
        let a = regular_polygon(Vec2::ZERO, 6, 10.0);
        let b = regular_polygon(Vec2::new(0.0, 15.0), 6, 10.0);
        let hit = polygon_polygon(&a, &b).unwrap();
        // Moving b along +normal by the penetration must separate the pair
        let moved: Vec<Vec2> = b.iter().map(|&v| v + hit.normal * (hit.penetration + 0.01)).collect();
        assert!(polygon_polygon(&a, &moved).is_none());
    }
}
