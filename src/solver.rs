//! Integration and collision response
//!
//! The physics handler advances all dynamic bodies by one fixed timestep:
//! semi-implicit Euler integration (velocity from gravity first, then
//! position from the updated velocity - unconditionally stable at the small
//! fixed steps used here), followed by an O(n^2) pair sweep where each
//! detected contact is resolved immediately with a restitution/friction
//! impulse plus full positional correction.
//!
//! The impulse formula is the standard rigid-body one: relative velocity at
//! the contact including the `w x r` term, a normal impulse scaled by the
//! combined inverse mass (walls contribute zero - they absorb nothing and
//! never move), a Coulomb-clamped tangential impulse, and de-penetration
//! split by inverse mass. Contacts approaching slower than one tick's worth
//! of gravity resolve with zero restitution so resting bodies do not jitter.

use glam::Vec2;

use crate::body::{Dynamic, Polygon, Sphere, Wall};
use crate::collision::{self, Contact};
use crate::consts::{EPSILON_SQ, RESTING_SPEED_MIN, SEPARATION_SLOP};
use crate::geometry::{cross, cross_scalar};
use crate::material::Material;

/// Owns the collision-detection/response pass. Stateless; all world state
/// lives in the `Space` collections handed to [`PhysicsHandler::update`].
#[derive(Debug, Default)]
pub(crate) struct PhysicsHandler;

impl PhysicsHandler {
    /// Advance every dynamic body by one timestep and resolve all contacts.
    pub(crate) fn update(
        &self,
        spheres: &mut [Sphere],
        polygons: &mut [Polygon],
        walls: &[Wall],
        gravity: f32,
        dt: f32,
    ) {
        integrate(spheres, polygons, gravity, dt);

        let resting = resting_speed(gravity, dt);

        // Every dynamic body against every wall
        for sphere in spheres.iter_mut() {
            for wall in walls {
                if let Some(contact) =
                    collision::wall_sphere(wall.p1(), wall.p2(), sphere.center, sphere.radius())
                {
                    resolve_static(sphere, wall.material(), &contact, resting);
                }
            }
        }
        for polygon in polygons.iter_mut() {
            for wall in walls {
                let verts = polygon.world_vertices();
                if let Some(contact) = collision::wall_polygon(wall.p1(), wall.p2(), &verts) {
                    resolve_static(polygon, wall.material(), &contact, resting);
                }
            }
        }

        // Dynamic pairs, each once per tick
        for i in 0..spheres.len() {
            let (head, tail) = spheres.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail.iter_mut() {
                if let Some(contact) =
                    collision::sphere_sphere(a.center, a.radius(), b.center, b.radius())
                {
                    resolve_pair(a, b, &contact, resting);
                }
            }
        }
        for sphere in spheres.iter_mut() {
            for polygon in polygons.iter_mut() {
                let verts = polygon.world_vertices();
                if let Some(contact) =
                    collision::sphere_polygon(sphere.center, sphere.radius(), &verts)
                {
                    resolve_pair(sphere, polygon, &contact, resting);
                }
            }
        }
        for i in 0..polygons.len() {
            let (head, tail) = polygons.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail.iter_mut() {
                let verts_a = a.world_vertices();
                let verts_b = b.world_vertices();
                if let Some(contact) = collision::polygon_polygon(&verts_a, &verts_b) {
                    resolve_pair(a, b, &contact, resting);
                }
            }
        }
    }
}

/// Semi-implicit Euler: velocity first, then position from the new velocity.
fn integrate(spheres: &mut [Sphere], polygons: &mut [Polygon], gravity: f32, dt: f32) {
    for sphere in spheres.iter_mut() {
        sphere.velocity.y += gravity * dt;
        sphere.center += sphere.velocity * dt;
        sphere.angle += sphere.angular_velocity * dt;
    }
    for polygon in polygons.iter_mut() {
        polygon.velocity.y += gravity * dt;
        polygon.position += polygon.velocity * dt;
        polygon.angle += polygon.angular_velocity * dt;
    }
}

/// Below this approach speed a contact is treated as resting and resolved
/// without restitution.
fn resting_speed(gravity: f32, dt: f32) -> f32 {
    (2.0 * gravity.abs() * dt).max(RESTING_SPEED_MIN)
}

/// Combined restitution: the bouncier material wins, so a perfectly elastic
/// body bounces fully off any wall.
fn combine_restitution(a: Material, b: Material) -> f32 {
    a.restitution.max(b.restitution)
}

/// Combined friction: geometric mean.
fn combine_friction(a: Material, b: Material) -> f32 {
    (a.friction * b.friction).sqrt()
}

/// Resolve a contact between a dynamic body and an immovable wall. The
/// contact normal points from the wall toward the body; the body absorbs the
/// whole impulse and the whole positional correction.
fn resolve_static(body: &mut dyn Dynamic, wall_material: Material, contact: &Contact, resting: f32) {
    let n = contact.normal;
    let r = contact.point - body.position();

    let v_contact = body.velocity() + cross_scalar(body.angular_velocity(), r);
    let vn = v_contact.dot(n);
    if vn > 0.0 {
        return; // Already separating
    }

    let e = if vn.abs() < resting {
        0.0
    } else {
        combine_restitution(body.material(), wall_material)
    };

    let rn = cross(r, n);
    let inv_sum = body.inv_mass() + rn * rn * body.inv_inertia();
    let j = -(1.0 + e) * vn / inv_sum;
    body.apply_impulse_at(n * j, r);

    let friction = combine_friction(body.material(), wall_material);
    apply_friction(&mut *body, None, n, r, Vec2::ZERO, j, friction);

    // The wall never moves: the body takes the full de-penetration
    body.set_position(body.position() + n * (contact.penetration + SEPARATION_SLOP));
}

/// Resolve a contact between two dynamic bodies. The contact normal points
/// from `a` toward `b`; impulse and correction split by inverse mass.
fn resolve_pair(a: &mut dyn Dynamic, b: &mut dyn Dynamic, contact: &Contact, resting: f32) {
    let n = contact.normal;
    let ra = contact.point - a.position();
    let rb = contact.point - b.position();

    let v_rel = b.velocity() + cross_scalar(b.angular_velocity(), rb)
        - a.velocity()
        - cross_scalar(a.angular_velocity(), ra);
    let vn = v_rel.dot(n);
    if vn > 0.0 {
        return;
    }

    let e = if vn.abs() < resting {
        0.0
    } else {
        combine_restitution(a.material(), b.material())
    };

    let ra_n = cross(ra, n);
    let rb_n = cross(rb, n);
    let inv_sum = a.inv_mass()
        + b.inv_mass()
        + ra_n * ra_n * a.inv_inertia()
        + rb_n * rb_n * b.inv_inertia();
    let j = -(1.0 + e) * vn / inv_sum;
    a.apply_impulse_at(n * -j, ra);
    b.apply_impulse_at(n * j, rb);

    let friction = combine_friction(a.material(), b.material());
    apply_friction(&mut *b, Some(&mut *a), n, rb, ra, j, friction);

    // De-penetrate fully, split by inverse mass
    let total_inv = a.inv_mass() + b.inv_mass();
    let correction = n * ((contact.penetration + SEPARATION_SLOP) / total_inv);
    a.set_position(a.position() - correction * a.inv_mass());
    b.set_position(b.position() + correction * b.inv_mass());
}

/// Coulomb friction along the contact tangent, clamped by the normal
/// impulse just applied. `other` is `None` when the other side is a wall.
fn apply_friction(
    body: &mut dyn Dynamic,
    mut other: Option<&mut dyn Dynamic>,
    n: Vec2,
    r_body: Vec2,
    r_other: Vec2,
    normal_impulse: f32,
    friction: f32,
) {
    let (other_vel, other_w, other_inv_mass, other_inv_inertia) = match other.as_deref() {
        Some(o) => (o.velocity(), o.angular_velocity(), o.inv_mass(), o.inv_inertia()),
        None => (Vec2::ZERO, 0.0, 0.0, 0.0),
    };

    // Relative velocity after the normal impulse
    let v_rel = body.velocity() + cross_scalar(body.angular_velocity(), r_body)
        - other_vel
        - cross_scalar(other_w, r_other);
    let tangent = v_rel - n * v_rel.dot(n);
    if tangent.length_squared() < EPSILON_SQ {
        return;
    }
    let t = tangent.normalize();

    let rt_body = cross(r_body, t);
    let rt_other = cross(r_other, t);
    let inv_sum = body.inv_mass()
        + other_inv_mass
        + rt_body * rt_body * body.inv_inertia()
        + rt_other * rt_other * other_inv_inertia;

    let max_jt = friction * normal_impulse.abs();
    let jt = (-v_rel.dot(t) / inv_sum).clamp(-max_jt, max_jt);
    if jt.abs() < f32::EPSILON {
        return;
    }

    body.apply_impulse_at(t * jt, r_body);
    if let Some(o) = other.as_deref_mut() {
        o.apply_impulse_at(t * -jt, r_other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyId;

    fn sphere(id: u32, center: Vec2, velocity: Vec2, radius: f32, material: Material) -> Sphere {
        Sphere::new(BodyId(id), velocity, 0.0, center, radius, material).unwrap()
    }

    #[test]
    fn test_overlapping_spheres_separate_without_energy_gain() {
        // Two touching-minus-epsilon spheres at rest, zero gravity
        let r = 10.0;
        let mut spheres = vec![
            sphere(0, Vec2::new(0.0, 0.0), Vec2::ZERO, r, Material::WOOD),
            sphere(1, Vec2::new(2.0 * r - 0.05, 0.0), Vec2::ZERO, r, Material::WOOD),
        ];
        let handler = PhysicsHandler;
        handler.update(&mut spheres, &mut [], &[], 0.0, 1.0 / 120.0);

        let dist = (spheres[1].center - spheres[0].center).length();
        assert!(dist >= 2.0 * r, "still penetrating: {dist}");

        let energy: f32 = spheres.iter().map(|s| s.kinetic_energy()).sum();
        assert!(energy <= 1e-6, "solver injected energy: {energy}");
    }

    #[test]
    fn test_head_on_elastic_collision_exchanges_velocities() {
        let r = 10.0;
        let speed = 50.0;
        // Force perfect elasticity through a custom material
        let elastic = Material {
            name: "test-elastic",
            restitution: 1.0,
            friction: 0.0,
            density: 1.0,
        };
        let mut spheres = vec![
            sphere(0, Vec2::new(-11.0, 0.0), Vec2::new(speed, 0.0), r, elastic),
            sphere(1, Vec2::new(9.0, 0.0), Vec2::new(-speed, 0.0), r, elastic),
        ];

        let before: f32 = spheres.iter().map(|s| s.kinetic_energy()).sum();
        let handler = PhysicsHandler;
        handler.update(&mut spheres, &mut [], &[], 0.0, 1.0 / 120.0);
        let after: f32 = spheres.iter().map(|s| s.kinetic_energy()).sum();

        // Equal masses, e = 1: velocities swap
        assert!(spheres[0].velocity.x < 0.0);
        assert!(spheres[1].velocity.x > 0.0);
        assert!((after - before).abs() / before < 1e-3);
    }

    #[test]
    fn test_wall_reflects_sphere() {
        let wall = Wall::new(
            BodyId(0),
            Vec2::new(-100.0, 50.0),
            Vec2::new(100.0, 50.0),
            Material::CONSTANTIN,
            None,
        )
        .unwrap();
        let elastic = Material {
            name: "test-elastic",
            restitution: 1.0,
            friction: 0.0,
            density: 1.0,
        };
        // Moving down (+y) into the wall, slightly overlapping
        let mut spheres = vec![sphere(1, Vec2::new(0.0, 41.0), Vec2::new(0.0, 100.0), 10.0, elastic)];

        let handler = PhysicsHandler;
        handler.update(&mut spheres, &mut [], std::slice::from_ref(&wall), 0.0, 1.0 / 120.0);

        // Velocity reversed, body pushed back above the wall line
        assert!(spheres[0].velocity.y < 0.0);
        assert!(spheres[0].center.y + spheres[0].radius() <= 50.0 + 1e-3);
        // Walls are immutable; endpoints untouched by the solver
        assert_eq!(wall.p1(), Vec2::new(-100.0, 50.0));
    }

    #[test]
    fn test_resting_contact_does_not_bounce() {
        // Approaching slower than one tick of gravity: restitution suppressed
        let gravity = 300.0;
        let dt = 1.0 / 120.0;
        let bouncy = Material {
            name: "test-bouncy",
            restitution: 1.0,
            friction: 0.0,
            density: 1.0,
        };
        let wall = Wall::new(
            BodyId(0),
            Vec2::new(-100.0, 50.0),
            Vec2::new(100.0, 50.0),
            Material::CONSTANTIN,
            None,
        )
        .unwrap();
        let mut spheres = vec![sphere(1, Vec2::new(0.0, 39.99), Vec2::ZERO, 10.0, bouncy)];

        let handler = PhysicsHandler;
        handler.update(&mut spheres, &mut [], std::slice::from_ref(&wall), gravity, dt);

        // One integration step of gravity produced a slow approach; the
        // resolved normal speed must stay below a bounce
        assert!(spheres[0].velocity.y.abs() < 2.0 * gravity * dt + 1e-3);
    }

    #[test]
    fn test_polygon_lands_on_wall() {
        let wall = Wall::new(
            BodyId(0),
            Vec2::new(-200.0, 100.0),
            Vec2::new(200.0, 100.0),
            Material::CONSTANTIN,
            None,
        )
        .unwrap();
        let mut polygons = vec![Polygon::regular(
            BodyId(1),
            Vec2::new(0.0, 80.0),
            0.0,
            Vec2::new(0.0, 70.0),
            4,
            20.0,
            Material::WOOD,
        )
        .unwrap()];

        let handler = PhysicsHandler;
        for _ in 0..240 {
            handler.update(&mut [], &mut polygons, std::slice::from_ref(&wall), 300.0, 1.0 / 120.0);
        }

        // Every vertex ends up at or above the wall line
        for v in polygons[0].world_vertices() {
            assert!(v.y <= 100.0 + 0.5, "vertex sank through the wall: {v:?}");
        }
    }
}
