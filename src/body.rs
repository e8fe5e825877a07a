//! Rigid-body variants
//!
//! Static geometry: [`Wall`] (infinite-mass line segment) and [`Block`]
//! (axis-aligned rectangle that decomposes into 4 walls). Dynamic bodies:
//! [`Sphere`] and [`Polygon`], which share the [`Dynamic`] capability set
//! used by the solver (position, velocity, angular velocity, mass, material,
//! apply-impulse).
//!
//! Degenerate shapes are rejected here, at construction, so the solver never
//! has to discover them mid-simulation.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry;
use crate::material::Material;

/// Stable, opaque body handle. Unique per `Space`, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Construction-time shape validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    /// Wall endpoints coincide.
    #[error("wall endpoints coincide")]
    DegenerateWall,

    /// Sphere or polygon radius must be strictly positive.
    #[error("radius must be positive, got {0}")]
    NonPositiveRadius(f32),

    /// Block width/height must be strictly positive.
    #[error("block extent must be positive, got {w}x{h}")]
    NonPositiveExtent { w: f32, h: f32 },

    /// A polygon needs at least 3 vertices.
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    /// Polygon vertices are collinear or otherwise enclose no area.
    #[error("polygon encloses no area")]
    DegeneratePolygon,

    /// Material name not present in the catalog.
    #[error("unknown material {0:?}")]
    UnknownMaterial(String),
}

/// Capability set shared by all dynamic bodies. The solver and the command
/// queue operate through this surface, dispatching by shape kind only in the
/// narrow-phase tests.
pub trait Dynamic {
    /// World centre of mass.
    fn position(&self) -> Vec2;
    fn set_position(&mut self, p: Vec2);
    fn velocity(&self) -> Vec2;
    fn set_velocity(&mut self, v: Vec2);
    fn angular_velocity(&self) -> f32;
    fn set_angular_velocity(&mut self, w: f32);
    fn mass(&self) -> f32;
    fn inv_mass(&self) -> f32;
    fn inv_inertia(&self) -> f32;
    fn material(&self) -> Material;

    /// Apply an impulse through the centre of mass.
    fn apply_impulse(&mut self, impulse: Vec2) {
        let v = self.velocity() + impulse * self.inv_mass();
        self.set_velocity(v);
    }

    /// Apply an impulse at offset `r` from the centre of mass; the lever arm
    /// couples into angular velocity.
    fn apply_impulse_at(&mut self, impulse: Vec2, r: Vec2) {
        self.apply_impulse(impulse);
        let w = self.angular_velocity() + self.inv_inertia() * geometry::cross(r, impulse);
        self.set_angular_velocity(w);
    }

    /// Apply a pure angular impulse (spin without translation).
    fn apply_angular_impulse(&mut self, impulse: f32) {
        let w = self.angular_velocity() + self.inv_inertia() * impulse;
        self.set_angular_velocity(w);
    }

    /// Total kinetic energy (translational + rotational).
    fn kinetic_energy(&self) -> f32 {
        let v2 = self.velocity().length_squared();
        let w = self.angular_velocity();
        let inertia = if self.inv_inertia() > 0.0 {
            1.0 / self.inv_inertia()
        } else {
            0.0
        };
        0.5 * self.mass() * v2 + 0.5 * inertia * w * w
    }
}

/// Static infinite-mass line segment. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Wall {
    id: BodyId,
    p1: Vec2,
    p2: Vec2,
    material: Material,
    /// Set when the wall is one of a block's four edges.
    owner: Option<BodyId>,
}

impl Wall {
    pub(crate) fn new(
        id: BodyId,
        p1: Vec2,
        p2: Vec2,
        material: Material,
        owner: Option<BodyId>,
    ) -> Result<Self, ShapeError> {
        if (p2 - p1).length_squared() < crate::consts::EPSILON_SQ {
            return Err(ShapeError::DegenerateWall);
        }
        Ok(Self {
            id,
            p1,
            p2,
            material,
            owner,
        })
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn p1(&self) -> Vec2 {
        self.p1
    }

    pub fn p2(&self) -> Vec2 {
        self.p2
    }

    pub fn material(&self) -> Material {
        self.material
    }

    /// The block this wall belongs to, if it is a block edge.
    pub fn owner(&self) -> Option<BodyId> {
        self.owner
    }

    /// Closest point on the segment to `p`.
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        geometry::closest_point_on_segment(p, self.p1, self.p2)
    }
}

/// Static axis-aligned rectangle. The block is the render/query handle; its
/// four edge walls, registered separately with the `Space` wall collection,
/// are the collision primitives.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    id: BodyId,
    min: Vec2,
    max: Vec2,
    material: Material,
    wall_ids: [BodyId; 4],
}

impl Block {
    pub(crate) fn new(
        id: BodyId,
        min: Vec2,
        max: Vec2,
        material: Material,
        wall_ids: [BodyId; 4],
    ) -> Self {
        Self {
            id,
            min,
            max,
            material,
            wall_ids,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn min(&self) -> Vec2 {
        self.min
    }

    pub fn max(&self) -> Vec2 {
        self.max
    }

    pub fn material(&self) -> Material {
        self.material
    }

    /// Ids of the four constituent walls (top, right, bottom, left order is
    /// the corner traversal used at construction).
    pub fn wall_ids(&self) -> [BodyId; 4] {
        self.wall_ids
    }
}

/// Dynamic circle.
#[derive(Debug, Clone, Serialize)]
pub struct Sphere {
    id: BodyId,
    /// World centre. The solver mutates this every tick.
    pub center: Vec2,
    /// Render-only depth hint (the original engine's `z`); ignored by the
    /// 2D physics.
    pub depth: f32,
    /// Accumulated rotation, render hint only for a circle.
    pub angle: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    radius: f32,
    mass: f32,
    inv_mass: f32,
    inv_inertia: f32,
    material: Material,
}

impl Sphere {
    pub(crate) fn new(
        id: BodyId,
        velocity: Vec2,
        angular_velocity: f32,
        center: Vec2,
        radius: f32,
        material: Material,
    ) -> Result<Self, ShapeError> {
        if radius <= 0.0 {
            return Err(ShapeError::NonPositiveRadius(radius));
        }
        // Disc: m = rho * pi * r^2, I = m * r^2 / 2
        let mass = material.density * std::f32::consts::PI * radius * radius;
        let inertia = 0.5 * mass * radius * radius;
        Ok(Self {
            id,
            center,
            depth: 0.0,
            angle: 0.0,
            velocity,
            angular_velocity,
            radius,
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia: 1.0 / inertia,
            material,
        })
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Dynamic for Sphere {
    fn position(&self) -> Vec2 {
        self.center
    }

    fn set_position(&mut self, p: Vec2) {
        self.center = p;
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn set_velocity(&mut self, v: Vec2) {
        self.velocity = v;
    }

    fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    fn set_angular_velocity(&mut self, w: f32) {
        self.angular_velocity = w;
    }

    fn mass(&self) -> f32 {
        self.mass
    }

    fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    fn material(&self) -> Material {
        self.material
    }
}

/// Dynamic convex polygon. Vertices are stored relative to the centre of
/// mass; `position` tracks the world centre of mass and `angle` the
/// accumulated rotation about it.
#[derive(Debug, Clone, Serialize)]
pub struct Polygon {
    id: BodyId,
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    local: Vec<Vec2>,
    mass: f32,
    inv_mass: f32,
    inv_inertia: f32,
    material: Material,
}

impl Polygon {
    /// Regular polygon with `sides` vertices inscribed in `radius`, recentred
    /// on its true centre of mass (the `PolygonCreator` role).
    pub(crate) fn regular(
        id: BodyId,
        velocity: Vec2,
        angular_velocity: f32,
        origin: Vec2,
        sides: usize,
        radius: f32,
        material: Material,
    ) -> Result<Self, ShapeError> {
        if sides < 3 {
            return Err(ShapeError::TooFewVertices(sides));
        }
        if radius <= 0.0 {
            return Err(ShapeError::NonPositiveRadius(radius));
        }
        let verts = geometry::regular_polygon(origin, sides, radius);
        Self::from_vertices(id, velocity, angular_velocity, verts, material)
    }

    /// Build a polygon from world-space vertices; winding is normalized to
    /// counter-clockwise and the vertex list is recentred on the centroid.
    pub(crate) fn from_vertices(
        id: BodyId,
        velocity: Vec2,
        angular_velocity: f32,
        mut verts: Vec<Vec2>,
        material: Material,
    ) -> Result<Self, ShapeError> {
        if verts.len() < 3 {
            return Err(ShapeError::TooFewVertices(verts.len()));
        }
        let signed_area = geometry::polygon_signed_area(&verts);
        if signed_area.abs() < 1e-6 {
            return Err(ShapeError::DegeneratePolygon);
        }
        if signed_area < 0.0 {
            verts.reverse();
        }
        let centroid = geometry::polygon_centroid(&verts);
        let local: Vec<Vec2> = verts.iter().map(|&v| v - centroid).collect();
        let mass = material.density * geometry::polygon_area(&local);
        let inertia = geometry::polygon_inertia(&local, material.density);
        Ok(Self {
            id,
            position: centroid,
            angle: 0.0,
            velocity,
            angular_velocity,
            local,
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia: 1.0 / inertia,
            material,
        })
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Vertices relative to the centre of mass, counter-clockwise.
    pub fn local_vertices(&self) -> &[Vec2] {
        &self.local
    }

    /// Vertices in world space at the current position and rotation.
    pub fn world_vertices(&self) -> Vec<Vec2> {
        let (sin, cos) = self.angle.sin_cos();
        self.local
            .iter()
            .map(|v| {
                let rotated = Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos);
                self.position + rotated
            })
            .collect()
    }
}

impl Dynamic for Polygon {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, p: Vec2) {
        self.position = p;
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn set_velocity(&mut self, v: Vec2) {
        self.velocity = v;
    }

    fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    fn set_angular_velocity(&mut self, w: f32) {
        self.angular_velocity = w;
    }

    fn mass(&self) -> f32 {
        self.mass
    }

    fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    fn material(&self) -> Material {
        self.material
    }
}

/// Copy-on-read render snapshot of one body. Carries enough geometry to be
/// drawn without the core knowing about pixels, cameras or colors, and
/// enough to rebuild the body through the `Space` factories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Drawable {
    Sphere {
        id: BodyId,
        center: Vec2,
        radius: f32,
        /// Render-only depth hint.
        depth: f32,
        angle: f32,
    },
    Polygon {
        id: BodyId,
        points: Vec<Vec2>,
    },
    Wall {
        id: BodyId,
        p1: Vec2,
        p2: Vec2,
    },
    Block {
        id: BodyId,
        min: Vec2,
        max: Vec2,
    },
}

impl Drawable {
    /// True for spheres and polygons (bodies that move).
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Drawable::Sphere { .. } | Drawable::Polygon { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_wall_rejected() {
        let p = Vec2::new(5.0, 5.0);
        let err = Wall::new(BodyId(0), p, p, Material::CONSTANTIN, None).unwrap_err();
        assert_eq!(err, ShapeError::DegenerateWall);
    }

    #[test]
    fn test_sphere_rejects_non_positive_radius() {
        for r in [0.0, -3.0] {
            let err = Sphere::new(BodyId(0), Vec2::ZERO, 0.0, Vec2::ZERO, r, Material::WOOD)
                .unwrap_err();
            assert_eq!(err, ShapeError::NonPositiveRadius(r));
        }
    }

    #[test]
    fn test_sphere_mass_from_material() {
        let s = Sphere::new(BodyId(0), Vec2::ZERO, 0.0, Vec2::ZERO, 2.0, Material::WOOD).unwrap();
        let expected = Material::WOOD.density * std::f32::consts::PI * 4.0;
        assert!((s.mass() - expected).abs() < 1e-4);
        assert!(s.inv_mass() > 0.0);
    }

    #[test]
    fn test_polygon_rejects_degenerates() {
        assert_eq!(
            Polygon::regular(BodyId(0), Vec2::ZERO, 0.0, Vec2::ZERO, 2, 10.0, Material::WOOD)
                .unwrap_err(),
            ShapeError::TooFewVertices(2)
        );
        assert_eq!(
            Polygon::regular(BodyId(0), Vec2::ZERO, 0.0, Vec2::ZERO, 5, 0.0, Material::WOOD)
                .unwrap_err(),
            ShapeError::NonPositiveRadius(0.0)
        );
        // Collinear vertices enclose no area
        let line = vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)];
        assert_eq!(
            Polygon::from_vertices(BodyId(0), Vec2::ZERO, 0.0, line, Material::WOOD).unwrap_err(),
            ShapeError::DegeneratePolygon
        );
    }

    #[test]
    fn test_polygon_recentred_on_centroid() {
        let origin = Vec2::new(40.0, -10.0);
        let p = Polygon::regular(BodyId(0), Vec2::ZERO, 0.0, origin, 6, 20.0, Material::WOOD)
            .unwrap();
        // A regular polygon's centroid is its construction origin
        assert!((p.position - origin).length() < 1e-3);
        let local_centroid = crate::geometry::polygon_centroid(p.local_vertices());
        assert!(local_centroid.length() < 1e-3);
    }

    #[test]
    fn test_polygon_winding_normalized() {
        let cw = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 0.0),
        ];
        let p = Polygon::from_vertices(BodyId(0), Vec2::ZERO, 0.0, cw, Material::WOOD).unwrap();
        assert!(crate::geometry::polygon_signed_area(p.local_vertices()) > 0.0);
    }

    #[test]
    fn test_impulse_changes_velocity_and_spin() {
        let mut s =
            Sphere::new(BodyId(0), Vec2::ZERO, 0.0, Vec2::ZERO, 10.0, Material::WOOD).unwrap();
        s.apply_impulse(Vec2::new(s.mass(), 0.0));
        assert!((s.velocity - Vec2::new(1.0, 0.0)).length() < 1e-5);

        // Off-centre impulse spins the body
        s.apply_impulse_at(Vec2::new(0.0, s.mass()), Vec2::new(10.0, 0.0));
        assert!(s.angular_velocity > 0.0);

        // Pure angular impulse leaves linear velocity alone
        let v = s.velocity;
        let w = s.angular_velocity;
        s.apply_angular_impulse(1.0 / s.inv_inertia());
        assert_eq!(s.velocity, v);
        assert!((s.angular_velocity - (w + 1.0)).abs() < 1e-5);
    }

    #[test]
    fn test_world_vertices_rotate() {
        let mut p =
            Polygon::regular(BodyId(0), Vec2::ZERO, 0.0, Vec2::ZERO, 4, 10.0, Material::WOOD)
                .unwrap();
        let before = p.world_vertices();
        p.angle = std::f32::consts::FRAC_PI_2;
        let after = p.world_vertices();
        // First vertex starts at (10, 0); a quarter turn moves it to (0, 10)
        assert!((before[0] - Vec2::new(10.0, 0.0)).length() < 1e-3);
        assert!((after[0] - Vec2::new(0.0, 10.0)).length() < 1e-3);
    }
}
