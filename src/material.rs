//! Physical material catalog
//!
//! A material is an immutable named record of the properties that drive
//! collision response: restitution (bounce), friction (tangential damping)
//! and density (mass per unit area). Bodies keep a copy of their material;
//! nothing mutates a material after creation.

use serde::Serialize;

/// An immutable physical-property record looked up by rigid bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Material {
    /// Catalog name; persistence layers store this and look the material
    /// back up with [`Material::by_name`].
    pub name: &'static str,
    /// Fraction of normal-direction relative velocity preserved after a
    /// collision (0 = perfectly inelastic, 1 = perfectly elastic).
    pub restitution: f32,
    /// Coulomb friction coefficient.
    pub friction: f32,
    /// Mass per unit area, used to derive body mass from shape.
    pub density: f32,
}

impl Material {
    /// Canonical infinite-mass wall material; the default when a `Space`
    /// factory's material argument is omitted.
    pub const CONSTANTIN: Material = Material {
        name: "constantin",
        restitution: 0.35,
        friction: 0.6,
        density: 8.9,
    };

    pub const WOOD: Material = Material {
        name: "wood",
        restitution: 0.4,
        friction: 0.45,
        density: 0.7,
    };

    pub const STEEL: Material = Material {
        name: "steel",
        restitution: 0.55,
        friction: 0.35,
        density: 7.8,
    };

    pub const RUBBER: Material = Material {
        name: "rubber",
        restitution: 0.85,
        friction: 0.9,
        density: 1.1,
    };

    pub const ICE: Material = Material {
        name: "ice",
        restitution: 0.1,
        friction: 0.05,
        density: 0.92,
    };

    /// The full read-only catalog, built once at compile time.
    pub const CATALOG: [Material; 5] = [
        Material::CONSTANTIN,
        Material::WOOD,
        Material::STEEL,
        Material::RUBBER,
        Material::ICE,
    ];

    /// Look a material up by its catalog name (case-sensitive). The
    /// persistence boundary stores names; an unknown name is a construction
    /// error at the `Space` factory surface.
    pub fn by_name(name: &str) -> Option<Material> {
        Material::CATALOG.into_iter().find(|m| m.name == name)
    }

    /// [`Material::by_name`] with the miss promoted to the construction
    /// error the factory surface reports.
    pub fn resolve(name: &str) -> Result<Material, crate::body::ShapeError> {
        Material::by_name(name)
            .ok_or_else(|| crate::body::ShapeError::UnknownMaterial(name.to_string()))
    }
}
