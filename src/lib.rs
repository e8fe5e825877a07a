//! Tumble - a 2D rigid-body physics core
//!
//! Core modules:
//! - `space`: the world aggregate - body registry, fixed-timestep tick loop,
//!   per-tick callbacks, command queue
//! - `solver`: integration and impulse-based collision response
//! - `collision`: narrow-phase tests between spheres, convex polygons and walls
//! - `body`: the rigid-body variants and their construction-time validation
//! - `material`: the immutable physical-material catalog
//! - `geometry`: segment/polygon primitives shared by the above
//!
//! The crate is a simulation core only: it knows nothing about pixels,
//! cameras or files. Renderers consume [`Drawable`] snapshots, controllers
//! push [`Command`]s, and a persistence layer round-trips levels through the
//! `Space` factory surface.
//!
//! Coordinates are screen-like: +y points down and a positive gravity
//! constant accelerates dynamic bodies toward +y.

pub mod body;
pub mod collision;
pub mod geometry;
pub mod material;
pub mod solver;
pub mod space;

pub use body::{Block, BodyId, Drawable, Dynamic, Polygon, ShapeError, Sphere, Wall};
pub use material::Material;
pub use space::{Command, CommandSender, Executable, Space, SpaceConfig};

/// Engine tuning constants
pub mod consts {
    /// Default fixed simulation timestep (120 Hz)
    pub const DEFAULT_DT: f32 = 1.0 / 120.0;
    /// Default gravity acceleration (+y is down, screen convention)
    pub const DEFAULT_GRAVITY: f32 = 300.0;

    /// Extra separation applied on top of full de-penetration so resolved
    /// pairs end the tick strictly apart.
    pub const SEPARATION_SLOP: f32 = 1e-3;
    /// Floor for the resting-contact speed threshold. Contacts approaching
    /// slower than this (or than one tick's worth of gravity) resolve with
    /// zero restitution to avoid position oscillation.
    pub const RESTING_SPEED_MIN: f32 = 0.01;
    /// Squared length below which a direction is treated as degenerate.
    pub const EPSILON_SQ: f32 = 1e-12;
}
