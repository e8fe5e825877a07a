//! The world aggregate
//!
//! A [`Space`] owns all bodies and advances them at a fixed timestep. Hosts
//! that tick from their own thread share it as `Arc<Mutex<Space>>`; every
//! method takes `&mut self` so the lock is the whole concurrency story.
//! External controllers never touch the lock: they clone a [`CommandSender`]
//! and queue [`Command`]s, which the space drains at the start of each step.
//! Renderers consume [`Drawable`] snapshots built fresh per call, never the
//! live collections.
//!
//! Logical time advances by exactly `dt` per step regardless of wall-clock
//! jitter; [`Space::tick`] additionally sleeps off any surplus so a bare
//! loop runs at the configured rate. After each step the dynamic-body
//! vectors are shuffled with the space-owned seeded RNG so iteration order
//! never becomes a hidden simulation parameter.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::body::{Block, BodyId, Drawable, Dynamic, Polygon, ShapeError, Sphere, Wall};
use crate::consts::{DEFAULT_DT, DEFAULT_GRAVITY};
use crate::material::Material;
use crate::solver::PhysicsHandler;

/// Construction parameters for a [`Space`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Fixed simulation timestep in seconds.
    pub dt: f32,
    /// Gravity acceleration along +y (screen convention, down).
    pub gravity: f32,
    /// Seed for the per-step iteration-order shuffle.
    pub seed: u64,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            gravity: DEFAULT_GRAVITY,
            seed: 0,
        }
    }
}

/// Commands buffered between steps. Sends past this limit are dropped, so
/// senders outliving a stalled space cannot grow the queue without bound.
const COMMAND_QUEUE_LIMIT: usize = 1024;

/// A mutation queued by an external controller, applied at the start of the
/// next step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    ApplyImpulse { id: BodyId, impulse: Vec2 },
    SetVelocity { id: BodyId, velocity: Vec2 },
    SetAngularVelocity { id: BodyId, angular_velocity: f32 },
}

/// Cloneable handle for queueing [`Command`]s without holding the space
/// lock. Obtained from [`Space::command_sender`].
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::SyncSender<Command>,
}

impl CommandSender {
    /// Queue a command. Never blocks: a command sent after the space was
    /// dropped, or while the queue is full, is discarded.
    pub fn send(&self, command: Command) {
        match self.tx.try_send(command) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(_)) => {
                log::debug!("command queue full, command dropped");
            }
            Err(mpsc::TrySendError::Disconnected(_)) => {
                log::debug!("command dropped, space no longer exists");
            }
        }
    }
}

/// Per-tick callback, run after the physics step.
pub type Executable = Box<dyn FnMut() + Send>;

/// The simulation world: static walls and blocks, dynamic spheres and
/// polygons, a command queue, per-tick callbacks, and the tick loop state.
pub struct Space {
    dt: f32,
    gravity: f32,
    /// Logical time, accumulated in f64 as exactly `dt` per step.
    time: f64,
    /// Measured rate of the last paced tick. Observability only.
    fps: f32,
    next_id: u32,
    walls: Vec<Wall>,
    blocks: Vec<Block>,
    spheres: Vec<Sphere>,
    polygons: Vec<Polygon>,
    callbacks: Vec<Executable>,
    handler: PhysicsHandler,
    rng: Pcg32,
    command_tx: mpsc::SyncSender<Command>,
    command_rx: mpsc::Receiver<Command>,
}

impl Space {
    pub fn new(config: SpaceConfig) -> Self {
        let (command_tx, command_rx) = mpsc::sync_channel(COMMAND_QUEUE_LIMIT);
        Self {
            dt: config.dt,
            gravity: config.gravity,
            time: 0.0,
            fps: 0.0,
            next_id: 0,
            walls: Vec::new(),
            blocks: Vec::new(),
            spheres: Vec::new(),
            polygons: Vec::new(),
            callbacks: Vec::new(),
            handler: PhysicsHandler,
            rng: Pcg32::seed_from_u64(config.seed),
            command_tx,
            command_rx,
        }
    }

    fn alloc_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a static wall segment. `material` defaults to
    /// [`Material::CONSTANTIN`].
    pub fn add_wall(
        &mut self,
        p1: Vec2,
        p2: Vec2,
        material: Option<Material>,
    ) -> Result<BodyId, ShapeError> {
        let id = self.alloc_id();
        let wall = Wall::new(id, p1, p2, material.unwrap_or(Material::CONSTANTIN), None)?;
        self.walls.push(wall);
        Ok(id)
    }

    /// Add a static axis-aligned block at top-left `(x, y)`. The block
    /// registers its four edge walls in the wall collection; the returned id
    /// is the block's.
    pub fn add_block(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        material: Option<Material>,
    ) -> Result<BodyId, ShapeError> {
        if width <= 0.0 || height <= 0.0 {
            return Err(ShapeError::NonPositiveExtent {
                w: width,
                h: height,
            });
        }
        let material = material.unwrap_or(Material::CONSTANTIN);
        let min = Vec2::new(x, y);
        let max = min + Vec2::new(width, height);
        let block_id = self.alloc_id();

        // Corner traversal: top, right, bottom, left
        let corners = [
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ];
        let mut wall_ids = [BodyId(0); 4];
        for i in 0..4 {
            let id = self.alloc_id();
            let wall = Wall::new(id, corners[i], corners[(i + 1) % 4], material, Some(block_id))?;
            self.walls.push(wall);
            wall_ids[i] = id;
        }
        self.blocks.push(Block::new(block_id, min, max, material, wall_ids));
        Ok(block_id)
    }

    /// Add a dynamic sphere. `material` defaults to
    /// [`Material::CONSTANTIN`].
    pub fn add_sphere(
        &mut self,
        velocity: Vec2,
        angular_velocity: f32,
        center: Vec2,
        radius: f32,
        material: Option<Material>,
    ) -> Result<BodyId, ShapeError> {
        self.add_sphere_with_depth(velocity, angular_velocity, center, radius, 0.0, material)
    }

    /// [`Space::add_sphere`] with an explicit render depth hint, so the
    /// persistence path can round-trip a snapshot's depth through the
    /// factory surface.
    pub fn add_sphere_with_depth(
        &mut self,
        velocity: Vec2,
        angular_velocity: f32,
        center: Vec2,
        radius: f32,
        depth: f32,
        material: Option<Material>,
    ) -> Result<BodyId, ShapeError> {
        let id = self.alloc_id();
        let mut sphere = Sphere::new(
            id,
            velocity,
            angular_velocity,
            center,
            radius,
            material.unwrap_or(Material::CONSTANTIN),
        )?;
        sphere.depth = depth;
        self.spheres.push(sphere);
        Ok(id)
    }

    /// Add a regular dynamic polygon with `sides` vertices inscribed in
    /// `radius` around `origin`.
    pub fn add_polygon(
        &mut self,
        velocity: Vec2,
        angular_velocity: f32,
        origin: Vec2,
        sides: usize,
        radius: f32,
        material: Option<Material>,
    ) -> Result<BodyId, ShapeError> {
        let id = self.alloc_id();
        let polygon = Polygon::regular(
            id,
            velocity,
            angular_velocity,
            origin,
            sides,
            radius,
            material.unwrap_or(Material::CONSTANTIN),
        )?;
        self.polygons.push(polygon);
        Ok(id)
    }

    /// Add a dynamic polygon from explicit world-space vertices (the
    /// persistence path: rebuilds a body from a snapshot's point list).
    pub fn add_polygon_points(
        &mut self,
        velocity: Vec2,
        angular_velocity: f32,
        points: Vec<Vec2>,
        material: Option<Material>,
    ) -> Result<BodyId, ShapeError> {
        let id = self.alloc_id();
        let polygon = Polygon::from_vertices(
            id,
            velocity,
            angular_velocity,
            points,
            material.unwrap_or(Material::CONSTANTIN),
        )?;
        self.polygons.push(polygon);
        Ok(id)
    }

    /// Register a per-tick callback, run after the physics step in
    /// registration order.
    pub fn add_callback(&mut self, callback: Executable) {
        self.callbacks.push(callback);
    }

    /// Handle for queueing commands from outside the space lock.
    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            tx: self.command_tx.clone(),
        }
    }

    /// Remove every dynamic body. Walls and blocks stay.
    pub fn delete_dynamic_objects(&mut self) {
        self.spheres.clear();
        self.polygons.clear();
    }

    /// One unpaced step: drain commands, run the guarded physics update and
    /// the callbacks, advance logical time, shuffle iteration order.
    /// Headless drivers and tests call this directly.
    pub fn step(&mut self) {
        self.drain_commands();

        let guarded = panic::catch_unwind(AssertUnwindSafe(|| {
            self.handler.update(
                &mut self.spheres,
                &mut self.polygons,
                &self.walls,
                self.gravity,
                self.dt,
            );
        }));
        if guarded.is_err() {
            log::error!("physics step panicked at t={}", self.time);
        }

        for (i, callback) in self.callbacks.iter_mut().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                log::warn!("tick callback {i} panicked");
            }
        }

        // Logical time never tracks the wall clock
        self.time += f64::from(self.dt);

        self.spheres.shuffle(&mut self.rng);
        self.polygons.shuffle(&mut self.rng);
    }

    /// One paced step: [`Space::step`], then sleep off whatever remains of
    /// the timestep and record the measured rate.
    pub fn tick(&mut self) {
        let start = Instant::now();
        self.step();

        let budget = Duration::from_secs_f32(self.dt);
        let elapsed = start.elapsed();
        if elapsed < budget {
            thread::sleep(budget - elapsed);
        }

        let total = start.elapsed().as_secs_f32();
        if total > 0.0 {
            self.fps = 1.0 / total;
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: Command) {
        let id = match command {
            Command::ApplyImpulse { id, .. }
            | Command::SetVelocity { id, .. }
            | Command::SetAngularVelocity { id, .. } => id,
        };
        let Some(body) = self.dynamic_mut(id) else {
            // The body may have been deleted since the command was queued
            log::debug!("command for unknown body {id:?} dropped");
            return;
        };
        match command {
            Command::ApplyImpulse { impulse, .. } => body.apply_impulse(impulse),
            Command::SetVelocity { velocity, .. } => body.set_velocity(velocity),
            Command::SetAngularVelocity {
                angular_velocity, ..
            } => body.set_angular_velocity(angular_velocity),
        }
    }

    fn dynamic_mut(&mut self, id: BodyId) -> Option<&mut dyn Dynamic> {
        if let Some(s) = self.spheres.iter_mut().find(|s| s.id() == id) {
            return Some(s);
        }
        if let Some(p) = self.polygons.iter_mut().find(|p| p.id() == id) {
            return Some(p);
        }
        None
    }

    /// Copy-on-read snapshot of every body, built fresh from the live
    /// collections. Block edge walls are represented by their block, not
    /// drawn twice.
    pub fn drawables(&self) -> Vec<Drawable> {
        let mut out = Vec::with_capacity(
            self.walls.len() + self.blocks.len() + self.spheres.len() + self.polygons.len(),
        );
        for w in &self.walls {
            if w.owner().is_none() {
                out.push(Drawable::Wall {
                    id: w.id(),
                    p1: w.p1(),
                    p2: w.p2(),
                });
            }
        }
        for b in &self.blocks {
            out.push(Drawable::Block {
                id: b.id(),
                min: b.min(),
                max: b.max(),
            });
        }
        for s in &self.spheres {
            out.push(Drawable::Sphere {
                id: s.id(),
                center: s.center,
                radius: s.radius(),
                depth: s.depth,
                angle: s.angle,
            });
        }
        for p in &self.polygons {
            out.push(Drawable::Polygon {
                id: p.id(),
                points: p.world_vertices(),
            });
        }
        out
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn spheres_mut(&mut self) -> &mut [Sphere] {
        &mut self.spheres
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn polygons_mut(&mut self) -> &mut [Polygon] {
        &mut self.polygons
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn sphere(&self, id: BodyId) -> Option<&Sphere> {
        self.spheres.iter().find(|s| s.id() == id)
    }

    pub fn sphere_mut(&mut self, id: BodyId) -> Option<&mut Sphere> {
        self.spheres.iter_mut().find(|s| s.id() == id)
    }

    pub fn polygon(&self, id: BodyId) -> Option<&Polygon> {
        self.polygons.iter().find(|p| p.id() == id)
    }

    pub fn polygon_mut(&mut self, id: BodyId) -> Option<&mut Polygon> {
        self.polygons.iter_mut().find(|p| p.id() == id)
    }

    /// Logical simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Measured rate of the last paced tick.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }
}
