//! Rigid-body physics behind a service trait, and the adapter that mirrors
//! body positions into scene placements.
//!
//! The renderer never talks to a physics engine directly. A
//! [`PhysicsService`] owns the simulation; [`PhysicsSync`] only remembers
//! which placement shows which body and copies positions across once per
//! frame.

use cgmath::{Quaternion, Vector3};

use crate::data_structures::scene_graph::{InstanceId, SceneGraph};

#[cfg(feature = "physics")]
pub mod rapier;

/// Index of a body in the order it was passed to
/// [`PhysicsService::initialize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub usize);

/// Initial state of one dynamic sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDesc {
    pub position: Vector3<f32>,
    /// sphere radius
    pub scale: f32,
}

/// Push applied to every body, bound to keys by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Nudge {
    Left,
    Right,
    Forward,
    Back,
    Up,
}

impl Nudge {
    /// Unit direction in world space.
    pub fn direction(self) -> Vector3<f32> {
        match self {
            Nudge::Left => Vector3::new(-1.0, 0.0, 0.0),
            Nudge::Right => Vector3::new(1.0, 0.0, 0.0),
            Nudge::Forward => Vector3::new(0.0, 0.0, -1.0),
            Nudge::Back => Vector3::new(0.0, 0.0, 1.0),
            Nudge::Up => Vector3::new(0.0, 1.0, 0.0),
        }
    }
}

pub trait PhysicsService {
    /// Create one body per description. Handles come back in the same order.
    fn initialize(&mut self, bodies: &[BodyDesc]) -> Vec<BodyHandle>;
    fn is_initialized(&self) -> bool;
    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f32);
    /// Drop every body. The service can be initialized again afterwards.
    fn shutdown(&mut self);
    fn position(&self, body: BodyHandle) -> Option<Vector3<f32>>;
    fn orientation(&self, body: BodyHandle) -> Option<Quaternion<f32>>;
    fn process_key(&mut self, nudge: Nudge);
}

/// Which placement shows which body. Bound once when the scene is built.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PhysicsSync {
    bindings: Vec<(BodyHandle, InstanceId)>,
}

impl PhysicsSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, body: BodyHandle, instance: InstanceId) {
        self.bindings.push((body, instance));
    }

    pub fn bindings(&self) -> &[(BodyHandle, InstanceId)] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Step the simulation once and move every bound placement to its
    /// body's position. Skipped entirely while the service is not
    /// initialized. Returns the number of placements moved.
    pub fn sync(&self, service: &mut dyn PhysicsService, scene: &mut SceneGraph, dt: f32) -> usize {
        if !service.is_initialized() {
            return 0;
        }
        service.step(dt);

        let mut moved = 0;
        for &(body, instance) in &self.bindings {
            let Some(position) = service.position(body) else {
                log::debug!("Physics body {body:?} has no position");
                continue;
            };
            if scene.set_mesh_position(instance, position.x, position.y, position.z) {
                moved += 1;
            }
        }
        moved
    }
}

/// Spheres dropped on the ground for the physics scene: a 5x5 grid per
/// layer, four layers, offset so neighbouring layers interleave.
pub fn sphere_stack() -> Vec<BodyDesc> {
    const GRID: usize = 5;
    const LAYERS: usize = 4;
    const SPACING: f32 = 2.5;
    const RADIUS: f32 = 1.0;

    let half = (GRID as f32 - 1.0) * SPACING * 0.5;
    let mut bodies = Vec::with_capacity(GRID * GRID * LAYERS);
    for layer in 0..LAYERS {
        let shift = if layer % 2 == 0 { 0.0 } else { SPACING * 0.5 };
        for row in 0..GRID {
            for column in 0..GRID {
                bodies.push(BodyDesc {
                    position: Vector3::new(
                        column as f32 * SPACING - half + shift,
                        10.0 + layer as f32 * SPACING * 1.5,
                        row as f32 * SPACING - half + shift,
                    ),
                    scale: RADIUS,
                });
            }
        }
    }
    bodies
}
