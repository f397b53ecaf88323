//! [`PhysicsService`] on top of rapier3d: a static ground slab and one
//! dynamic ball per body, stepped at a fixed rate.

use cgmath::{Quaternion, Vector3};
use rapier3d::prelude as rapier;

use crate::physics::{BodyDesc, BodyHandle, Nudge, PhysicsService};

const TIMESTEP: f32 = 1.0 / 60.0;
const MAX_SUBSTEPS: u32 = 4;
const NUDGE_IMPULSE: f32 = 4.0;
const GROUND_HALF_EXTENT: f32 = 50.0;

struct World {
    pipeline: rapier::PhysicsPipeline,
    gravity: rapier::Vector<f32>,
    integration_params: rapier::IntegrationParameters,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,
    handles: Vec<rapier::RigidBodyHandle>,
}

impl World {
    fn new() -> Self {
        let mut integration_params = rapier::IntegrationParameters::default();
        integration_params.dt = TIMESTEP;
        Self {
            pipeline: rapier::PhysicsPipeline::new(),
            gravity: rapier::Vector::new(0.0, -9.81, 0.0),
            integration_params,
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            handles: Vec::new(),
        }
    }

    fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    fn body(&self, body: BodyHandle) -> Option<&rapier::RigidBody> {
        self.handles.get(body.0).and_then(|h| self.bodies.get(*h))
    }
}

#[derive(Default)]
pub struct RapierPhysics {
    world: Option<World>,
    accumulated_time: f32,
}

impl RapierPhysics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhysicsService for RapierPhysics {
    fn initialize(&mut self, bodies: &[BodyDesc]) -> Vec<BodyHandle> {
        let mut world = World::new();

        let ground = rapier::ColliderBuilder::cuboid(GROUND_HALF_EXTENT, 0.5, GROUND_HALF_EXTENT)
            .translation(rapier::vector![0.0, -0.5, 0.0])
            .build();
        world.colliders.insert(ground);

        for desc in bodies {
            let body = rapier::RigidBodyBuilder::dynamic()
                .translation(rapier::vector![desc.position.x, desc.position.y, desc.position.z])
                .build();
            let handle = world.bodies.insert(body);
            let collider = rapier::ColliderBuilder::ball(desc.scale).restitution(0.4).build();
            world
                .colliders
                .insert_with_parent(collider, handle, &mut world.bodies);
            world.handles.push(handle);
        }

        log::info!("Physics world ready with {} bodies", bodies.len());
        self.world = Some(world);
        self.accumulated_time = 0.0;
        (0..bodies.len()).map(BodyHandle).collect()
    }

    fn is_initialized(&self) -> bool {
        self.world.is_some()
    }

    fn step(&mut self, dt: f32) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        self.accumulated_time += dt;
        let mut steps = 0;
        while self.accumulated_time >= TIMESTEP && steps < MAX_SUBSTEPS {
            world.step();
            self.accumulated_time -= TIMESTEP;
            steps += 1;
        }
        // drop the backlog after a stall
        if steps == MAX_SUBSTEPS {
            self.accumulated_time = self.accumulated_time.min(TIMESTEP);
        }
    }

    fn shutdown(&mut self) {
        if self.world.take().is_some() {
            log::info!("Physics world shut down");
        }
    }

    fn position(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        let t = self.world.as_ref()?.body(body)?.translation();
        Some(Vector3::new(t.x, t.y, t.z))
    }

    fn orientation(&self, body: BodyHandle) -> Option<Quaternion<f32>> {
        let r = self.world.as_ref()?.body(body)?.rotation();
        Some(Quaternion::new(r.w, r.i, r.j, r.k))
    }

    fn process_key(&mut self, nudge: Nudge) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        let d = nudge.direction() * NUDGE_IMPULSE;
        for handle in &world.handles {
            if let Some(body) = world.bodies.get_mut(*handle) {
                body.apply_impulse(rapier::vector![d.x, d.y, d.z], true);
            }
        }
    }
}
