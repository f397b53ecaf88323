use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use cgmath::{One, Quaternion, Vector3};
use deferred_ngin::{
    data_structures::{
        mesh_instance::{MeshData, SubMesh},
        model::Aabb,
    },
    physics::{BodyDesc, BodyHandle, Nudge, PhysicsService},
    resources::MeshLoader,
};

pub fn unit_box() -> Aabb {
    Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0))
}

/// Hands out one CPU-only unit box per path and counts how often each path
/// was requested.
#[derive(Default)]
pub struct FakeLoader {
    loads: RefCell<HashMap<String, usize>>,
    failing: HashSet<String>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(paths: &[&str]) -> Self {
        Self {
            loads: RefCell::default(),
            failing: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn loads(&self, path: &str) -> usize {
        self.loads.borrow().get(path).copied().unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.loads.borrow().values().sum()
    }
}

impl MeshLoader for FakeLoader {
    fn load(&self, path: &str) -> anyhow::Result<MeshData> {
        *self.loads.borrow_mut().entry(path.to_string()).or_default() += 1;
        if self.failing.contains(path) {
            anyhow::bail!("{path} is missing");
        }
        Ok(MeshData {
            submeshes: vec![SubMesh::new("unit", unit_box(), 0, None)],
            materials: Vec::new(),
        })
    }
}

/// Bodies fall by `dt` units per step and record what happened to them.
#[derive(Default)]
pub struct FakePhysics {
    pub bodies: Vec<Vector3<f32>>,
    pub initialized: bool,
    pub steps: u32,
    pub shutdowns: u32,
    pub nudges: Vec<Nudge>,
}

impl PhysicsService for FakePhysics {
    fn initialize(&mut self, bodies: &[BodyDesc]) -> Vec<BodyHandle> {
        self.bodies = bodies.iter().map(|b| b.position).collect();
        self.initialized = true;
        (0..bodies.len()).map(BodyHandle).collect()
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn step(&mut self, dt: f32) {
        self.steps += 1;
        for body in self.bodies.iter_mut() {
            body.y -= dt;
        }
    }

    fn shutdown(&mut self) {
        self.initialized = false;
        self.bodies.clear();
        self.shutdowns += 1;
    }

    fn position(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        if !self.initialized {
            return None;
        }
        self.bodies.get(body.0).copied()
    }

    fn orientation(&self, body: BodyHandle) -> Option<Quaternion<f32>> {
        self.position(body).map(|_| Quaternion::one())
    }

    fn process_key(&mut self, nudge: Nudge) {
        self.nudges.push(nudge);
    }
}
