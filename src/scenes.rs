//! The selectable test scenes.
//!
//! Each scene is a recipe: a world transform, the meshes and placements to
//! add, the sky and where the camera starts. Mesh paths are relative to the
//! media directory.

use cgmath::Point3;
use serde::{Deserialize, Serialize};

use crate::{
    data_structures::{scene_graph::SceneGraph, transform::Transform},
    physics::{PhysicsService, PhysicsSync, sphere_stack},
    resources::MeshLoader,
};

pub const SPHERE_MESH: &str = "cube/sphere.obj";
pub const POWER_PLANT_MESH: &str = "powerplant/powerplant.glb";
pub const SPONZA_MESH: &str = "sponza/sponza.gltf";
pub const SKYBOX_TEXTURE: &str = "skybox/empty_space.png";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneSelection {
    #[default]
    CubeWorld,
    PowerPlant,
    Sponza,
    MultiScene,
    /// Physics-driven spheres.
    Cubes,
}

impl SceneSelection {
    pub const ALL: [SceneSelection; 5] = [
        SceneSelection::CubeWorld,
        SceneSelection::PowerPlant,
        SceneSelection::Sponza,
        SceneSelection::MultiScene,
        SceneSelection::Cubes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SceneSelection::CubeWorld => "Cube World",
            SceneSelection::PowerPlant => "Power Plant",
            SceneSelection::Sponza => "Sponza",
            SceneSelection::MultiScene => "Multi Object Scene",
            SceneSelection::Cubes => "Cubes",
        }
    }

    pub fn scale(self) -> f32 {
        match self {
            SceneSelection::Sponza | SceneSelection::MultiScene => 0.05,
            SceneSelection::CubeWorld | SceneSelection::PowerPlant | SceneSelection::Cubes => 1.0,
        }
    }
}

/// What the session needs from a freshly built scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSetup {
    pub eye: Point3<f32>,
    pub at: Point3<f32>,
    /// Sky texture relative to the media directory.
    pub skybox: Option<&'static str>,
    /// Present only for scenes driven by physics.
    pub physics_sync: Option<PhysicsSync>,
    pub scale: f32,
}

/// Replace the contents of `scene` with `selection`.
///
/// The physics service, when given, is shut down first and only
/// initialized again by scenes that use it. Without a service the physics
/// scene still places its spheres, they just stay where they start.
pub fn build_scene(
    selection: SceneSelection,
    scene: &mut SceneGraph,
    loader: &dyn MeshLoader,
    mut physics: Option<&mut dyn PhysicsService>,
) -> SceneSetup {
    if let Some(service) = physics.as_deref_mut() {
        service.shutdown();
    }

    let scale = selection.scale();
    scene.start_scene(Transform::uniform_scale(scale), scale);
    log::info!("Building scene {}", selection.label());

    let mut eye = Point3::new(100.0, 5.0, 5.0);
    let mut physics_sync = None;
    match selection {
        SceneSelection::CubeWorld => {
            scene.add(loader, SPHERE_MESH, Transform::new());
        }
        SceneSelection::PowerPlant => {
            scene.add(loader, POWER_PLANT_MESH, Transform::new());
        }
        SceneSelection::Sponza => {
            scene.add(loader, SPONZA_MESH, Transform::new());
            eye = Point3::new(1200.0, 200.0, 100.0);
        }
        SceneSelection::MultiScene => {
            scene.add(loader, SPONZA_MESH, Transform::new());
            scene.add(loader, POWER_PLANT_MESH, Transform::from_translation(0.0, 10.0, 0.0));
        }
        SceneSelection::Cubes => {
            let bodies = sphere_stack();
            let handles = match physics.as_deref_mut() {
                Some(service) => service.initialize(&bodies),
                None => {
                    log::warn!("No physics service, spheres will not move");
                    Vec::new()
                }
            };
            let mut sync = PhysicsSync::new();
            for (i, body) in bodies.iter().enumerate() {
                let p = body.position;
                let id = scene.add_at(loader, SPHERE_MESH, p.x, p.y, p.z, body.scale, body.scale, body.scale);
                if let Some(&handle) = handles.get(i) {
                    sync.bind(handle, id);
                }
            }
            physics_sync = Some(sync);
        }
    }

    SceneSetup {
        eye: Point3::new(eye.x * scale, eye.y * scale, eye.z * scale),
        at: Point3::new(0.0, 0.0, 0.0),
        skybox: Some(SKYBOX_TEXTURE),
        physics_sync,
        scale,
    }
}
