use approx::assert_relative_eq;
use deferred_ngin::{
    data_structures::scene_graph::SceneGraph,
    physics::PhysicsService,
    scenes::{
        POWER_PLANT_MESH, SKYBOX_TEXTURE, SPHERE_MESH, SPONZA_MESH, SceneSelection, build_scene,
    },
};

use crate::common::test_utils::{FakeLoader, FakePhysics};
mod common;

#[test]
fn should_build_cube_world() {
    let loader = FakeLoader::new();
    let mut scene = SceneGraph::new();

    let setup = build_scene(SceneSelection::CubeWorld, &mut scene, &loader, None);

    assert_eq!(scene.len(), 1);
    assert_eq!(loader.loads(SPHERE_MESH), 1);
    assert_eq!(setup.eye, cgmath::Point3::new(100.0, 5.0, 5.0));
    assert_eq!(setup.at, cgmath::Point3::new(0.0, 0.0, 0.0));
    assert_eq!(setup.skybox, Some(SKYBOX_TEXTURE));
    assert!(setup.physics_sync.is_none());
}

#[test]
fn should_scale_sponza_and_its_camera() {
    let loader = FakeLoader::new();
    let mut scene = SceneGraph::new();

    let setup = build_scene(SceneSelection::Sponza, &mut scene, &loader, None);

    assert_eq!(loader.loads(SPONZA_MESH), 1);
    assert_relative_eq!(scene.scale(), 0.05);
    assert_relative_eq!(setup.scale, 0.05);
    assert_relative_eq!(setup.eye.x, 60.0, epsilon = 1e-4);
    assert_relative_eq!(setup.eye.y, 10.0, epsilon = 1e-4);
    assert_relative_eq!(setup.eye.z, 5.0, epsilon = 1e-4);
    assert_relative_eq!(scene.placements()[0].transform().scale.y, 0.05);
}

#[test]
fn should_lift_power_plant_in_multi_scene() {
    let loader = FakeLoader::new();
    let mut scene = SceneGraph::new();

    build_scene(SceneSelection::MultiScene, &mut scene, &loader, None);

    assert_eq!(scene.len(), 2);
    assert_eq!(loader.loads(SPONZA_MESH), 1);
    assert_eq!(loader.loads(POWER_PLANT_MESH), 1);
    let plant = &scene.placements()[1];
    assert_relative_eq!(plant.transform().position.y, 0.5, epsilon = 1e-6);
}

#[test]
fn should_bind_every_sphere_to_a_body() {
    let loader = FakeLoader::new();
    let mut scene = SceneGraph::new();
    let mut physics = FakePhysics::default();

    let setup = build_scene(
        SceneSelection::Cubes,
        &mut scene,
        &loader,
        Some(&mut physics as &mut dyn PhysicsService),
    );

    assert!(physics.initialized);
    assert_eq!(physics.shutdowns, 1);
    assert_eq!(scene.len(), 100);
    assert_eq!(scene.meshes().len(), 1);
    assert_eq!(loader.loads(SPHERE_MESH), 1);
    let sync = setup.physics_sync.expect("physics scene has a sync");
    assert_eq!(sync.len(), 100);
    for (i, (body, instance)) in sync.bindings().iter().enumerate() {
        assert_eq!(body.0, i);
        assert_eq!(instance.index() as usize, i);
    }
}

#[test]
fn should_place_spheres_without_physics_service() {
    let loader = FakeLoader::new();
    let mut scene = SceneGraph::new();

    let setup = build_scene(SceneSelection::Cubes, &mut scene, &loader, None);

    assert_eq!(scene.len(), 100);
    assert!(setup.physics_sync.is_some_and(|sync| sync.is_empty()));
}

#[test]
fn should_shut_physics_down_when_leaving_physics_scene() {
    let loader = FakeLoader::new();
    let mut scene = SceneGraph::new();
    let mut physics = FakePhysics::default();

    build_scene(
        SceneSelection::Cubes,
        &mut scene,
        &loader,
        Some(&mut physics as &mut dyn PhysicsService),
    );
    let setup = build_scene(
        SceneSelection::PowerPlant,
        &mut scene,
        &loader,
        Some(&mut physics as &mut dyn PhysicsService),
    );

    assert!(!physics.initialized);
    assert_eq!(physics.shutdowns, 2);
    assert_eq!(scene.len(), 1);
    assert!(setup.physics_sync.is_none());
}

#[test]
fn should_keep_scene_when_mesh_is_missing() {
    let loader = FakeLoader::failing(&[POWER_PLANT_MESH]);
    let mut scene = SceneGraph::new();

    build_scene(SceneSelection::PowerPlant, &mut scene, &loader, None);

    assert_eq!(scene.len(), 1);
    assert!(!scene.is_loaded());
}

#[test]
fn should_label_every_scene() {
    for selection in SceneSelection::ALL {
        assert!(!selection.label().is_empty());
        assert!(selection.scale() > 0.0);
    }
    assert_eq!(SceneSelection::default(), SceneSelection::CubeWorld);
}
