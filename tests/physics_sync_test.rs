use approx::assert_relative_eq;
use cgmath::Vector3;
use deferred_ngin::{
    data_structures::{scene_graph::SceneGraph, transform::Transform},
    physics::{BodyDesc, BodyHandle, Nudge, PhysicsService, PhysicsSync, sphere_stack},
};

use crate::common::test_utils::{FakeLoader, FakePhysics};
mod common;

const SPHERE: &str = "sphere.obj";

fn one_body_scene(loader: &FakeLoader) -> (SceneGraph, PhysicsSync) {
    let mut scene = SceneGraph::new();
    scene.start_scene(Transform::new(), 1.0);
    let id = scene.add_at(loader, SPHERE, 1.0, 2.0, 3.0, 1.0, 1.0, 1.0);
    let mut sync = PhysicsSync::new();
    sync.bind(BodyHandle(0), id);
    (scene, sync)
}

#[test]
fn should_skip_sync_while_uninitialized() {
    let loader = FakeLoader::new();
    let (mut scene, sync) = one_body_scene(&loader);
    let mut physics = FakePhysics::default();

    assert_eq!(sync.sync(&mut physics, &mut scene, 0.5), 0);
    assert_eq!(physics.steps, 0);
}

#[test]
fn should_step_once_and_copy_positions() {
    let loader = FakeLoader::new();
    let (mut scene, sync) = one_body_scene(&loader);
    let mut physics = FakePhysics::default();
    physics.initialize(&[BodyDesc {
        position: Vector3::new(1.0, 2.0, 3.0),
        scale: 1.0,
    }]);

    assert_eq!(sync.sync(&mut physics, &mut scene, 0.5), 1);

    assert_eq!(physics.steps, 1);
    let position = scene.placements()[0].transform().position;
    assert_relative_eq!(position.x, 1.0);
    assert_relative_eq!(position.y, 1.5);
    assert_relative_eq!(position.z, 3.0);
}

#[test]
fn should_ignore_placements_of_an_old_scene() {
    let loader = FakeLoader::new();
    let (mut scene, sync) = one_body_scene(&loader);
    let mut physics = FakePhysics::default();
    physics.initialize(&[BodyDesc {
        position: Vector3::new(0.0, 0.0, 0.0),
        scale: 1.0,
    }]);
    scene.start_scene(Transform::new(), 1.0);
    scene.add(&loader, SPHERE, Transform::new());

    assert_eq!(sync.sync(&mut physics, &mut scene, 0.1), 0);
    assert_eq!(scene.placements()[0].transform().position, Vector3::new(0.0, 0.0, 0.0));
}

#[test]
fn should_skip_bodies_without_position() {
    let loader = FakeLoader::new();
    let (mut scene, mut sync) = one_body_scene(&loader);
    let extra = scene.add(&loader, SPHERE, Transform::new());
    sync.bind(BodyHandle(7), extra);
    let mut physics = FakePhysics::default();
    physics.initialize(&[BodyDesc {
        position: Vector3::new(0.0, 4.0, 0.0),
        scale: 1.0,
    }]);

    assert_eq!(sync.len(), 2);
    assert_eq!(sync.sync(&mut physics, &mut scene, 1.0), 1);
}

#[test]
fn should_stack_hundred_spheres_above_ground() {
    let bodies = sphere_stack();
    assert_eq!(bodies.len(), 100);
    for body in &bodies {
        assert!(body.position.y - body.scale > 0.0);
        assert!(body.position.x.abs() < 10.0 && body.position.z.abs() < 10.0);
    }
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            let gap = (a.position - b.position).map(f32::abs);
            assert!(gap.x >= 1.0 || gap.y >= 1.0 || gap.z >= 1.0, "bodies overlap");
        }
    }
}

#[test]
fn should_point_nudges_in_unit_directions() {
    use cgmath::InnerSpace;
    for nudge in [Nudge::Left, Nudge::Right, Nudge::Forward, Nudge::Back, Nudge::Up] {
        assert_relative_eq!(nudge.direction().magnitude(), 1.0);
    }
    assert_eq!(Nudge::Left.direction(), -Nudge::Right.direction());
}

#[cfg(feature = "physics")]
mod rapier_backend {
    use super::*;
    use deferred_ngin::physics::rapier::RapierPhysics;

    #[test]
    fn should_drop_spheres_under_gravity() {
        let mut physics = RapierPhysics::new();
        let handles = physics.initialize(&[BodyDesc {
            position: Vector3::new(0.0, 10.0, 0.0),
            scale: 1.0,
        }]);
        assert_eq!(handles, vec![BodyHandle(0)]);
        assert!(physics.is_initialized());

        for _ in 0..60 {
            physics.step(1.0 / 60.0);
        }

        let position = physics.position(handles[0]).expect("body exists");
        assert!(position.y < 10.0, "sphere did not fall: {position:?}");
        assert!(position.y > 0.0, "sphere fell through the ground: {position:?}");
        assert!(physics.orientation(handles[0]).is_some());
    }

    #[test]
    fn should_forget_bodies_on_shutdown() {
        let mut physics = RapierPhysics::new();
        let handles = physics.initialize(&sphere_stack());
        assert_eq!(handles.len(), 100);

        physics.shutdown();

        assert!(!physics.is_initialized());
        assert!(physics.position(handles[0]).is_none());
        // stepping and nudging a shut down world are no-ops
        physics.step(1.0);
        physics.process_key(Nudge::Up);
        physics.shutdown();
    }

    #[test]
    fn should_push_bodies_on_nudge() {
        let mut physics = RapierPhysics::new();
        let handles = physics.initialize(&[BodyDesc {
            position: Vector3::new(0.0, 10.0, 0.0),
            scale: 1.0,
        }]);

        physics.process_key(Nudge::Right);
        physics.step(1.0 / 60.0);

        let position = physics.position(handles[0]).expect("body exists");
        assert!(position.x > 0.0);
    }
}
