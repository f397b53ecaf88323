use cgmath::{Deg, Matrix4, Point3, Vector3};
use deferred_ngin::{
    camera::{Camera, Projection},
    data_structures::{mesh_instance::aabb_in_frustum, model::Aabb},
};

fn view_proj() -> Matrix4<f32> {
    let camera = Camera::look_at(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, -1.0));
    let projection = Projection::new(100, 100, Deg(60.0), 0.1, 100.0);
    projection.calc_matrix() * camera.calc_matrix()
}

fn cube_at(x: f32, y: f32, z: f32, half: f32) -> Aabb {
    Aabb::new(
        Vector3::new(x - half, y - half, z - half),
        Vector3::new(x + half, y + half, z + half),
    )
}

#[test]
fn should_keep_box_in_front_of_camera() {
    let m = view_proj();
    assert!(aabb_in_frustum(&cube_at(0.0, 0.0, -10.0, 1.0), &m, false));
    assert!(aabb_in_frustum(&cube_at(0.0, 0.0, -10.0, 1.0), &m, true));
}

#[test]
fn should_cull_box_behind_camera() {
    let m = view_proj();
    assert!(!aabb_in_frustum(&cube_at(0.0, 0.0, 20.0, 1.0), &m, false));
}

#[test]
fn should_cull_box_off_to_the_side() {
    let m = view_proj();
    assert!(!aabb_in_frustum(&cube_at(1000.0, 0.0, -5.0, 1.0), &m, false));
    assert!(!aabb_in_frustum(&cube_at(0.0, -1000.0, -5.0, 1.0), &m, false));
}

#[test]
fn should_cull_box_beyond_far_plane() {
    let m = view_proj();
    assert!(!aabb_in_frustum(&cube_at(0.0, 0.0, -1000.0, 1.0), &m, false));
}

#[test]
fn should_keep_box_straddling_a_plane() {
    let m = view_proj();
    // corners on both sides of the right plane
    let wide = Aabb::new(Vector3::new(-200.0, -1.0, -11.0), Vector3::new(200.0, 1.0, -9.0));
    assert!(aabb_in_frustum(&wide, &m, false));
}

#[test]
fn should_test_near_plane_only_when_asked() {
    let m = view_proj();
    let between_eye_and_near = Aabb::new(
        Vector3::new(-0.001, -0.001, -0.05),
        Vector3::new(0.001, 0.001, -0.02),
    );
    assert!(aabb_in_frustum(&between_eye_and_near, &m, false));
    assert!(!aabb_in_frustum(&between_eye_and_near, &m, true));
}
