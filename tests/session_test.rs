use approx::assert_relative_eq;
use deferred_ngin::{
    config::Settings,
    flow::{FrameTimer, Invalidation, SessionEvent, Stage, overlay_line},
    physics::Nudge,
    render::LightCullTechnique,
    scenes::SceneSelection,
};
use instant::Duration;
use winit::keyboard::KeyCode;

#[test]
fn should_map_keys_to_events() {
    assert_eq!(SessionEvent::from_key(KeyCode::Digit1), Some(SessionEvent::SetTechnique(0)));
    assert_eq!(SessionEvent::from_key(KeyCode::Digit6), Some(SessionEvent::SetTechnique(5)));
    assert_eq!(SessionEvent::from_key(KeyCode::Digit9), Some(SessionEvent::SetMsaa(4)));
    assert_eq!(SessionEvent::from_key(KeyCode::Digit0), Some(SessionEvent::SetMsaa(8)));
    assert_eq!(
        SessionEvent::from_key(KeyCode::F3),
        Some(SessionEvent::SelectScene(SceneSelection::Sponza))
    );
    assert_eq!(SessionEvent::from_key(KeyCode::NumpadAdd), Some(SessionEvent::ChangeLightPower(1)));
    assert_eq!(SessionEvent::from_key(KeyCode::Minus), Some(SessionEvent::ChangeLightPower(-1)));
    assert_eq!(SessionEvent::from_key(KeyCode::Space), Some(SessionEvent::ToggleLightAnimation));
    assert_eq!(SessionEvent::from_key(KeyCode::F9), Some(SessionEvent::ToggleUi));
    assert_eq!(SessionEvent::from_key(KeyCode::KeyJ), Some(SessionEvent::PhysicsKey(Nudge::Up)));
    // camera movement keys belong to the camera controller
    assert_eq!(SessionEvent::from_key(KeyCode::KeyW), None);
}

#[test]
fn should_invalidate_scene_only_on_scene_change() {
    assert_eq!(
        SessionEvent::SelectScene(SceneSelection::Cubes).invalidation(),
        Invalidation::Scene
    );
    for event in [
        SessionEvent::SetTechnique(2),
        SessionEvent::ChangeLightPower(1),
        SessionEvent::ToggleLightingOnly,
        SessionEvent::Resized { width: 10, height: 10 },
        SessionEvent::PhysicsKey(Nudge::Left),
    ] {
        assert_eq!(event.invalidation(), Invalidation::None, "{event:?}");
    }
}

#[test]
fn should_rebuild_renderer_on_msaa_change() {
    assert_eq!(SessionEvent::SetMsaa(4).invalidation(), Invalidation::Renderer);
    assert_eq!(SessionEvent::SetMsaa(1).invalidation(), Invalidation::Renderer);
}

#[test]
fn should_snap_msaa_to_offered_counts() {
    let mut settings = Settings::default();
    assert_eq!(settings.msaa_samples, 1);

    for (requested, expected) in [(4, 4), (3, 2), (16, 8), (0, 1), (8, 8)] {
        SessionEvent::SetMsaa(requested).apply_to(&mut settings);
        assert_eq!(settings.msaa_samples, expected, "{requested}x");
    }
}

#[test]
fn should_clamp_light_power() {
    let mut settings = Settings::default();
    assert_eq!(settings.light_power, 10);

    SessionEvent::ChangeLightPower(1).apply_to(&mut settings);
    assert_eq!(settings.light_power, 10);

    SessionEvent::ChangeLightPower(-3).apply_to(&mut settings);
    assert_eq!(settings.light_power, 7);

    SessionEvent::ChangeLightPower(-20).apply_to(&mut settings);
    assert_eq!(settings.light_power, 0);
}

#[test]
fn should_select_default_technique_for_unknown_code() {
    let mut settings = Settings::default();
    SessionEvent::SetTechnique(0).apply_to(&mut settings);
    assert_eq!(settings.ui.light_cull_technique, LightCullTechnique::ForwardNone);

    SessionEvent::SetTechnique(42).apply_to(&mut settings);
    assert_eq!(settings.ui.light_cull_technique, LightCullTechnique::QuadDeferredLighting);
}

#[test]
fn should_toggle_switches() {
    let mut settings = Settings::default();
    for event in [
        SessionEvent::ToggleLightAnimation,
        SessionEvent::ToggleLightingOnly,
        SessionEvent::ToggleFaceNormals,
        SessionEvent::ToggleLightCount,
        SessionEvent::TogglePerSampleShading,
        SessionEvent::ToggleUi,
    ] {
        event.apply_to(&mut settings);
    }
    assert!(settings.animate_lights);
    assert!(settings.ui.lighting_only);
    assert!(settings.ui.face_normals);
    assert!(settings.ui.visualize_light_count);
    assert!(settings.ui.visualize_per_sample_shading);
    assert!(!settings.show_overlay);

    SessionEvent::ToggleLightingOnly.apply_to(&mut settings);
    assert!(!settings.ui.lighting_only);
}

#[test]
fn should_ignore_zero_sized_resize() {
    let mut settings = Settings::default();
    SessionEvent::Resized { width: 0, height: 300 }.apply_to(&mut settings);
    assert_eq!((settings.width, settings.height), (1280, 720));

    SessionEvent::Resized { width: 800, height: 600 }.apply_to(&mut settings);
    assert_eq!((settings.width, settings.height), (800, 600));
}

#[test]
fn should_leave_settings_alone_for_physics_keys() {
    let mut settings = Settings::default();
    SessionEvent::PhysicsKey(Nudge::Forward).apply_to(&mut settings);
    assert_eq!(settings, Settings::default());
}

#[test]
fn should_select_scene() {
    let mut settings = Settings::default();
    SessionEvent::SelectScene(SceneSelection::MultiScene).apply_to(&mut settings);
    assert_eq!(settings.scene, SceneSelection::MultiScene);
}

#[test]
fn should_initialize_stage_once() {
    let mut stage: Stage<u32> = Stage::default();
    assert!(!stage.is_ready());
    assert!(stage.get().is_none());

    let mut calls = 0;
    *stage.get_or_init(|| {
        calls += 1;
        1
    }) += 1;
    stage.get_or_init(|| {
        calls += 1;
        100
    });

    assert_eq!(calls, 1);
    assert_eq!(stage.get(), Some(&2));

    stage.reset();
    assert!(!stage.is_ready());
}

#[test]
fn should_report_frame_time_once_per_second() {
    let mut timer = FrameTimer::default();
    let frame = Duration::from_millis(16);

    for _ in 0..62 {
        assert_eq!(timer.record(frame), None);
    }
    let ms = timer.record(frame).expect("a second has passed");
    assert_relative_eq!(ms, 16.0, epsilon = 1e-3);

    assert_eq!(timer.record(frame), None);
}

#[test]
fn should_format_overlay_line() {
    assert_eq!(
        overlay_line(LightCullTechnique::QuadDeferredLighting, 16.0, 1024),
        "Quad Deferred Light | 16.00 ms / frame | Lights: 1024"
    );
}
