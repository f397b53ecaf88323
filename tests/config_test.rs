use std::path::{Path, PathBuf};

use deferred_ngin::{
    config::{ConfigError, Settings},
    render::LightCullTechnique,
    scenes::SceneSelection,
};

#[test]
fn should_default_to_window_and_scene() {
    let settings = Settings::default();
    assert_eq!((settings.width, settings.height), (1280, 720));
    assert_eq!(settings.scene, SceneSelection::CubeWorld);
    assert!(!settings.animate_lights);
    assert_eq!(settings.msaa_samples, 1);
    assert!(settings.show_overlay);
    assert_eq!(settings.media_dir, PathBuf::from("assets"));
    assert_eq!(settings.ui.light_cull_technique, LightCullTechnique::QuadDeferredLighting);
}

#[test]
fn should_fill_missing_keys_with_defaults() {
    let settings = Settings::from_toml_str(
        r#"
        scene = "sponza"
        animate_lights = true

        [ui]
        light_cull_technique = "compute_shader_tile"
        face_normals = true
        "#,
    )
    .expect("valid settings");

    assert_eq!(settings.scene, SceneSelection::Sponza);
    assert!(settings.animate_lights);
    assert_eq!(settings.ui.light_cull_technique, LightCullTechnique::ComputeShaderTile);
    assert!(settings.ui.face_normals);
    assert!(!settings.ui.lighting_only);
    assert_eq!(settings.width, 1280);
    assert_eq!(settings.light_power, 10);
}

#[test]
fn should_clamp_out_of_range_values() {
    let settings =
        Settings::from_toml_str("width = 0\nheight = 0\nlight_power = 31\nmsaa_samples = 6").expect("valid settings");
    assert_eq!((settings.width, settings.height), (1, 1));
    assert_eq!(settings.light_power, 10);
    assert_eq!(settings.msaa_samples, 4);
}

#[test]
fn should_reject_malformed_toml() {
    let result = Settings::from_toml_str("scene = ");
    assert!(matches!(result, Err(ConfigError::Parse(_))));

    let result = Settings::from_toml_str("scene = \"moon\"");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn should_use_defaults_without_settings_file() {
    let settings = Settings::load_or_default(Path::new("does/not/exist/deferred-ngin.toml"));
    assert_eq!(settings, Settings::default());

    let result = Settings::load_from_file(Path::new("does/not/exist/deferred-ngin.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
