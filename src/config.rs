//! Runtime settings, read from `deferred-ngin.toml` when it exists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    pipelines::{light::MAX_LIGHTS_POWER, snap_sample_count},
    render::LightCullTechnique,
    scenes::SceneSelection,
};

/// Shading switches that the lighting shaders read every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConstants {
    /// Replace material albedo with white.
    pub lighting_only: bool,
    /// Use geometric face normals instead of interpolated/normal-mapped ones.
    pub face_normals: bool,
    /// Colour pixels by the number of lights that reach them.
    pub visualize_light_count: bool,
    /// Highlight pixels whose samples are lit one by one. Only multisampled
    /// edges are, so at one sample per pixel nothing is highlighted.
    pub visualize_per_sample_shading: bool,
    pub light_cull_technique: LightCullTechnique,
}

impl Default for UiConstants {
    fn default() -> Self {
        Self {
            lighting_only: false,
            face_normals: false,
            visualize_light_count: false,
            visualize_per_sample_shading: false,
            light_cull_technique: LightCullTechnique::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub scene: SceneSelection,
    /// Active lights are `2^light_power`.
    pub light_power: u32,
    pub animate_lights: bool,
    /// Samples per pixel: 1, 2, 4 or 8.
    pub msaa_samples: u32,
    /// Root for every mesh and skybox path.
    pub media_dir: PathBuf,
    /// Show technique, frame time and light count in the window title.
    pub show_overlay: bool,
    pub ui: UiConstants,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            scene: SceneSelection::default(),
            light_power: MAX_LIGHTS_POWER,
            animate_lights: false,
            msaa_samples: 1,
            media_dir: PathBuf::from("assets"),
            show_overlay: true,
            ui: UiConstants::default(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Settings {
    pub const FILE_NAME: &'static str = "deferred-ngin.toml";

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents)?;
        Ok(settings.sanitized())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Settings from `path`, or the defaults when the file is missing or
    /// cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from_file(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No {} found, using default settings", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        self.width = self.width.max(1);
        self.height = self.height.max(1);
        self.light_power = self.light_power.min(MAX_LIGHTS_POWER);
        self.msaa_samples = snap_sample_count(self.msaa_samples);
        self
    }
}
