//! deferred-ngin
//!
//! An interactive renderer for comparing light-culling techniques on the
//! same scene: forward shading with and without a depth pre-pass,
//! full-screen deferred shading, per-light quads, quad light accumulation
//! and compute-shader tile culling. Thousands of animated point lights are
//! drawn over a small set of test scenes, one of which is driven by
//! rigid-body physics.
//!
//! High-level modules
//! - `camera`: fly camera, projection and the camera uniform
//! - `config`: settings file and the shading switches
//! - `context`: window surface and GPU device
//! - `data_structures`: meshes, placements, textures and the scene graph
//! - `flow`: session state, input events and the event loop
//! - `physics`: physics service trait, rapier backend and scene sync
//! - `pipelines`: shaders, bind layouts and pipeline construction
//! - `render`: techniques, their pass lists and frame recording
//! - `resources`: mesh and texture loading
//! - `scenes`: the selectable test scenes
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod physics;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scenes;

pub use cgmath;
pub use winit::event::WindowEvent;
