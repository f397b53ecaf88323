//! Scene data: what is drawn and where.
//!
//! - `model` holds vertex layouts, materials and uploaded geometry
//! - `texture` wraps GPU textures and the depth target
//! - `transform` is a placement's position, rotation and scale
//! - `mesh_instance` is one loaded mesh with all of its placements
//! - `scene_graph` owns the meshes of the current scene and culls them

pub mod mesh_instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod transform;
