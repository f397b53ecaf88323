//! A drawable mesh resource loaded from one file.
//!
//! A [`MeshInstance`] is created once per distinct path in a scene and shared
//! by index between every placement of that path. Each frame the scene graph
//! asks it to recompute per-submesh visibility for one placement's
//! world-view-projection and then to draw the visible submeshes.

use std::ops::Range;
use std::path::Path;

use cgmath::{Matrix4, Vector4};

use crate::data_structures::model::{Aabb, GpuGeometry, Material, TextureSlots};
use crate::resources::MeshLoader;

/// On-disk container families that can back a mesh instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    /// Wavefront OBJ with its MTL materials.
    Obj,
    /// glTF, either text `.gltf` with external buffers or binary `.glb`.
    Gltf,
}

impl MeshFormat {
    pub fn from_path(path: &str) -> Option<Self> {
        let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "obj" => Some(MeshFormat::Obj),
            "gltf" | "glb" => Some(MeshFormat::Gltf),
            _ => None,
        }
    }
}

/// Part of a mesh drawn with one material.
#[derive(Debug)]
pub struct SubMesh {
    pub name: String,
    pub bounds: Aabb,
    pub material: usize,
    pub geometry: Option<GpuGeometry>,
    visible: bool,
}

impl SubMesh {
    /// `geometry` may be `None` for CPU-only meshes; those take part in
    /// visibility but never draw.
    pub fn new(name: &str, bounds: Aabb, material: usize, geometry: Option<GpuGeometry>) -> Self {
        Self {
            name: name.to_string(),
            bounds,
            material,
            geometry,
            visible: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// What a [`MeshLoader`] hands back for one file.
#[derive(Debug, Default)]
pub struct MeshData {
    pub submeshes: Vec<SubMesh>,
    pub materials: Vec<Material>,
}

#[derive(Debug)]
pub struct MeshInstance {
    path: String,
    format: Option<MeshFormat>,
    loaded: bool,
    submeshes: Vec<SubMesh>,
    materials: Vec<Material>,
}

impl MeshInstance {
    /// Load `path` through `loader`. Never fails: a mesh that cannot be read
    /// is kept as an unloaded instance that renders nothing.
    pub fn create(loader: &dyn MeshLoader, path: &str) -> Self {
        match loader.load(path) {
            Ok(data) => {
                log::info!(
                    "Loaded mesh {path} ({} submeshes, {} materials)",
                    data.submeshes.len(),
                    data.materials.len()
                );
                Self::from_data(path, data)
            }
            Err(e) => {
                log::warn!("Mesh {path} could not be loaded: {e:#}");
                Self {
                    path: path.to_string(),
                    format: MeshFormat::from_path(path),
                    loaded: false,
                    submeshes: Vec::new(),
                    materials: Vec::new(),
                }
            }
        }
    }

    /// Wrap mesh data that was already loaded elsewhere. `key` names the
    /// instance and need not be a file path.
    pub fn from_data(key: &str, data: MeshData) -> Self {
        Self {
            path: key.to_string(),
            format: MeshFormat::from_path(key),
            loaded: true,
            submeshes: data.submeshes,
            materials: data.materials,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn format(&self) -> Option<MeshFormat> {
        self.format
    }

    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.submeshes
            .iter()
            .map(|s| s.bounds)
            .reduce(|a, b| a.union(&b))
    }

    pub fn visible_submeshes(&self) -> usize {
        self.submeshes.iter().filter(|s| s.visible).count()
    }

    /// Recompute the visibility bit of every submesh for one placement.
    ///
    /// The near plane only takes part when `cull_near` is set.
    pub fn compute_in_frustum_flags(&mut self, world_view_proj: &Matrix4<f32>, cull_near: bool) {
        for submesh in self.submeshes.iter_mut() {
            submesh.visible = aabb_in_frustum(&submesh.bounds, world_view_proj, cull_near);
        }
    }

    /// Draw every visible submesh that has GPU geometry. When `slots` is set,
    /// the submesh material's textures are bound first. Returns the number of
    /// draw calls issued.
    pub fn render(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        instances: Range<u32>,
        slots: Option<TextureSlots>,
    ) -> usize {
        if !self.loaded {
            return 0;
        }
        let mut draws = 0;
        for submesh in self.submeshes.iter().filter(|s| s.visible) {
            let Some(geometry) = &submesh.geometry else {
                continue;
            };
            if let Some(slots) = slots {
                let material = self
                    .materials
                    .get(submesh.material)
                    .or_else(|| self.materials.first());
                match material {
                    Some(material) => material.bind(pass, slots),
                    // the pipeline expects textures that we cannot provide
                    None => continue,
                }
            }
            geometry.draw(pass, instances.clone());
            draws += 1;
        }
        draws
    }
}

/// Clip-space box test against the view frustum planes
/// (`-w <= x <= w`, `-w <= y <= w`, `z <= w` and optionally `0 <= z`).
/// The box is culled only when all eight corners are outside the same plane.
pub fn aabb_in_frustum(bounds: &Aabb, world_view_proj: &Matrix4<f32>, cull_near: bool) -> bool {
    let clip: [Vector4<f32>; 8] = bounds
        .corners()
        .map(|corner| world_view_proj * corner.extend(1.0));
    let all_outside = |outside: fn(&Vector4<f32>) -> bool| clip.iter().all(outside);

    if all_outside(|c| c.x < -c.w)
        || all_outside(|c| c.x > c.w)
        || all_outside(|c| c.y < -c.w)
        || all_outside(|c| c.y > c.w)
        || all_outside(|c| c.z > c.w)
    {
        return false;
    }
    !(cull_near && all_outside(|c| c.z < 0.0))
}
