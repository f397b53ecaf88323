//! The scene graph: mesh resource table plus an ordered list of placements.
//!
//! Meshes are deduplicated by path, so placing the same file a hundred times
//! loads it once. Every placement stores the index of its mesh and its own
//! world transform; its position in the placement list doubles as its slot in
//! the instance buffer and as the `index` of the [`InstanceId`] handed out
//! by [`SceneGraph::add`].

use std::collections::HashMap;

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        mesh_instance::{MeshData, MeshInstance},
        model::TextureSlots,
        transform::{Transform, TransformRaw},
    },
    resources::MeshLoader,
};

/// Handle to one placement.
///
/// `index` is the placement's insertion position within its scene. The
/// generation changes whenever a scene is started or destroyed, so a handle
/// kept across scenes resolves to nothing instead of to an unrelated object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId {
    index: u32,
    generation: u32,
}

impl InstanceId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    mesh: usize,
    transform: Transform,
}

impl Placement {
    pub fn mesh_index(&self) -> usize {
        self.mesh
    }

    /// World transform (scene world already applied).
    pub fn transform(&self) -> &Transform {
        &self.transform
    }
}

pub struct SceneGraph {
    world: Transform,
    scale: f32,
    generation: u32,
    meshes: Vec<MeshInstance>,
    by_path: HashMap<String, usize>,
    placements: Vec<Placement>,
    instance_buffer: Option<wgpu::Buffer>,
    buffer_size_needs_change: bool,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            world: Transform::new(),
            scale: 1.0,
            generation: 0,
            meshes: Vec::new(),
            by_path: HashMap::new(),
            placements: Vec::new(),
            instance_buffer: None,
            buffer_size_needs_change: true,
        }
    }

    /// Clear every table and remember the transform that all following
    /// placements are composed with.
    pub fn start_scene(&mut self, world: Transform, scale: f32) {
        self.clear();
        self.world = world;
        self.scale = scale;
        log::debug!("Scene started (generation {}, scale {scale})", self.generation);
    }

    /// Place the mesh at `path` with `transform` relative to the scene world.
    /// The mesh is loaded on first use of the path.
    pub fn add(&mut self, loader: &dyn MeshLoader, path: &str, transform: Transform) -> InstanceId {
        let mesh = self.mesh_for(path, || MeshInstance::create(loader, path));
        self.place(mesh, transform)
    }

    /// Place a mesh whose data is already in memory, registered under `key`.
    /// When `key` is known the existing mesh is reused and `data` is dropped.
    pub fn add_from_container(&mut self, key: &str, data: MeshData, transform: Transform) -> InstanceId {
        let mesh = self.mesh_for(key, || MeshInstance::from_data(key, data));
        self.place(mesh, transform)
    }

    fn mesh_for(&mut self, key: &str, create: impl FnOnce() -> MeshInstance) -> usize {
        if let Some(&mesh) = self.by_path.get(key) {
            return mesh;
        }
        let mesh = self.meshes.len();
        self.meshes.push(create());
        self.by_path.insert(key.to_string(), mesh);
        mesh
    }

    fn place(&mut self, mesh: usize, transform: Transform) -> InstanceId {
        let index = self.placements.len() as u32;
        self.placements.push(Placement {
            mesh,
            transform: &self.world * &transform,
        });
        self.buffer_size_needs_change = true;
        InstanceId {
            index,
            generation: self.generation,
        }
    }

    pub fn add_at(
        &mut self,
        loader: &dyn MeshLoader,
        path: &str,
        x: f32,
        y: f32,
        z: f32,
        sx: f32,
        sy: f32,
        sz: f32,
    ) -> InstanceId {
        self.add(loader, path, Transform::from_translation_scale(x, y, z, sx, sy, sz))
    }

    /// Move one placement to the world position `(x, y, z)`. Rotation and
    /// scale are kept. Returns `false` for ids this scene did not hand out.
    pub fn set_mesh_position(&mut self, id: InstanceId, x: f32, y: f32, z: f32) -> bool {
        match self.placement_mut(id) {
            Some(placement) => {
                placement.transform.position = cgmath::Vector3::new(x, y, z);
                true
            }
            None => {
                log::debug!("Ignoring position update for unknown placement {id:?}");
                false
            }
        }
    }

    /// True once there is something to draw and every placed mesh loaded.
    pub fn is_loaded(&self) -> bool {
        !self.placements.is_empty()
            && self
                .placements
                .iter()
                .all(|p| self.meshes[p.mesh].is_loaded())
    }

    /// Release every mesh and placement. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if !self.meshes.is_empty() || !self.placements.is_empty() {
            log::info!(
                "Releasing scene with {} meshes and {} placements",
                self.meshes.len(),
                self.placements.len()
            );
        }
        self.clear();
        self.world = Transform::new();
        self.scale = 1.0;
    }

    fn clear(&mut self) {
        self.meshes.clear();
        self.by_path.clear();
        self.placements.clear();
        self.instance_buffer = None;
        self.buffer_size_needs_change = true;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Upload the world matrices of all placements, one instance slot each.
    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        if self.placements.is_empty() {
            return;
        }
        let raw_instances: Vec<TransformRaw> =
            self.placements.iter().map(|p| p.transform.to_raw()).collect();
        match &self.instance_buffer {
            Some(buffer) if !self.buffer_size_needs_change => {
                queue.write_buffer(buffer, 0, bytemuck::cast_slice(&raw_instances));
            }
            _ => {
                self.instance_buffer = Some(device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Placement Instance Buffer"),
                        contents: bytemuck::cast_slice(&raw_instances),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    },
                ));
                self.buffer_size_needs_change = false;
            }
        }
    }

    /// Draw every placement in insertion order. Per placement the mesh first
    /// recomputes its visibility for `view_proj * world`, then draws with the
    /// placement's instance slot. Returns the number of draw calls.
    ///
    /// Expects the pipeline and frame bind group to be set already.
    pub fn render(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        view_proj: &Matrix4<f32>,
        cull_near: bool,
        slots: Option<TextureSlots>,
    ) -> usize {
        let Some(instance_buffer) = &self.instance_buffer else {
            return 0;
        };
        if self.buffer_size_needs_change {
            log::debug!("Instance buffer is stale, skipping scene draw");
            return 0;
        }
        pass.set_vertex_buffer(1, instance_buffer.slice(..));

        let mut draws = 0;
        for (slot, placement) in self.placements.iter().enumerate() {
            let mesh = &mut self.meshes[placement.mesh];
            mesh.compute_in_frustum_flags(&(view_proj * placement.transform.to_matrix()), cull_near);
            let slot = slot as u32;
            draws += mesh.render(pass, slot..slot + 1, slots);
        }
        draws
    }

    /// The visibility walk of [`render`](Self::render) without drawing.
    /// Returns the number of visible submeshes summed over all placements.
    pub fn visible_submeshes(&mut self, view_proj: &Matrix4<f32>, cull_near: bool) -> usize {
        let mut visible = 0;
        for placement in &self.placements {
            let mesh = &mut self.meshes[placement.mesh];
            mesh.compute_in_frustum_flags(&(view_proj * placement.transform.to_matrix()), cull_near);
            visible += mesh.visible_submeshes();
        }
        visible
    }

    pub fn placement(&self, id: InstanceId) -> Option<&Placement> {
        if id.generation != self.generation {
            return None;
        }
        self.placements.get(id.index as usize)
    }

    fn placement_mut(&mut self, id: InstanceId) -> Option<&mut Placement> {
        if id.generation != self.generation {
            return None;
        }
        self.placements.get_mut(id.index as usize)
    }

    pub fn mesh(&self, id: InstanceId) -> Option<&MeshInstance> {
        self.placement(id).map(|p| &self.meshes[p.mesh])
    }

    pub fn meshes(&self) -> &[MeshInstance] {
        &self.meshes
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn world(&self) -> &Transform {
        &self.world
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}
