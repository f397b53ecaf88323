//! Loading meshes, materials and textures from the media directory.
//!
//! The [`MeshLoader`] trait is the seam between the scene graph and file
//! parsing. [`GpuLoader`] is the production implementation; it reads OBJ+MTL
//! through `tobj` and glTF/GLB through `gltf` and uploads the result.

use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::{
    mesh_instance::{MeshData, MeshFormat, SubMesh},
    model::{self, Aabb, GpuGeometry},
    texture::Texture,
};
use crate::resources::texture::{load_binary, load_obj_materials, load_string, load_texture};

pub mod mesh;
pub mod texture;

/// Turns a media path into mesh data. Paths are relative to whatever root
/// the implementation was configured with.
pub trait MeshLoader {
    fn load(&self, path: &str) -> anyhow::Result<MeshData>;
}

/// Loads meshes from disk onto the GPU.
///
/// Device and queue are cheap handles, so the loader keeps its own clones.
pub struct GpuLoader {
    device: wgpu::Device,
    queue: wgpu::Queue,
    material_layout: wgpu::BindGroupLayout,
    media_dir: PathBuf,
}

impl GpuLoader {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        media_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            material_layout: material_layout.clone(),
            media_dir: media_dir.into(),
        }
    }
}

impl MeshLoader for GpuLoader {
    fn load(&self, path: &str) -> anyhow::Result<MeshData> {
        let format = MeshFormat::from_path(path)
            .ok_or_else(|| anyhow!("{path} is not an .obj, .gltf or .glb file"))?;
        let full_path = self.media_dir.join(path);
        futures::executor::block_on(async {
            match format {
                MeshFormat::Obj => {
                    load_model_obj(&full_path, &self.device, &self.queue, &self.material_layout).await
                }
                MeshFormat::Gltf => {
                    load_model_gltf(&full_path, &self.device, &self.queue, &self.material_layout).await
                }
            }
        })
    }
}

pub async fn load_model_obj(
    path: &Path,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<MeshData> {
    let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
    let obj_text = load_string(path).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let mtl_path = dir.join(p);
            async move {
                match load_string(&mtl_path).await {
                    Ok(mtl_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mtl_text))),
                    Err(e) => {
                        log::warn!("{e:#}");
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("Materials of {} unavailable ({e}), using flat grey", path.display());
        Vec::new()
    });
    let mut materials = load_obj_materials(&dir, &obj_materials, device, queue, layout).await;
    if materials.is_empty() {
        materials.push(model::Material::flat(device, queue, "default", [0.7, 0.7, 0.7], layout));
    }

    let file_name = path.to_string_lossy();
    let submeshes = mesh::obj_submeshes(&models, &file_name, device);
    if submeshes.is_empty() {
        return Err(anyhow!("{file_name} contains no geometry"));
    }
    Ok(MeshData {
        submeshes,
        materials,
    })
}

pub async fn load_model_gltf(
    path: &Path,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<MeshData> {
    let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
    let gltf_bytes = load_binary(path).await?;
    let gltf = gltf::Gltf::from_reader(BufReader::new(Cursor::new(gltf_bytes)))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow!("{} references a missing GLB chunk", path.display()))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(&dir.join(uri)).await?);
            }
        }
    }

    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let base = pbr.base_color_factor();
        let name = material.name().unwrap_or("gltf material");

        let diffuse = match pbr.base_color_texture() {
            Some(info) => gltf_texture(&info.texture(), &buffer_data, &dir, false, device, queue).await,
            None => None,
        }
        .unwrap_or_else(|| {
            Texture::from_color(device, queue, model::to_rgba8([base[0], base[1], base[2]]), name, true)
        });
        let normal = match material.normal_texture() {
            Some(info) => gltf_texture(&info.texture(), &buffer_data, &dir, true, device, queue).await,
            None => None,
        }
        .unwrap_or_else(|| Texture::create_default_normal_map(1, 1, device, queue));
        let shine = (1.0 - pbr.roughness_factor()) * 0.5;
        let specular = Texture::from_color(device, queue, model::to_rgba8([shine; 3]), name, false);

        materials.push(model::Material::new(device, name, diffuse, normal, specular, layout));
    }
    let default_material = materials.len();
    materials.push(model::Material::flat(device, queue, "default", [0.7, 0.7, 0.7], layout));

    let mut submeshes = Vec::new();
    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| anyhow!("{} has no scene", path.display()))?;
    let mut pending: Vec<(gltf::Node, Matrix4<f32>)> =
        scene.nodes().map(|node| (node, Matrix4::identity())).collect();
    while let Some((node, parent)) = pending.pop() {
        let world = parent * Matrix4::from(node.transform().matrix());
        if let Some(gltf_mesh) = node.mesh() {
            let mesh_name = gltf_mesh.name().unwrap_or("gltf mesh");
            for primitive in gltf_mesh.primitives() {
                let (vertices, indices) = mesh::gltf_primitive_vertices(&primitive, &buffer_data, &world);
                let Some(bounds) = Aabb::from_points(vertices.iter().map(|v| v.position)) else {
                    continue;
                };
                let geometry = GpuGeometry::new(device, mesh_name, &vertices, &indices);
                let material = primitive.material().index().unwrap_or(default_material);
                submeshes.push(SubMesh::new(mesh_name, bounds, material, Some(geometry)));
            }
        }
        pending.extend(node.children().map(|child| (child, world)));
    }

    if submeshes.is_empty() {
        return Err(anyhow!("{} contains no geometry", path.display()));
    }
    Ok(MeshData {
        submeshes,
        materials,
    })
}

async fn gltf_texture(
    texture: &gltf::Texture<'_>,
    buffer_data: &[Vec<u8>],
    dir: &Path,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Option<Texture> {
    let loaded = match texture.source().source() {
        gltf::image::Source::View { view, mime_type } => {
            let start = view.offset();
            let end = start + view.length();
            match buffer_data.get(view.buffer().index()).and_then(|b| b.get(start..end)) {
                Some(bytes) => Texture::from_bytes(
                    device,
                    queue,
                    bytes,
                    "gltf embedded texture",
                    mime_type.split('/').next_back(),
                    is_normal_map,
                ),
                None => Err(anyhow!("embedded texture view out of range")),
            }
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            let format = mime_type.and_then(|mt| mt.split('/').next_back());
            load_texture(&dir.join(uri), is_normal_map, device, queue, format).await
        }
    };
    match loaded {
        Ok(texture) => Some(texture),
        Err(e) => {
            log::warn!("Skipping glTF texture: {e:#}");
            None
        }
    }
}
