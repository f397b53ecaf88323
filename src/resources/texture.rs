use std::path::Path;

use anyhow::Context as _;

use crate::data_structures::{model, texture};

/// One filterable texture at binding 0 and its sampler at binding 1. Every
/// material texture and the skybox are bound through this layout.
pub fn material_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_texture_layout"),
    })
}

pub async fn load_string(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

pub async fn load_texture(
    path: &Path,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(path).await?;
    let label = path.to_string_lossy();
    texture::Texture::from_bytes(device, queue, &data, &label, format, is_normal_map)
}

/// Load an optional texture referenced by a material, falling back to
/// `fallback` when it is not named or cannot be read.
pub async fn load_texture_or(
    dir: &Path,
    name: Option<&str>,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    fallback: impl FnOnce() -> texture::Texture,
) -> texture::Texture {
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return fallback();
    };
    match load_texture(&dir.join(name), is_normal_map, device, queue, None).await {
        Ok(texture) => texture,
        Err(e) => {
            log::warn!("Falling back to a flat texture: {e:#}");
            fallback()
        }
    }
}

/// Turn the MTL materials of an OBJ file into GPU materials. Textures are
/// resolved relative to `dir`; missing maps become flat colours built from
/// the material's constants.
pub async fn load_obj_materials(
    dir: &Path,
    obj_materials: &[tobj::Material],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Vec<model::Material> {
    let mut materials = Vec::with_capacity(obj_materials.len());
    for m in obj_materials {
        let kd = m.diffuse.unwrap_or([0.8, 0.8, 0.8]);
        let ks = m.specular.unwrap_or([0.25, 0.25, 0.25]);
        let diffuse = load_texture_or(dir, m.diffuse_texture.as_deref(), false, device, queue, || {
            texture::Texture::from_color(device, queue, model::to_rgba8(kd), "diffuse", true)
        })
        .await;
        let normal = load_texture_or(dir, m.normal_texture.as_deref(), true, device, queue, || {
            texture::Texture::create_default_normal_map(1, 1, device, queue)
        })
        .await;
        let specular = load_texture_or(dir, m.specular_texture.as_deref(), false, device, queue, || {
            texture::Texture::from_color(device, queue, model::to_rgba8(ks), "specular", false)
        })
        .await;
        materials.push(model::Material::new(device, &m.name, diffuse, normal, specular, layout));
    }
    materials
}
