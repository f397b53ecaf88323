use std::path::Path;

use crate::{
    data_structures::{model::MaterialTexture, texture::Texture},
    resources::texture::load_binary,
};

/// Equirectangular environment image drawn behind the scene.
#[derive(Debug)]
pub struct Skybox {
    pub texture: MaterialTexture,
}

impl Skybox {
    pub async fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        path: &Path,
    ) -> anyhow::Result<Self> {
        let bytes = load_binary(path).await?;
        let ext = path.extension().and_then(|e| e.to_str());
        let label = path.to_string_lossy();
        let texture = Texture::from_bytes(device, queue, &bytes, &label, ext, false)?;
        log::info!("Loaded skybox {}", path.display());
        Ok(Self {
            texture: MaterialTexture::new(device, texture, layout, &label),
        })
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.texture.bind_group
    }
}
