//! Vertex layout, bounds, materials and GPU geometry shared by every mesh format.

use std::ops::Range;

use cgmath::{ElementWise, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Object-space axis aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box around `points`; `None` when there are no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        let mut points = points.into_iter();
        let first: Vector3<f32> = points.next()?.into();
        let (min, max) = points.fold((first, first), |(min, max), p| {
            let p = Vector3::from(p);
            (
                Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        });
        Some(Self { min, max })
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Vector3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Vector3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let extent = self.max - self.min;
        std::array::from_fn(|i| {
            let pick = Vector3::new(
                (i & 1) as f32,
                ((i >> 1) & 1) as f32,
                ((i >> 2) & 1) as f32,
            );
            self.min + extent.mul_element_wise(pick)
        })
    }
}

/// One material texture with the bind group that exposes it (texture at
/// binding 0, sampler at binding 1).
#[derive(Debug)]
pub struct MaterialTexture {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl MaterialTexture {
    pub fn new(
        device: &wgpu::Device,
        texture: Texture,
        layout: &wgpu::BindGroupLayout,
        label: &str,
    ) -> Self {
        let sampler = texture
            .sampler
            .clone()
            .unwrap_or_else(|| crate::data_structures::texture::create_default_sampler(device));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(label),
        });
        Self {
            texture,
            bind_group,
        }
    }
}

/// Which bind group index each material texture is bound to while drawing.
/// A `None` slot leaves that texture unbound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureSlots {
    pub diffuse: Option<u32>,
    pub normal: Option<u32>,
    pub specular: Option<u32>,
}

impl TextureSlots {
    /// Diffuse, normal and specular at groups 1, 2 and 3.
    pub const ALL: TextureSlots = TextureSlots {
        diffuse: Some(1),
        normal: Some(2),
        specular: Some(3),
    };

    pub const fn diffuse_only(slot: u32) -> Self {
        Self {
            diffuse: Some(slot),
            normal: None,
            specular: None,
        }
    }
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse: MaterialTexture,
    pub normal: MaterialTexture,
    pub specular: MaterialTexture,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse: Texture,
        normal: Texture,
        specular: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            name: name.to_string(),
            diffuse: MaterialTexture::new(device, diffuse, layout, &format!("{name} diffuse")),
            normal: MaterialTexture::new(device, normal, layout, &format!("{name} normal")),
            specular: MaterialTexture::new(device, specular, layout, &format!("{name} specular")),
        }
    }

    /// Grey diffuse, flat normal and a dim specular; used when a mesh names no material.
    pub fn flat(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        rgb: [f32; 3],
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self::new(
            device,
            name,
            Texture::from_color(device, queue, to_rgba8(rgb), "flat diffuse", true),
            Texture::create_default_normal_map(1, 1, device, queue),
            Texture::from_color(device, queue, [64, 64, 64, 255], "flat specular", false),
            layout,
        )
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, slots: TextureSlots) {
        if let Some(slot) = slots.diffuse {
            pass.set_bind_group(slot, &self.diffuse.bind_group, &[]);
        }
        if let Some(slot) = slots.normal {
            pass.set_bind_group(slot, &self.normal.bind_group, &[]);
        }
        if let Some(slot) = slots.specular {
            pass.set_bind_group(slot, &self.specular.bind_group, &[]);
        }
    }
}

pub fn to_rgba8(rgb: [f32; 3]) -> [u8; 4] {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [channel(rgb[0]), channel(rgb[1]), channel(rgb[2]), 255]
}

/// Vertex and index buffers of one sub-mesh.
#[derive(Debug)]
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl GpuGeometry {
    pub fn new(device: &wgpu::Device, name: &str, vertices: &[ModelVertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: Range<u32>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.num_elements, 0, instances);
    }
}
