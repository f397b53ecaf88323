//! Render and compute pipelines for every light-culling technique.
//!
//! - `basic` holds the shared pipeline builders
//! - `light` holds the point light set and its GPU buffer
//! - `skybox` loads the equirectangular sky texture
//!
//! [`Pipelines`] builds every pipeline up front so that switching technique
//! never compiles shaders mid-session. A new sample count needs a new
//! [`Pipelines`].

use crate::data_structures::{model::{ModelVertex, Vertex}, transform::TransformRaw};

pub mod basic;
pub mod light;
pub mod skybox;

use basic::{ADDITIVE, COMMON_WGSL, PipelineSpec, color_target, depth_state, mk_compute_pipeline, mk_pipeline_layout, mk_render_pipeline, mk_shader};

const GEOMETRY_VERTEX_WGSL: &str = include_str!("geometry_vertex.wgsl");
const MATERIAL_WGSL: &str = include_str!("material.wgsl");
const RESOLVE_WGSL: &str = include_str!("resolve.wgsl");
const GBUFFER_SINGLE_WGSL: &str = include_str!("gbuffer_single.wgsl");
const GBUFFER_MSAA_WGSL: &str = include_str!("gbuffer_msaa.wgsl");
const GBUFFER_READ_WGSL: &str = include_str!("gbuffer_read.wgsl");
const DEFERRED_WGSL: &str = include_str!("deferred.wgsl");
const TILE_WGSL: &str = include_str!("tile.wgsl");
const COMPOSITE_WGSL: &str = include_str!("composite.wgsl");
const SKYBOX_WGSL: &str = include_str!("skybox.wgsl");

/// G-buffer normal target: world normal in xyz.
pub const GBUFFER_NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// G-buffer albedo target: albedo in rgb, specular amount in a.
pub const GBUFFER_ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Light accumulation and tile output: rgb diffuse light, a specular.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Sample counts offered for the frame and G-buffer targets.
pub const MSAA_SAMPLE_COUNTS: [u32; 4] = [1, 2, 4, 8];

/// Workgroup memory of the tile culling shader: the light index list plus
/// three atomics.
pub const TILE_WORKGROUP_BYTES: u32 = (light::MAX_LIGHTS + 3) * 4;

/// Rust-side limits the shaders size their arrays and loops by.
pub fn wgsl_constants() -> String {
    format!(
        "const MAX_LIGHTS: u32 = {}u;\nconst TILE_SIZE: u32 = {}u;\n",
        light::MAX_LIGHTS,
        crate::render::TILE_SIZE
    )
}

/// Largest offered sample count not above `requested`.
pub fn snap_sample_count(requested: u32) -> u32 {
    MSAA_SAMPLE_COUNTS
        .iter()
        .copied()
        .filter(|&count| count <= requested)
        .max()
        .unwrap_or(1)
}

fn unfilterable_texture(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    screen_texture(binding, visibility, false)
}

fn screen_texture(binding: u32, visibility: wgpu::ShaderStages, multisampled: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            multisampled,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    }
}

fn buffer_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Bind group layouts shared by pipelines and the bind groups built against them.
#[derive(Debug, Clone)]
pub struct BindLayouts {
    /// camera uniform, frame constants, light storage buffer
    pub frame: wgpu::BindGroupLayout,
    /// one material texture with its sampler
    pub material: wgpu::BindGroupLayout,
    /// G-buffer normal, albedo and depth, read with `textureLoad`,
    /// multisampled when the renderer is
    pub gbuffer: wgpu::BindGroupLayout,
    /// a single screen texture read with `textureLoad`
    pub loaded_texture: wgpu::BindGroupLayout,
    pub tile_output: wgpu::BindGroupLayout,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device, samples: u32) -> Self {
        let multisampled = samples > 1;
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                buffer_entry(0, wgpu::BufferBindingType::Uniform),
                buffer_entry(1, wgpu::BufferBindingType::Uniform),
                buffer_entry(2, wgpu::BufferBindingType::Storage { read_only: true }),
            ],
            label: Some("frame_bind_group_layout"),
        });
        let material = crate::resources::texture::material_texture_layout(device);
        let lighting_stages = wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE;
        let gbuffer = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                screen_texture(0, lighting_stages, multisampled),
                screen_texture(1, lighting_stages, multisampled),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: lighting_stages,
                    ty: wgpu::BindingType::Texture {
                        multisampled,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
            ],
            label: Some("gbuffer_bind_group_layout"),
        });
        let loaded_texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[unfilterable_texture(0, wgpu::ShaderStages::FRAGMENT)],
            label: Some("loaded_texture_bind_group_layout"),
        });
        let tile_output = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: HDR_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            }],
            label: Some("tile_output_bind_group_layout"),
        });
        Self {
            frame,
            material,
            gbuffer,
            loaded_texture,
            tile_output,
        }
    }
}

/// Every pipeline a pass of any technique needs.
pub struct Pipelines {
    pub depth_prepass: wgpu::RenderPipeline,
    /// forward shading with its own depth test and write
    pub forward: wgpu::RenderPipeline,
    /// forward shading over a depth buffer filled by the pre-pass
    pub forward_prez: wgpu::RenderPipeline,
    pub gbuffer: wgpu::RenderPipeline,
    pub deferred: wgpu::RenderPipeline,
    pub light_quads: wgpu::RenderPipeline,
    pub light_accumulation: wgpu::RenderPipeline,
    pub resolve: wgpu::RenderPipeline,
    pub tile_cull: wgpu::ComputePipeline,
    pub composite: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        surface_format: wgpu::TextureFormat,
        samples: u32,
    ) -> Self {
        let geometry_buffers = [ModelVertex::desc(), TransformRaw::desc()];
        let surface_target = [color_target(surface_format, Some(wgpu::BlendState::REPLACE))];
        let back = Some(wgpu::Face::Back);

        let material_shader = mk_shader(device, "Material Shader", &[COMMON_WGSL, GEOMETRY_VERTEX_WGSL, MATERIAL_WGSL]);
        let resolve_shader = mk_shader(device, "Resolve Shader", &[COMMON_WGSL, GEOMETRY_VERTEX_WGSL, RESOLVE_WGSL]);
        let constants = wgsl_constants();
        let gbuffer_bindings = if samples > 1 { GBUFFER_MSAA_WGSL } else { GBUFFER_SINGLE_WGSL };
        let deferred_shader = mk_shader(
            device,
            "Deferred Lighting Shader",
            &[COMMON_WGSL, gbuffer_bindings, GBUFFER_READ_WGSL, DEFERRED_WGSL],
        );
        let tile_shader = mk_shader(
            device,
            "Tile Culling Shader",
            &[&constants, COMMON_WGSL, gbuffer_bindings, GBUFFER_READ_WGSL, TILE_WGSL],
        );
        let composite_shader = mk_shader(device, "Composite Shader", &[COMPOSITE_WGSL]);
        let skybox_shader = mk_shader(device, "Skybox Shader", &[COMMON_WGSL, SKYBOX_WGSL]);

        let prepass_layout = mk_pipeline_layout(device, "Depth Pre-pass Layout", &[&layouts.frame, &layouts.material]);
        let material_layout = mk_pipeline_layout(
            device,
            "Material Pipeline Layout",
            &[&layouts.frame, &layouts.material, &layouts.material, &layouts.material],
        );
        let lighting_layout = mk_pipeline_layout(device, "Screen Lighting Layout", &[&layouts.frame, &layouts.gbuffer]);
        let resolve_layout = mk_pipeline_layout(
            device,
            "Resolve Pipeline Layout",
            &[&layouts.frame, &layouts.material, &layouts.material, &layouts.loaded_texture],
        );
        let tile_layout = mk_pipeline_layout(
            device,
            "Tile Culling Layout",
            &[&layouts.frame, &layouts.gbuffer, &layouts.tile_output],
        );
        let composite_layout = mk_pipeline_layout(device, "Composite Layout", &[&layouts.loaded_texture]);
        let skybox_layout = mk_pipeline_layout(device, "Skybox Layout", &[&layouts.frame, &layouts.material]);

        let depth_prepass = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Depth Pre-pass Pipeline",
                layout: &prepass_layout,
                shader: &material_shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_depth"),
                targets: &[],
                depth: Some(depth_state(true, wgpu::CompareFunction::Less)),
                vertex_layouts: &geometry_buffers,
                cull_mode: back,
                samples,
            },
        );
        let forward = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Forward Pipeline",
                layout: &material_layout,
                shader: &material_shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_forward"),
                targets: &surface_target,
                depth: Some(depth_state(true, wgpu::CompareFunction::Less)),
                vertex_layouts: &geometry_buffers,
                cull_mode: back,
                samples,
            },
        );
        let forward_prez = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Forward Pre-Z Pipeline",
                layout: &material_layout,
                shader: &material_shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_forward"),
                targets: &surface_target,
                depth: Some(depth_state(false, wgpu::CompareFunction::LessEqual)),
                vertex_layouts: &geometry_buffers,
                cull_mode: back,
                samples,
            },
        );
        let gbuffer = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "G-buffer Pipeline",
                layout: &material_layout,
                shader: &material_shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_gbuffer"),
                targets: &[
                    color_target(GBUFFER_NORMAL_FORMAT, None),
                    color_target(GBUFFER_ALBEDO_FORMAT, None),
                ],
                depth: Some(depth_state(true, wgpu::CompareFunction::Less)),
                vertex_layouts: &geometry_buffers,
                cull_mode: back,
                samples,
            },
        );
        let deferred = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Deferred Full-screen Pipeline",
                layout: &lighting_layout,
                shader: &deferred_shader,
                vs_entry: "vs_fullscreen",
                fs_entry: Some("fs_deferred"),
                targets: &surface_target,
                depth: None,
                vertex_layouts: &[],
                cull_mode: None,
                samples,
            },
        );
        let light_quads = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Light Quad Pipeline",
                layout: &lighting_layout,
                shader: &deferred_shader,
                vs_entry: "vs_light_quad",
                fs_entry: Some("fs_quad_shade"),
                targets: &[color_target(surface_format, Some(ADDITIVE))],
                depth: None,
                vertex_layouts: &[],
                cull_mode: None,
                samples,
            },
        );
        let light_accumulation = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Light Accumulation Pipeline",
                layout: &lighting_layout,
                shader: &deferred_shader,
                vs_entry: "vs_light_quad",
                fs_entry: Some("fs_quad_accumulate"),
                targets: &[color_target(HDR_FORMAT, Some(ADDITIVE))],
                depth: None,
                vertex_layouts: &[],
                cull_mode: None,
                samples: 1,
            },
        );
        let resolve = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Deferred Lighting Resolve Pipeline",
                layout: &resolve_layout,
                shader: &resolve_shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_resolve"),
                targets: &surface_target,
                depth: Some(depth_state(false, wgpu::CompareFunction::LessEqual)),
                vertex_layouts: &geometry_buffers,
                cull_mode: back,
                samples,
            },
        );
        let tile_cull = mk_compute_pipeline(device, "Tile Culling Pipeline", &tile_layout, &tile_shader, "cs_main");
        let composite = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Composite Pipeline",
                layout: &composite_layout,
                shader: &composite_shader,
                vs_entry: "vs_composite",
                fs_entry: Some("fs_composite"),
                targets: &surface_target,
                depth: None,
                vertex_layouts: &[],
                cull_mode: None,
                samples,
            },
        );
        let skybox = mk_render_pipeline(
            device,
            PipelineSpec {
                label: "Skybox Pipeline",
                layout: &skybox_layout,
                shader: &skybox_shader,
                vs_entry: "vs_skybox",
                fs_entry: Some("fs_skybox"),
                targets: &surface_target,
                depth: Some(depth_state(false, wgpu::CompareFunction::LessEqual)),
                vertex_layouts: &[],
                cull_mode: None,
                samples,
            },
        );

        Self {
            depth_prepass,
            forward,
            forward_prez,
            gbuffer,
            deferred,
            light_quads,
            light_accumulation,
            resolve,
            tile_cull,
            composite,
            skybox,
        }
    }
}
