//! Light culling technique dispatch and the per-frame renderer.
//!
//! A [`LightCullTechnique`] maps to a fixed list of [`Pass`]es and to the
//! screen targets those passes need. The [`Renderer`] owns every pipeline,
//! the frame uniforms and the light buffer, and each frame executes the pass
//! list of the technique selected in the [`UiConstants`].
//!
//! Switching technique only builds the screen targets the new technique is
//! missing; meshes and the scene graph are left alone.
//!
//! With more than one sample per pixel the depth buffer, the G-buffer and a
//! frame colour target are multisampled. Every pass that writes the frame
//! renders into that colour target and resolves it into the output view.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use wgpu::util::DeviceExt;

use crate::{
    camera::CameraUniform,
    config::UiConstants,
    data_structures::{model::TextureSlots, scene_graph::SceneGraph, texture::Texture},
    error::RenderError,
    pipelines::{
        BindLayouts, GBUFFER_ALBEDO_FORMAT, GBUFFER_NORMAL_FORMAT, HDR_FORMAT, Pipelines,
        snap_sample_count,
        light::{self, LightSet},
        skybox::Skybox,
    },
};

/// Edge length of a light culling tile in pixels.
pub const TILE_SIZE: u32 = 16;

#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightCullTechnique {
    ForwardNone = 0,
    ForwardPreZNone = 1,
    DeferredNone = 2,
    Quad = 3,
    #[default]
    QuadDeferredLighting = 4,
    ComputeShaderTile = 5,
}

impl From<u32> for LightCullTechnique {
    /// Unknown codes select the default technique.
    fn from(code: u32) -> Self {
        match code {
            0 => LightCullTechnique::ForwardNone,
            1 => LightCullTechnique::ForwardPreZNone,
            2 => LightCullTechnique::DeferredNone,
            3 => LightCullTechnique::Quad,
            4 => LightCullTechnique::QuadDeferredLighting,
            5 => LightCullTechnique::ComputeShaderTile,
            _ => {
                log::warn!("Unknown light cull technique {code}, using the default");
                LightCullTechnique::default()
            }
        }
    }
}

impl LightCullTechnique {
    pub const ALL: [LightCullTechnique; 6] = [
        LightCullTechnique::ForwardNone,
        LightCullTechnique::ForwardPreZNone,
        LightCullTechnique::DeferredNone,
        LightCullTechnique::Quad,
        LightCullTechnique::QuadDeferredLighting,
        LightCullTechnique::ComputeShaderTile,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            LightCullTechnique::ForwardNone => "No Cull Forward",
            LightCullTechnique::ForwardPreZNone => "No Cull Pre-Z",
            LightCullTechnique::DeferredNone => "No Cull Deferred",
            LightCullTechnique::Quad => "Quad",
            LightCullTechnique::QuadDeferredLighting => "Quad Deferred Light",
            LightCullTechnique::ComputeShaderTile => "Compute Shader Tile",
        }
    }

    /// The passes executed for one frame, in order.
    pub fn passes(self) -> &'static [Pass] {
        match self {
            LightCullTechnique::ForwardNone => &[Pass::Forward, Pass::Skybox],
            LightCullTechnique::ForwardPreZNone => &[Pass::DepthPrePass, Pass::Forward, Pass::Skybox],
            LightCullTechnique::DeferredNone => &[Pass::GBuffer, Pass::DeferredFullScreen, Pass::Skybox],
            LightCullTechnique::Quad => &[Pass::GBuffer, Pass::LightQuads, Pass::Skybox],
            LightCullTechnique::QuadDeferredLighting => &[
                Pass::GBuffer,
                Pass::LightAccumulationQuads,
                Pass::DeferredLightingResolve,
                Pass::Skybox,
            ],
            LightCullTechnique::ComputeShaderTile => {
                &[Pass::GBuffer, Pass::TileCullCompute, Pass::Composite, Pass::Skybox]
            }
        }
    }

    pub fn targets(self) -> TargetRequirements {
        TargetRequirements {
            gbuffer: !matches!(
                self,
                LightCullTechnique::ForwardNone | LightCullTechnique::ForwardPreZNone
            ),
            accumulation: self == LightCullTechnique::QuadDeferredLighting,
            tile_output: self == LightCullTechnique::ComputeShaderTile,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Depth only, alpha tested.
    DepthPrePass,
    /// Geometry shaded with every active light.
    Forward,
    /// Normal, albedo and depth of the visible surfaces.
    GBuffer,
    /// One full-screen triangle shading every pixel with every light.
    DeferredFullScreen,
    /// One additive screen quad per light, shaded from the G-buffer.
    LightQuads,
    /// One additive screen quad per light into the accumulation buffer.
    LightAccumulationQuads,
    /// Second geometry pass multiplying material colour by accumulated light.
    DeferredLightingResolve,
    /// Per-tile light lists and shading into the tile output texture.
    TileCullCompute,
    /// Tile output copied to the frame.
    Composite,
    Skybox,
}

impl Pass {
    pub fn draws_scene(self) -> bool {
        matches!(
            self,
            Pass::DepthPrePass | Pass::Forward | Pass::GBuffer | Pass::DeferredLightingResolve
        )
    }
}

/// Screen targets a technique needs besides the depth buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetRequirements {
    pub gbuffer: bool,
    pub accumulation: bool,
    pub tile_output: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub x: u32,
    pub y: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: width.div_ceil(TILE_SIZE),
            y: height.div_ceil(TILE_SIZE),
        }
    }

    pub fn count(&self) -> u32 {
        self.x * self.y
    }
}

/// Mirrors `FrameConstants` in `common.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameConstants {
    pub lighting_only: u32,
    pub face_normals: u32,
    pub visualize_light_count: u32,
    pub visualize_per_sample_shading: u32,
    pub light_cull_technique: u32,
    pub active_lights: u32,
    pub tiles_x: u32,
    _pad: u32,
}

impl FrameConstants {
    pub fn new(ui: &UiConstants, active_lights: u32, tiles: TileGrid) -> Self {
        Self {
            lighting_only: ui.lighting_only as u32,
            face_normals: ui.face_normals as u32,
            visualize_light_count: ui.visualize_light_count as u32,
            visualize_per_sample_shading: ui.visualize_per_sample_shading as u32,
            light_cull_technique: ui.light_cull_technique.code(),
            active_lights,
            tiles_x: tiles.x,
            _pad: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// What one call to [`Renderer::render`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameStats {
    pub technique: LightCullTechnique,
    /// Passes actually executed.
    pub passes: Vec<Pass>,
    pub draw_calls: usize,
}

struct GBufferTargets {
    normal: Texture,
    albedo: Texture,
    bind_group: wgpu::BindGroup,
}

struct ScreenTexture {
    texture: Texture,
    /// `textureLoad` access for the pass consuming this texture
    read_group: wgpu::BindGroup,
}

struct TileTargets {
    output: ScreenTexture,
    write_group: wgpu::BindGroup,
}

/// Depth plus whatever the current and earlier techniques asked for.
/// Dropped wholesale on resize and rebuilt on demand.
struct ScreenTargets {
    width: u32,
    height: u32,
    samples: u32,
    depth: Texture,
    /// multisampled stand-in for the output view, `None` at one sample
    frame_color: Option<Texture>,
    gbuffer: Option<GBufferTargets>,
    accumulation: Option<ScreenTexture>,
    tile_output: Option<TileTargets>,
}

impl ScreenTargets {
    fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        samples: u32,
        frame_format: wgpu::TextureFormat,
    ) -> Self {
        let frame_color = (samples > 1).then(|| {
            Texture::create_render_target(
                device,
                [width, height],
                frame_format,
                samples,
                wgpu::TextureUsages::empty(),
                "frame_color_msaa",
            )
        });
        Self {
            width,
            height,
            samples,
            depth: Texture::create_depth_texture(device, [width, height], samples, "depth_texture"),
            frame_color,
            gbuffer: None,
            accumulation: None,
            tile_output: None,
        }
    }

    fn loaded_texture_group(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        texture: &Texture,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.loaded_texture,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            }],
            label: Some(label),
        })
    }

    fn ensure(&mut self, device: &wgpu::Device, layouts: &BindLayouts, required: TargetRequirements) {
        let size = [self.width, self.height];
        if required.gbuffer && self.gbuffer.is_none() {
            log::debug!("Creating G-buffer {}x{} x{}", self.width, self.height, self.samples);
            let normal = Texture::create_render_target(
                device,
                size,
                GBUFFER_NORMAL_FORMAT,
                self.samples,
                wgpu::TextureUsages::TEXTURE_BINDING,
                "gbuffer_normal",
            );
            let albedo = Texture::create_render_target(
                device,
                size,
                GBUFFER_ALBEDO_FORMAT,
                self.samples,
                wgpu::TextureUsages::TEXTURE_BINDING,
                "gbuffer_albedo",
            );
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &layouts.gbuffer,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&normal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&albedo.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&self.depth.view),
                    },
                ],
                label: Some("gbuffer_bind_group"),
            });
            self.gbuffer = Some(GBufferTargets {
                normal,
                albedo,
                bind_group,
            });
        }
        if required.accumulation && self.accumulation.is_none() {
            log::debug!("Creating light accumulation buffer {}x{}", self.width, self.height);
            let texture = Texture::create_render_target(
                device,
                size,
                HDR_FORMAT,
                1,
                wgpu::TextureUsages::TEXTURE_BINDING,
                "light_accumulation",
            );
            let read_group = Self::loaded_texture_group(device, layouts, &texture, "light_accumulation_bind_group");
            self.accumulation = Some(ScreenTexture { texture, read_group });
        }
        if required.tile_output && self.tile_output.is_none() {
            log::debug!("Creating tile output {}x{}", self.width, self.height);
            let texture = Texture::create_render_target(
                device,
                size,
                HDR_FORMAT,
                1,
                wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
                "tile_output",
            );
            let write_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &layouts.tile_output,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                }],
                label: Some("tile_output_write_bind_group"),
            });
            let read_group = Self::loaded_texture_group(device, layouts, &texture, "tile_output_read_bind_group");
            self.tile_output = Some(TileTargets {
                output: ScreenTexture { texture, read_group },
                write_group,
            });
        }
    }

    /// Colour attachment for a pass that writes the frame.
    fn frame_attachment<'a>(
        &'a self,
        target: &'a wgpu::TextureView,
        clear: bool,
    ) -> Option<wgpu::RenderPassColorAttachment<'a>> {
        match &self.frame_color {
            Some(frame_color) => color_attachment(&frame_color.view, clear).map(|attachment| {
                wgpu::RenderPassColorAttachment {
                    resolve_target: Some(target),
                    ..attachment
                }
            }),
            None => color_attachment(target, clear),
        }
    }
}

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// Scene geometry never gets near-plane culling; the camera may sit inside
/// a bounding box.
const CULL_NEAR: bool = false;

/// Slots for the resolve pass: diffuse at group 1, specular at group 2.
const RESOLVE_SLOTS: TextureSlots = TextureSlots {
    diffuse: Some(1),
    normal: None,
    specular: Some(2),
};

fn color_attachment(view: &wgpu::TextureView, clear: bool) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: if clear {
                wgpu::LoadOp::Clear(CLEAR_COLOR)
            } else {
                wgpu::LoadOp::Load
            },
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

fn depth_attachment(view: &wgpu::TextureView, clear: bool) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
    Some(wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: if clear {
                wgpu::LoadOp::Clear(1.0)
            } else {
                wgpu::LoadOp::Load
            },
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    })
}

/// Everything a pass reads while it is encoded.
struct FrameInputs<'a> {
    technique: LightCullTechnique,
    target: &'a wgpu::TextureView,
    skybox: Option<&'a Skybox>,
    view_proj: cgmath::Matrix4<f32>,
}

pub struct Renderer {
    surface_format: wgpu::TextureFormat,
    layouts: BindLayouts,
    pipelines: Pipelines,
    camera_buffer: wgpu::Buffer,
    constants_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    lights: LightSet,
    tiles: TileGrid,
    targets: ScreenTargets,
    device_lost: Arc<Mutex<Option<String>>>,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        light_power: u32,
        samples: u32,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let samples = snap_sample_count(samples);
        let layouts = BindLayouts::new(device, samples);
        let pipelines = Pipelines::new(device, &layouts, surface_format, samples);
        let lights = LightSet::with_power(light_power);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let tiles = TileGrid::new(width, height);
        let constants = FrameConstants::new(&UiConstants::default(), lights.active_lights(), tiles);
        let constants_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Constants Buffer"),
            contents: bytemuck::cast_slice(&[constants]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_buffer = light::mk_buffer(device, &lights);
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: constants_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
            label: Some("frame_bind_group"),
        });

        let device_lost = Arc::new(Mutex::new(None));
        let lost = device_lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            if let Ok(mut lost) = lost.lock() {
                *lost = Some(format!("{reason:?}: {message}"));
            }
        });

        log::info!(
            "Renderer ready: {}x{}, {}x MSAA, {} lights, {} tiles",
            width,
            height,
            samples,
            lights.active_lights(),
            tiles.count()
        );

        Self {
            targets: ScreenTargets::new(device, width, height, samples, surface_format),
            surface_format,
            layouts,
            pipelines,
            camera_buffer,
            constants_buffer,
            light_buffer,
            frame_bind_group,
            lights,
            tiles,
            device_lost,
        }
    }

    /// Layout the material bind groups of loaded meshes must be built against.
    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layouts.material
    }

    pub async fn load_skybox(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &std::path::Path,
    ) -> anyhow::Result<Skybox> {
        Skybox::load(device, queue, &self.layouts.material, path).await
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.tiles = TileGrid::new(width, height);
        self.targets = ScreenTargets::new(device, width, height, self.targets.samples, self.surface_format);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.targets.width, self.targets.height)
    }

    /// Samples per pixel of the depth buffer, G-buffer and frame targets.
    pub fn samples(&self) -> u32 {
        self.targets.samples
    }

    pub fn set_active_lights(&mut self, count: u32) -> u32 {
        self.lights.set_active_lights(count)
    }

    pub fn active_lights(&self) -> u32 {
        self.lights.active_lights()
    }

    pub fn move_lights(&mut self, dt: f32) {
        self.lights.move_lights(dt);
    }

    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    fn check_device(&self) -> Result<(), RenderError> {
        match self.device_lost.lock() {
            Ok(lost) => match lost.as_ref() {
                Some(message) => Err(RenderError::DeviceLost(message.clone())),
                None => Ok(()),
            },
            Err(_) => Err(RenderError::DeviceLost("device lost state poisoned".to_string())),
        }
    }

    /// Record and submit every pass of the selected technique into `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        scene: &mut SceneGraph,
        skybox: Option<&Skybox>,
        camera: &CameraUniform,
        viewport: Viewport,
        ui: &UiConstants,
    ) -> Result<FrameStats, RenderError> {
        self.check_device()?;
        if viewport.width == 0 || viewport.height == 0 {
            return Err(RenderError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        if self.size() != (viewport.width, viewport.height) {
            self.resize(device, viewport.width, viewport.height);
        }

        let technique = ui.light_cull_technique;
        self.targets.ensure(device, &self.layouts, technique.targets());

        let mut camera = *camera;
        camera.set_viewport(viewport.width, viewport.height);
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera]));
        let constants = FrameConstants::new(ui, self.lights.active_lights(), self.tiles);
        queue.write_buffer(&self.constants_buffer, 0, bytemuck::cast_slice(&[constants]));
        queue.write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(self.lights.active()));
        scene.write_to_buffers(queue, device);

        let inputs = FrameInputs {
            technique,
            target,
            skybox,
            view_proj: camera.view_proj_matrix(),
        };
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(technique.label()),
        });
        let mut stats = FrameStats {
            technique,
            passes: Vec::with_capacity(technique.passes().len()),
            draw_calls: 0,
        };
        for &pass in technique.passes() {
            if let Some(draws) = self.encode_pass(pass, &mut encoder, scene, &inputs) {
                stats.passes.push(pass);
                stats.draw_calls += draws;
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
        self.check_device()?;
        Ok(stats)
    }

    /// Returns the draw calls issued, or `None` when the pass was skipped.
    fn encode_pass(
        &self,
        pass: Pass,
        encoder: &mut wgpu::CommandEncoder,
        scene: &mut SceneGraph,
        inputs: &FrameInputs,
    ) -> Option<usize> {
        let depth = &self.targets.depth.view;
        match pass {
            Pass::DepthPrePass => {
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Depth Pre-pass"),
                    color_attachments: &[],
                    depth_stencil_attachment: depth_attachment(depth, true),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(&self.pipelines.depth_prepass);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                Some(scene.render(
                    &mut render_pass,
                    &inputs.view_proj,
                    CULL_NEAR,
                    Some(TextureSlots::diffuse_only(1)),
                ))
            }
            Pass::Forward => {
                // after a pre-pass the depth buffer is already filled
                let prez = inputs.technique.passes().contains(&Pass::DepthPrePass);
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Forward Pass"),
                    color_attachments: &[self.targets.frame_attachment(inputs.target, true)],
                    depth_stencil_attachment: depth_attachment(depth, !prez),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(if prez {
                    &self.pipelines.forward_prez
                } else {
                    &self.pipelines.forward
                });
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                Some(scene.render(&mut render_pass, &inputs.view_proj, CULL_NEAR, Some(TextureSlots::ALL)))
            }
            Pass::GBuffer => {
                let gbuffer = self.targets.gbuffer.as_ref()?;
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("G-buffer Pass"),
                    color_attachments: &[
                        color_attachment(&gbuffer.normal.view, true),
                        color_attachment(&gbuffer.albedo.view, true),
                    ],
                    depth_stencil_attachment: depth_attachment(depth, true),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(&self.pipelines.gbuffer);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                Some(scene.render(&mut render_pass, &inputs.view_proj, CULL_NEAR, Some(TextureSlots::ALL)))
            }
            Pass::DeferredFullScreen => {
                let gbuffer = self.targets.gbuffer.as_ref()?;
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Deferred Full-screen Pass"),
                    color_attachments: &[self.targets.frame_attachment(inputs.target, true)],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(&self.pipelines.deferred);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                render_pass.set_bind_group(1, &gbuffer.bind_group, &[]);
                render_pass.draw(0..3, 0..1);
                Some(1)
            }
            Pass::LightQuads | Pass::LightAccumulationQuads => {
                let gbuffer = self.targets.gbuffer.as_ref()?;
                let (attachment, pipeline, label) = if pass == Pass::LightQuads {
                    (
                        self.targets.frame_attachment(inputs.target, true),
                        &self.pipelines.light_quads,
                        "Light Quad Pass",
                    )
                } else {
                    let accumulation = self.targets.accumulation.as_ref()?;
                    (
                        color_attachment(&accumulation.texture.view, true),
                        &self.pipelines.light_accumulation,
                        "Light Accumulation Pass",
                    )
                };
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(label),
                    color_attachments: &[attachment],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                render_pass.set_bind_group(1, &gbuffer.bind_group, &[]);
                render_pass.draw(0..6, 0..self.lights.active_lights());
                Some(1)
            }
            Pass::DeferredLightingResolve => {
                let accumulation = self.targets.accumulation.as_ref()?;
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Deferred Lighting Resolve Pass"),
                    color_attachments: &[self.targets.frame_attachment(inputs.target, true)],
                    depth_stencil_attachment: depth_attachment(depth, false),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(&self.pipelines.resolve);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                render_pass.set_bind_group(3, &accumulation.read_group, &[]);
                Some(scene.render(&mut render_pass, &inputs.view_proj, CULL_NEAR, Some(RESOLVE_SLOTS)))
            }
            Pass::TileCullCompute => {
                let gbuffer = self.targets.gbuffer.as_ref()?;
                let tiles = self.targets.tile_output.as_ref()?;
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Tile Culling Pass"),
                    timestamp_writes: None,
                });
                compute_pass.set_pipeline(&self.pipelines.tile_cull);
                compute_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                compute_pass.set_bind_group(1, &gbuffer.bind_group, &[]);
                compute_pass.set_bind_group(2, &tiles.write_group, &[]);
                compute_pass.dispatch_workgroups(self.tiles.x, self.tiles.y, 1);
                Some(0)
            }
            Pass::Composite => {
                let tiles = self.targets.tile_output.as_ref()?;
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Composite Pass"),
                    color_attachments: &[self.targets.frame_attachment(inputs.target, true)],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(&self.pipelines.composite);
                render_pass.set_bind_group(0, &tiles.output.read_group, &[]);
                render_pass.draw(0..3, 0..1);
                Some(1)
            }
            Pass::Skybox => {
                let skybox = inputs.skybox?;
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Skybox Pass"),
                    color_attachments: &[self.targets.frame_attachment(inputs.target, false)],
                    depth_stencil_attachment: depth_attachment(depth, false),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(&self.pipelines.skybox);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                render_pass.set_bind_group(1, skybox.bind_group(), &[]);
                render_pass.draw(0..3, 0..1);
                Some(1)
            }
        }
    }
}
