use std::sync::Arc;

use winit::window::Window;

use crate::{
    camera::Projection,
    data_structures::texture::Texture,
    error::RenderError,
    pipelines::{GBUFFER_ALBEDO_FORMAT, GBUFFER_NORMAL_FORMAT, MSAA_SAMPLE_COUNTS},
};

/// Vertical field of view of the viewer camera.
const FOVY_DEGREES: f32 = 60.0;
const Z_NEAR: f32 = 0.05;
const Z_FAR: f32 = 1000.0;

/// The window, its surface and the GPU device that draws into it.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub projection: Projection,
    /// Sample counts every multisampled target format supports, ascending.
    sample_counts: Vec<u32>,
}

/// Counts from [`MSAA_SAMPLE_COUNTS`] usable for the frame, G-buffer and depth
/// formats. Without adapter specific format features only the counts every
/// device guarantees (1 and 4) are valid.
fn supported_sample_counts(
    adapter: &wgpu::Adapter,
    surface_format: wgpu::TextureFormat,
    adapter_specific: bool,
) -> Vec<u32> {
    let formats = [
        surface_format,
        GBUFFER_NORMAL_FORMAT,
        GBUFFER_ALBEDO_FORMAT,
        Texture::DEPTH_FORMAT,
    ];
    MSAA_SAMPLE_COUNTS
        .into_iter()
        .filter(|&count| match count {
            1 => true,
            _ if !adapter_specific => count == 4,
            _ => formats.iter().all(|&format| {
                adapter
                    .get_texture_format_features(format)
                    .flags
                    .sample_count_supported(count)
            }),
        })
        .collect()
}

impl Context {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| {
                log::error!("Could not create a surface for the window: {e}");
                RenderError::AdapterUnavailable
            })?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| {
                log::error!("No adapter: {e}");
                RenderError::AdapterUnavailable
            })?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let format_features = adapter.features() & wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("deferred-ngin device"),
                required_features: format_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU uncaptured error: {e}");
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        // Lighting is computed in linear space and relies on an sRGB surface
        // for the final encode.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::AdapterUnavailable)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sample_counts = supported_sample_counts(&adapter, surface_format, !format_features.is_empty());
        log::info!("Supported MSAA sample counts: {sample_counts:?}");

        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(FOVY_DEGREES),
            Z_NEAR,
            Z_FAR,
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            projection,
            sample_counts,
        })
    }

    /// The largest supported sample count not above `requested`.
    pub fn sample_count_for(&self, requested: u32) -> u32 {
        let count = self
            .sample_counts
            .iter()
            .copied()
            .filter(|&count| count <= requested)
            .max()
            .unwrap_or(1);
        if count != requested {
            log::warn!("{requested}x MSAA is not supported here, using {count}x");
        }
        count
    }

    /// Reconfigure the surface and the projection aspect. Zero sizes
    /// (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.projection.resize(width, height);
        true
    }

    /// Configure the surface again with the current size, after it was lost
    /// or became outdated.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}
