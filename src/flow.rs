//! Session state and the application event loop.
//!
//! A [`Session`] owns everything the renderer needs between frames: the GPU
//! [`Context`], the [`Settings`], the scene graph, the camera and the
//! physics service. Renderer and scene are brought up explicitly through
//! [`Stage`]s instead of being created lazily wherever they are first used.
//!
//! # Lifecycle
//!
//! Each frame:
//! 1. Bring up any stage that is still [`Stage::Uninitialized`]
//! 2. Step physics and mirror body positions into the scene
//! 3. Animate lights and move the camera
//! 4. Render the selected technique into the next swapchain image
//! 5. Present and, once per second, report frame time and light count
//!
//! Input is translated into [`SessionEvent`]s. Each event states through
//! [`SessionEvent::invalidation`] which stage it tears down. The scene is
//! built against the renderer's layouts, so tearing down the renderer takes
//! the scene with it.

use std::sync::Arc;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    camera::{Camera, CameraController, CameraRig, CameraUniform},
    config::Settings,
    context::Context,
    data_structures::scene_graph::SceneGraph,
    error::RenderError,
    physics::{Nudge, PhysicsService},
    pipelines::{light::MAX_LIGHTS_POWER, skybox::Skybox, snap_sample_count},
    render::{FrameStats, LightCullTechnique, Renderer, Viewport},
    resources::GpuLoader,
    scenes::{SceneSelection, SceneSetup, build_scene},
};

const WINDOW_TITLE: &str = "Deferred Shading";
const CAMERA_SPEED: f32 = 10.0;
const CAMERA_SENSITIVITY: f32 = 0.4;
const MOUSE_LOOK_FACTOR: f64 = 5.0;

/// A piece of session state that is either absent or fully built.
#[derive(Debug, Default)]
pub enum Stage<T> {
    #[default]
    Uninitialized,
    Ready(T),
}

impl<T> Stage<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Stage::Ready(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Stage::Ready(value) => Some(value),
            Stage::Uninitialized => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Stage::Ready(value) => Some(value),
            Stage::Uninitialized => None,
        }
    }

    /// Build the stage with `init` if needed and return it.
    pub fn get_or_init(&mut self, init: impl FnOnce() -> T) -> &mut T {
        if let Stage::Uninitialized = self {
            *self = Stage::Ready(init());
        }
        match self {
            Stage::Ready(value) => value,
            Stage::Uninitialized => unreachable!("stage initialized above"),
        }
    }

    pub fn reset(&mut self) {
        *self = Stage::Uninitialized;
    }
}

/// Which stage an event tears down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalidation {
    None,
    Scene,
    /// Renderer and scene.
    Renderer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SelectScene(SceneSelection),
    /// Numeric technique code; unknown codes select the default technique.
    SetTechnique(u32),
    /// Change the light count exponent by this many steps.
    ChangeLightPower(i32),
    /// Samples per pixel, snapped down to 1, 2, 4 or 8.
    SetMsaa(u32),
    ToggleLightAnimation,
    ToggleLightingOnly,
    ToggleFaceNormals,
    ToggleLightCount,
    TogglePerSampleShading,
    /// Show or hide the frame statistics in the window title.
    ToggleUi,
    Resized { width: u32, height: u32 },
    PhysicsKey(Nudge),
}

impl SessionEvent {
    /// Keyboard stand-in for the settings panel.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        let event = match key {
            KeyCode::Digit1 => SessionEvent::SetTechnique(0),
            KeyCode::Digit2 => SessionEvent::SetTechnique(1),
            KeyCode::Digit3 => SessionEvent::SetTechnique(2),
            KeyCode::Digit4 => SessionEvent::SetTechnique(3),
            KeyCode::Digit5 => SessionEvent::SetTechnique(4),
            KeyCode::Digit6 => SessionEvent::SetTechnique(5),
            KeyCode::Digit7 => SessionEvent::SetMsaa(1),
            KeyCode::Digit8 => SessionEvent::SetMsaa(2),
            KeyCode::Digit9 => SessionEvent::SetMsaa(4),
            KeyCode::Digit0 => SessionEvent::SetMsaa(8),
            KeyCode::F1 => SessionEvent::SelectScene(SceneSelection::CubeWorld),
            KeyCode::F2 => SessionEvent::SelectScene(SceneSelection::PowerPlant),
            KeyCode::F3 => SessionEvent::SelectScene(SceneSelection::Sponza),
            KeyCode::F4 => SessionEvent::SelectScene(SceneSelection::MultiScene),
            KeyCode::F5 => SessionEvent::SelectScene(SceneSelection::Cubes),
            KeyCode::Equal | KeyCode::NumpadAdd => SessionEvent::ChangeLightPower(1),
            KeyCode::Minus | KeyCode::NumpadSubtract => SessionEvent::ChangeLightPower(-1),
            KeyCode::Space => SessionEvent::ToggleLightAnimation,
            KeyCode::KeyL => SessionEvent::ToggleLightingOnly,
            KeyCode::KeyN => SessionEvent::ToggleFaceNormals,
            KeyCode::KeyV => SessionEvent::ToggleLightCount,
            KeyCode::KeyP => SessionEvent::TogglePerSampleShading,
            KeyCode::F9 => SessionEvent::ToggleUi,
            KeyCode::ArrowLeft => SessionEvent::PhysicsKey(Nudge::Left),
            KeyCode::ArrowRight => SessionEvent::PhysicsKey(Nudge::Right),
            KeyCode::ArrowUp => SessionEvent::PhysicsKey(Nudge::Forward),
            KeyCode::ArrowDown => SessionEvent::PhysicsKey(Nudge::Back),
            KeyCode::KeyJ => SessionEvent::PhysicsKey(Nudge::Up),
            _ => return None,
        };
        Some(event)
    }

    pub fn invalidation(&self) -> Invalidation {
        match self {
            SessionEvent::SelectScene(_) => Invalidation::Scene,
            SessionEvent::SetMsaa(_) => Invalidation::Renderer,
            _ => Invalidation::None,
        }
    }

    /// The settings change this event stands for. Events that only reach
    /// other collaborators leave the settings alone.
    pub fn apply_to(&self, settings: &mut Settings) {
        let ui = &mut settings.ui;
        match *self {
            SessionEvent::SelectScene(scene) => settings.scene = scene,
            SessionEvent::SetTechnique(code) => ui.light_cull_technique = LightCullTechnique::from(code),
            SessionEvent::ChangeLightPower(steps) => {
                settings.light_power =
                    (settings.light_power as i64 + steps as i64).clamp(0, MAX_LIGHTS_POWER as i64) as u32;
            }
            SessionEvent::SetMsaa(samples) => settings.msaa_samples = snap_sample_count(samples),
            SessionEvent::ToggleLightAnimation => settings.animate_lights = !settings.animate_lights,
            SessionEvent::ToggleLightingOnly => ui.lighting_only = !ui.lighting_only,
            SessionEvent::ToggleFaceNormals => ui.face_normals = !ui.face_normals,
            SessionEvent::ToggleLightCount => ui.visualize_light_count = !ui.visualize_light_count,
            SessionEvent::TogglePerSampleShading => {
                ui.visualize_per_sample_shading = !ui.visualize_per_sample_shading
            }
            SessionEvent::ToggleUi => settings.show_overlay = !settings.show_overlay,
            SessionEvent::Resized { width, height } => {
                if width > 0 && height > 0 {
                    settings.width = width;
                    settings.height = height;
                }
            }
            SessionEvent::PhysicsKey(_) => (),
        }
    }
}

/// Averages frame times and reports once per second.
#[derive(Debug, Default)]
pub struct FrameTimer {
    elapsed: Duration,
    frames: u32,
}

impl FrameTimer {
    pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

    /// Returns the mean milliseconds per frame when a report is due.
    pub fn record(&mut self, dt: Duration) -> Option<f32> {
        self.elapsed += dt;
        self.frames += 1;
        if self.elapsed < Self::REPORT_INTERVAL {
            return None;
        }
        let ms = self.elapsed.as_secs_f32() * 1000.0 / self.frames as f32;
        self.elapsed = Duration::ZERO;
        self.frames = 0;
        Some(ms)
    }
}

pub fn overlay_line(technique: LightCullTechnique, ms_per_frame: f32, lights: u32) -> String {
    format!(
        "{} | {:.2} ms / frame | Lights: {}",
        technique.label(),
        ms_per_frame,
        lights
    )
}

/// A built scene and what it brought along.
pub struct LoadedScene {
    pub selection: SceneSelection,
    pub setup: SceneSetup,
    pub skybox: Option<Skybox>,
}

fn physics_ref(physics: &mut Option<Box<dyn PhysicsService>>) -> Option<&mut dyn PhysicsService> {
    match physics {
        Some(service) => Some(service.as_mut() as &mut dyn PhysicsService),
        None => None,
    }
}

fn default_physics() -> Option<Box<dyn PhysicsService>> {
    #[cfg(feature = "physics")]
    {
        Some(Box::new(crate::physics::rapier::RapierPhysics::new()))
    }
    #[cfg(not(feature = "physics"))]
    {
        None
    }
}

pub struct Session {
    ctx: Context,
    settings: Settings,
    renderer: Stage<Renderer>,
    scene: Stage<LoadedScene>,
    scene_graph: SceneGraph,
    physics: Option<Box<dyn PhysicsService>>,
    camera: CameraRig,
    timer: FrameTimer,
    mouse_look: bool,
}

impl Session {
    pub fn new(ctx: Context, settings: Settings) -> Self {
        let mut camera = CameraRig {
            camera: Camera::look_at((100.0, 5.0, 5.0).into(), (0.0, 0.0, 0.0).into()),
            controller: CameraController::new(CAMERA_SPEED, CAMERA_SENSITIVITY),
            uniform: CameraUniform::new(),
        };
        camera.uniform.update_view_proj(&camera.camera, &ctx.projection);
        Self {
            ctx,
            settings,
            renderer: Stage::Uninitialized,
            scene: Stage::Uninitialized,
            scene_graph: SceneGraph::new(),
            physics: default_physics(),
            camera,
            timer: FrameTimer::default(),
            mouse_look: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn handle(&mut self, event: SessionEvent) {
        log::debug!("Session event {event:?}");
        event.apply_to(&mut self.settings);
        match event {
            SessionEvent::ChangeLightPower(_) => {
                if let Some(renderer) = self.renderer.get_mut() {
                    let lights = renderer.set_active_lights(1 << self.settings.light_power);
                    log::info!("Lights: {lights}");
                }
            }
            SessionEvent::SetTechnique(_) => {
                log::info!("Technique: {}", self.settings.ui.light_cull_technique.label());
            }
            SessionEvent::Resized { width, height } => {
                if self.ctx.resize(width, height) {
                    if let Some(renderer) = self.renderer.get_mut() {
                        renderer.resize(&self.ctx.device, width, height);
                    }
                }
            }
            SessionEvent::PhysicsKey(nudge) => {
                if let Some(physics) = self.physics.as_mut() {
                    physics.process_key(nudge);
                }
            }
            SessionEvent::ToggleUi if !self.settings.show_overlay => {
                self.ctx.window().set_title(WINDOW_TITLE);
            }
            _ => (),
        }
        match event.invalidation() {
            Invalidation::None => (),
            Invalidation::Scene => self.teardown_scene(),
            Invalidation::Renderer => {
                log::info!("Rebuilding renderer with {}x MSAA", self.settings.msaa_samples);
                self.teardown_scene();
                self.renderer.reset();
            }
        }
    }

    fn teardown_scene(&mut self) {
        if let Some(physics) = self.physics.as_mut() {
            physics.shutdown();
        }
        self.scene_graph.destroy();
        self.scene.reset();
    }

    fn bring_up_renderer(ctx: &Context, settings: &Settings) -> Renderer {
        let (width, height) = ctx.size();
        Renderer::new(
            &ctx.device,
            ctx.config.format,
            width,
            height,
            settings.light_power,
            ctx.sample_count_for(settings.msaa_samples),
        )
    }

    fn bring_up_scene(
        ctx: &Context,
        settings: &Settings,
        renderer: &Renderer,
        scene_graph: &mut SceneGraph,
        physics: Option<&mut dyn PhysicsService>,
    ) -> LoadedScene {
        let loader = GpuLoader::new(&ctx.device, &ctx.queue, renderer.material_layout(), &settings.media_dir);
        let setup = build_scene(settings.scene, scene_graph, &loader, physics);
        let skybox = setup.skybox.and_then(|path| {
            let path = settings.media_dir.join(path);
            match futures::executor::block_on(renderer.load_skybox(&ctx.device, &ctx.queue, &path)) {
                Ok(skybox) => Some(skybox),
                Err(e) => {
                    log::warn!("Drawing without a sky: {e:#}");
                    None
                }
            }
        });
        LoadedScene {
            selection: settings.scene,
            setup,
            skybox,
        }
    }

    /// Update and draw one frame.
    pub fn frame(&mut self, dt: Duration) -> Result<FrameStats, RenderError> {
        let renderer = self
            .renderer
            .get_or_init(|| Self::bring_up_renderer(&self.ctx, &self.settings));
        if !self.scene.is_ready() {
            let loaded = Self::bring_up_scene(
                &self.ctx,
                &self.settings,
                renderer,
                &mut self.scene_graph,
                physics_ref(&mut self.physics),
            );
            self.camera.camera.point_at(loaded.setup.eye, loaded.setup.at);
            self.scene = Stage::Ready(loaded);
        }

        let secs = dt.as_secs_f32();
        if let (Some(scene), Some(physics)) = (self.scene.get(), self.physics.as_mut()) {
            if let Some(sync) = &scene.setup.physics_sync {
                sync.sync(physics.as_mut(), &mut self.scene_graph, secs);
            }
        }
        if self.settings.animate_lights {
            renderer.move_lights(secs);
        }
        self.camera.controller.update(&mut self.camera.camera, dt);
        self.camera
            .uniform
            .update_view_proj(&self.camera.camera, &self.ctx.projection);

        let (width, height) = self.ctx.size();
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let stats = renderer.render(
            &self.ctx.device,
            &self.ctx.queue,
            &view,
            &mut self.scene_graph,
            self.scene.get().and_then(|s| s.skybox.as_ref()),
            &self.camera.uniform,
            Viewport { width, height },
            &self.settings.ui,
        )?;
        output.present();

        if let Some(ms) = self.timer.record(dt) {
            let line = overlay_line(stats.technique, ms, renderer.active_lights());
            log::info!("{line} | {} draw calls", stats.draw_calls);
            if self.settings.show_overlay {
                self.ctx.window().set_title(&format!("{WINDOW_TITLE} | {line}"));
            }
        }
        Ok(stats)
    }

    fn window_event(&mut self, event: &WindowEvent) {
        self.camera.controller.handle_window_events(event);
        match event {
            WindowEvent::Resized(size) => self.handle(SessionEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(event) = SessionEvent::from_key(*key) {
                    self.handle(event);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => self.mouse_look = state.is_pressed(),
            _ => (),
        }
    }

    fn device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.mouse_look {
                self.camera
                    .controller
                    .handle_mouse(dx * MOUSE_LOOK_FACTOR, dy * MOUSE_LOOK_FACTOR);
            }
        }
    }

    fn shutdown(&mut self) {
        self.teardown_scene();
        self.renderer.reset();
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    settings: Settings,
    session: Option<Session>,
    last_time: Instant,
}

impl App {
    fn new(settings: Settings) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            settings,
            session: None,
            last_time: Instant::now(),
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.settings.width,
                self.settings.height,
            ));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        match self.async_runtime.block_on(Context::new(window)) {
            Ok(ctx) => {
                ctx.window().request_redraw();
                self.session = Some(Session::new(ctx, self.settings.clone()));
                self.last_time = Instant::now();
            }
            Err(e) => {
                log::error!("Unable to initialize the GPU: {e}");
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(session) = &mut self.session {
            session.device_event(&event);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(session) = &mut self.session else {
            return;
        };
        session.window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                session.shutdown();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                match session.frame(dt) {
                    Ok(_) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(e) if e.needs_reconfigure() => session.ctx.reconfigure(),
                    Err(e) if e.is_fatal() => {
                        log::error!("Stopping: {e}");
                        session.shutdown();
                        event_loop.exit();
                        return;
                    }
                    Err(e) => log::warn!("Frame skipped: {e}"),
                }
                session.ctx.window().request_redraw();
            }
            _ => (),
        }
    }
}

pub fn run(settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
