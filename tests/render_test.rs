#[cfg(feature = "integration-tests")]
mod gpu {
    use std::cell::Cell;

    use cgmath::{Deg, Point3};
    use deferred_ngin::{
        camera::{Camera, CameraUniform, Projection},
        config::UiConstants,
        data_structures::{
            mesh_instance::{MeshData, SubMesh},
            model::{Aabb, GpuGeometry, Material, ModelVertex},
            scene_graph::SceneGraph,
            transform::Transform,
        },
        render::{LightCullTechnique, Pass, Renderer, Viewport},
        resources::MeshLoader,
    };

    const SIZE: u32 = 64;
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    async fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok()?;
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("test device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .ok()
    }

    fn target(device: &wgpu::Device) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test target"),
            size: wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Unit cube, 24 vertices with outward normals.
    fn cube_vertices() -> (Vec<ModelVertex>, Vec<u32>) {
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        ];
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for (n, u, v) in faces {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                vertices.push(ModelVertex {
                    position: std::array::from_fn(|i| n[i] + su * u[i] + sv * v[i]),
                    tex_coords: [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
                    normal: n,
                    tangent: u,
                    bitangent: v,
                });
            }
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        (vertices, indices)
    }

    /// Hands out a drawable cube per path and counts the loads.
    struct CubeLoader<'a> {
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        layout: &'a wgpu::BindGroupLayout,
        loads: Cell<usize>,
    }

    impl MeshLoader for CubeLoader<'_> {
        fn load(&self, path: &str) -> anyhow::Result<MeshData> {
            self.loads.set(self.loads.get() + 1);
            let (vertices, indices) = cube_vertices();
            let bounds = Aabb::from_points(vertices.iter().map(|v| v.position)).expect("cube has vertices");
            let geometry = GpuGeometry::new(self.device, path, &vertices, &indices);
            Ok(MeshData {
                submeshes: vec![SubMesh::new(path, bounds, 0, Some(geometry))],
                materials: vec![Material::flat(self.device, self.queue, path, [0.8, 0.8, 0.8], self.layout)],
            })
        }
    }

    fn looking_at_origin() -> CameraUniform {
        let camera = Camera::look_at(Point3::new(0.0, 0.0, 10.0), Point3::new(0.0, 0.0, 0.0));
        let projection = Projection::new(SIZE, SIZE, Deg(60.0), 0.1, 100.0);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);
        uniform
    }

    fn viewport() -> Viewport {
        Viewport {
            width: SIZE,
            height: SIZE,
        }
    }

    async fn read_pixels(device: &wgpu::Device, queue: &wgpu::Queue, texture: &wgpu::Texture) -> Vec<u8> {
        let bytes_per_row = 4 * SIZE;
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            size: (bytes_per_row * SIZE) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: None,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(SIZE),
                },
            },
            wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .unwrap();
        rx.receive().await.unwrap().unwrap();
        buffer_slice.get_mapped_range().to_vec()
    }

    #[test]
    fn should_run_every_technique_on_empty_scene() {
        futures::executor::block_on(async {
            let Some((device, queue)) = headless_device().await else {
                eprintln!("No GPU adapter, skipping");
                return;
            };
            let mut renderer = Renderer::new(&device, FORMAT, SIZE, SIZE, 4, 1);
            let mut scene = SceneGraph::new();
            let texture = target(&device);
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

            for technique in LightCullTechnique::ALL {
                let ui = UiConstants {
                    light_cull_technique: technique,
                    ..Default::default()
                };
                let stats = renderer
                    .render(
                        &device,
                        &queue,
                        &view,
                        &mut scene,
                        None,
                        &CameraUniform::new(),
                        Viewport {
                            width: SIZE,
                            height: SIZE,
                        },
                        &ui,
                    )
                    .expect("frame renders");

                assert_eq!(stats.technique, technique);
                assert!(!stats.passes.contains(&Pass::Skybox));
                assert_eq!(stats.passes.len(), technique.passes().len() - 1);
            }
        });
    }

    #[test]
    fn should_clear_to_black_without_geometry() {
        futures::executor::block_on(async {
            let Some((device, queue)) = headless_device().await else {
                eprintln!("No GPU adapter, skipping");
                return;
            };
            let mut renderer = Renderer::new(&device, FORMAT, SIZE, SIZE, 4, 1);
            let mut scene = SceneGraph::new();
            let texture = target(&device);
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let ui = UiConstants {
                light_cull_technique: LightCullTechnique::ForwardNone,
                ..Default::default()
            };

            let stats = renderer
                .render(
                    &device,
                    &queue,
                    &view,
                    &mut scene,
                    None,
                    &CameraUniform::new(),
                    Viewport {
                        width: SIZE,
                        height: SIZE,
                    },
                    &ui,
                )
                .expect("frame renders");
            assert_eq!(stats.draw_calls, 0);

            let pixels = read_pixels(&device, &queue, &texture).await;
            for pixel in pixels.chunks_exact(4) {
                assert_eq!(pixel, [0, 0, 0, 255]);
            }
        });
    }

    #[test]
    fn should_reject_empty_viewport() {
        futures::executor::block_on(async {
            let Some((device, queue)) = headless_device().await else {
                eprintln!("No GPU adapter, skipping");
                return;
            };
            let mut renderer = Renderer::new(&device, FORMAT, SIZE, SIZE, 4, 1);
            let texture = target(&device);
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

            let result = renderer.render(
                &device,
                &queue,
                &view,
                &mut SceneGraph::new(),
                None,
                &CameraUniform::new(),
                Viewport { width: 0, height: SIZE },
                &UiConstants::default(),
            );

            assert!(matches!(
                result,
                Err(deferred_ngin::error::RenderError::InvalidViewport { width: 0, .. })
            ));
            assert_eq!(renderer.size(), (SIZE, SIZE));
        });
    }

    #[test]
    fn should_switch_techniques_without_reloading_meshes() {
        futures::executor::block_on(async {
            let Some((device, queue)) = headless_device().await else {
                eprintln!("No GPU adapter, skipping");
                return;
            };
            let mut renderer = Renderer::new(&device, FORMAT, SIZE, SIZE, 4, 1);
            let loader = CubeLoader {
                device: &device,
                queue: &queue,
                layout: renderer.material_layout(),
                loads: Cell::new(0),
            };
            let mut scene = SceneGraph::new();
            scene.start_scene(Transform::new(), 1.0);
            scene.add(&loader, "box.obj", Transform::from_translation(-2.0, 0.0, 0.0));
            scene.add(&loader, "box.obj", Transform::from_translation(2.0, 0.0, 0.0));
            scene.add(&loader, "other.glb", Transform::new());
            scene.write_to_buffers(&queue, &device);
            assert_eq!(loader.loads.get(), 2);

            let texture = target(&device);
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let camera = looking_at_origin();
            let sequence = LightCullTechnique::ALL.into_iter().chain([
                LightCullTechnique::ForwardNone,
                LightCullTechnique::QuadDeferredLighting,
            ]);

            for technique in sequence {
                let ui = UiConstants {
                    light_cull_technique: technique,
                    ..Default::default()
                };
                let stats = renderer
                    .render(&device, &queue, &view, &mut scene, None, &camera, viewport(), &ui)
                    .expect("frame renders");

                let scene_passes = technique.passes().iter().filter(|p| p.draws_scene()).count();
                assert!(stats.draw_calls >= 3 * scene_passes, "{technique:?}: {stats:?}");
                assert!(stats.draw_calls > 0);
            }

            assert_eq!(loader.loads.get(), 2);
            assert_eq!(scene.len(), 3);
            assert_eq!(scene.meshes().len(), 2);
        });
    }

    #[test]
    fn should_run_every_technique_multisampled() {
        futures::executor::block_on(async {
            let Some((device, queue)) = headless_device().await else {
                eprintln!("No GPU adapter, skipping");
                return;
            };
            let mut renderer = Renderer::new(&device, FORMAT, SIZE, SIZE, 4, 4);
            assert_eq!(renderer.samples(), 4);
            let loader = CubeLoader {
                device: &device,
                queue: &queue,
                layout: renderer.material_layout(),
                loads: Cell::new(0),
            };
            let mut scene = SceneGraph::new();
            scene.start_scene(Transform::new(), 1.0);
            scene.add(&loader, "box.obj", Transform::new());
            let texture = target(&device);
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let camera = looking_at_origin();

            for technique in LightCullTechnique::ALL {
                let ui = UiConstants {
                    light_cull_technique: technique,
                    visualize_per_sample_shading: true,
                    ..Default::default()
                };
                let stats = renderer
                    .render(&device, &queue, &view, &mut scene, None, &camera, viewport(), &ui)
                    .expect("frame renders");
                assert_eq!(stats.passes.len(), technique.passes().len() - 1);
            }
            assert_eq!(renderer.samples(), 4);
        });
    }

    #[test]
    fn should_resolve_multisampled_clear_to_black() {
        futures::executor::block_on(async {
            let Some((device, queue)) = headless_device().await else {
                eprintln!("No GPU adapter, skipping");
                return;
            };
            let mut renderer = Renderer::new(&device, FORMAT, SIZE, SIZE, 4, 4);
            let texture = target(&device);
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let ui = UiConstants {
                light_cull_technique: LightCullTechnique::ForwardNone,
                ..Default::default()
            };

            renderer
                .render(
                    &device,
                    &queue,
                    &view,
                    &mut SceneGraph::new(),
                    None,
                    &CameraUniform::new(),
                    viewport(),
                    &ui,
                )
                .expect("frame renders");

            let pixels = read_pixels(&device, &queue, &texture).await;
            for pixel in pixels.chunks_exact(4) {
                assert_eq!(pixel, [0, 0, 0, 255]);
            }
        });
    }

    #[test]
    fn should_snap_unoffered_sample_count() {
        futures::executor::block_on(async {
            let Some((device, _queue)) = headless_device().await else {
                eprintln!("No GPU adapter, skipping");
                return;
            };
            let renderer = Renderer::new(&device, FORMAT, SIZE, SIZE, 4, 5);
            assert_eq!(renderer.samples(), 4);
        });
    }
}
