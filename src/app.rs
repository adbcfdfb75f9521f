use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _, Result};
use eframe::egui::{
    self, pos2, vec2, ClippedPrimitive, DragValue, Rect, ScrollArea, Slider, TextureId, Ui,
};
use log::{info, trace, warn};
use nalgebra::Vector3;
use wgpu::{
    Backends, Color, CommandBuffer, CommandEncoder, CommandEncoderDescriptor, CompositeAlphaMode,
    Device, DeviceDescriptor, Dx12Compiler, Features, FilterMode, Instance, InstanceDescriptor,
    Limits, LoadOp, Operations, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RequestAdapterOptions, Surface, SurfaceConfiguration, SurfaceError,
    TextureUsages, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::Window;

use crate::camera::{Camera, CameraConfig};
use crate::input::WinitInput;
use crate::tracer::kernel::Scatter;
use crate::tracer::scene::{Material, Scene, Sphere};
use crate::tracer::texture::GpuImage;
use crate::tracer::{Renderer, Settings};

pub struct Application {
    surface: Surface,
    device: Arc<Device>,
    queue: Arc<Queue>,
    config: SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    // 무조건 winit의 Window를 쓸 것!
    pub window: Window,
    egui_state: egui_winit::State,
    egui_context: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_screen: egui_wgpu::renderer::ScreenDescriptor,

    input: WinitInput,
    camera: Camera,
    scene: Scene,
    renderer: Renderer<GpuImage>,

    viewport_size: PhysicalSize<u32>,
    viewport_texture: Option<(TextureId, u64)>,
    is_rendering: bool,
    last_update: Instant,
    last_render_time: Duration,
}

impl Application {
    pub async fn new(window: Window, event_loop: &EventLoop<()>) -> Result<Self> {
        let size = window.inner_size();

        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            dx12_shader_compiler: Dx12Compiler::default(),
        });

        // 전달하는 &window가 생성하는 surface보다 오래 유지되어야 함.
        let surface = unsafe { instance.create_surface(&window) }
            .context("failed to create a surface for the window")?;

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or_else(|| anyhow!("no GPU adapter is compatible with the window surface"))?;
        info!("using adapter {:?} ({:?})", adapter.get_info().name, adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    features: Features::empty(),
                    limits: Limits::default(),
                    label: Some("Radiance GPU"),
                },
                None,
            )
            .await
            .context("failed to open the GPU device")?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let capabilities = surface.get_capabilities(&adapter);

        // 색 포맷으로 sRGB 사용
        let surface_format = capabilities
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .or_else(|| capabilities.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: PresentMode::AutoVsync,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let egui_state = egui_winit::State::new(event_loop);
        let egui_context = egui::Context::default();
        let egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_format,
            None, // 깊이 안씀
            1,    // 멀티 샘플링 1번만 할꺼임
        );
        let egui_screen = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: egui_context.pixels_per_point(),
        };

        let image = GpuImage::new(device.clone(), queue.clone(), 1, 1, "Radiance Output");
        let scene = Scene::showcase();
        if let Err(error) = scene.validate() {
            warn!("{error}");
        }

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            egui_state,
            egui_context,
            egui_renderer,
            egui_screen,
            input: WinitInput::new(),
            camera: Camera::new(CameraConfig::default()),
            scene,
            renderer: Renderer::new(image),
            viewport_size: PhysicalSize::new(0, 0),
            viewport_texture: None,
            is_rendering: true,
            last_update: Instant::now(),
            last_render_time: Duration::ZERO,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.egui_screen.pixels_per_point = self.egui_context.pixels_per_point();
        self.egui_screen.size_in_pixels = [self.config.width, self.config.height];
    }

    // 카메라 갱신 -> 크기 맞추기 -> 렌더링 순서로 한 프레임 진행
    pub fn update(&mut self) {
        let now = Instant::now();
        let time_delta = now - self.last_update;
        self.last_update = now;

        if self.camera.update(time_delta, &mut self.input) {
            self.renderer.reset_frame_index();
        }
        self.input.apply_cursor_mode(&self.window);

        if !self.is_rendering {
            return;
        }

        let start = Instant::now();
        let PhysicalSize { width, height } = self.viewport_size;
        self.renderer.resize(width, height);
        self.camera.resize(width, height);

        if let Err(error) = self.renderer.render(&self.scene, &self.camera) {
            warn!("frame skipped: {error}");
        }

        self.last_render_time = start.elapsed();
        trace!("render took {:?}", self.last_render_time);

        self.sync_viewport_texture();
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let output = self.surface.get_current_texture()?; // 렌더링 결과를 출력할 곳

        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Encoder"),
        });

        let (primitives, mut commands) = self.update_egui(&mut encoder);

        // render_pass가 encoder를 빌려오기 때문에 아래처럼 따로 빼지 않으면 앞으로 계속 쓸 수 없음
        {
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            self.egui_renderer.render(&mut render_pass, &primitives, &self.egui_screen);
        }

        commands.push(encoder.finish());
        self.queue.submit(commands);
        output.present();

        Ok(())
    }

    // true: 앱에서 입력 처리를 했으니 따로 관리할 필요 없음
    // false: 아래 event loop에서 처리 해야 함.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        let egui_response = self.egui_state.on_event(&self.egui_context, event);

        // 글자 입력 중이면 키보드는 egui 몫
        if matches!(event, WindowEvent::KeyboardInput { .. }) && self.egui_context.wants_keyboard_input() {
            return egui_response.consumed;
        }

        self.input.handle_window_event(event) | egui_response.consumed
    }

    pub fn device_input(&mut self, event: &DeviceEvent) {
        self.input.handle_device_event(event);
    }

    fn sync_viewport_texture(&mut self) {
        let image = self.renderer.sink();

        match self.viewport_texture {
            Some((_, generation)) if generation == image.generation() => {}
            Some((id, _)) => {
                self.egui_renderer.update_egui_texture_from_wgpu_texture(
                    &self.device,
                    image.view(),
                    FilterMode::Linear,
                    id,
                );
                self.viewport_texture = Some((id, image.generation()));
            }
            None => {
                let id = self.egui_renderer.register_native_texture(
                    &self.device,
                    image.view(),
                    FilterMode::Linear,
                );
                self.viewport_texture = Some((id, image.generation()));
            }
        }
    }

    fn update_egui(&mut self, encoder: &mut CommandEncoder) -> (Vec<ClippedPrimitive>, Vec<CommandBuffer>) {
        let egui_input = self.egui_state.take_egui_input(&self.window);
        let pixels_per_point = self.egui_context.pixels_per_point();

        let image_size = self.renderer.size();
        let frame_index = self.renderer.frame_index();
        let texture = self.viewport_texture.map(|(id, _)| id);
        let last_render_time = self.last_render_time;

        let is_rendering = &mut self.is_rendering;
        let settings = &mut self.renderer.settings;
        let scene = &mut self.scene;
        let viewport_size = &mut self.viewport_size;

        let mut reset = false;
        let egui_output = self.egui_context.run(egui_input, |ctx| {
            egui::SidePanel::right("Settings")
                .resizable(true)
                .width_range(160.0..=512.0)
                .default_width(260.0)
                .show(ctx, |ui| {
                    ui.heading("Settings");
                    let label = if *is_rendering { "Stop rendering" } else { "Start rendering" };
                    if ui.button(label).clicked() {
                        *is_rendering = !*is_rendering;
                        info!("rendering {}", if *is_rendering { "started" } else { "stopped" });
                    }

                    ui.label(format!("Image size: ({}, {})", image_size.width, image_size.height));
                    ui.label(format!("Last render time: {:.3}ms", last_render_time.as_secs_f64() * 1000.0));
                    ui.label(format!("Frame: {}", frame_index));

                    ui.checkbox(&mut settings.accumulate, "Accumulate");
                    if ui.button("Reset").clicked() {
                        reset = true;
                    }

                    ui.separator();
                    reset |= kernel_settings(ui, settings);

                    ui.separator();
                    ScrollArea::vertical().show(ui, |ui| {
                        reset |= scene_editor(ui, scene);
                    });
                });

            egui::CentralPanel::default()
                .frame(egui::Frame::none())
                .show(ctx, |ui| {
                    let available = ui.available_size() * pixels_per_point;
                    *viewport_size = PhysicalSize::new(available.x as u32, available.y as u32);

                    if let Some(texture) = texture {
                        let size = vec2(image_size.width as f32, image_size.height as f32) / pixels_per_point;
                        // 첫 행이 화면 아래쪽이라 위아래를 뒤집어서 보여줌
                        ui.add(
                            egui::Image::new(texture, size)
                                .uv(Rect::from_min_max(pos2(0.0, 1.0), pos2(1.0, 0.0))),
                        );
                    }
                });
        });

        if reset {
            self.renderer.reset_frame_index();
        }

        self.egui_state.handle_platform_output(&self.window, &self.egui_context, egui_output.platform_output);
        let primitives = self.egui_context.tessellate(egui_output.shapes);
        for (id, delta) in &egui_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
        }
        for id in &egui_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        let commands = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &primitives,
            &self.egui_screen,
        );

        (primitives, commands)
    }
}

fn kernel_settings(ui: &mut Ui, settings: &mut Settings) -> bool {
    let kernel = &mut settings.kernel;
    let mut changed = false;

    changed |= ui
        .add(Slider::new(&mut kernel.max_bounces, 1..=32).text("Bounces"))
        .changed();

    let mut use_sky = kernel.sky.is_some();
    if ui.checkbox(&mut use_sky, "Sky").changed() {
        kernel.sky = use_sky.then(|| Vector3::new(0.6, 0.7, 0.9));
        changed = true;
    }
    if let Some(sky) = kernel.sky.as_mut() {
        changed |= color_edit(ui, sky);
    }

    ui.horizontal(|ui| {
        changed |= ui.radio_value(&mut kernel.scatter, Scatter::Diffuse, "Diffuse").changed();
        changed |= ui.radio_value(&mut kernel.scatter, Scatter::Reflect, "Reflect").changed();
    });

    changed
}

fn scene_editor(ui: &mut Ui, scene: &mut Scene) -> bool {
    let mut changed = false;
    let material_count = scene.materials.len();

    for (index, sphere) in scene.spheres.iter_mut().enumerate() {
        ui.push_id(("sphere", index), |ui| {
            ui.label(format!("Sphere {index}"));
            changed |= vector_edit(ui, &mut sphere.center, 0.1);
            changed |= ui
                .add(DragValue::new(&mut sphere.radius).speed(0.1).clamp_range(0.01..=1000.0).prefix("Radius: "))
                .changed();
            changed |= ui
                .add(
                    DragValue::new(&mut sphere.material_index)
                        .speed(1.0)
                        .clamp_range(0..=material_count.saturating_sub(1))
                        .prefix("Material: "),
                )
                .changed();
            ui.separator();
        });
    }

    for (index, material) in scene.materials.iter_mut().enumerate() {
        ui.push_id(("material", index), |ui| {
            ui.label(format!("Material {index}"));
            ui.horizontal(|ui| {
                ui.label("Albedo");
                changed |= color_edit(ui, &mut material.albedo);
            });
            changed |= ui.add(Slider::new(&mut material.roughness, 0.0..=1.0).text("Roughness")).changed();
            changed |= ui.add(Slider::new(&mut material.metallic, 0.0..=1.0).text("Metallic")).changed();
            ui.horizontal(|ui| {
                ui.label("Emission");
                changed |= color_edit(ui, &mut material.emission_color);
            });
            changed |= ui
                .add(
                    DragValue::new(&mut material.emission_intensity)
                        .speed(0.05)
                        .clamp_range(0.0..=f32::MAX)
                        .prefix("Intensity: "),
                )
                .changed();
            ui.separator();
        });
    }

    ui.horizontal(|ui| {
        if ui.button("Add sphere").clicked() {
            scene.add_sphere(Sphere::default());
            changed = true;
        }
        if ui.button("Add material").clicked() {
            scene.add_material(Material::default());
            changed = true;
        }
    });

    changed
}

fn vector_edit(ui: &mut Ui, vector: &mut Vector3<f32>, speed: f64) -> bool {
    ui.horizontal(|ui| {
        let mut changed = false;
        for component in vector.iter_mut() {
            changed |= ui.add(DragValue::new(component).speed(speed)).changed();
        }
        changed
    })
    .inner
}

fn color_edit(ui: &mut Ui, color: &mut Vector3<f32>) -> bool {
    let mut rgb = [color.x, color.y, color.z];
    let changed = ui.color_edit_button_rgb(&mut rgb).changed();
    if changed {
        *color = Vector3::from(rgb);
    }
    changed
}
