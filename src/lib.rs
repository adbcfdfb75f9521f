use anyhow::Context;
use env_logger::Env;
use log::{error, info, warn};
use wgpu::SurfaceError;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::app::Application;

pub mod app;
pub mod camera;
pub mod error;
pub mod input;
pub mod tracer;
pub mod util;

pub use crate::camera::{Camera, CameraConfig};
pub use crate::error::{Error, Result};
pub use crate::tracer::scene::{Material, Scene, Sphere};
pub use crate::tracer::{ImageSink, Renderer, Settings};

pub fn run() -> anyhow::Result<()> {
    // RUST_LOG가 없으면 info 이상만 출력
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Radiance: Path Tracer")
        .build(&event_loop)
        .context("failed to create the window")?;

    let mut app = pollster::block_on(Application::new(window, &event_loop))?;
    info!("started with {} worker threads", rayon::current_num_threads());

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == app.window.id() => match event {
            // 만약 앱을 운영체제에서 닫으려고 하거나
            WindowEvent::CloseRequested |
            // ESC가 새로 눌렸다면
            WindowEvent::KeyboardInput {
                input: KeyboardInput {
                    state: ElementState::Pressed,
                    virtual_keycode: Some(VirtualKeyCode::Escape),
                    ..
                },
                ..
            } => *control_flow = ControlFlow::ExitWithCode(0), // 나가기

            WindowEvent::Resized(physical_size) => {
                app.input(event);
                app.resize(*physical_size);
            }
            WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                let new_size = **new_inner_size;
                app.input(event);
                app.resize(new_size);
            }
            _ => {
                app.input(event);
            }
        },
        Event::DeviceEvent { ref event, .. } => app.device_input(event),
        Event::RedrawRequested(window_id) if window_id == app.window.id() => {
            app.update();
            match app.render() {
                Ok(_) => {}
                // surface를 잃어버렸다면 다시 설정
                Err(SurfaceError::Lost) => app.resize(app.size),
                Err(SurfaceError::OutOfMemory) => {
                    error!("GPU ran out of memory");
                    *control_flow = ControlFlow::ExitWithCode(1);
                }
                Err(e) => warn!("{e:?}"),
            }
        }
        // 계속 다시 그리기
        Event::MainEventsCleared => app.window.request_redraw(),
        _ => {}
    });
}
