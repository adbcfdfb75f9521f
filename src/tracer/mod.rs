use bytemuck::cast_slice;
use log::{debug, trace};
use nalgebra::Vector4;
use rayon::prelude::*;
use winit::dpi::PhysicalSize;

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::tracer::buffer::PixelBuffer;
use crate::tracer::kernel::{Kernel, KernelConfig};
use crate::tracer::ray::Ray;
use crate::tracer::rng::XorShift128Plus;
use crate::tracer::scene::Scene;
use crate::util::to_rgba;

pub mod buffer;
pub mod kernel;
pub mod ray;
pub mod rng;
pub mod scene;
pub mod texture;

/// 완성된 RGBA8 프레임을 받아가는 곳. 보통은 GPU 텍스쳐.
pub trait ImageSink {
    fn resize(&mut self, width: u32, height: u32);
    /// `rgba`는 언제나 `width * height * 4` 바이트, 행 우선 순서.
    fn submit(&mut self, rgba: &[u8]);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub accumulate: bool,
    pub kernel: KernelConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accumulate: true,
            kernel: KernelConfig::default(),
        }
    }
}

pub struct Renderer<S: ImageSink> {
    sink: S,
    image: PixelBuffer<[u8; 4]>,
    accumulation: PixelBuffer<Vector4<f32>>,
    frame_index: u32,
    pub settings: Settings,
}

impl<S: ImageSink> Renderer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            image: PixelBuffer::new(0, 0, [0; 4]),
            accumulation: PixelBuffer::new(0, 0, Vector4::zeros()),
            frame_index: 1,
            settings: Default::default(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.image.width() == width && self.image.height() == height {
            return false;
        }

        debug!("renderer {}x{} -> {width}x{height}", self.image.width(), self.image.height());

        // 제자리에서 늘리지 않고 통째로 새로 할당
        self.image = PixelBuffer::new(width, height, [0; 4]);
        self.accumulation = PixelBuffer::new(width, height, Vector4::zeros());
        self.sink.resize(width, height);
        self.frame_index = 1;
        true
    }

    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        let width = self.image.width() as usize;
        let height = self.image.height() as usize;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let rays = camera.ray_directions();
        if rays.len() != width * height {
            return Err(Error::RayTableMismatch {
                expected: width * height,
                actual: rays.len(),
            });
        }

        if self.frame_index == 1 {
            self.accumulation.fill(Vector4::zeros());
        }

        let frame_index = self.frame_index;
        let divisor = frame_index as f32;
        let origin = camera.position();
        let kernel = Kernel::new(scene, &self.settings.kernel);

        // 행 블록 하나를 스레드 하나가 맡음. 블록끼리는 겹치는 메모리가 없음.
        let rows_per_block = rows_per_block(height, rayon::current_num_threads());
        let block_len = rows_per_block * width;

        self.accumulation
            .as_mut_slice()
            .par_chunks_mut(block_len)
            .zip(self.image.as_mut_slice().par_chunks_mut(block_len))
            .zip(rays.par_chunks(block_len))
            .enumerate()
            .for_each(|(block, ((accumulated, pixels), directions))| {
                let rows = accumulated
                    .chunks_mut(width)
                    .zip(pixels.chunks_mut(width))
                    .zip(directions.chunks(width));

                for (offset, ((accumulated, pixels), directions)) in rows.enumerate() {
                    let mut rng = XorShift128Plus::for_pixel_row(block * rows_per_block + offset, frame_index);

                    for ((sum, pixel), direction) in accumulated.iter_mut().zip(pixels).zip(directions) {
                        *sum += kernel.per_pixel(Ray::new(origin, *direction), &mut rng);
                        *pixel = to_rgba(&(*sum / divisor));
                    }
                }
            });

        // 모든 블록이 끝난 뒤에만 내보냄
        self.sink.submit(cast_slice(self.image.as_slice()));
        trace!("frame {frame_index} submitted ({width}x{height})");

        if self.settings.accumulate {
            self.frame_index += 1;
        } else {
            self.frame_index = 1;
        }

        Ok(())
    }

    pub fn reset_frame_index(&mut self) {
        self.frame_index = 1;
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.image.size()
    }

    pub fn image(&self) -> &PixelBuffer<[u8; 4]> {
        &self.image
    }

    pub fn accumulation(&self) -> &PixelBuffer<Vector4<f32>> {
        &self.accumulation
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

fn rows_per_block(height: usize, threads: usize) -> usize {
    (height / (2 * threads.max(1))).max(1)
}
