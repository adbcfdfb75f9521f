use std::sync::Arc;

use log::debug;
use wgpu::{
    Device, Extent3d, ImageCopyTexture, ImageDataLayout, Origin3d, Queue, Texture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;

use crate::tracer::ImageSink;

// 전역 Application 대신 device와 queue 핸들을 직접 들고 있음
pub struct GpuImage {
    device: Arc<Device>,
    queue: Arc<Queue>,
    gpu_texture: Texture,
    view: TextureView,
    name: String,
    generation: u64,
}

impl GpuImage {
    pub fn new(device: Arc<Device>, queue: Arc<Queue>, width: u32, height: u32, label: &str) -> Self {
        let (gpu_texture, view) = Self::allocate(&device, width, height, label);

        Self {
            device,
            queue,
            gpu_texture,
            view,
            name: label.to_string(),
            generation: 0,
        }
    }

    fn allocate(device: &Device, width: u32, height: u32, label: &str) -> (Texture, TextureView) {
        // 크기가 0인 텍스쳐는 만들 수 없음
        let width = width.max(1);
        let height = height.max(1);

        let gpu_texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1, // 이미지의 레이어 갯수. 단순한 2차원 이미지니 1개로
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,

            // Texture Binding: 쉐이더(egui)에서 쓸 예정
            // Copy destination: CPU에서 GPU로 데이터가 복사될 예정
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = gpu_texture.create_view(&TextureViewDescriptor {
            label: Some(&format!("{} view", label)),
            ..Default::default() // label 뺴고 나머진 기본값 그대로
        });

        (gpu_texture, view)
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    // 텍스쳐를 새로 만들 때마다 올라감. egui에 다시 등록해야 하는지 확인용.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.gpu_texture.width(), self.gpu_texture.height())
    }
}

impl ImageSink for GpuImage {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if self.gpu_texture.width() == width && self.gpu_texture.height() == height {
            return;
        }

        let (gpu_texture, view) = Self::allocate(&self.device, width, height, &self.name);
        self.gpu_texture = gpu_texture;
        self.view = view;
        self.generation += 1;
        debug!("{} reallocated at {width}x{height}", self.name);
    }

    fn submit(&mut self, rgba: &[u8]) {
        let pixel_count = {
            let size = self.gpu_texture.size();
            size.width * size.height
        } as usize;
        assert_eq!(pixel_count, rgba.len() / 4, "frame does not match {} size", self.name);

        self.queue.write_texture(
            ImageCopyTexture {
                texture: &self.gpu_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            rgba,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.gpu_texture.width()),
                rows_per_image: Some(self.gpu_texture.height()),
            },
            self.gpu_texture.size(),
        )
    }
}
