use crate::texture::{TextTexture, WrapMode};
use uuid::Uuid;

pub fn address_mode(mode: WrapMode) -> wgpu::AddressMode {
    match mode {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    }
}

/// Layout for group 2: the map texture and its sampler.
pub fn map_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("map_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// GPU copy of a [`TextTexture`].
#[derive(Debug)]
pub struct GpuMapTexture {
    source_id: Option<Uuid>,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl GpuMapTexture {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        source: &TextTexture,
    ) -> Self {
        let rgba = source.image().to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(
            device,
            queue,
            layout,
            Some(source.id()),
            rgba.as_raw(),
            (width, height),
            (source.wrap_s, source.wrap_t),
        )
    }

    /// 1×1 transparent texture bound for meshes without a map.
    pub fn placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self::from_rgba(
            device,
            queue,
            layout,
            None,
            &[0, 0, 0, 0],
            (1, 1),
            (WrapMode::ClampToEdge, WrapMode::ClampToEdge),
        )
    }

    fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        source_id: Option<Uuid>,
        rgba: &[u8],
        (width, height): (u32, u32),
        (wrap_s, wrap_t): (WrapMode, WrapMode),
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Text Map Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[wgpu::TextureFormat::Rgba8UnormSrgb],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Text Map Sampler"),
            address_mode_u: address_mode(wrap_s),
            address_mode_v: address_mode(wrap_t),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some("map_bind_group"),
        });

        Self {
            source_id,
            texture,
            bind_group,
        }
    }

    pub fn source_id(&self) -> Option<Uuid> {
        self.source_id
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Frees the GPU memory right away instead of waiting for the drop.
    pub fn destroy(self) {
        self.texture.destroy();
    }
}
