use std::borrow::Cow;
use std::collections::HashMap;

use log::debug;
use uuid::Uuid;
use wgpu::util::DeviceExt;

use crate::camera::PerspectiveCamera;
use crate::gpu_texture::{map_bind_group_layout, GpuMapTexture};
use crate::scene::{Mesh, Scene, Surface};
use crate::utils::{GlobalsUniform, ObjectUniform, Vertex};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Hex colors are authored in sRGB; the shader works in linear space.
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_rgb(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(srgb_to_linear)
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
}

/// Draws a [`Scene`] with one lit, optionally textured pipeline.
///
/// Independent of any window: the target view is handed to [`draw`], so the
/// same renderer serves the viewer and offscreen snapshots.
///
/// [`draw`]: SceneRenderer::draw
pub struct SceneRenderer {
    pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    map_layout: wgpu::BindGroupLayout,
    depth_view: wgpu::TextureView,
    meshes: HashMap<Uuid, GpuMesh>,
    map: Option<GpuMapTexture>,
    blank_map: GpuMapTexture,
}

impl SceneRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<GlobalsUniform>() as _,
                    ),
                },
                count: None,
            }],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ObjectUniform>() as _,
                    ),
                },
                count: None,
            }],
        });
        let map_layout = map_bind_group_layout(device);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("../shaders/mesh.wgsl"))),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &object_layout, &map_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // the tumbler is open at the top; both faces are visible
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals-buffer"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
            label: Some("globals_bind_group"),
        });

        let blank_map = GpuMapTexture::placeholder(device, queue, &map_layout);

        Self {
            pipeline,
            globals_buffer,
            globals_bind_group,
            object_layout,
            depth_view: create_depth_view(device, width, height),
            map_layout,
            meshes: HashMap::new(),
            map: None,
            blank_map,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = create_depth_view(device, width, height);
    }

    /// Number of meshes with GPU buffers.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Id of the text texture currently on the GPU.
    pub fn uploaded_map(&self) -> Option<Uuid> {
        self.map.as_ref().and_then(GpuMapTexture::source_id)
    }

    /// Brings GPU state in line with the scene: mesh buffers, the text map
    /// and every uniform. Clears the update flags it consumes.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &mut Scene,
        camera: &PerspectiveCamera,
    ) {
        self.sync_meshes(device, scene);
        self.sync_map(device, queue, scene);

        let light = |rgb: [f32; 3], intensity: f32| {
            let [r, g, b] = linear_rgb(rgb);
            [r * intensity, g * intensity, b * intensity, 1.0]
        };
        let globals = GlobalsUniform {
            view_proj: camera.view_proj().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            light_direction: scene.sun.direction().extend(0.0).to_array(),
            light_color: light(scene.sun.color, scene.sun.intensity),
            ambient_color: light(scene.ambient.color, scene.ambient.intensity),
        };
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let has_map = self.map.is_some();
        for mesh in scene.meshes() {
            let Some(gpu) = self.meshes.get(&mesh.id()) else {
                continue;
            };
            let uniform = object_uniform(mesh, scene, has_map);
            queue.write_buffer(&gpu.object_buffer, 0, bytemuck::bytes_of(&uniform));
        }
    }

    fn sync_meshes(&mut self, device: &wgpu::Device, scene: &Scene) {
        let before = self.meshes.len();
        self.meshes
            .retain(|id, _| scene.meshes().iter().any(|m| m.id() == *id));
        for mesh in scene.meshes() {
            if self.meshes.contains_key(&mesh.id()) || mesh.buffers.is_empty() {
                continue;
            }
            let gpu = self.create_mesh(device, mesh);
            self.meshes.insert(mesh.id(), gpu);
        }
        if self.meshes.len() != before {
            debug!("renderer now holds {} mesh(es)", self.meshes.len());
        }
    }

    fn create_mesh(&self, device: &wgpu::Device, mesh: &Mesh) -> GpuMesh {
        let vertices = mesh.buffers.vertices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh-vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh-indices"),
            contents: bytemuck::cast_slice(&mesh.buffers.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let object_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object-buffer"),
            size: std::mem::size_of::<ObjectUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: object_buffer.as_entire_binding(),
            }],
            label: Some("object_bind_group"),
        });
        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.buffers.indices.len() as u32,
            object_buffer,
            object_bind_group,
        }
    }

    fn sync_map(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &mut Scene) {
        let Some(material) = scene.text_material_mut() else {
            if let Some(old) = self.map.take() {
                old.destroy();
            }
            return;
        };

        match material.map_mut() {
            Some(texture) => {
                let current = self.map.as_ref().and_then(GpuMapTexture::source_id);
                if texture.needs_update || current != Some(texture.id()) {
                    let uploaded = GpuMapTexture::upload(device, queue, &self.map_layout, texture);
                    if let Some(old) = self.map.replace(uploaded) {
                        old.destroy();
                    }
                    texture.needs_update = false;
                    debug!("uploaded text map {}", texture.id());
                }
            }
            None => {
                if let Some(old) = self.map.take() {
                    old.destroy();
                }
            }
        }
        material.needs_update = false;
    }

    /// Records the scene into `encoder`, clearing `target` to the background.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, scene: &Scene) {
        let [r, g, b] = linear_rgb(scene.background);
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.globals_bind_group, &[]);
        for mesh in scene.meshes() {
            let Some(gpu) = self.meshes.get(&mesh.id()) else {
                continue;
            };
            let map = match (mesh.surface, &self.map) {
                (Surface::TextMaterial, Some(map)) => map,
                _ => &self.blank_map,
            };
            rpass.set_bind_group(1, &gpu.object_bind_group, &[]);
            rpass.set_bind_group(2, map.bind_group(), &[]);
            rpass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            rpass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..gpu.index_count, 0, 0..1);
        }
    }
}

fn object_uniform(mesh: &Mesh, scene: &Scene, has_map: bool) -> ObjectUniform {
    let (base_color, metalness, roughness, map_weight, map_alpha) = match mesh.surface {
        Surface::TextMaterial => match scene.text_material() {
            Some(material) => {
                let [r, g, b] = linear_rgb(material.color);
                let weight = if has_map && material.map().is_some() { 1.0 } else { 0.0 };
                let alpha = if material.transparent { 1.0 } else { 0.0 };
                ([r, g, b, 1.0], material.metalness, material.roughness, weight, alpha)
            }
            None => ([1.0; 4], 0.0, 1.0, 0.0, 0.0),
        },
        // glTF factors are already linear
        Surface::Base {
            color,
            metalness,
            roughness,
        } => (color, metalness, roughness, 0.0, 0.0),
    };
    let normal_matrix = mesh.transform.inverse().transpose();
    ObjectUniform {
        model: mesh.transform.to_cols_array_2d(),
        normal_matrix: normal_matrix.to_cols_array_2d(),
        base_color,
        params: [metalness, roughness, map_weight, map_alpha],
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth-texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Window surface plus the device that draws into it.
#[cfg(feature = "viewer")]
pub struct SurfaceRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    scene_renderer: SceneRenderer,
}

#[cfg(feature = "viewer")]
impl SurfaceRenderer {
    pub fn new(
        window: std::sync::Arc<winit::window::Window>,
    ) -> Result<Self, crate::error::PreviewError> {
        use crate::error::PreviewError;
        use pollster::block_on;

        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| PreviewError::Gpu(e.to_string()))?;

        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        }))
        .ok_or_else(|| PreviewError::Gpu("no suitable adapter".to_string()))?;

        let (device, queue) = block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| PreviewError::Gpu(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| PreviewError::Gpu("surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![format],
        };
        surface.configure(&device, &config);
        log::info!("Surface configured as {:?} at {}x{}", format, config.width, config.height);

        let scene_renderer = SceneRenderer::new(&device, &queue, format, config.width, config.height);
        Ok(Self {
            surface,
            device,
            queue,
            config,
            scene_renderer,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.scene_renderer.resize(&self.device, width, height);
    }

    /// Reconfigures with the current size, after a lost or outdated surface.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn render(
        &mut self,
        scene: &mut Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.scene_renderer
            .prepare(&self.device, &self.queue, scene, camera);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.scene_renderer.draw(&mut encoder, &view, scene);
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreviewConfig;
    use crate::material::refresh;
    use crate::raster::RasterImage;
    use crate::texture::TextureLedger;

    fn fallback_scene() -> Scene {
        let config = PreviewConfig::default();
        let mut scene = Scene::new(&config.scene);
        scene.install_model(None, &config.material, &config.model, &config.fallback);
        scene
    }

    #[test]
    fn map_alpha_follows_material_transparency() {
        let mut scene = fallback_scene();
        let uniform = object_uniform(&scene.meshes()[0], &scene, true);
        assert_eq!(uniform.params[2], 0.0, "no map installed yet");

        let ledger = TextureLedger::new();
        let blank = tiny_skia::Pixmap::new(4, 4).expect("pixmap");
        refresh(RasterImage::from_pixmap(blank), scene.text_material_mut(), &ledger);
        let uniform = object_uniform(&scene.meshes()[0], &scene, true);
        assert_eq!(uniform.params[2], 1.0);
        assert_eq!(uniform.params[3], 1.0);

        if let Some(material) = scene.text_material_mut() {
            material.transparent = false;
        }
        let uniform = object_uniform(&scene.meshes()[0], &scene, true);
        assert_eq!(uniform.params[3], 0.0);
    }
}
