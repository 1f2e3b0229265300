use anyhow::{anyhow, Context};
use image::ImageReader;
use std::fs;
use std::path::{Path, PathBuf};
use tumbler_preview::assets::StaticFetcher;
use tumbler_preview::font::FontResolver;
use tumbler_preview::renderer::SceneRenderer;
use tumbler_preview::text_canvas::{TextCanvas, TextTextureGenerator};
use tumbler_preview::{PreviewConfig, PreviewContext};

const SCENE_SIZE: u32 = 512;
const TOLERANCE: u8 = 3;

const TEXT_SAMPLES: &[(&str, &str)] = &[
    ("text_hello", "Hello"),
    ("text_two_words", "Happy Birthday"),
    (
        "text_wrapped",
        "The quick brown fox jumps over the lazy dog near the riverbank",
    ),
    ("text_empty", ""),
];

fn build_device() -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        force_fallback_adapter: false,
        compatible_surface: None,
    }))
    .ok_or_else(|| anyhow!("no adapter"))?;
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            memory_hints: Default::default(),
        },
        None,
    ))?;
    Ok((device, queue))
}

fn compare_with_tolerance(a_path: &Path, b_path: &Path, tolerance: u8) -> anyhow::Result<bool> {
    let a = ImageReader::open(a_path)?.decode()?.to_rgba8();
    let b = ImageReader::open(b_path)?.decode()?.to_rgba8();

    if a.dimensions() != b.dimensions() {
        return Ok(false);
    }
    Ok(a.pixels().zip(b.pixels()).all(|(pa, pb)| {
        let da = pa.0;
        let db = pb.0;
        (0..4).all(|i| da[i].abs_diff(db[i]) <= tolerance)
    }))
}

/// Promotes `actual` to golden on first run, compares afterwards.
fn check_golden(name: &str) -> anyhow::Result<bool> {
    let actual = actual_path(name);
    let golden = PathBuf::from(format!("snapshots/golden/{name}.png"));
    if !golden.exists() {
        fs::copy(&actual, &golden)?;
        println!("golden created at {}", golden.display());
        return Ok(true);
    }
    let ok = compare_with_tolerance(&actual, &golden, TOLERANCE)?;
    if ok {
        println!("snapshot OK for {name}.png");
    } else {
        println!("snapshot mismatch for {name}.png");
    }
    Ok(ok)
}

fn actual_path(name: &str) -> PathBuf {
    PathBuf::from(format!("snapshots/actual/{name}.png"))
}

fn snapshot_text_textures() -> anyhow::Result<bool> {
    let config = PreviewConfig::default();
    let canvas = TextCanvas::new(config.canvas.clone())?;
    let mut generator = TextTextureGenerator::new(canvas, FontResolver::builtin_only());

    let mut all_ok = true;
    for (name, text) in TEXT_SAMPLES {
        let raster = generator.generate(text, "Arial, sans-serif");
        raster.save_png(actual_path(name))?;
        all_ok &= check_golden(name)?;
    }
    Ok(all_ok)
}

fn save_texture_png(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    tex: &wgpu::Texture,
    path: &Path,
) -> anyhow::Result<()> {
    let size = tex.size();
    let bytes_per_row = ((size.width * 4 + 255) / 256) * 256; // align to 256
    let output = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("snapshot-output"),
        size: (bytes_per_row as u64) * (size.height as u64),
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("snapshot-encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: tex,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &output,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(size.height),
            },
        },
        size,
    );
    queue.submit(Some(encoder.finish()));
    let slice = output.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |r| {
        tx.send(r).ok();
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv()??;
    let view = slice.get_mapped_range();
    let mut rgba = Vec::with_capacity((size.width * size.height * 4) as usize);
    for row in view.chunks(bytes_per_row as usize) {
        rgba.extend_from_slice(&row[..(size.width * 4) as usize]);
    }
    drop(view);
    output.unmap();
    let img = image::RgbaImage::from_raw(size.width, size.height, rgba)
        .ok_or_else(|| anyhow!("readback size mismatch"))?;
    img.save(path)?;
    Ok(())
}

/// The fallback tumbler with "Hello" on it, rendered offscreen.
fn snapshot_scene() -> anyhow::Result<bool> {
    let (device, queue) = build_device()?;

    let mut context = PreviewContext::with_fonts(PreviewConfig::default(), FontResolver::builtin_only())?;
    // nothing registered: both loads fail and the fallback cylinder is used
    context.load_all(&StaticFetcher::new());
    context.set_text("Hello");
    context.resize(SCENE_SIZE, SCENE_SIZE);
    context.update(0.0);

    let format = wgpu::TextureFormat::Rgba8UnormSrgb;
    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scene-target"),
        size: wgpu::Extent3d {
            width: SCENE_SIZE,
            height: SCENE_SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[format],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let mut renderer = SceneRenderer::new(&device, &queue, format, SCENE_SIZE, SCENE_SIZE);
    let camera = context.camera().clone();
    renderer.prepare(&device, &queue, context.scene_mut(), &camera);
    let expected_map = context.scene().text_material().and_then(|m| m.map()).map(|t| t.id());
    if renderer.uploaded_map() != expected_map || renderer.mesh_count() != context.scene().meshes().len() {
        return Err(anyhow!("renderer state does not match the scene"));
    }

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("scene-encoder"),
    });
    renderer.draw(&mut encoder, &view, context.scene());
    queue.submit(Some(encoder.finish()));

    save_texture_png(&device, &queue, &target, &actual_path("scene_fallback_hello"))?;
    check_golden("scene_fallback_hello")
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    fs::create_dir_all("snapshots/actual").context("creating snapshots/actual")?;
    fs::create_dir_all("snapshots/golden").context("creating snapshots/golden")?;

    let mut ok = snapshot_text_textures()?;
    match snapshot_scene() {
        Ok(scene_ok) => ok &= scene_ok,
        // headless machines without a GPU still get the texture snapshots
        Err(e) => println!("scene snapshot skipped: {e}"),
    }

    if !ok {
        return Err(anyhow!("one or more snapshots differ from golden"));
    }
    Ok(())
}
