use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, ModifiersState, NamedKey},
    window::{Window, WindowId},
};

use crate::assets::DefaultFetcher;
use crate::config::PreviewConfig;
use crate::preview::PreviewContext;
use crate::renderer::SurfaceRenderer;
use crate::utils::Position;

/// Pixels of trackpad scroll that count as one wheel step.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

pub struct PreviewApp {
    context: PreviewContext,
    fetcher: DefaultFetcher,
    renderer: Option<SurfaceRenderer>,
    window: Option<Arc<Window>>,
    last_frame: Instant,
    cursor: Option<Position>,
    dragging: bool,
    modifiers: ModifiersState,
}

impl PreviewApp {
    pub fn new(context: PreviewContext) -> Self {
        let assets = &context.config().assets;
        let fetcher = DefaultFetcher::new(
            assets.max_download_bytes,
            Duration::from_secs(assets.download_timeout_secs),
        );
        Self {
            context,
            fetcher,
            renderer: None,
            window: None,
            last_frame: Instant::now(),
            cursor: None,
            dragging: false,
            modifiers: ModifiersState::empty(),
        }
    }

    pub fn context(&self) -> &PreviewContext {
        &self.context
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref().map(|w| w.as_ref())
    }

    fn window_title(&self) -> String {
        format!(
            "{} - {}",
            self.context.config().window.title,
            self.context.current_font().label
        )
    }

    fn update_title(&self) {
        if let Some(window) = &self.window {
            window.set_title(&self.window_title());
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        match event.logical_key {
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Named(NamedKey::Backspace) => {
                if self.modifiers.control_key() {
                    self.context.clear_text();
                } else {
                    self.context.backspace();
                }
            }
            Key::Named(NamedKey::Tab) => {
                let step = if self.modifiers.shift_key() { -1 } else { 1 };
                self.context.cycle_font(step);
                self.update_title();
            }
            _ => {
                let Some(text) = event.text else {
                    return;
                };
                let typed: String = text.chars().filter(|c| !c.is_control()).collect();
                if !typed.is_empty() {
                    self.context.insert_text(&typed);
                }
            }
        }
    }

    fn handle_cursor(&mut self, position: Position) {
        if self.dragging {
            if let (Some(last), Some(window)) = (self.cursor, &self.window) {
                let delta = position - last;
                let height = window.inner_size().height as f32;
                self.context
                    .controls_mut()
                    .drag(delta.x, delta.y, height);
            }
        }
        self.cursor = Some(position);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.context.poll_assets(&self.fetcher);
        self.context.update(dt);

        let Some(renderer) = &mut self.renderer else {
            return;
        };
        let camera = self.context.camera().clone();
        match renderer.render(self.context.scene_mut(), &camera) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => renderer.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(e) => warn!("Dropped frame: {}", e),
        }
    }
}

impl ApplicationHandler<()> for PreviewApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let settings = &self.context.config().window;
        let window_attributes = Window::default_attributes()
            .with_title(self.window_title())
            .with_inner_size(PhysicalSize::new(settings.width, settings.height));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        match SurfaceRenderer::new(window.clone()) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                error!("{}", e);
                event_loop.exit();
                return;
            }
        }

        let size = window.inner_size();
        self.context.resize(size.width, size.height);
        info!("Preview window opened at {}x{}", size.width, size.height);
        window.request_redraw();
        self.window = Some(window);
        self.last_frame = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(new_size.width, new_size.height);
                }
                self.context.resize(new_size.width, new_size.height);
            }
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, event),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.dragging = state.is_pressed(),
            WindowEvent::CursorMoved { position, .. } => self.handle_cursor(Position {
                x: position.x as f32,
                y: position.y as f32,
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_STEP,
                };
                self.context.controls_mut().zoom(steps);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => (),
        }
    }
}

/// Opens the preview window and runs until it closes.
pub fn run_app(config: PreviewConfig) -> anyhow::Result<()> {
    let context = PreviewContext::new(config)?;
    let event_loop = EventLoop::new()?;
    let mut app = PreviewApp::new(context);

    event_loop.run_app(&mut app)?;
    Ok(())
}
