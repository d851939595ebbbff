use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use isoview::assets::DirImageSource;
use isoview::config::{ViewConfig, load_view_config};
use isoview::coords::{ScreenPoint, TileCoord};
use isoview::input::{MouseButton, ViewEvent};
use isoview::keybindings::{ModifierFlags, ViewAction};
use isoview::paint::Color;
use isoview::sprite::{SpriteRenderer, SpriteTexture};
use isoview::tile_map::{TileFlags, TileMap, WorldGrid};
use isoview::tile_types::{TileGroup, TileType};
use isoview::view::{EditAction, MapEditor, MapView, MiniMap, MiniMapMode, PointerControl, ViewHost};

/// Convert sRGB component (0-1) to linear for use as wgpu clear color.
fn srgb_to_linear(s: f64) -> f64 {
    if s <= 0.04045 {
        s / 12.92
    } else {
        ((s + 0.055) / 1.055).powf(2.4)
    }
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
}

impl GpuState {
    fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("create surface");

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("failed to find a suitable GPU adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("isoview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .expect("failed to create GPU device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Self {
            surface,
            device,
            queue,
            config,
            window,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn render(&self, sprites: &SpriteRenderer, vertex_count: u32, clear: Color) {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory");
                return;
            }
            Err(e) => {
                log::warn!("surface error: {e:?}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("map_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: srgb_to_linear(clear[0] as f64),
                            g: srgb_to_linear(clear[1] as f64),
                            b: srgb_to_linear(clear[2] as f64),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            sprites.render(&mut render_pass, vertex_count);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

#[derive(Debug, Clone, Copy)]
enum UserEvent {
    /// The tile loader finished; redraw with every image.
    AssetsLoaded,
}

/// The demo application's side of the view: a generated map, a tool
/// selection and the window's pointer.
struct DemoHost {
    world: TileMap,
    tool: Option<TileType>,
    window: Option<Arc<Window>>,
}

impl MapEditor for DemoHost {
    fn edit_tile(&mut self, tile: TileCoord, action: EditAction) {
        match (action, self.tool) {
            (EditAction::Drag, _) | (EditAction::Click, Some(TileType::ROAD)) => {
                if self.world.get_type(tile) == Some(TileType::GREEN) {
                    self.world.set_tile(tile, TileType::ROAD);
                }
            }
            (EditAction::Click, Some(kind)) => {
                if !self.world.place_building(tile, kind, kind.default_size()) {
                    log::info!("cannot place {:?} at ({}, {})", kind, tile.x, tile.y);
                }
            }
            (EditAction::Click, None) => self.world.clear(tile),
        }
    }

    fn inspect_tile(&mut self, tile: TileCoord) {
        let kind = self.world.tile_type(tile);
        let name = kind.info().map(|i| i.name).unwrap_or("?");
        log::info!(
            "({}, {}): {} origin={:?} flags={:?}",
            tile.x,
            tile.y,
            name,
            self.world.building_origin(tile),
            self.world.flags(tile)
        );
    }

    fn blocking_dialog_open(&self) -> bool {
        false
    }

    fn selected_tool(&self) -> Option<TileType> {
        self.tool
    }
}

impl MiniMap for DemoHost {
    fn set_view_corners(&mut self, corners: [TileCoord; 4]) {
        log::trace!("visible corners {corners:?}");
    }

    fn tile_color(&self, tile: TileCoord, mode: MiniMapMode) -> Color {
        let group = self.world.group(tile);
        match mode {
            MiniMapMode::Power => {
                if self.world.flags(tile).contains(TileFlags::POWERED) {
                    [1.0, 1.0, 0.0, 1.0]
                } else {
                    [0.2, 0.2, 0.2, 1.0]
                }
            }
            MiniMapMode::Traffic => match group {
                TileGroup::Road | TileGroup::Track | TileGroup::Rail => [1.0, 0.5, 0.0, 1.0],
                _ => [0.1, 0.1, 0.1, 1.0],
            },
            MiniMapMode::Normal | MiniMapMode::Pollution => group_color(group),
        }
    }
}

fn group_color(group: TileGroup) -> Color {
    match group {
        TileGroup::Blank | TileGroup::Used => [0.0, 0.0, 0.0, 1.0],
        TileGroup::Bare | TileGroup::Park => [0.1, 0.6, 0.1, 1.0],
        TileGroup::Water => [0.1, 0.2, 0.8, 1.0],
        TileGroup::Road | TileGroup::Track | TileGroup::Rail => [0.5, 0.5, 0.5, 1.0],
        TileGroup::Residence => [0.9, 0.5, 0.3, 1.0],
        TileGroup::Market | TileGroup::Civic | TileGroup::Monument => [0.8, 0.8, 0.2, 1.0],
        TileGroup::Industry | TileGroup::Mine | TileGroup::Port => [0.5, 0.3, 0.2, 1.0],
        TileGroup::Farm => [0.6, 0.8, 0.3, 1.0],
        TileGroup::PowerLine | TileGroup::PowerSource | TileGroup::Substation => [0.9, 0.9, 0.0, 1.0],
        TileGroup::Fire | TileGroup::Burnt => [0.8, 0.1, 0.0, 1.0],
    }
}

impl PointerControl for DemoHost {
    fn set_cursor_visible(&mut self, visible: bool) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(visible);
        }
    }

    fn set_pointer_grab(&mut self, grab: bool) {
        let Some(window) = &self.window else {
            return;
        };
        let result = if grab {
            window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = result {
            log::warn!("pointer grab: {e}");
        }
    }

    fn warp_pointer(&mut self, pos: ScreenPoint) {
        if let Some(window) = &self.window
            && let Err(e) = window.set_cursor_position(winit::dpi::PhysicalPosition::new(pos.x, pos.y))
        {
            log::debug!("pointer warp: {e}");
        }
    }
}

impl ViewHost for DemoHost {
    fn world(&self) -> &dyn WorldGrid {
        &self.world
    }
}

/// Demo tools on the digit keys, by catalog name. `None` bulldozes.
const TOOLS: [(KeyCode, Option<&str>); 5] = [
    (KeyCode::Digit1, None),
    (KeyCode::Digit2, Some("road_lr")),
    (KeyCode::Digit3, Some("residence_ml")),
    (KeyCode::Digit4, Some("market_empty")),
    (KeyCode::Digit5, Some("ex_port")),
];

struct App {
    gpu: Option<GpuState>,
    sprites: Option<SpriteRenderer>,
    view: Option<MapView<SpriteTexture>>,
    host: DemoHost,
    config: ViewConfig,
    proxy: EventLoopProxy<UserEvent>,
    cursor_pos: ScreenPoint,
    modifiers: ModifiersState,
}

impl App {
    fn modifier_flags(&self) -> ModifierFlags {
        ModifierFlags {
            shift: self.modifiers.shift_key(),
            ctrl: self.modifiers.control_key(),
            alt: self.modifiers.alt_key(),
        }
    }

    fn select_tool(&mut self, tool: Option<TileType>) {
        self.host.tool = tool;
        let size = match tool {
            None => 0,
            Some(kind) if kind == TileType::ROAD => 1,
            Some(kind) => kind.default_size(),
        };
        if let Some(view) = self.view.as_mut() {
            view.set_cursor_size(size);
        }
        log::info!("tool: {}", tool.and_then(|t| t.info()).map(|i| i.name).unwrap_or("bulldoze"));
    }

    fn forward(&mut self, event: ViewEvent) {
        if let Some(view) = self.view.as_mut() {
            view.handle_event(event, &mut self.host);
        }
    }

    fn redraw(&mut self) {
        let (Some(gpu), Some(sprites), Some(view)) = (self.gpu.as_ref(), self.sprites.as_mut(), self.view.as_mut())
        else {
            return;
        };
        sprites.begin_frame(&gpu.queue, gpu.config.width, gpu.config.height);
        {
            let mut frame = sprites.frame(&gpu.device, &gpu.queue);
            view.draw(&mut self.host, &mut frame);
        }
        let vertex_count = sprites.flush(&gpu.queue, &gpu.device);
        gpu.render(sprites, vertex_count, self.config.background);
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("isoview")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));

        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));
        let gpu = GpuState::new(window.clone());
        let sprites = SpriteRenderer::new(&gpu.device, &gpu.queue, gpu.surface_format());

        let size = window.inner_size();
        let proxy = self.proxy.clone();
        let source = DirImageSource::new(&self.config.asset_dir, self.config.manifest.clone());
        let view = MapView::new(
            self.config.clone(),
            self.host.world.side(),
            size.width as f32,
            size.height as f32,
            source,
            Box::new(move || {
                // The loop is gone during shutdown; nothing to redraw then.
                let _ = proxy.send_event(UserEvent::AssetsLoaded);
            }),
        );

        for action in [ViewAction::CycleOverlay, ViewAction::ToggleHideHigh, ViewAction::ZoomIn, ViewAction::ZoomOut] {
            if let Some(label) = view.bindings().label_for(action) {
                log::info!("{label}: {action:?}");
            }
        }

        self.host.window = Some(window);
        self.gpu = Some(gpu);
        self.sprites = Some(sprites);
        self.view = Some(view);
        self.select_tool(None);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::AssetsLoaded => {
                log::info!("tile images ready");
                if let Some(gpu) = &self.gpu {
                    gpu.window.request_redraw();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(view) = self.view.as_mut() {
                    view.shutdown(&mut self.host);
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size);
                }
                if let Some(view) = self.view.as_mut() {
                    view.resize(size.width as f32, size.height as f32);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_pos = ScreenPoint::new(position.x as f32, position.y as f32);
                self.forward(ViewEvent::Motion {
                    pos: self.cursor_pos,
                    at: Instant::now(),
                });
            }
            WindowEvent::CursorLeft { .. } => self.forward(ViewEvent::Left),
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    winit::event::MouseButton::Left => MouseButton::Left,
                    winit::event::MouseButton::Right => MouseButton::Right,
                    winit::event::MouseButton::Middle => MouseButton::Middle,
                    _ => return,
                };
                let pos = self.cursor_pos;
                let event = match state {
                    ElementState::Pressed => ViewEvent::ButtonDown {
                        button,
                        pos,
                        at: Instant::now(),
                    },
                    ElementState::Released => ViewEvent::ButtonUp { button, pos },
                };
                self.forward(event);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                if dy != 0.0 {
                    self.forward(ViewEvent::Wheel { up: dy > 0.0 });
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                if event.state == ElementState::Pressed {
                    match key {
                        KeyCode::Escape => {
                            if let Some(view) = self.view.as_mut() {
                                view.shutdown(&mut self.host);
                            }
                            event_loop.exit();
                        }
                        _ => {
                            if let Some(&(_, name)) = TOOLS.iter().find(|(k, _)| *k == key) {
                                self.select_tool(name.and_then(TileType::by_name));
                            }
                        }
                    }
                    return;
                }
                if key == KeyCode::KeyM {
                    self.cycle_map_mode();
                    return;
                }
                let modifiers = self.modifier_flags();
                self.forward(ViewEvent::KeyUp { key, modifiers });
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }

        let dirty = self.view.as_mut().is_some_and(|v| v.take_dirty());
        if dirty && let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

impl App {
    fn cycle_map_mode(&mut self) {
        let next = match self.map_mode() {
            MiniMapMode::Normal => MiniMapMode::Power,
            MiniMapMode::Power => MiniMapMode::Traffic,
            MiniMapMode::Traffic => MiniMapMode::Pollution,
            MiniMapMode::Pollution => MiniMapMode::Normal,
        };
        if let Some(view) = self.view.as_mut() {
            view.set_map_mode(next);
        }
        log::info!("map mode: {next:?}");
    }

    fn map_mode(&self) -> MiniMapMode {
        self.view.as_ref().map(|v| v.map_mode()).unwrap_or_default()
    }
}

fn main() {
    env_logger::init();

    let config = load_view_config("data/view.ron");
    let world = TileMap::generate(config.world_side, config.world_seed);
    log::info!("generated {0}x{0} map (seed {1})", world.side(), config.world_seed);

    let event_loop = EventLoop::<UserEvent>::with_user_event()
        .build()
        .expect("create event loop");
    let proxy = event_loop.create_proxy();
    let mut app = App {
        gpu: None,
        sprites: None,
        view: None,
        host: DemoHost {
            world,
            tool: None,
            window: None,
        },
        config,
        proxy,
        cursor_pos: ScreenPoint::ZERO,
        modifiers: ModifiersState::empty(),
    };
    event_loop.run_app(&mut app).expect("run event loop");
}
