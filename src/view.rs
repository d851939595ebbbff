use std::time::Duration;

use crate::assets::{AssetLoader, ImageSource, RedrawSignal, catalog_jobs};
use crate::config::ViewConfig;
use crate::coords::{ScreenPoint, TileCoord, Viewport};
use crate::input::{MouseButton, PanGesture, PanStep, PointerMode, ViewEvent, road_path};
use crate::keybindings::{KeyBindings, KeyCombo, ModifierFlags, ViewAction};
use crate::paint::{Color, TextureUploader};
use crate::render::{CursorMarks, DisplayMode, Overlay, Scene, draw_scene};
use crate::texture_cache::TileVisuals;
use crate::tile_map::WorldGrid;
use crate::tile_types::TileType;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// What an edit request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Left click on one tile.
    Click,
    /// One tile of a finished road-paint drag.
    Drag,
}

/// The application side that owns tile contents and tool state.
pub trait MapEditor {
    fn edit_tile(&mut self, tile: TileCoord, action: EditAction);

    fn inspect_tile(&mut self, tile: TileCoord);

    /// While true no edits are issued and no cursor marker is drawn.
    fn blocking_dialog_open(&self) -> bool;

    /// Building type the next edit would place, if any.
    fn selected_tool(&self) -> Option<TileType>;
}

/// Minimap display mode. Passed through to the colour lookup untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiniMapMode {
    #[default]
    Normal,
    Power,
    Traffic,
    Pollution,
}

pub trait MiniMap {
    /// Tiles under the top-left, top-right, bottom-right and bottom-left
    /// corners of the view.
    fn set_view_corners(&mut self, corners: [TileCoord; 4]);

    fn tile_color(&self, tile: TileCoord, mode: MiniMapMode) -> Color;
}

/// Control over the system pointer while panning.
pub trait PointerControl {
    fn set_cursor_visible(&mut self, visible: bool);

    fn set_pointer_grab(&mut self, grab: bool);

    /// Move the pointer to a view-local position.
    fn warp_pointer(&mut self, pos: ScreenPoint);
}

/// Everything a [`MapView`] talks to, handed in on each call.
pub trait ViewHost: MapEditor + MiniMap + PointerControl {
    fn world(&self) -> &dyn WorldGrid;
}

// ---------------------------------------------------------------------------
// MapView
// ---------------------------------------------------------------------------

/// Isometric map view: viewport, gestures, display toggles and tile visuals.
///
/// `T` is the texture type of the painter the view is drawn with.
pub struct MapView<T> {
    config: ViewConfig,
    viewport: Viewport,
    display: DisplayMode,
    map_mode: MiniMapMode,
    mode: PointerMode,
    /// Last pointer position inside the view.
    pointer: Option<ScreenPoint>,
    hover: Option<TileCoord>,
    bindings: KeyBindings,
    visuals: TileVisuals<T>,
    loader: AssetLoader,
    dirty: bool,
    corners_stale: bool,
}

impl<T> MapView<T> {
    /// View of a `side` × `side` world in a `width` × `height` widget. Starts
    /// loading tile images from `source` right away; `on_loaded` fires on the
    /// loader thread once every image has been tried.
    pub fn new<S: ImageSource>(
        config: ViewConfig,
        side: i32,
        width: f32,
        height: f32,
        source: S,
        on_loaded: RedrawSignal,
    ) -> Self {
        let viewport = Viewport::new(config.base_tile_width, config.base_tile_height, side, width, height);
        let loader = AssetLoader::spawn(source, catalog_jobs(), on_loaded);
        Self {
            config,
            viewport,
            display: DisplayMode::default(),
            map_mode: MiniMapMode::default(),
            mode: PointerMode::Idle,
            pointer: None,
            hover: None,
            bindings: KeyBindings::defaults(),
            visuals: TileVisuals::new(),
            loader,
            dirty: true,
            corners_stale: true,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn display(&self) -> DisplayMode {
        self.display
    }

    pub fn map_mode(&self) -> MiniMapMode {
        self.map_mode
    }

    pub fn pointer_mode(&self) -> PointerMode {
        self.mode
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Whether the view changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Visible region changed: redraw and tell the minimap.
    fn request_redraw(&mut self) {
        self.dirty = true;
        self.corners_stale = true;
    }

    fn sync_minimap<H: ViewHost + ?Sized>(&mut self, host: &mut H) {
        if std::mem::take(&mut self.corners_stale) {
            host.set_view_corners(self.viewport.visible_corners());
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.resize(width, height);
        self.request_redraw();
    }

    pub fn zoom_in(&mut self) {
        if self.viewport.zoom_in() {
            self.request_redraw();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.viewport.zoom_out() {
            self.request_redraw();
        }
    }

    pub fn reset_zoom(&mut self) {
        if self.viewport.reset_zoom() {
            self.request_redraw();
        }
    }

    /// Returns false for zoom factors outside the accepted range.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        let changed = self.viewport.set_zoom(zoom);
        if changed {
            self.request_redraw();
        }
        changed
    }

    /// Centre the view on `tile`.
    pub fn show(&mut self, tile: TileCoord) {
        self.viewport.show(tile);
        self.request_redraw();
    }

    pub fn set_cursor_size(&mut self, size: i32) {
        let size = size.max(0);
        if self.display.cursor_size != size {
            self.display.cursor_size = size;
            self.dirty = true;
        }
    }

    pub fn set_overlay(&mut self, overlay: Overlay) {
        if self.display.overlay != overlay {
            self.display.overlay = overlay;
            self.dirty = true;
        }
    }

    /// Minimap colour scheme used by the overlay. Only redraws if an overlay
    /// is showing.
    pub fn set_map_mode(&mut self, mode: MiniMapMode) {
        self.map_mode = mode;
        if self.display.overlay != Overlay::None {
            self.dirty = true;
        }
    }

    /// Block until every tile image is loaded or `timeout` passes.
    pub fn wait_for_assets(&mut self, timeout: Duration) {
        for tile in self.loader.wait(timeout) {
            self.visuals.ingest(tile);
        }
    }

    pub fn assets_loaded(&self) -> bool {
        self.loader.is_finished()
    }

    fn inside(&self, pos: ScreenPoint) -> bool {
        pos.x >= 0.0 && pos.y >= 0.0 && pos.x < self.viewport.width() && pos.y < self.viewport.height()
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn handle_event<H: ViewHost + ?Sized>(&mut self, event: ViewEvent, host: &mut H) {
        match event {
            ViewEvent::Motion { pos, at } => {
                if let PointerMode::Panning(pan) = &mut self.mode {
                    let step = pan.sample(pos, at, &self.config.pan);
                    let anchor = pan.anchor;
                    if let PanStep::Moved(delta) = step {
                        self.viewport.pan_by(delta);
                        host.warp_pointer(anchor);
                        self.request_redraw();
                    }
                } else {
                    self.pointer_moved(pos);
                }
            }
            ViewEvent::Left => {
                self.pointer = None;
                if self.hover.take().is_some() {
                    self.dirty = true;
                }
            }
            ViewEvent::ButtonDown { button, pos, at } => {
                if !self.inside(pos) || !matches!(self.mode, PointerMode::Idle) {
                    return;
                }
                match button {
                    MouseButton::Middle => {
                        self.mode = PointerMode::Panning(PanGesture::new(pos, at));
                        host.set_cursor_visible(false);
                        host.set_pointer_grab(true);
                    }
                    MouseButton::Left if self.display.cursor_size == 1 => {
                        self.mode = PointerMode::RoadPainting {
                            start: self.viewport.screen_to_tile(pos),
                        };
                        self.dirty = true;
                    }
                    _ => {}
                }
            }
            ViewEvent::ButtonUp { button, pos } => self.button_up(button, pos, host),
            ViewEvent::Wheel { up } => {
                if self.pointer.is_none() {
                    return;
                }
                if up {
                    self.zoom_in();
                } else {
                    self.zoom_out();
                }
            }
            ViewEvent::KeyUp { key, modifiers } => {
                if let Some(action) = self.bindings.lookup(KeyCombo { modifiers, key }) {
                    self.apply_action(action, modifiers, host);
                }
            }
        }
        self.sync_minimap(host);
    }

    fn pointer_moved(&mut self, pos: ScreenPoint) {
        if !self.inside(pos) {
            self.pointer = None;
            if self.hover.take().is_some() {
                self.dirty = true;
            }
            return;
        }
        self.pointer = Some(pos);
        let tile = self.viewport.screen_to_tile(pos);
        if self.hover != Some(tile) {
            self.hover = Some(tile);
            self.dirty = true;
        }
    }

    fn button_up<H: ViewHost + ?Sized>(&mut self, button: MouseButton, pos: ScreenPoint, host: &mut H) {
        let inside = self.inside(pos);
        let tile = self.viewport.screen_to_tile(pos);
        match button {
            MouseButton::Middle => {
                let clicked = match std::mem::take(&mut self.mode) {
                    PointerMode::Panning(pan) => {
                        release_pointer(host);
                        !pan.moved()
                    }
                    other => {
                        self.mode = other;
                        true
                    }
                };
                if clicked && inside {
                    self.viewport.recenter(pos);
                    self.request_redraw();
                }
            }
            MouseButton::Left => {
                if let PointerMode::RoadPainting { start } = self.mode {
                    self.mode = PointerMode::Idle;
                    self.dirty = true;
                    if inside && !host.blocking_dialog_open() {
                        for step in road_path(start, tile) {
                            host.edit_tile(step, EditAction::Drag);
                        }
                        self.request_redraw();
                    }
                } else if inside && !host.blocking_dialog_open() {
                    host.edit_tile(tile, EditAction::Click);
                    self.request_redraw();
                }
            }
            MouseButton::Right => {
                if inside {
                    host.inspect_tile(tile);
                }
            }
        }
    }

    fn apply_action<H: ViewHost + ?Sized>(&mut self, action: ViewAction, modifiers: ModifierFlags, host: &mut H) {
        match action {
            ViewAction::ToggleHideHigh => {
                self.display.hide_high = !self.display.hide_high;
                self.request_redraw();
            }
            ViewAction::CycleOverlay => {
                self.display.overlay = self.display.overlay.next();
                self.request_redraw();
            }
            ViewAction::ZoomIn => self.zoom_in(),
            ViewAction::ZoomOut => self.zoom_out(),
            ViewAction::ZoomReset => self.reset_zoom(),
            ViewAction::Scroll { dx, dy } => {
                let factor = if modifiers.shift {
                    self.config.scroll_fast_multiplier
                } else {
                    1.0
                };
                let step = ScreenPoint::new(
                    f32::from(dx) * self.viewport.tile_width() / 2.0,
                    f32::from(dy) * self.viewport.tile_height() / 2.0,
                );
                self.viewport.pan_by(step * factor);
                self.request_redraw();
            }
            ViewAction::CenterMap => {
                let half = host.world().side_len() / 2;
                self.show(TileCoord::new(half, half));
            }
        }
    }

    /// Restore the pointer if a pan is in progress and stop loading. Call
    /// before dropping the view while the host is still alive.
    pub fn shutdown<H: ViewHost + ?Sized>(&mut self, host: &mut H) {
        if let PointerMode::Panning(_) = std::mem::take(&mut self.mode) {
            release_pointer(host);
        }
        self.loader.stop();
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    /// Draw one frame. Tile images decoded since the previous frame are
    /// picked up first.
    pub fn draw<H, U>(&mut self, host: &mut H, painter: &mut U)
    where
        H: ViewHost + ?Sized,
        U: TextureUploader<Texture = T>,
    {
        for tile in self.loader.poll() {
            self.visuals.ingest(tile);
        }

        let side = host.world().side_len();
        let center = self.viewport.center_tile();
        if !center.in_bounds(side) {
            self.viewport.show(center.clamp_to(side));
            self.request_redraw();
        }
        self.sync_minimap(host);

        let cursor = match self.pointer {
            Some(pos) if !host.blocking_dialog_open() => Some(CursorMarks {
                under: self.viewport.screen_to_tile(pos),
                road_start: match self.mode {
                    PointerMode::RoadPainting { start } => Some(start),
                    _ => None,
                },
            }),
            _ => None,
        };

        let host: &H = host;
        let scene = Scene {
            viewport: &self.viewport,
            world: host.world(),
            minimap: host,
            display: self.display,
            map_mode: self.map_mode,
            cursor,
            selected_tool: host.selected_tool(),
            margin: self.config.render_margin,
            background: self.config.background,
        };
        draw_scene(&scene, &mut self.visuals, painter);
    }
}

fn release_pointer<H: PointerControl + ?Sized>(host: &mut H) {
    host.set_cursor_visible(true);
    host.set_pointer_grab(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryImageSource;
    use crate::paint::{CURSOR_LEGAL, DrawList, ListTexture, RED};
    use crate::tile_map::TileMap;
    use std::time::Instant;
    use winit::keyboard::KeyCode;

    #[derive(Default)]
    struct Recorder {
        edits: Vec<(TileCoord, EditAction)>,
        inspected: Vec<TileCoord>,
        corners: Vec<[TileCoord; 4]>,
        cursor_visible: Vec<bool>,
        grabs: Vec<bool>,
        warps: Vec<ScreenPoint>,
        dialog: bool,
    }

    struct Host {
        world: TileMap,
        log: Recorder,
    }

    impl Host {
        fn new(side: i32) -> Self {
            Self {
                world: TileMap::new(side),
                log: Recorder::default(),
            }
        }
    }

    impl MapEditor for Host {
        fn edit_tile(&mut self, tile: TileCoord, action: EditAction) {
            self.log.edits.push((tile, action));
        }

        fn inspect_tile(&mut self, tile: TileCoord) {
            self.log.inspected.push(tile);
        }

        fn blocking_dialog_open(&self) -> bool {
            self.log.dialog
        }

        fn selected_tool(&self) -> Option<TileType> {
            None
        }
    }

    impl MiniMap for Host {
        fn set_view_corners(&mut self, corners: [TileCoord; 4]) {
            self.log.corners.push(corners);
        }

        fn tile_color(&self, _tile: TileCoord, _mode: MiniMapMode) -> Color {
            [0.5, 0.5, 0.5, 1.0]
        }
    }

    impl PointerControl for Host {
        fn set_cursor_visible(&mut self, visible: bool) {
            self.log.cursor_visible.push(visible);
        }

        fn set_pointer_grab(&mut self, grab: bool) {
            self.log.grabs.push(grab);
        }

        fn warp_pointer(&mut self, pos: ScreenPoint) {
            self.log.warps.push(pos);
        }
    }

    impl ViewHost for Host {
        fn world(&self) -> &dyn WorldGrid {
            &self.world
        }
    }

    fn view(side: i32) -> MapView<ListTexture> {
        MapView::new(
            ViewConfig::default(),
            side,
            800.0,
            600.0,
            MemoryImageSource::default(),
            Box::new(|| {}),
        )
    }

    fn p(x: f32, y: f32) -> ScreenPoint {
        ScreenPoint::new(x, y)
    }

    fn key(view: &mut MapView<ListTexture>, host: &mut Host, key: KeyCode, shift: bool) {
        let modifiers = if shift { ModifierFlags::SHIFT } else { ModifierFlags::NONE };
        view.handle_event(ViewEvent::KeyUp { key, modifiers }, host);
    }

    #[test]
    fn pan_session_restores_pointer_once() {
        let mut v = view(100);
        let mut host = Host::new(100);
        let t0 = Instant::now();
        let anchor = p(400.0, 300.0);
        v.handle_event(ViewEvent::ButtonDown { button: MouseButton::Middle, pos: anchor, at: t0 }, &mut host);
        assert_eq!(host.log.cursor_visible, vec![false]);
        assert_eq!(host.log.grabs, vec![true]);

        let before = v.viewport().offset();
        v.handle_event(
            ViewEvent::Motion { pos: p(405.0, 300.0), at: t0 + Duration::from_millis(40) },
            &mut host,
        );
        assert_eq!(v.viewport().offset(), before + p(5.0, 0.0));
        assert_eq!(host.log.warps, vec![anchor]);

        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Middle, pos: anchor }, &mut host);
        assert_eq!(host.log.cursor_visible, vec![false, true]);
        assert_eq!(host.log.grabs, vec![true, false]);
        // A drag is not a click: no recenter.
        assert_eq!(v.viewport().offset(), before + p(5.0, 0.0));

        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Middle, pos: anchor }, &mut host);
        assert_eq!(host.log.grabs, vec![true, false]);
    }

    #[test]
    fn middle_click_recenters() {
        let mut v = view(100);
        let mut host = Host::new(100);
        let click = p(100.0, 100.0);
        let target = v.viewport().screen_to_tile(click);
        v.handle_event(ViewEvent::ButtonDown { button: MouseButton::Middle, pos: click, at: Instant::now() }, &mut host);
        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Middle, pos: click }, &mut host);
        assert_eq!(v.viewport().center_tile(), target);
        assert_eq!(host.log.grabs, vec![true, false]);
    }

    #[test]
    fn fast_drag_release_does_not_recenter() {
        let mut v = view(100);
        let mut host = Host::new(100);
        let t0 = Instant::now();
        let anchor = p(400.0, 300.0);
        v.handle_event(ViewEvent::ButtonDown { button: MouseButton::Middle, pos: anchor, at: t0 }, &mut host);
        let before = v.viewport().offset();
        let released = p(550.0, 300.0);
        v.handle_event(
            ViewEvent::Motion { pos: released, at: t0 + Duration::from_millis(20) },
            &mut host,
        );
        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Middle, pos: released }, &mut host);
        assert_eq!(v.viewport().offset(), before);
        assert_eq!(host.log.grabs, vec![true, false]);
    }

    #[test]
    fn runaway_drag_release_does_not_recenter() {
        let mut v = view(100);
        let mut host = Host::new(100);
        let t0 = Instant::now();
        let anchor = p(400.0, 300.0);
        v.handle_event(ViewEvent::ButtonDown { button: MouseButton::Middle, pos: anchor, at: t0 }, &mut host);
        let before = v.viewport().offset();
        // 300 px in 40 ms is far past the runaway speed.
        let released = p(700.0, 300.0);
        v.handle_event(
            ViewEvent::Motion { pos: released, at: t0 + Duration::from_millis(40) },
            &mut host,
        );
        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Middle, pos: released }, &mut host);
        assert_eq!(v.viewport().offset(), before);
    }

    #[test]
    fn negative_cursor_size_clamps_without_redraw() {
        let mut v = view(100);
        v.set_cursor_size(0);
        v.take_dirty();
        v.set_cursor_size(-3);
        assert_eq!(v.display().cursor_size, 0);
        assert!(!v.take_dirty());
    }

    #[test]
    fn debounced_motion_is_not_applied_twice() {
        let mut v = view(100);
        let mut host = Host::new(100);
        let t0 = Instant::now();
        let anchor = p(400.0, 300.0);
        v.handle_event(ViewEvent::ButtonDown { button: MouseButton::Middle, pos: anchor, at: t0 }, &mut host);
        let before = v.viewport().offset();
        for (ms, x) in [(25, 402.0), (35, 404.0), (45, 406.0)] {
            v.handle_event(
                ViewEvent::Motion { pos: p(x, 300.0), at: t0 + Duration::from_millis(ms) },
                &mut host,
            );
        }
        assert_eq!(v.viewport().offset(), before + p(4.0, 0.0));
        assert_eq!(host.log.warps.len(), 1);
    }

    #[test]
    fn shutdown_mid_pan_releases_pointer() {
        let mut v = view(100);
        let mut host = Host::new(100);
        v.handle_event(
            ViewEvent::ButtonDown { button: MouseButton::Middle, pos: p(10.0, 10.0), at: Instant::now() },
            &mut host,
        );
        v.shutdown(&mut host);
        assert_eq!(host.log.grabs, vec![true, false]);
        assert_eq!(host.log.cursor_visible, vec![false, true]);
    }

    #[test]
    fn road_drag_edits_l_path() {
        let mut v = view(100);
        let mut host = Host::new(100);
        v.set_cursor_size(1);
        let vp = v.viewport().clone();
        let centre_of = |t: TileCoord| vp.tile_to_screen(t) - p(0.0, vp.tile_height() / 2.0);
        let start = vp.center_tile();
        let end = TileCoord::new(start.x + 2, start.y + 2);

        v.handle_event(
            ViewEvent::ButtonDown { button: MouseButton::Left, pos: centre_of(start), at: Instant::now() },
            &mut host,
        );
        assert!(matches!(v.pointer_mode(), PointerMode::RoadPainting { .. }));
        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Left, pos: centre_of(end) }, &mut host);

        let tiles: Vec<TileCoord> = host.log.edits.iter().map(|(t, _)| *t).collect();
        assert_eq!(tiles, road_path(start, end));
        assert!(host.log.edits.iter().all(|(_, a)| *a == EditAction::Drag));
        assert!(matches!(v.pointer_mode(), PointerMode::Idle));
    }

    #[test]
    fn road_drag_released_outside_is_abandoned() {
        let mut v = view(100);
        let mut host = Host::new(100);
        v.set_cursor_size(1);
        v.handle_event(
            ViewEvent::ButtonDown { button: MouseButton::Left, pos: p(400.0, 300.0), at: Instant::now() },
            &mut host,
        );
        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Left, pos: p(-5.0, 300.0) }, &mut host);
        assert!(host.log.edits.is_empty());
        assert!(matches!(v.pointer_mode(), PointerMode::Idle));
    }

    #[test]
    fn dialog_blocks_edits_but_not_inspect() {
        let mut v = view(100);
        let mut host = Host::new(100);
        host.log.dialog = true;
        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Left, pos: p(400.0, 300.0) }, &mut host);
        assert!(host.log.edits.is_empty());
        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Right, pos: p(400.0, 300.0) }, &mut host);
        assert_eq!(host.log.inspected.len(), 1);
    }

    #[test]
    fn single_click_edits_tile_under_pointer() {
        let mut v = view(100);
        let mut host = Host::new(100);
        let pos = p(400.0, 300.0);
        let tile = v.viewport().screen_to_tile(pos);
        v.handle_event(ViewEvent::ButtonUp { button: MouseButton::Left, pos }, &mut host);
        assert_eq!(host.log.edits, vec![(tile, EditAction::Click)]);
    }

    #[test]
    fn wheel_zooms_only_with_pointer_inside() {
        let mut v = view(100);
        let mut host = Host::new(100);
        v.handle_event(ViewEvent::Wheel { up: true }, &mut host);
        assert_eq!(v.viewport().zoom(), 1.0);

        v.handle_event(ViewEvent::Motion { pos: p(10.0, 10.0), at: Instant::now() }, &mut host);
        let center = v.viewport().center_tile();
        v.handle_event(ViewEvent::Wheel { up: true }, &mut host);
        assert!(v.viewport().zoom() > 1.0);
        assert_eq!(v.viewport().center_tile(), center);
        v.handle_event(ViewEvent::Wheel { up: false }, &mut host);
        assert_eq!(v.viewport().zoom(), 1.0);
    }

    #[test]
    fn keyboard_scroll_steps() {
        let mut v = view(100);
        let mut host = Host::new(100);
        let before = v.viewport().offset();
        key(&mut v, &mut host, KeyCode::ArrowRight, false);
        assert_eq!(v.viewport().offset(), before + p(64.0, 0.0));
        key(&mut v, &mut host, KeyCode::Numpad8, true);
        assert_eq!(v.viewport().offset(), before + p(64.0, -160.0));
    }

    #[test]
    fn keyboard_toggles() {
        let mut v = view(100);
        let mut host = Host::new(100);
        key(&mut v, &mut host, KeyCode::KeyH, false);
        assert!(v.display().hide_high);
        key(&mut v, &mut host, KeyCode::KeyV, false);
        assert_eq!(v.display().overlay, Overlay::OverTiles);
        key(&mut v, &mut host, KeyCode::NumpadAdd, false);
        key(&mut v, &mut host, KeyCode::NumpadEnter, false);
        assert_eq!(v.viewport().zoom(), 1.0);
        v.show(TileCoord::new(3, 3));
        key(&mut v, &mut host, KeyCode::Numpad5, false);
        assert_eq!(v.viewport().center_tile(), TileCoord::new(50, 50));
    }

    #[test]
    fn region_changes_notify_minimap() {
        let mut v = view(100);
        let mut host = Host::new(100);
        key(&mut v, &mut host, KeyCode::ArrowUp, false);
        assert_eq!(host.log.corners.len(), 1);
        assert_eq!(host.log.corners[0], v.viewport().visible_corners());
        // Pointer motion alone does not move the region.
        v.handle_event(ViewEvent::Motion { pos: p(20.0, 20.0), at: Instant::now() }, &mut host);
        assert_eq!(host.log.corners.len(), 1);
    }

    #[test]
    fn map_mode_redraws_only_with_overlay() {
        let mut v = view(100);
        v.take_dirty();
        v.set_map_mode(MiniMapMode::Power);
        assert!(!v.take_dirty());
        v.set_overlay(Overlay::Only);
        v.take_dirty();
        v.set_map_mode(MiniMapMode::Traffic);
        assert!(v.take_dirty());
    }

    #[test]
    fn draw_recovers_offmap_centre() {
        let mut v = view(20);
        let mut host = Host::new(20);
        v.show(TileCoord::new(-30, 45));
        let mut list = DrawList::new();
        v.draw(&mut host, &mut list);
        let c = v.viewport().center_tile();
        assert_eq!(c, TileCoord::new(0, 19));
        assert_eq!(host.log.corners.last(), Some(&v.viewport().visible_corners()));
        // No art loaded: every in-range tile falls back to the placeholder.
        assert!(list.fills_of(RED).count() > 0);
    }

    #[test]
    fn draw_marks_cursor_only_without_dialog() {
        let mut v = view(20);
        let mut host = Host::new(20);
        v.set_cursor_size(1);
        v.show(TileCoord::new(10, 10));
        v.handle_event(ViewEvent::Motion { pos: p(400.0, 300.0), at: Instant::now() }, &mut host);
        let mut list = DrawList::new();
        v.draw(&mut host, &mut list);
        assert_eq!(list.fills_of(CURSOR_LEGAL).count(), 1);

        host.log.dialog = true;
        list.clear();
        v.draw(&mut host, &mut list);
        assert_eq!(list.fills_of(CURSOR_LEGAL).count(), 0);
    }
}
