//! Shared host for integration tests.

#![allow(dead_code)]

use isoview::coords::{ScreenPoint, TileCoord};
use isoview::paint::Color;
use isoview::tile_map::{TileMap, WorldGrid};
use isoview::tile_types::TileType;
use isoview::view::{EditAction, MapEditor, MiniMap, MiniMapMode, PointerControl, ViewHost};

pub const OVERLAY_GREY: Color = [0.5, 0.5, 0.5, 1.0];

/// Applies edits to a [`TileMap`] and records everything else.
pub struct TestHost {
    pub world: TileMap,
    pub tool: Option<TileType>,
    pub corners: Vec<[TileCoord; 4]>,
    pub grabbed: bool,
    pub cursor_hidden: bool,
}

impl TestHost {
    pub fn new(world: TileMap) -> Self {
        Self {
            world,
            tool: None,
            corners: Vec::new(),
            grabbed: false,
            cursor_hidden: false,
        }
    }
}

impl MapEditor for TestHost {
    fn edit_tile(&mut self, tile: TileCoord, action: EditAction) {
        match (action, self.tool) {
            (EditAction::Click, Some(kind)) => {
                self.world.place_building(tile, kind, kind.default_size());
            }
            _ => self.world.set_tile(tile, TileType::ROAD),
        }
    }

    fn inspect_tile(&mut self, _tile: TileCoord) {}

    fn blocking_dialog_open(&self) -> bool {
        false
    }

    fn selected_tool(&self) -> Option<TileType> {
        self.tool
    }
}

impl MiniMap for TestHost {
    fn set_view_corners(&mut self, corners: [TileCoord; 4]) {
        self.corners.push(corners);
    }

    fn tile_color(&self, _tile: TileCoord, _mode: MiniMapMode) -> Color {
        OVERLAY_GREY
    }
}

impl PointerControl for TestHost {
    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_hidden = !visible;
    }

    fn set_pointer_grab(&mut self, grab: bool) {
        self.grabbed = grab;
    }

    fn warp_pointer(&mut self, _pos: ScreenPoint) {}
}

impl ViewHost for TestHost {
    fn world(&self) -> &dyn WorldGrid {
        &self.world
    }
}
