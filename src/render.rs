//! Frame composition for the isometric view.
//!
//! Draws, in order: the background, every tile in the visible region (plus a
//! margin for tall buildings rooted off-screen), the information overlay and
//! the cursor marker. Nothing here mutates the viewport; centre correction
//! happens in [`crate::view::MapView::draw`] before a [`Scene`] is built.

use crate::coords::{ScreenPoint, TileCoord, Viewport};
use crate::input::road_path;
use crate::paint::{
    BLACK, CURSOR_ILLEGAL, CURSOR_LEGAL, CURSOR_OUTLINE, Painter, RED, Rect, TextureUploader,
};
use crate::texture_cache::{Resolved, TileVisuals};
use crate::tile_map::{TileFlags, WorldGrid};
use crate::tile_types::{TileGroup, TileType};
use crate::view::{MiniMap, MiniMapMode};

/// Overlay alpha when drawn over tile imagery.
const OVERLAY_ALPHA: f32 = 200.0 / 255.0;

/// Which layers the information overlay replaces or covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    None,
    /// Translucent colours over the tile imagery.
    OverTiles,
    /// Opaque colours instead of the tile imagery.
    Only,
}

impl Overlay {
    /// The next mode in the `V` key cycle.
    pub fn next(self) -> Self {
        match self {
            Overlay::None => Overlay::OverTiles,
            Overlay::OverTiles => Overlay::Only,
            Overlay::Only => Overlay::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayMode {
    pub overlay: Overlay,
    /// Skip every building larger than one tile.
    pub hide_high: bool,
    /// Cursor footprint edge length; 0 draws a plain outline.
    pub cursor_size: i32,
}

/// Where the cursor marker goes this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorMarks {
    pub under: TileCoord,
    /// Start of an active road-paint drag.
    pub road_start: Option<TileCoord>,
}

/// Everything one frame is drawn from.
pub struct Scene<'a, M: MiniMap + ?Sized> {
    pub viewport: &'a Viewport,
    pub world: &'a dyn WorldGrid,
    pub minimap: &'a M,
    pub display: DisplayMode,
    pub map_mode: MiniMapMode,
    /// `None` when the pointer is outside or a modal dialog is open.
    pub cursor: Option<CursorMarks>,
    pub selected_tool: Option<TileType>,
    pub margin: i32,
    pub background: [f32; 4],
}

/// Candidate tiles for the region bounded by the tiles under the top-left
/// (`ul`), top-right (`ur`) and bottom-left (`ll`) screen corners, walked as
/// two interleaved diagonal passes.
pub fn visible_tiles(ul: TileCoord, ur: TileCoord, ll: TileCoord) -> impl Iterator<Item = TileCoord> {
    let rows = 2 * (ll.y - ul.y);
    let cols = ur.x - ul.x;
    (0..=rows).flat_map(move |k| {
        (0..=cols).map(move |i| TileCoord::new(ul.x + i + k / 2 + k % 2, ul.y - i + k / 2))
    })
}

/// Corner tiles of the visible region expanded by `margin` tiles.
fn expanded_corners(viewport: &Viewport, margin: i32) -> (TileCoord, TileCoord, TileCoord) {
    let mut ul = viewport.screen_to_tile(ScreenPoint::new(0.0, 0.0));
    let mut ur = viewport.screen_to_tile(ScreenPoint::new(viewport.width(), 0.0));
    let mut ll = viewport.screen_to_tile(ScreenPoint::new(0.0, viewport.height()));
    ul.x -= margin;
    ur.y -= margin;
    ur.x += margin;
    ll.y += margin;
    (ul, ur, ll)
}

/// Bounding box of a tile's diamond whose south corner projects to `point`.
fn tile_rect(viewport: &Viewport, point: ScreenPoint) -> Rect {
    let (tw, th) = (viewport.tile_width(), viewport.tile_height());
    Rect::new(point.x - tw / 2.0, point.y - th, tw, th)
}

pub fn draw_scene<M, U>(scene: &Scene<'_, M>, visuals: &mut TileVisuals<U::Texture>, painter: &mut U)
where
    M: MiniMap + ?Sized,
    U: TextureUploader,
{
    let vp = scene.viewport;
    painter.fill_rect(Rect::new(0.0, 0.0, vp.width(), vp.height()), scene.background);

    let (ul, ur, ll) = expanded_corners(vp, scene.margin);

    if scene.display.overlay != Overlay::Only {
        for tile in visible_tiles(ul, ur, ll) {
            draw_tile(scene, visuals, painter, tile);
        }
    }
    if scene.display.overlay != Overlay::None {
        for tile in visible_tiles(ul, ur, ll) {
            draw_overlay(scene, painter, tile);
        }
    }

    let Some(cursor) = scene.cursor else {
        return;
    };
    match cursor.road_start {
        Some(start) => {
            for tile in road_path(start, cursor.under) {
                mark_tile(scene, painter, tile);
            }
        }
        None => mark_tile(scene, painter, cursor.under),
    }
}

fn draw_tile<M, U>(scene: &Scene<'_, M>, visuals: &mut TileVisuals<U::Texture>, painter: &mut U, tile: TileCoord)
where
    M: MiniMap + ?Sized,
    U: TextureUploader,
{
    let vp = scene.viewport;
    let world = scene.world;

    if !tile.in_bounds(world.side_len()) {
        let point = vp.tile_to_screen(tile);
        match visuals.resolve(TileType::BLANK, painter) {
            Some(blank) => blit(painter, &blank, point, vp.zoom()),
            None => painter.fill_diamond(tile_rect(vp, point), scene.background),
        }
        return;
    }

    let origin = world.building_origin(tile);
    let size = world.footprint_size(origin);
    // Only the canonical corner (smallest x, largest y) draws a footprint.
    if tile.x != origin.x || tile.y - size + 1 != origin.y {
        return;
    }
    let mut point = vp.tile_to_screen(tile);
    if size > 1 {
        if scene.display.hide_high {
            return;
        }
        point = vp.tile_to_screen(TileCoord::new(tile.x + size - 1, tile.y));
    }

    let kind = world.tile_type(origin);
    match visuals.resolve(kind, painter) {
        Some(visual) => blit(painter, &visual, point, vp.zoom()),
        None => painter.fill_diamond(tile_rect(vp, point), RED),
    }
}

/// Place a texture with its anchor pixel on `point`.
fn blit<P: Painter>(painter: &mut P, visual: &Resolved<'_, P::Texture>, point: ScreenPoint, zoom: f32) {
    let at = ScreenPoint::new(
        point.x - visual.anchor.x as f32 * zoom,
        point.y - visual.anchor.y as f32 * zoom,
    );
    if zoom == 1.0 {
        painter.draw_texture(visual.texture, at);
    } else {
        let (w, h) = visual.size;
        painter.draw_texture_stretched(visual.texture, Rect::new(at.x, at.y, w as f32 * zoom, h as f32 * zoom));
    }
}

fn draw_overlay<M, P>(scene: &Scene<'_, M>, painter: &mut P, tile: TileCoord)
where
    M: MiniMap + ?Sized,
    P: Painter,
{
    let vp = scene.viewport;
    let rect = tile_rect(vp, vp.tile_to_screen(tile));
    let color = if tile.in_bounds(scene.world.side_len()) {
        let mut c = scene.minimap.tile_color(tile, scene.map_mode);
        if scene.display.overlay == Overlay::OverTiles {
            c[3] = OVERLAY_ALPHA;
        }
        c
    } else {
        BLACK
    };
    painter.fill_diamond(rect, color);
}

fn mark_tile<M, P>(scene: &Scene<'_, M>, painter: &mut P, tile: TileCoord)
where
    M: MiniMap + ?Sized,
    P: Painter,
{
    let vp = scene.viewport;
    let point = vp.tile_to_screen(tile);
    let size = scene.display.cursor_size;
    if size <= 0 {
        painter.stroke_diamond(tile_rect(vp, point), CURSOR_OUTLINE);
        return;
    }

    let color = if placement_legal(scene.world, tile, size, scene.selected_tool) {
        CURSOR_LEGAL
    } else {
        CURSOR_ILLEGAL
    };
    let (tw, th) = (vp.tile_width(), vp.tile_height());
    let n = size as f32;
    painter.fill_diamond(Rect::new(point.x - tw * n / 2.0, point.y - th, tw * n, th * n), color);
}

/// Whether a `size` × `size` building of `tool` may go at `origin`.
///
/// Every covered tile must be in range and bare green land. A port also needs
/// river water along the whole column just east of its footprint.
pub fn placement_legal(world: &dyn WorldGrid, origin: TileCoord, size: i32, tool: Option<TileType>) -> bool {
    let side = world.side_len();
    if origin.x < 0 || origin.y < 0 || origin.x + size > side || origin.y + size > side {
        return false;
    }
    let rows = origin.y..origin.y + size;
    let all_green = rows.clone().all(|y| {
        (origin.x..origin.x + size).all(|x| world.tile_type(TileCoord::new(x, y)) == TileType::GREEN)
    });
    if !all_green {
        return false;
    }
    if tool == Some(TileType::PORT) {
        let east = origin.x + size;
        return rows.into_iter().all(|y| {
            let t = TileCoord::new(east, y);
            world.group(t) == TileGroup::Water && world.flags(t).contains(TileFlags::IS_RIVER)
        });
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Anchor, LoadedTile};
    use crate::paint::{Color, DrawCommand, DrawList};
    use crate::tile_map::TileMap;
    use image::RgbaImage;
    use std::collections::HashSet;

    struct FlatColors(Color);

    impl MiniMap for FlatColors {
        fn set_view_corners(&mut self, _corners: [TileCoord; 4]) {}

        fn tile_color(&self, _tile: TileCoord, _mode: MiniMapMode) -> Color {
            self.0
        }
    }

    const GREEN_BG: Color = [0.0, 0.5, 0.0, 1.0];
    const OVERLAY: Color = [0.2, 0.4, 0.6, 1.0];

    fn t(x: i32, y: i32) -> TileCoord {
        TileCoord::new(x, y)
    }

    fn scene<'a>(vp: &'a Viewport, world: &'a TileMap, colors: &'a FlatColors) -> Scene<'a, FlatColors> {
        Scene {
            viewport: vp,
            world,
            minimap: colors,
            display: DisplayMode::default(),
            map_mode: MiniMapMode::default(),
            cursor: None,
            selected_tool: None,
            margin: 7,
            background: GREEN_BG,
        }
    }

    fn with_image(visuals: &mut TileVisuals<crate::paint::ListTexture>, kind: TileType, w: u32, h: u32) {
        visuals.ingest(LoadedTile {
            kind,
            image: RgbaImage::new(w, h),
            anchor: Anchor {
                x: w as i32 / 2,
                y: h as i32,
            },
        });
    }

    /// Every tile of `kind` ever resolved, paired with where its texture went.
    fn texture_draws(list: &DrawList) -> Vec<(u32, ScreenPoint)> {
        list.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Texture { texture, at } => Some((texture.id, *at)),
                DrawCommand::StretchedTexture { texture, rect } => Some((texture.id, rect.origin())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn visible_region_covers_screen() {
        let vp = Viewport::new(64.0, 32.0, 40, 320.0, 240.0);
        let (ul, ur, ll) = expanded_corners(&vp, 0);
        let tiles: HashSet<TileCoord> = visible_tiles(ul, ur, ll).collect();
        for sy in (0..240).step_by(8) {
            for sx in (0..320).step_by(8) {
                let tile = vp.screen_to_tile(ScreenPoint::new(sx as f32, sy as f32));
                assert!(tiles.contains(&tile), "{tile:?} at ({sx},{sy}) not visited");
            }
        }
    }

    #[test]
    fn footprint_drawn_once_from_canonical_corner() {
        let mut world = TileMap::new(12);
        assert!(world.place_building(t(4, 4), TileType::PORT, 3));
        let vp = Viewport::new(64.0, 32.0, 12, 800.0, 600.0);
        let colors = FlatColors(OVERLAY);
        let mut visuals = TileVisuals::new();
        with_image(&mut visuals, TileType::PORT, 192, 120);
        let mut list = DrawList::new();
        let s = scene(&vp, &world, &colors);

        for x in 4..7 {
            for y in 4..7 {
                list.clear();
                draw_tile(&s, &mut visuals, &mut list, t(x, y));
                let drawn = list.textures().count();
                if (x, y) == (4, 6) {
                    assert_eq!(drawn, 1, "canonical corner must draw");
                } else {
                    assert_eq!(drawn, 0, "({x},{y}) must not draw the footprint");
                    assert!(list.commands.is_empty());
                }
            }
        }
    }

    #[test]
    fn footprint_positioned_at_opposite_corner() {
        let mut world = TileMap::new(12);
        assert!(world.place_building(t(4, 4), TileType::PORT, 3));
        let vp = Viewport::new(64.0, 32.0, 12, 800.0, 600.0);
        let colors = FlatColors(OVERLAY);
        let mut visuals = TileVisuals::new();
        with_image(&mut visuals, TileType::PORT, 192, 120);
        let mut list = DrawList::new();

        draw_tile(&scene(&vp, &world, &colors), &mut visuals, &mut list, t(4, 6));
        let corner = vp.tile_to_screen(t(6, 6));
        let draws = texture_draws(&list);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].1, ScreenPoint::new(corner.x - 96.0, corner.y - 120.0));
    }

    #[test]
    fn hide_high_skips_footprints_only() {
        let mut world = TileMap::new(12);
        assert!(world.place_building(t(4, 4), TileType::PORT, 3));
        let vp = Viewport::new(64.0, 32.0, 12, 800.0, 600.0);
        let colors = FlatColors(OVERLAY);
        let mut visuals = TileVisuals::new();
        with_image(&mut visuals, TileType::PORT, 192, 120);
        with_image(&mut visuals, TileType::GREEN, 64, 32);
        let mut list = DrawList::new();
        let mut s = scene(&vp, &world, &colors);
        s.display.hide_high = true;

        draw_tile(&s, &mut visuals, &mut list, t(4, 6));
        assert!(list.commands.is_empty());
        draw_tile(&s, &mut visuals, &mut list, t(0, 0));
        assert_eq!(list.textures().count(), 1);
    }

    #[test]
    fn missing_art_draws_red_diamond() {
        let world = TileMap::new(8);
        let vp = Viewport::new(64.0, 32.0, 8, 400.0, 300.0);
        let colors = FlatColors(OVERLAY);
        let mut visuals = TileVisuals::new();
        let mut list = DrawList::new();

        draw_scene(&scene(&vp, &world, &colors), &mut visuals, &mut list);
        assert_eq!(list.fills_of(RED).count(), 64);
        assert_eq!(list.textures().count(), 0);
    }

    #[test]
    fn off_map_uses_blank_or_background() {
        let world = TileMap::new(4);
        let vp = Viewport::new(64.0, 32.0, 4, 400.0, 300.0);
        let colors = FlatColors(OVERLAY);
        let mut visuals = TileVisuals::new();
        let mut list = DrawList::new();
        let s = scene(&vp, &world, &colors);

        draw_tile(&s, &mut visuals, &mut list, t(-1, 2));
        assert_eq!(list.fills_of(GREEN_BG).count(), 1);

        with_image(&mut visuals, TileType::BLANK, 64, 32);
        list.clear();
        draw_tile(&s, &mut visuals, &mut list, t(-1, 2));
        assert_eq!(list.textures().count(), 1);
    }

    #[test]
    fn zoomed_textures_are_stretched() {
        let world = TileMap::new(4);
        let mut vp = Viewport::new(64.0, 32.0, 4, 400.0, 300.0);
        assert!(vp.set_zoom(2.0));
        let colors = FlatColors(OVERLAY);
        let mut visuals = TileVisuals::new();
        with_image(&mut visuals, TileType::GREEN, 64, 32);
        let mut list = DrawList::new();

        draw_tile(&scene(&vp, &world, &colors), &mut visuals, &mut list, t(1, 1));
        let point = vp.tile_to_screen(t(1, 1));
        assert_eq!(
            list.commands,
            vec![DrawCommand::StretchedTexture {
                texture: crate::paint::ListTexture {
                    id: 0,
                    width: 64,
                    height: 32
                },
                rect: Rect::new(point.x - 64.0, point.y - 64.0, 128.0, 64.0),
            }]
        );
    }

    #[test]
    fn overlay_modes() {
        let world = TileMap::new(4);
        let vp = Viewport::new(64.0, 32.0, 4, 400.0, 300.0);
        let colors = FlatColors(OVERLAY);
        let mut visuals = TileVisuals::new();
        with_image(&mut visuals, TileType::GREEN, 64, 32);
        let mut list = DrawList::new();

        let mut s = scene(&vp, &world, &colors);
        s.display.overlay = Overlay::Only;
        draw_scene(&s, &mut visuals, &mut list);
        assert_eq!(list.textures().count(), 0);
        assert_eq!(list.fills_of(OVERLAY).count(), 16);
        assert!(list.fills_of(BLACK).count() > 0);

        list.clear();
        s.display.overlay = Overlay::OverTiles;
        draw_scene(&s, &mut visuals, &mut list);
        assert_eq!(list.textures().count(), 16);
        let translucent = [OVERLAY[0], OVERLAY[1], OVERLAY[2], OVERLAY_ALPHA];
        assert_eq!(list.fills_of(translucent).count(), 16);
    }

    #[test]
    fn overlay_cycle_wraps() {
        assert_eq!(Overlay::None.next(), Overlay::OverTiles);
        assert_eq!(Overlay::OverTiles.next(), Overlay::Only);
        assert_eq!(Overlay::Only.next(), Overlay::None);
    }

    #[test]
    fn cursor_legality_two_by_two() {
        let mut world = TileMap::new(10);
        world.set_tile(t(6, 6), TileType::WATER);
        let vp = Viewport::new(64.0, 32.0, 10, 400.0, 300.0);
        let colors = FlatColors(OVERLAY);
        let mut list = DrawList::new();
        let mut s = scene(&vp, &world, &colors);
        s.display.cursor_size = 2;

        mark_tile(&s, &mut list, t(2, 2));
        assert_eq!(list.fills_of(CURSOR_LEGAL).count(), 1);

        list.clear();
        mark_tile(&s, &mut list, t(5, 5));
        assert_eq!(list.fills_of(CURSOR_ILLEGAL).count(), 1);
        assert_eq!(list.fills_of(CURSOR_LEGAL).count(), 0);
    }

    #[test]
    fn cursor_outline_for_size_zero() {
        let world = TileMap::new(10);
        let vp = Viewport::new(64.0, 32.0, 10, 400.0, 300.0);
        let colors = FlatColors(OVERLAY);
        let mut list = DrawList::new();
        let s = scene(&vp, &world, &colors);
        mark_tile(&s, &mut list, t(3, 3));
        assert!(matches!(
            list.commands.as_slice(),
            [DrawCommand::StrokePolygon { color, .. }] if *color == CURSOR_OUTLINE
        ));
    }

    #[test]
    fn road_drag_marks_whole_path() {
        let world = TileMap::new(10);
        let vp = Viewport::new(64.0, 32.0, 10, 400.0, 300.0);
        let colors = FlatColors(OVERLAY);
        let mut visuals = TileVisuals::new();
        let mut list = DrawList::new();
        let mut s = scene(&vp, &world, &colors);
        s.display.cursor_size = 1;
        s.cursor = Some(CursorMarks {
            under: t(2, 2),
            road_start: Some(t(0, 0)),
        });
        draw_scene(&s, &mut visuals, &mut list);
        assert_eq!(list.fills_of(CURSOR_LEGAL).count(), 5);
    }

    #[test]
    fn placement_rejects_offmap_footprint() {
        let world = TileMap::new(10);
        assert!(placement_legal(&world, t(8, 8), 2, None));
        assert!(!placement_legal(&world, t(9, 8), 2, None));
        assert!(!placement_legal(&world, t(-1, 0), 1, None));
    }

    #[test]
    fn port_needs_river_to_the_east() {
        let mut world = TileMap::new(10);
        for y in 2..4 {
            world.set_tile(t(4, y), TileType::WATER);
        }
        assert!(!placement_legal(&world, t(2, 2), 2, Some(TileType::PORT)));

        for y in 2..4 {
            world.set_flags(t(4, y), TileFlags::IS_RIVER);
        }
        assert!(placement_legal(&world, t(2, 2), 2, Some(TileType::PORT)));
        assert!(placement_legal(&world, t(2, 2), 2, None));
        assert!(!placement_legal(&world, t(2, 1), 2, Some(TileType::PORT)));
    }
}
