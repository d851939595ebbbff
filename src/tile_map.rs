use bitflags::bitflags;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::coords::TileCoord;
use crate::tile_types::{TileGroup, TileType};

bitflags! {
    /// Per-cell state bits the view cares about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TileFlags: u32 {
        /// Water that flows (as opposed to a lake).
        const IS_RIVER = 1 << 0;
        const POWERED = 1 << 1;
    }
}

/// Read access to the world the view displays.
///
/// Queries outside `[0, side_len())` must not panic; they return the blank
/// type, a size of 1 and no flags.
pub trait WorldGrid {
    fn side_len(&self) -> i32;

    fn tile_type(&self, tile: TileCoord) -> TileType;

    /// Origin (smallest x, smallest y) of the building covering `tile`.
    /// Single-tile cells are their own origin.
    fn building_origin(&self, tile: TileCoord) -> TileCoord;

    /// Edge length of the building whose origin is `tile`.
    fn footprint_size(&self, tile: TileCoord) -> i32;

    fn flags(&self, tile: TileCoord) -> TileFlags;

    fn group(&self, tile: TileCoord) -> TileGroup {
        self.tile_type(tile).group()
    }
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    kind: TileType,
    origin: TileCoord,
    size: u8,
    flags: TileFlags,
}

/// Square grid of tiles with multi-tile buildings.
#[derive(Debug)]
pub struct TileMap {
    side: i32,
    cells: Vec<Cell>,
}

impl TileMap {
    /// All-green map of `side` × `side` tiles.
    pub fn new(side: i32) -> Self {
        let side = side.max(0);
        let cells = (0..side * side)
            .map(|i| Cell {
                kind: TileType::GREEN,
                origin: TileCoord::new(i % side, i / side),
                size: 1,
                flags: TileFlags::empty(),
            })
            .collect();
        Self { side, cells }
    }

    /// Random map with a river, a few lakes and some buildings.
    /// Same seed, same map.
    pub fn generate(side: i32, seed: u64) -> Self {
        let mut map = Self::new(side);
        if side < 8 {
            return map;
        }
        let mut rng = StdRng::seed_from_u64(seed);

        // A river meandering north to south in the eastern third.
        let mut river_x = side * 2 / 3;
        for y in 0..side {
            for x in river_x..(river_x + 2).min(side) {
                map.set_tile(TileCoord::new(x, y), TileType::WATER);
                map.set_flags(TileCoord::new(x, y), TileFlags::IS_RIVER);
            }
            let roll: f32 = rng.random();
            if roll < 0.2 && river_x > side / 2 {
                river_x -= 1;
            } else if roll > 0.8 && river_x < side - 3 {
                river_x += 1;
            }
        }

        for _ in 0..side / 8 {
            let cx = rng.random_range(0..side);
            let cy = rng.random_range(0..side);
            let r = rng.random_range(1..4);
            for y in (cy - r)..=(cy + r) {
                for x in (cx - r)..=(cx + r) {
                    let t = TileCoord::new(x, y);
                    if t.in_bounds(side) && (x - cx).abs() + (y - cy).abs() <= r {
                        map.set_tile(t, TileType::WATER);
                    }
                }
            }
        }

        let buildable: Vec<TileType> = TileType::all()
            .filter(|t| {
                !matches!(
                    t.group(),
                    TileGroup::Blank | TileGroup::Bare | TileGroup::Used | TileGroup::Water
                )
            })
            .collect();
        for _ in 0..side * side / 40 {
            let kind = buildable[rng.random_range(0..buildable.len())];
            let origin = TileCoord::new(rng.random_range(0..side), rng.random_range(0..side));
            map.place_building(origin, kind, kind.default_size());
        }
        map
    }

    pub fn side(&self) -> i32 {
        self.side
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.in_bounds(self.side) {
            Some((tile.y * self.side + tile.x) as usize)
        } else {
            None
        }
    }

    pub fn get_type(&self, tile: TileCoord) -> Option<TileType> {
        self.index(tile).map(|i| self.cells[i].kind)
    }

    /// Replace one cell with a single-tile type. A building covering the
    /// cell is cleared first.
    pub fn set_tile(&mut self, tile: TileCoord, kind: TileType) {
        if self.index(tile).is_none() {
            return;
        }
        self.clear(tile);
        if let Some(i) = self.index(tile) {
            self.cells[i].kind = kind;
        }
    }

    pub fn set_flags(&mut self, tile: TileCoord, flags: TileFlags) {
        if let Some(i) = self.index(tile) {
            self.cells[i].flags = flags;
        }
    }

    /// Put a `size` × `size` building with its origin at `origin`. Fails
    /// without changes unless every covered cell is in range and green.
    pub fn place_building(&mut self, origin: TileCoord, kind: TileType, size: i32) -> bool {
        if size < 1 || size > i32::from(u8::MAX) {
            return false;
        }
        let covered: Vec<TileCoord> = (origin.y..origin.y + size)
            .flat_map(|y| (origin.x..origin.x + size).map(move |x| TileCoord::new(x, y)))
            .collect();
        if !covered
            .iter()
            .all(|&t| self.get_type(t) == Some(TileType::GREEN))
        {
            return false;
        }
        for t in covered {
            if let Some(i) = self.index(t) {
                let cell = &mut self.cells[i];
                cell.kind = if t == origin { kind } else { TileType::USED };
                cell.origin = origin;
                cell.size = if t == origin { size as u8 } else { 1 };
            }
        }
        true
    }

    /// Turn the building covering `tile` back into green land.
    pub fn clear(&mut self, tile: TileCoord) {
        let Some(i) = self.index(tile) else {
            return;
        };
        let origin = self.cells[i].origin;
        let size = self.index(origin).map(|o| self.cells[o].size).unwrap_or(1) as i32;
        for y in origin.y..origin.y + size {
            for x in origin.x..origin.x + size {
                let t = TileCoord::new(x, y);
                if let Some(j) = self.index(t) {
                    self.cells[j] = Cell {
                        kind: TileType::GREEN,
                        origin: t,
                        size: 1,
                        flags: self.cells[j].flags & TileFlags::IS_RIVER,
                    };
                }
            }
        }
    }
}

impl WorldGrid for TileMap {
    fn side_len(&self) -> i32 {
        self.side
    }

    fn tile_type(&self, tile: TileCoord) -> TileType {
        self.get_type(tile).unwrap_or(TileType::BLANK)
    }

    fn building_origin(&self, tile: TileCoord) -> TileCoord {
        self.index(tile).map(|i| self.cells[i].origin).unwrap_or(tile)
    }

    fn footprint_size(&self, tile: TileCoord) -> i32 {
        self.index(tile)
            .map(|i| i32::from(self.cells[i].size))
            .unwrap_or(1)
    }

    fn flags(&self, tile: TileCoord) -> TileFlags {
        self.index(tile)
            .map(|i| self.cells[i].flags)
            .unwrap_or_default()
    }
}
