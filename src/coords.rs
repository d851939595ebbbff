use std::ops::{Add, AddAssign, Mul, Sub};

/// Smallest accepted zoom factor.
pub const MIN_ZOOM: f32 = 0.125;
/// Largest accepted zoom factor.
pub const MAX_ZOOM: f32 = 4.0;

/// Zoom values this close to 1.0 snap to exactly 1.0.
const ZOOM_SNAP: f32 = 0.01;

/// Fraction of a tile treated as "on the boundary" when picking.
const EDGE_EPSILON: f32 = 1.0e-3;

/// Integer cell of the square world grid. Validity is a range test, not a type
/// invariant: off-map coordinates are ordinary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True if both axes lie in `[0, side)`.
    pub fn in_bounds(self, side: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < side && self.y < side
    }

    /// Nearest in-range coordinate. `side` must be positive.
    pub fn clamp_to(self, side: i32) -> Self {
        let max = (side - 1).max(0);
        Self {
            x: self.x.clamp(0, max),
            y: self.y.clamp(0, max),
        }
    }
}

/// Pixel position in viewport-local space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn floor(self) -> Self {
        Self::new(self.x.floor(), self.y.floor())
    }
}

impl Add for ScreenPoint {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for ScreenPoint {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for ScreenPoint {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for ScreenPoint {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Pan and zoom state of the isometric view.
///
/// The whole world is laid out on a virtual screen `virtual_width` ×
/// `virtual_height` pixels large; `offset` is the virtual-screen pixel shown at
/// the widget's top-left corner. Tile and virtual sizes are only ever
/// recomputed together with `zoom`.
#[derive(Debug, Clone)]
pub struct Viewport {
    offset: ScreenPoint,
    zoom: f32,
    base_tile_width: f32,
    base_tile_height: f32,
    tile_width: f32,
    tile_height: f32,
    virtual_width: f32,
    virtual_height: f32,
    side: i32,
    width: f32,
    height: f32,
}

impl Viewport {
    /// Unzoomed viewport of a `side` × `side` world, centred on the virtual
    /// screen for a widget of `width` × `height` pixels.
    pub fn new(base_tile_width: f32, base_tile_height: f32, side: i32, width: f32, height: f32) -> Self {
        let mut vp = Self {
            offset: ScreenPoint::ZERO,
            zoom: 1.0,
            base_tile_width,
            base_tile_height,
            tile_width: 0.0,
            tile_height: 0.0,
            virtual_width: 0.0,
            virtual_height: 0.0,
            side,
            width,
            height,
        };
        vp.apply_zoom(1.0);
        vp.offset = ScreenPoint::new(
            ((vp.virtual_width - width) / 2.0).floor(),
            ((vp.virtual_height - height) / 2.0).floor(),
        );
        vp
    }

    pub fn offset(&self) -> ScreenPoint {
        self.offset
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> f32 {
        self.tile_height
    }

    pub fn virtual_width(&self) -> f32 {
        self.virtual_width
    }

    pub fn virtual_height(&self) -> f32 {
        self.virtual_height
    }

    pub fn side(&self) -> i32 {
        self.side
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Screen position of the tile's south (lowest) projected corner.
    pub fn tile_to_screen(&self, tile: TileCoord) -> ScreenPoint {
        let x = self.virtual_width / 2.0 + (tile.x - tile.y) as f32 * (self.tile_width / 2.0);
        let y = (tile.x + tile.y) as f32 * (self.tile_height / 2.0) + self.tile_height;
        ScreenPoint::new(x - self.offset.x, y - self.offset.y)
    }

    /// Tile whose diamond contains `p`.
    ///
    /// Inverse of [`Viewport::tile_to_screen`]: the south corner of a tile maps
    /// back to that tile. Points on a diamond edge belong to the tile above.
    pub fn screen_to_tile(&self, p: ScreenPoint) -> TileCoord {
        let vx = p.x + self.offset.x;
        let vy = p.y + self.offset.y;
        // Both are exactly tile + 1 at the south corner.
        let fx = (vx - self.virtual_width / 2.0) / self.tile_width + vy / self.tile_height;
        let fy = 2.0 * vy / self.tile_height - fx;
        TileCoord::new(edge_floor(fx), edge_floor(fy))
    }

    /// Tile under the centre of the widget.
    pub fn center_tile(&self) -> TileCoord {
        self.screen_to_tile(ScreenPoint::new(self.width / 2.0, self.height / 2.0))
    }

    /// Tiles under the top-left, top-right, bottom-right and bottom-left
    /// corners of the widget.
    pub fn visible_corners(&self) -> [TileCoord; 4] {
        [
            self.screen_to_tile(ScreenPoint::new(0.0, 0.0)),
            self.screen_to_tile(ScreenPoint::new(self.width, 0.0)),
            self.screen_to_tile(ScreenPoint::new(self.width, self.height)),
            self.screen_to_tile(ScreenPoint::new(0.0, self.height)),
        ]
    }

    /// Set the zoom factor, keeping the centre tile in the middle of the
    /// widget. Returns false (and changes nothing) outside
    /// `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
            return false;
        }
        let center = self.center_tile();
        let zoom = if (zoom - 1.0).abs() < ZOOM_SNAP { 1.0 } else { zoom };
        self.apply_zoom(zoom);
        self.show(center);
        true
    }

    /// Step up to the next power of √2.
    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(zoom_step(self.zoom, 1))
    }

    /// Step down to the previous power of √2.
    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(zoom_step(self.zoom, -1))
    }

    pub fn reset_zoom(&mut self) -> bool {
        self.set_zoom(1.0)
    }

    /// Centre the widget on the middle of `tile`'s diamond.
    pub fn show(&mut self, tile: TileCoord) {
        let cx = self.virtual_width / 2.0 + (tile.x - tile.y) as f32 * (self.tile_width / 2.0);
        let cy = (tile.x + tile.y) as f32 * (self.tile_height / 2.0) + self.tile_height / 2.0;
        self.offset = ScreenPoint::new(cx - self.width / 2.0, cy - self.height / 2.0);
    }

    /// Make the widget-local point `p` the new centre of the widget.
    pub fn recenter(&mut self, p: ScreenPoint) {
        let position = p + self.offset;
        self.offset = ScreenPoint::new(position.x - self.width / 2.0, position.y - self.height / 2.0).floor();
    }

    /// Shift the virtual-screen origin by `delta` pixels.
    pub fn pan_by(&mut self, delta: ScreenPoint) {
        self.offset += delta;
    }

    fn apply_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
        self.tile_width = self.base_tile_width * zoom;
        self.tile_height = self.base_tile_height * zoom;
        self.virtual_width = self.tile_width * self.side as f32;
        self.virtual_height = self.tile_height * self.side as f32;
    }
}

/// `floor` that assigns exact (and nearly exact) integers to the cell below.
/// `zoom` rounded to the nearest power of √2, moved `by` steps. Even powers
/// are exact powers of two, so repeated steps land on the bounds.
fn zoom_step(zoom: f32, by: i32) -> f32 {
    let k = (2.0 * zoom.log2()).round() as i32 + by;
    let whole = 2.0_f32.powi(k.div_euclid(2));
    if k.rem_euclid(2) == 0 {
        whole
    } else {
        whole * std::f32::consts::SQRT_2
    }
}

fn edge_floor(v: f32) -> i32 {
    (v - EDGE_EPSILON).ceil() as i32 - 1
}
