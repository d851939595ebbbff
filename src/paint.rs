use image::RgbaImage;

use crate::assets::AssetError;
use crate::coords::ScreenPoint;

/// sRGB RGBA colour, components in 0..=1.
pub type Color = [f32; 4];

pub const RED: Color = [1.0, 0.0, 0.0, 1.0];
pub const BLACK: Color = [0.0, 0.0, 0.0, 1.0];
/// Cursor outline for single-tile selection.
pub const CURSOR_OUTLINE: Color = [1.0, 1.0, 1.0, 128.0 / 255.0];
pub const CURSOR_LEGAL: Color = [0.0, 0.0, 1.0, 128.0 / 255.0];
pub const CURSOR_ILLEGAL: Color = [1.0, 0.0, 0.0, 128.0 / 255.0];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }

    /// The four corners of the diamond inscribed in this rectangle:
    /// top, left, bottom, right.
    pub fn diamond(&self) -> [ScreenPoint; 4] {
        let mid_x = self.x + self.width / 2.0;
        let mid_y = self.y + self.height / 2.0;
        [
            ScreenPoint::new(mid_x, self.y),
            ScreenPoint::new(self.x, mid_y),
            ScreenPoint::new(mid_x, self.y + self.height),
            ScreenPoint::new(self.x + self.width, mid_y),
        ]
    }
}

/// Drawing surface the view renders into.
pub trait Painter {
    /// Handle of an uploaded texture.
    type Texture;

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Fill a convex polygon.
    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Color);

    /// Outline a closed polygon.
    fn stroke_polygon(&mut self, points: &[ScreenPoint], color: Color);

    /// Blit at natural size with the top-left corner at `at`.
    fn draw_texture(&mut self, texture: &Self::Texture, at: ScreenPoint);

    fn draw_texture_stretched(&mut self, texture: &Self::Texture, rect: Rect);

    fn fill_diamond(&mut self, rect: Rect, color: Color) {
        self.fill_polygon(&rect.diamond(), color);
    }

    fn stroke_diamond(&mut self, rect: Rect, color: Color) {
        self.stroke_polygon(&rect.diamond(), color);
    }
}

/// A painter that can also turn decoded images into its textures. Uploading
/// consumes the image.
pub trait TextureUploader: Painter {
    fn upload(&mut self, image: RgbaImage) -> Result<Self::Texture, AssetError>;
}

/// Texture handle of a [`DrawList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTexture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// One recorded drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    FillPolygon {
        points: Vec<ScreenPoint>,
        color: Color,
    },
    StrokePolygon {
        points: Vec<ScreenPoint>,
        color: Color,
    },
    Texture {
        texture: ListTexture,
        at: ScreenPoint,
    },
    StretchedTexture {
        texture: ListTexture,
        rect: Rect,
    },
}

/// Headless painter that records draw commands instead of producing pixels.
/// Decouples view logic from GPU renderers.
#[derive(Debug, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
    next_texture: u32,
    /// Number of uploads performed over the list's lifetime.
    pub uploads: u32,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Filled polygons of exactly `color`.
    pub fn fills_of(&self, color: Color) -> impl Iterator<Item = &[ScreenPoint]> {
        self.commands.iter().filter_map(move |cmd| match cmd {
            DrawCommand::FillPolygon { points, color: c } if *c == color => Some(points.as_slice()),
            _ => None,
        })
    }

    /// Every texture draw, stretched or not.
    pub fn textures(&self) -> impl Iterator<Item = &ListTexture> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Texture { texture, .. } | DrawCommand::StretchedTexture { texture, .. } => {
                Some(texture)
            }
            _ => None,
        })
    }
}

impl Painter for DrawList {
    type Texture = ListTexture;

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Color) {
        self.commands.push(DrawCommand::FillPolygon {
            points: points.to_vec(),
            color,
        });
    }

    fn stroke_polygon(&mut self, points: &[ScreenPoint], color: Color) {
        self.commands.push(DrawCommand::StrokePolygon {
            points: points.to_vec(),
            color,
        });
    }

    fn draw_texture(&mut self, texture: &ListTexture, at: ScreenPoint) {
        self.commands.push(DrawCommand::Texture {
            texture: *texture,
            at,
        });
    }

    fn draw_texture_stretched(&mut self, texture: &ListTexture, rect: Rect) {
        self.commands.push(DrawCommand::StretchedTexture {
            texture: *texture,
            rect,
        });
    }
}

impl TextureUploader for DrawList {
    fn upload(&mut self, image: RgbaImage) -> Result<ListTexture, AssetError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AssetError::Upload {
                reason: "empty image".to_string(),
            });
        }
        let texture = ListTexture {
            id: self.next_texture,
            width: image.width(),
            height: image.height(),
        };
        self.next_texture += 1;
        self.uploads += 1;
        Ok(texture)
    }
}
