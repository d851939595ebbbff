use image::RgbaImage;

use crate::assets::{Anchor, LoadedTile};
use crate::paint::TextureUploader;
use crate::tile_types::{CATALOG, TileType};

/// Everything known about how to draw one tile type.
///
/// An image, once uploaded, is moved into the texture and never kept
/// alongside it.
#[derive(Debug)]
pub struct TileVisual<T> {
    image: Option<RgbaImage>,
    texture: Option<T>,
    size: (u32, u32),
    anchor: Anchor,
}

impl<T> Default for TileVisual<T> {
    fn default() -> Self {
        Self {
            image: None,
            texture: None,
            size: (0, 0),
            anchor: Anchor::default(),
        }
    }
}

/// A drawable texture with its placement data.
#[derive(Debug)]
pub struct Resolved<'a, T> {
    pub texture: &'a T,
    pub size: (u32, u32),
    pub anchor: Anchor,
}

/// Per-tile-type visuals, one slot per catalog entry.
#[derive(Debug)]
pub struct TileVisuals<T> {
    slots: Vec<TileVisual<T>>,
}

impl<T> Default for TileVisuals<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TileVisuals<T> {
    pub fn new() -> Self {
        Self {
            slots: std::iter::repeat_with(TileVisual::default)
                .take(CATALOG.len())
                .collect(),
        }
    }

    /// Store a freshly decoded image. Types that already have a texture
    /// keep it.
    pub fn ingest(&mut self, tile: LoadedTile) {
        let Some(slot) = self.slots.get_mut(tile.kind.index()) else {
            log::warn!("decoded image for unknown tile type {:?}", tile.kind);
            return;
        };
        if slot.texture.is_some() {
            return;
        }
        slot.size = tile.image.dimensions();
        slot.anchor = tile.anchor;
        slot.image = Some(tile.image);
    }

    /// The texture for `kind`, uploading a pending image first. `None` means
    /// neither image nor texture is available.
    pub fn resolve<U>(&mut self, kind: TileType, uploader: &mut U) -> Option<Resolved<'_, T>>
    where
        U: TextureUploader<Texture = T>,
    {
        let slot = self.slots.get_mut(kind.index())?;
        if slot.texture.is_none()
            && let Some(image) = slot.image.take()
        {
            match uploader.upload(image) {
                Ok(texture) => slot.texture = Some(texture),
                Err(e) => log::warn!("tile type {:?}: {}", kind, e),
            }
        }
        let texture = slot.texture.as_ref()?;
        Some(Resolved {
            texture,
            size: slot.size,
            anchor: slot.anchor,
        })
    }

    pub fn has_image(&self, kind: TileType) -> bool {
        self.slots
            .get(kind.index())
            .is_some_and(|s| s.image.is_some())
    }

    pub fn has_texture(&self, kind: TileType) -> bool {
        self.slots
            .get(kind.index())
            .is_some_and(|s| s.texture.is_some())
    }
}
