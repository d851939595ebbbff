pub mod assets;
pub mod config;
pub mod coords;
pub mod input;
pub mod keybindings;
pub mod paint;
pub mod render;
pub mod sprite;
pub mod texture_cache;
pub mod tile_map;
pub mod tile_types;
pub mod view;
