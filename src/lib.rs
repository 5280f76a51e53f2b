#![warn(missing_docs)]

//! Editing core for 2D tile-map levels: tile layers, parallax backgrounds and
//! static collision shapes, stored together in a single JSON level file.
//!
//! The [`MapController`] owns an open level and notifies listeners of every
//! change; [`tools`] turn pointer input into edits and undo actions.

pub mod background;
pub mod controller;
mod error;
pub mod loader {
    //! Reading and writing level files.

    /// Background section
    pub mod background_io;
    /// Whole level files
    pub mod level_io;
    /// Tile map section
    pub mod tilemap_io;
    /// Collision world section
    pub mod world_io;
}
pub mod preferences;
pub mod shapes;
pub mod tilemap;
pub mod tools;
pub mod undo;
pub mod world;

pub use background::{Background, ParallaxLayer};
pub use controller::{MapController, MapEvent, MapListener, TileSelection};
pub use error::LevelError;
pub use loader::level_io::{read_level, read_level_str, write_level, Level};
pub use preferences::Preferences;
pub use shapes::{Circle, Material, Polygon, Shape};
pub use tilemap::{Layer, Tile, TileMap};
pub use undo::{UndoAction, UndoStack};
pub use world::{BlazeWorld, ShapeId};
